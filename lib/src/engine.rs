//! Region enumeration, comparator selection and the pass-based scan driver.

use crate::{
    error::Error,
    map::SharedMap,
    process::{ProcessMemory, Protect, RegionInfo},
    region::RegionSnapshot,
    result::{ScanEntry, ScanResult},
    scalar::Scalar,
    store::DumpStore,
    worker::{PassBarrier, WorkerPool},
    AddressRange,
};
use std::{
    collections::VecDeque,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Workers used for the next-pass join.
const NEXT_SCAN_WORKERS: usize = 8;

/// How a pass decides whether an element matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Seed-only: record no entries, retain whole region contents on disk
    /// for later byte-level comparison.
    UnknownValue,
    IncreasedValue,
    DecreasedValue,
    ExactValue,
    IncreasedBy,
    DecreasedBy,
    SmallerThan,
    BiggerThan,
    Changed,
    Unchanged,
    ValueBetween,
}

impl ScanType {
    /// Whether the comparator's reference is the element's prior value
    /// rather than the user-supplied one.
    pub fn is_relative(self) -> bool {
        matches!(
            self,
            ScanType::IncreasedValue
                | ScanType::DecreasedValue
                | ScanType::IncreasedBy
                | ScanType::DecreasedBy
                | ScanType::Changed
                | ScanType::Unchanged
        )
    }
}

/// Comparator over `(new_value, reference, optional_extra)`.
pub type Comparator<T> = fn(T, T, Option<T>) -> bool;

/// Select the comparator for a scan type, monomorphized per scalar type.
///
/// `UnknownValue` has no comparator. Types that need a secondary value
/// reject every element when it is missing.
pub(crate) fn comparator<T: Scalar>(scan_type: ScanType) -> Option<Comparator<T>> {
    Some(match scan_type {
        ScanType::UnknownValue => return None,
        ScanType::ExactValue => |new, reference, _| new == reference,
        ScanType::BiggerThan => |new, reference, _| T::above(new, reference),
        ScanType::SmallerThan => |new, reference, _| T::below(new, reference),
        ScanType::Changed => |new, old, _| new != old,
        ScanType::Unchanged => |new, old, _| new == old,
        ScanType::IncreasedValue => |new, old, _| new > old,
        ScanType::DecreasedValue => |new, old, _| new < old,
        ScanType::IncreasedBy => |new, old, delta| match delta {
            Some(delta) => T::difference(new, old) == delta,
            None => false,
        },
        ScanType::DecreasedBy => |new, old, delta| match delta {
            Some(delta) => T::difference(old, new) == delta,
            None => false,
        },
        ScanType::ValueBetween => |new, low, high| match high {
            Some(high) => new > low && new < high,
            None => false,
        },
    })
}

/// Pass progress, reported from the driving thread.
pub trait Progress {
    /// Report the number of regions the pass will process.
    fn report_regions(&mut self, regions: usize);

    /// Report that the pass has progressed to the given percentage, with
    /// the running match count.
    fn report(&mut self, percentage: usize, entries: u64);
}

/// A progress sink that does nothing.
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn report_regions(&mut self, _: usize) {}

    fn report(&mut self, _: usize, _: u64) {}
}

/// The pass-based scan driver.
///
/// A first call to [`scan`](ScanEngine::scan) seeds the result set;
/// subsequent calls join fresh region snapshots against the previous
/// pass's results and narrow them. The engine owns the scratch stores that
/// region payloads and match lists spill into; both are removed when the
/// engine is dropped.
pub struct ScanEngine<T: Scalar, P: ProcessMemory + 'static> {
    process: Arc<P>,
    region_store: Arc<DumpStore>,
    entry_store: Arc<DumpStore>,
    prev_results: Option<Arc<SharedMap<ScanResult<T>>>>,
    passes: u64,
}

impl<T: Scalar, P: ProcessMemory + 'static> ScanEngine<T, P> {
    /// Create an engine whose scratch stores live under `scratch_dir`.
    pub fn new(process: P, scratch_dir: &Path) -> Result<ScanEngine<T, P>, Error> {
        let region_store = Arc::new(DumpStore::create(scratch_dir.join("regions.bin"))?);
        let entry_store = Arc::new(DumpStore::create(scratch_dir.join("entries.bin"))?);
        Ok(Self::with_stores(process, region_store, entry_store))
    }

    /// Create an engine over explicitly constructed scratch stores.
    pub fn with_stores(
        process: P,
        region_store: Arc<DumpStore>,
        entry_store: Arc<DumpStore>,
    ) -> ScanEngine<T, P> {
        ScanEngine {
            process: Arc::new(process),
            region_store,
            entry_store,
            prev_results: None,
            passes: 0,
        }
    }

    /// Results of the most recent pass, if one has completed.
    pub fn results(&self) -> Option<Arc<SharedMap<ScanResult<T>>>> {
        self.prev_results.clone()
    }

    /// Number of completed passes.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Run one pass over `range`, returning the total number of matches.
    ///
    /// Never fails: enumeration, read and store errors are local to a
    /// region or record and only reduce the result set.
    pub fn scan(
        &mut self,
        range: AddressRange,
        scan_type: ScanType,
        value1: T,
        value2: Option<T>,
    ) -> u64 {
        self.scan_with_progress(range, scan_type, value1, value2, &mut NoopProgress)
    }

    /// Like [`scan`](ScanEngine::scan), reporting progress as the pass runs.
    pub fn scan_with_progress<G: Progress>(
        &mut self,
        range: AddressRange,
        scan_type: ScanType,
        value1: T,
        value2: Option<T>,
        progress: &mut G,
    ) -> u64 {
        let mut regions =
            self.collect_regions(range, Protect::READWRITE | Protect::WRITECOPY);

        progress.report_regions(regions.len());

        let (results, total) = if self.passes == 0 {
            self.first_scan(&mut regions, scan_type, value1, value2, progress)
        } else {
            let prev = self.prev_results.clone().unwrap_or_default();
            self.next_scan(&mut regions, scan_type, prev, value1, value2, progress)
        };

        self.prev_results = Some(results);
        self.passes += 1;
        progress.report(100, total);

        total
    }

    /// Materialize the snapshot queue for one pass.
    ///
    /// Walks the target's regions from the bottom of `range`, clamps each
    /// to the range, and keeps those that are committed, not file-mapped
    /// and whose protection intersects `mask`. Stops at the top of the
    /// range or on the first query failure; regions already enqueued stay
    /// valid.
    fn collect_regions(
        &self,
        range: AddressRange,
        mask: Protect,
    ) -> VecDeque<Arc<RegionSnapshot>> {
        let mut regions = VecDeque::new();
        let mut current = range.base;
        let end = range.end();

        while current < end {
            let info = match self.process.region_info(current) {
                Ok(Some(info)) => info,
                _ => break,
            };

            let mut base = info.range.base;

            if base < range.base {
                base = range.base;
            }

            let mut size = info.range.size;

            if base.saturating_add(size) > end {
                size = end.as_u64().saturating_sub(base.as_u64());
            }

            let clamped = RegionInfo {
                range: AddressRange::new(base, size),
                ..info
            };

            if clamped.is_committed() && !clamped.is_file_mapped() && clamped.has_protection(mask)
            {
                regions.push_back(Arc::new(RegionSnapshot::new(
                    clamped,
                    Arc::clone(&self.region_store),
                )));
            }

            let next = base.saturating_add(size);

            if next <= current {
                break;
            }

            current = next;
        }

        regions
    }

    fn first_scan<G: Progress>(
        &self,
        regions: &mut VecDeque<Arc<RegionSnapshot>>,
        scan_type: ScanType,
        value1: T,
        value2: Option<T>,
        progress: &mut G,
    ) -> (Arc<SharedMap<ScanResult<T>>>, u64) {
        let results = Arc::new(SharedMap::new());
        let cmp = comparator::<T>(scan_type);
        let total_regions = regions.len().max(1);
        let mut total_entries = 0u64;
        let mut processed = 0usize;
        let mut index = 0u32;

        while let Some(region) = regions.pop_front() {
            if region.read_from_target(&*self.process) {
                let result = Arc::new(ScanResult::new(
                    Arc::clone(&region),
                    index,
                    scan_type,
                    Arc::clone(&self.entry_store),
                ));

                let mut success = false;

                if scan_type == ScanType::UnknownValue {
                    // Keep the full contents on disk; the next pass reads
                    // prior values straight out of the store.
                    success = region.dump_and_discard().is_ok();
                }

                if let Some(cmp) = cmp {
                    success = result.search_value(cmp, value1, value2);

                    if success {
                        total_entries += result.entry_count() as u64;
                    }
                }

                if success {
                    results.insert(index, result);
                }
            }

            index += 1;
            processed += 1;
            progress.report(processed * 100 / total_regions, total_entries);
        }

        (results, total_entries)
    }

    fn next_scan<G: Progress>(
        &self,
        regions: &mut VecDeque<Arc<RegionSnapshot>>,
        scan_type: ScanType,
        prev: Arc<SharedMap<ScanResult<T>>>,
        value1: T,
        value2: Option<T>,
        progress: &mut G,
    ) -> (Arc<SharedMap<ScanResult<T>>>, u64) {
        let results = Arc::new(SharedMap::new());
        let total_entries = Arc::new(AtomicU64::new(0));
        let pool = WorkerPool::new(NEXT_SCAN_WORKERS);
        let barrier = Arc::new(PassBarrier::new());
        let cmp = comparator::<T>(scan_type);

        let total_regions = regions.len().max(1);
        let mut processed = 0usize;
        let mut dispatched = 0usize;
        let mut keys = prev.keys().into_iter().peekable();

        'regions: while let Some(region) = regions.pop_front() {
            processed += 1;

            // Drop prior results ending strictly below this region; their
            // addresses no longer fall inside any current writable region.
            let (key, old) = loop {
                let key = match keys.peek() {
                    Some(key) => *key,
                    None => break 'regions,
                };

                let old = match prev.get(key) {
                    Some(old) => old,
                    None => {
                        keys.next();
                        continue;
                    }
                };

                let old_end = old.region_base().saturating_add(old.region_size() as u64);

                if old_end < region.base() {
                    prev.erase(key);
                    keys.next();
                    continue;
                }

                break (key, old);
            };

            // The ranges must actually overlap; otherwise this region pairs
            // with nothing and the prior result waits for a later one.
            if old.region_base() >= region.base().saturating_add(region.size() as u64) {
                continue;
            }

            keys.next();
            prev.erase(key);
            barrier.add(1);

            let task = {
                let process = Arc::clone(&self.process);
                let entry_store = Arc::clone(&self.entry_store);
                let results = Arc::clone(&results);
                let total_entries = Arc::clone(&total_entries);
                let barrier = Arc::clone(&barrier);

                move || {
                    scan_pair(
                        &*process,
                        &entry_store,
                        &results,
                        &total_entries,
                        &old,
                        &region,
                        scan_type,
                        cmp,
                        value1,
                        value2,
                    );
                    barrier.done();
                }
            };

            pool.dispatch(dispatched, task);
            dispatched += 1;

            progress.report(
                processed * 100 / total_regions,
                total_entries.load(Ordering::Relaxed),
            );
        }

        barrier.wait();

        let total = total_entries.load(Ordering::SeqCst);
        (results, total)
    }
}

/// Join one prior result with its overlapping fresh snapshot.
#[allow(clippy::too_many_arguments)]
fn scan_pair<T: Scalar>(
    process: &dyn ProcessMemory,
    entry_store: &Arc<DumpStore>,
    results: &SharedMap<ScanResult<T>>,
    total_entries: &AtomicU64,
    old: &ScanResult<T>,
    region: &Arc<RegionSnapshot>,
    scan_type: ScanType,
    cmp: Option<Comparator<T>>,
    value1: T,
    value2: Option<T>,
) {
    if !region.read_from_target(process) {
        return;
    }

    let cmp = match cmp {
        Some(cmp) => cmp,
        None => return,
    };

    let result = Arc::new(ScanResult::new(
        Arc::clone(region),
        old.index(),
        scan_type,
        Arc::clone(entry_store),
    ));

    let mut test = |old_entry: ScanEntry<T>| {
        let new_value = match region.value_at_address::<T>(old_entry.address) {
            Some(value) => value,
            None => return,
        };

        let (reference, extra) = if scan_type.is_relative() {
            (old_entry.value, Some(value1))
        } else {
            (value1, value2)
        };

        if cmp(new_value, reference, extra) {
            total_entries.fetch_add(1, Ordering::SeqCst);
            result.add_element(ScanEntry {
                value: new_value,
                address: old_entry.address,
            });
        }
    };

    if old.scan_type() == ScanType::UnknownValue {
        // No entries were materialized by the seed; walk the retained
        // region dump element by element.
        let prev_region = old.region();
        let count = prev_region.size() / T::WIRE_SIZE;

        for index in 0..count {
            let value = match prev_region.value_at_index::<T>(index) {
                Some(value) => value,
                None => continue,
            };

            let address = prev_region
                .base()
                .saturating_add((index * T::WIRE_SIZE) as u64);

            test(ScanEntry { value, address });
        }
    } else {
        let entries = old.entries();

        for entry in entries.iter() {
            test(entry);
        }
    }

    if result.entry_count() > 0 {
        results.insert(old.index(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::{comparator, ScanEngine, ScanType};
    use crate::{
        process::testing::MockProcess,
        store::DumpStore,
        Address, AddressRange, ProcessMemory as _,
    };
    use std::sync::Arc;

    fn engine_for(
        process: &Arc<MockProcess>,
        store_capacity: usize,
    ) -> (
        tempfile::TempDir,
        ScanEngine<u32, Arc<MockProcess>>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let regions = Arc::new(
            DumpStore::with_capacity(dir.path().join("regions.bin"), store_capacity).unwrap(),
        );
        let entries = Arc::new(
            DumpStore::with_capacity(dir.path().join("entries.bin"), store_capacity).unwrap(),
        );
        let engine = ScanEngine::with_stores(Arc::clone(process), regions, entries);
        (dir, engine)
    }

    fn u32_bytes(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn matches(engine: &ScanEngine<u32, Arc<MockProcess>>) -> Vec<(u64, u32)> {
        let mut out = Vec::new();

        if let Some(results) = engine.results() {
            results.for_each(|_, result| {
                for entry in result.entries().iter() {
                    out.push((entry.address.as_u64(), entry.value));
                }
            });
        }

        out
    }

    #[test]
    fn test_seed_exact_value() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[10, 20, 30, 40]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(bounds, ScanType::ExactValue, 30, None);

        assert_eq!(1, total);
        assert_eq!(vec![(0x1008, 30)], matches(&engine));
    }

    #[test]
    fn test_seed_without_matches_keeps_empty_result_map() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[10, 20, 30, 40]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(bounds, ScanType::ExactValue, 5, None);

        assert_eq!(0, total);
        let results = engine.results().unwrap();
        assert!(results.is_empty());
        assert_eq!(1, engine.pass_count());
    }

    #[test]
    fn test_refine_with_increased_value() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[10, 20, 30, 40]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        assert_eq!(4, engine.scan(bounds, ScanType::BiggerThan, 0, None));

        process.patch_u32(0x1004, 21);
        process.patch_u32(0x100C, 39);

        let total = engine.scan(bounds, ScanType::IncreasedValue, 0, None);
        assert_eq!(1, total);
        assert_eq!(vec![(0x1004, 21)], matches(&engine));
    }

    #[test]
    fn test_unknown_seed_then_changed() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[7, 8, 9]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(bounds, ScanType::UnknownValue, 0, None);

        // Nothing is reported, but the region contents were retained.
        assert_eq!(0, total);
        let seeded = engine.results().unwrap();
        assert_eq!(1, seeded.len());
        assert!(seeded.first().unwrap().region().is_discarded());

        process.patch_u32(0x1004, 9);

        let total = engine.scan(bounds, ScanType::Changed, 0, None);
        assert_eq!(1, total);
        assert_eq!(vec![(0x1004, 9)], matches(&engine));
    }

    #[test]
    fn test_value_between_is_strict_and_needs_upper_bound() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[5, 10, 15, 25, 30, 35]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(bounds, ScanType::ValueBetween, 10, Some(30));

        assert_eq!(2, total);
        assert_eq!(vec![(0x1008, 15), (0x100C, 25)], matches(&engine));

        // Without the upper bound every element is rejected.
        let (_dir, mut engine) = engine_for(&process, 4096);
        assert_eq!(0, engine.scan(bounds, ScanType::ValueBetween, 10, None));
    }

    #[test]
    fn test_refinement_is_subset_of_previous_pass() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[10, 20, 30, 40]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        assert_eq!(4, engine.scan(bounds, ScanType::BiggerThan, 0, None));
        let first: Vec<(u64, u32)> = matches(&engine);

        // Target frozen; unchanged refines to the same set.
        assert_eq!(4, engine.scan(bounds, ScanType::Unchanged, 0, None));
        let second: Vec<(u64, u32)> = matches(&engine);

        assert_eq!(first, second);

        // A further exact refinement is a strict subset.
        assert_eq!(1, engine.scan(bounds, ScanType::ExactValue, 30, None));
        assert!(matches(&engine)
            .iter()
            .all(|entry| second.contains(entry)));
    }

    #[test]
    fn test_join_erases_unmapped_prior_regions() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[1, 2]));
        process.add_region(0x3000, u32_bytes(&[3, 4]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        assert_eq!(4, engine.scan(bounds, ScanType::BiggerThan, 0, None));

        let prev = engine.results().unwrap();
        assert_eq!(vec![0, 1], prev.keys());

        // The low region disappears before the next pass.
        process.remove_region(0x1000);
        let bounds = process.address_bounds().unwrap();
        let total = engine.scan(bounds, ScanType::Unchanged, 0, None);

        // The stale prior result was erased during the walk, the live one
        // consumed by its pairing.
        assert!(prev.is_empty());

        assert_eq!(2, total);
        assert_eq!(vec![(0x3000, 3), (0x3004, 4)], matches(&engine));
        assert_eq!(vec![1], engine.results().unwrap().keys());
    }

    #[test]
    fn test_join_keeps_prior_waiting_for_overlap() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x3000, u32_bytes(&[3, 4]));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        assert_eq!(2, engine.scan(bounds, ScanType::BiggerThan, 0, None));

        // A fresh low region appears before the surviving prior one; it
        // pairs with nothing and is dropped, while the prior result waits
        // for the region it overlaps.
        process.add_region(0x1000, u32_bytes(&[1, 2]));
        let bounds = process.address_bounds().unwrap();

        let total = engine.scan(bounds, ScanType::Unchanged, 0, None);
        assert_eq!(2, total);
        assert_eq!(vec![(0x3000, 3), (0x3004, 4)], matches(&engine));
    }

    #[test]
    fn test_unknown_seed_survives_small_store_buffer() {
        // Region larger than the store's write buffer exercises the
        // flush-then-map round trip for retained contents.
        let values: Vec<u32> = (0..1024).collect();
        let process = Arc::new(MockProcess::new());
        process.add_region(0x8000, u32_bytes(&values));
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 64);
        assert_eq!(0, engine.scan(bounds, ScanType::UnknownValue, 0, None));

        process.patch_u32(0x8000 + 512 * 4, 999_999);

        let total = engine.scan(bounds, ScanType::Changed, 0, None);
        assert_eq!(1, total);
        assert_eq!(vec![(0x8000 + 512 * 4, 999_999)], matches(&engine));
    }

    #[test]
    fn test_unreadable_region_contributes_nothing() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[30, 30]));
        process.add_region(0x3000, u32_bytes(&[30]));
        process.set_readable(0x3000, false);
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(bounds, ScanType::ExactValue, 30, None);

        assert_eq!(2, total);
        assert_eq!(vec![(0x1000, 30), (0x1004, 30)], matches(&engine));
    }

    #[test]
    fn test_non_writable_regions_are_skipped() {
        use crate::process::{MemoryKind, MemoryState, Protect};

        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[30]));
        process.add_region_with(
            0x2000,
            u32_bytes(&[30]),
            Protect::READONLY,
            MemoryState::Commit,
            MemoryKind::Private,
        );
        process.add_region_with(
            0x3000,
            u32_bytes(&[30]),
            Protect::READWRITE,
            MemoryState::Commit,
            MemoryKind::Mapped,
        );
        let bounds = process.address_bounds().unwrap();

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(bounds, ScanType::ExactValue, 30, None);

        assert_eq!(1, total);
        assert_eq!(vec![(0x1000, 30)], matches(&engine));
    }

    #[test]
    fn test_enumeration_clamps_to_range() {
        let process = Arc::new(MockProcess::new());
        process.add_region(0x1000, u32_bytes(&[30, 30, 30, 30]));

        // Only the middle of the region falls inside the scanned range.
        let range = AddressRange::new(Address::new(0x1004), 8);

        let (_dir, mut engine) = engine_for(&process, 4096);
        let total = engine.scan(range, ScanType::ExactValue, 30, None);

        assert_eq!(2, total);
        assert_eq!(vec![(0x1004, 30), (0x1008, 30)], matches(&engine));
    }

    #[test]
    fn test_comparator_table() {
        let exact = comparator::<u32>(ScanType::ExactValue).unwrap();
        assert!(exact(30, 30, None));
        assert!(!exact(31, 30, None));

        let increased_by = comparator::<u32>(ScanType::IncreasedBy).unwrap();
        assert!(increased_by(30, 20, Some(10)));
        assert!(!increased_by(30, 20, Some(5)));
        assert!(!increased_by(30, 20, None));

        let decreased_by = comparator::<u32>(ScanType::DecreasedBy).unwrap();
        assert!(decreased_by(20, 30, Some(10)));
        assert!(!decreased_by(20, 30, None));

        let between = comparator::<u32>(ScanType::ValueBetween).unwrap();
        assert!(between(15, 10, Some(30)));
        assert!(!between(10, 10, Some(30)));
        assert!(!between(30, 10, Some(30)));

        assert!(comparator::<u32>(ScanType::UnknownValue).is_none());

        let bigger = comparator::<f32>(ScanType::BiggerThan).unwrap();
        assert!(!bigger(1.00005, 1.0, None));
        assert!(bigger(1.001, 1.0, None));

        let smaller = comparator::<f32>(ScanType::SmallerThan).unwrap();
        assert!(!smaller(0.99995, 1.0, None));
        assert!(smaller(0.999, 1.0, None));
    }
}
