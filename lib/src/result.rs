//! Per-region match lists.

use crate::{
    dumpable::{Dumpable, Element, ElementView},
    engine::{Comparator, ScanType},
    region::RegionSnapshot,
    scalar::Scalar,
    store::DumpStore,
    worker::{PassBarrier, WorkerPool},
    Address,
};
use byteorder::{ByteOrder as _, LittleEndian};
use parking_lot::Mutex;
use std::sync::Arc;

/// Above this element count a search is partitioned across the worker pool.
const PARALLEL_THRESHOLD: usize = 10000;

/// Workers used for an intra-region parallel search.
const SEARCH_WORKERS: usize = 4;

/// One match: the value observed and the address it lives at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanEntry<T: Scalar> {
    pub value: T,
    pub address: Address,
}

impl<T: Scalar> Element for ScanEntry<T> {
    const WIRE_SIZE: usize = T::WIRE_SIZE + 8;

    fn read(buf: &[u8]) -> Self {
        let value = T::read(buf);
        let address = Address::new(LittleEndian::read_u64(&buf[T::WIRE_SIZE..]));
        ScanEntry { value, address }
    }

    fn write(self, out: &mut Vec<u8>) {
        self.value.write(out);
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, self.address.as_u64());
        out.extend_from_slice(&buf);
    }
}

/// The match list one region produced in one pass.
///
/// Keeps a strong handle on the originating snapshot: the next pass walks
/// the snapshot's raw bytes when this result came out of an unknown-value
/// seed.
pub struct ScanResult<T: Scalar> {
    region: Arc<RegionSnapshot>,
    index: u32,
    scan_type: ScanType,
    entries: Dumpable<ScanEntry<T>>,
}

impl<T: Scalar> ScanResult<T> {
    /// Construct an empty result for `region`, identified by the pass-local
    /// `index`.
    pub fn new(
        region: Arc<RegionSnapshot>,
        index: u32,
        scan_type: ScanType,
        store: Arc<DumpStore>,
    ) -> ScanResult<T> {
        ScanResult {
            region,
            index,
            scan_type,
            entries: Dumpable::new(store),
        }
    }

    /// The snapshot this result was produced from.
    pub fn region(&self) -> &Arc<RegionSnapshot> {
        &self.region
    }

    pub fn region_base(&self) -> Address {
        self.region.base()
    }

    pub fn region_size(&self) -> usize {
        self.region.size()
    }

    /// Stable index of the region within its pass.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The scan type that produced this result.
    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    /// Append a match found by a next-pass worker.
    pub fn add_element(&self, entry: ScanEntry<T>) {
        self.entries.push(entry);
    }

    /// Number of recorded matches.
    pub fn entry_count(&self) -> usize {
        self.entries.view().len()
    }

    /// Read-only view over the matches. Empty when the record is invalid or
    /// unmappable.
    pub fn entries(&self) -> ElementView<'_, ScanEntry<T>> {
        self.entries.view()
    }

    /// Spill the match list to the store, releasing the RAM copy.
    pub fn dump_and_discard(&self) -> Result<(), crate::Error> {
        self.entries.dump(true)
    }

    /// Scan the associated region as a contiguous array of `T`, collecting
    /// every element the comparator accepts.
    ///
    /// Regions holding [`PARALLEL_THRESHOLD`] elements or more are split
    /// into equal chunks across a fixed worker pool; per-worker buffers are
    /// concatenated in worker order, so the outcome is identical to a
    /// serial scan. Returns whether anything matched.
    pub fn search_value(&self, comparator: Comparator<T>, value1: T, value2: Option<T>) -> bool {
        let total = self.region.size() / T::WIRE_SIZE;

        if total < PARALLEL_THRESHOLD {
            for index in 0..total {
                if let Some(entry) = self.test_index(index, comparator, value1, value2) {
                    self.entries.push(entry);
                }
            }

            return self.entry_count() > 0;
        }

        let pool = WorkerPool::new(SEARCH_WORKERS);
        let barrier = Arc::new(PassBarrier::new());
        let per_worker = total / SEARCH_WORKERS;

        let buffers: Vec<Arc<Mutex<Vec<ScanEntry<T>>>>> = (0..SEARCH_WORKERS)
            .map(|_| Arc::new(Mutex::new(Vec::new())))
            .collect();

        barrier.add(SEARCH_WORKERS);

        for job in 0..SEARCH_WORKERS {
            let start = job * per_worker;
            let end = if job == SEARCH_WORKERS - 1 {
                total
            } else {
                start + per_worker
            };

            let region = Arc::clone(&self.region);
            let buffer = Arc::clone(&buffers[job]);
            let barrier = Arc::clone(&barrier);

            pool.dispatch(job, move || {
                let mut local = Vec::new();

                for index in start..end {
                    if let Some(value) = region.value_at_index::<T>(index) {
                        if comparator(value, value1, value2) {
                            let address =
                                region.base().saturating_add((index * T::WIRE_SIZE) as u64);
                            local.push(ScanEntry { value, address });
                        }
                    }
                }

                *buffer.lock() = local;
                barrier.done();
            });
        }

        barrier.wait();

        let mut combined = Vec::new();

        for buffer in &buffers {
            combined.append(&mut buffer.lock());
        }

        if combined.is_empty() {
            return false;
        }

        self.entries.replace_data(combined);
        true
    }

    fn test_index(
        &self,
        index: usize,
        comparator: Comparator<T>,
        value1: T,
        value2: Option<T>,
    ) -> Option<ScanEntry<T>> {
        let value = self.region.value_at_index::<T>(index)?;

        if !comparator(value, value1, value2) {
            return None;
        }

        let address = self
            .region
            .base()
            .saturating_add((index * T::WIRE_SIZE) as u64);

        Some(ScanEntry { value, address })
    }
}
