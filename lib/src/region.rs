//! Per-pass snapshots of target memory regions.

use crate::{
    dumpable::{ByteView, Dumpable},
    error::Error,
    process::{MemoryKind, MemoryState, ProcessMemory, Protect, RegionInfo},
    scalar::Scalar,
    store::DumpStore,
    Address, AddressRange,
};
use std::sync::Arc;

/// One contiguous range of the target's address space, captured once per
/// pass.
///
/// The payload holds the region's bytes as read from the target. After a
/// dump-with-discard the bytes live only in the store and accessors fault
/// a mapped view back in.
pub struct RegionSnapshot {
    base: Address,
    protect: Protect,
    state: MemoryState,
    kind: MemoryKind,
    record: Dumpable<u8>,
}

impl RegionSnapshot {
    /// Wrap an enumerated region, binding its payload to `store`.
    pub fn new(info: RegionInfo, store: Arc<DumpStore>) -> RegionSnapshot {
        RegionSnapshot {
            base: info.range.base,
            protect: info.protect,
            state: info.state,
            kind: info.kind,
            record: Dumpable::with_len(store, info.range.size as usize),
        }
    }

    /// Base address of the region.
    pub fn base(&self) -> Address {
        self.base
    }

    /// Current payload size in bytes.
    ///
    /// Before a read this is the enumerated region size; afterwards it is
    /// the number of bytes the target actually delivered.
    pub fn size(&self) -> usize {
        self.record.len()
    }

    /// The address range currently covered by the snapshot.
    pub fn range(&self) -> AddressRange {
        AddressRange::new(self.base, self.size() as u64)
    }

    /// Check if `address` falls within the snapshot.
    ///
    /// The upper bound is inclusive; see [`AddressRange::contains`].
    pub fn contains(&self, address: Address) -> bool {
        self.range().contains(address)
    }

    pub fn is_committed(&self) -> bool {
        self.state == MemoryState::Commit
    }

    pub fn is_file_mapped(&self) -> bool {
        self.kind == MemoryKind::Mapped
    }

    pub fn has_protection(&self, mask: Protect) -> bool {
        self.protect.intersects(mask)
    }

    pub fn is_valid(&self) -> bool {
        self.record.is_valid()
    }

    /// Capture the region's bytes from the target.
    ///
    /// A short read shrinks the snapshot to the bytes delivered. On failure
    /// the payload is cleared and the snapshot marked invalid.
    pub fn read_from_target<P>(&self, process: &P) -> bool
    where
        P: ProcessMemory + ?Sized,
    {
        let size = self.size();
        let mut buf = vec![0u8; size];

        match process.read_memory(self.base, &mut buf) {
            Ok(n) if n > 0 => {
                buf.truncate(n);
                self.record.replace_data(buf);
                true
            }
            _ => {
                self.record.invalidate();
                false
            }
        }
    }

    /// Spill the payload to the store and release the RAM copy.
    pub fn dump_and_discard(&self) -> Result<(), Error> {
        self.record.dump(true)
    }

    pub fn is_discarded(&self) -> bool {
        self.record.is_discarded()
    }

    /// The raw payload bytes, faulting the mapped view in when discarded.
    pub fn bytes(&self) -> ByteView<'_> {
        self.record.bytes()
    }

    /// Decode a `T` at the given byte offset into the payload.
    ///
    /// Returns `None` when the snapshot is invalid, unmappable, or the
    /// offset is out of range.
    pub fn value_at_offset<T: Scalar>(&self, offset: usize) -> Option<T> {
        let view = self.record.bytes();
        let buf = view.as_slice();
        let end = offset.checked_add(T::WIRE_SIZE)?;

        if end > buf.len() {
            return None;
        }

        Some(T::read(&buf[offset..end]))
    }

    /// Decode the `index`-th `T` of the payload.
    pub fn value_at_index<T: Scalar>(&self, index: usize) -> Option<T> {
        self.value_at_offset(index * T::WIRE_SIZE)
    }

    /// Decode a `T` at a target virtual address.
    pub fn value_at_address<T: Scalar>(&self, address: Address) -> Option<T> {
        if !self.contains(address) {
            return None;
        }

        let offset = address.offset_from(self.base)? as usize;
        self.value_at_offset(offset)
    }
}
