//! Injected OS collaborators the engine reads the target through.

use crate::{error::Error, Address, AddressRange};
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Page protection flags of a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protect: u32 {
        const NOACCESS = 1 << 0;
        const READONLY = 1 << 1;
        const READWRITE = 1 << 2;
        const WRITECOPY = 1 << 3;
        const EXECUTE = 1 << 4;
        const EXECUTE_READ = 1 << 5;
        const EXECUTE_READWRITE = 1 << 6;
        const EXECUTE_WRITECOPY = 1 << 7;
        const GUARD = 1 << 8;
        const NOCACHE = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryState {
    Commit,
    Reserve,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    None,
    Private,
    Mapped,
    Image,
}

/// Description of one region of the target's address space.
#[derive(Debug, Clone, Copy)]
pub struct RegionInfo {
    pub range: AddressRange,
    pub protect: Protect,
    pub state: MemoryState,
    pub kind: MemoryKind,
}

impl RegionInfo {
    /// Test if the region is committed.
    pub fn is_committed(&self) -> bool {
        self.state == MemoryState::Commit
    }

    /// Test if the region is backed by a mapped file.
    pub fn is_file_mapped(&self) -> bool {
        self.kind == MemoryKind::Mapped
    }

    /// Test if the region's protection intersects the given mask.
    pub fn has_protection(&self, mask: Protect) -> bool {
        self.protect.intersects(mask)
    }
}

/// Host-OS primitives the engine is parameterized over.
///
/// A real integration binds these to native syscalls; tests inject an
/// in-memory double.
pub trait ProcessMemory: Send + Sync {
    /// Describe the region containing `address`, or `None` past the end of
    /// the queryable space.
    fn region_info(&self, address: Address) -> Result<Option<RegionInfo>, Error>;

    /// Read target memory at `address` into `buf`, returning the number of
    /// bytes actually read. Zero means the read failed.
    fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<usize, Error>;

    /// The usable application address range of the target.
    fn address_bounds(&self) -> Result<AddressRange, Error>;
}

impl<P: ProcessMemory> ProcessMemory for Arc<P> {
    fn region_info(&self, address: Address) -> Result<Option<RegionInfo>, Error> {
        (**self).region_info(address)
    }

    fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<usize, Error> {
        (**self).read_memory(address, buf)
    }

    fn address_bounds(&self) -> Result<AddressRange, Error> {
        (**self).address_bounds()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{MemoryKind, MemoryState, ProcessMemory, Protect, RegionInfo};
    use crate::{error::Error, Address, AddressRange};
    use parking_lot::Mutex;

    struct Page {
        info: RegionInfo,
        bytes: Vec<u8>,
        readable: bool,
    }

    /// In-memory stand-in for a target process.
    ///
    /// Pages are kept sorted by base address; contents can be mutated
    /// between passes to simulate a live target.
    pub(crate) struct MockProcess {
        pages: Mutex<Vec<Page>>,
    }

    impl MockProcess {
        pub fn new() -> MockProcess {
            MockProcess {
                pages: Mutex::new(Vec::new()),
            }
        }

        pub fn add_region(&self, base: u64, bytes: Vec<u8>) {
            self.add_region_with(
                base,
                bytes,
                Protect::READWRITE,
                MemoryState::Commit,
                MemoryKind::Private,
            );
        }

        pub fn add_region_with(
            &self,
            base: u64,
            bytes: Vec<u8>,
            protect: Protect,
            state: MemoryState,
            kind: MemoryKind,
        ) {
            let mut pages = self.pages.lock();

            pages.push(Page {
                info: RegionInfo {
                    range: AddressRange::new(Address::new(base), bytes.len() as u64),
                    protect,
                    state,
                    kind,
                },
                bytes,
                readable: true,
            });

            pages.sort_by_key(|p| p.info.range.base);
        }

        /// Overwrite target bytes in place.
        pub fn patch(&self, address: u64, bytes: &[u8]) {
            let address = Address::new(address);
            let mut pages = self.pages.lock();

            for page in pages.iter_mut() {
                if let Some(offset) = address.offset_from(page.info.range.base) {
                    let offset = offset as usize;

                    if offset + bytes.len() <= page.bytes.len() {
                        page.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
                        return;
                    }
                }
            }

            panic!("patch outside any region: {}", address);
        }

        pub fn patch_u32(&self, address: u64, value: u32) {
            self.patch(address, &value.to_le_bytes());
        }

        pub fn remove_region(&self, base: u64) {
            self.pages
                .lock()
                .retain(|p| p.info.range.base != Address::new(base));
        }

        pub fn set_readable(&self, base: u64, readable: bool) {
            let mut pages = self.pages.lock();

            for page in pages.iter_mut() {
                if page.info.range.base == Address::new(base) {
                    page.readable = readable;
                }
            }
        }
    }

    impl ProcessMemory for MockProcess {
        fn region_info(&self, address: Address) -> Result<Option<RegionInfo>, Error> {
            let pages = self.pages.lock();

            for page in pages.iter() {
                let range = page.info.range;

                if address < range.base {
                    // Synthesize the free gap up to the next page.
                    let size = range.base.as_u64() - address.as_u64();

                    return Ok(Some(RegionInfo {
                        range: AddressRange::new(address, size),
                        protect: Protect::empty(),
                        state: MemoryState::Free,
                        kind: MemoryKind::None,
                    }));
                }

                if address < range.end() {
                    return Ok(Some(page.info));
                }
            }

            Ok(None)
        }

        fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<usize, Error> {
            let pages = self.pages.lock();

            for page in pages.iter() {
                let range = page.info.range;

                if address >= range.base && address < range.end() {
                    if !page.readable {
                        return Ok(0);
                    }

                    let offset = (address.as_u64() - range.base.as_u64()) as usize;
                    let available = page.bytes.len() - offset;
                    let n = buf.len().min(available);
                    buf[..n].copy_from_slice(&page.bytes[offset..offset + n]);
                    return Ok(n);
                }
            }

            Ok(0)
        }

        fn address_bounds(&self) -> Result<AddressRange, Error> {
            let pages = self.pages.lock();

            let min = pages
                .first()
                .map(|p| p.info.range.base)
                .unwrap_or(Address::new(0));
            let max = pages
                .last()
                .map(|p| p.info.range.end())
                .unwrap_or(Address::new(0));

            Ok(AddressRange::new(min, max.as_u64() - min.as_u64()))
        }
    }
}
