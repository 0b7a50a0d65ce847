mod address;
mod dumpable;
mod engine;
mod error;
mod map;
mod process;
mod region;
mod result;
mod scalar;
mod store;
mod worker;
#[cfg(windows)]
mod windows;

pub use self::address::{Address, AddressRange};
pub use self::dumpable::{ByteView, Dumpable, Element, ElementView};
pub use self::engine::{Comparator, NoopProgress, Progress, ScanEngine, ScanType};
pub use self::error::Error;
pub use self::map::SharedMap;
pub use self::process::{MemoryKind, MemoryState, ProcessMemory, Protect, RegionInfo};
pub use self::region::RegionSnapshot;
pub use self::result::{ScanEntry, ScanResult};
pub use self::scalar::Scalar;
pub use self::store::{DumpStore, MappedChunk, DEFAULT_BUFFER_CAPACITY};
pub use self::worker::{DeferredProcessor, PassBarrier, WorkerPool};
#[cfg(windows)]
pub use self::windows::WindowsProcess;
