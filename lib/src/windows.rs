//! Native binding of the OS collaborators for Windows targets.

use crate::{
    error::Error,
    process::{MemoryKind, MemoryState, ProcessMemory, Protect, RegionInfo},
    Address, AddressRange,
};
use std::{convert::TryFrom, mem, ops};

use winapi::{
    shared::{
        basetsd::SIZE_T,
        minwindef::{DWORD, FALSE, LPVOID},
        winerror,
    },
    um::{memoryapi, processthreadsapi, sysinfoapi, winnt},
};

/// Wrapper for a process handle that takes care of drop.
struct Handle(winnt::HANDLE);

unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl ops::Deref for Handle {
    type Target = winnt::HANDLE;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe {
            winapi::um::handleapi::CloseHandle(self.0);
        }
    }
}

/// A target process opened for querying and reading.
pub struct WindowsProcess {
    process_id: u32,
    handle: Handle,
}

impl WindowsProcess {
    /// Open the given process for memory inspection.
    pub fn open(process_id: u32) -> Result<WindowsProcess, Error> {
        let handle = unsafe {
            processthreadsapi::OpenProcess(
                winnt::PROCESS_QUERY_INFORMATION | winnt::PROCESS_VM_READ,
                FALSE,
                process_id,
            )
        };

        if handle.is_null() {
            return Err(Error::OpenProcess(process_id));
        }

        Ok(WindowsProcess {
            process_id,
            handle: Handle(handle),
        })
    }

    /// The process id this handle refers to.
    pub fn process_id(&self) -> u32 {
        self.process_id
    }
}

fn decode_protect(protect: DWORD) -> Protect {
    let mut set = Protect::empty();

    let bits = [
        (winnt::PAGE_NOACCESS, Protect::NOACCESS),
        (winnt::PAGE_READONLY, Protect::READONLY),
        (winnt::PAGE_READWRITE, Protect::READWRITE),
        (winnt::PAGE_WRITECOPY, Protect::WRITECOPY),
        (winnt::PAGE_EXECUTE, Protect::EXECUTE),
        (winnt::PAGE_EXECUTE_READ, Protect::EXECUTE_READ),
        (winnt::PAGE_EXECUTE_READWRITE, Protect::EXECUTE_READWRITE),
        (winnt::PAGE_EXECUTE_WRITECOPY, Protect::EXECUTE_WRITECOPY),
        (winnt::PAGE_GUARD, Protect::GUARD),
        (winnt::PAGE_NOCACHE, Protect::NOCACHE),
    ];

    for (flag, value) in bits {
        if protect & flag != 0 {
            set |= value;
        }
    }

    set
}

impl ProcessMemory for WindowsProcess {
    fn region_info(&self, address: Address) -> Result<Option<RegionInfo>, Error> {
        let mut mbi: winnt::MEMORY_BASIC_INFORMATION = unsafe { mem::zeroed() };

        let length = unsafe {
            memoryapi::VirtualQueryEx(
                *self.handle,
                address.as_u64() as *const _,
                &mut mbi as *mut _ as winnt::PMEMORY_BASIC_INFORMATION,
                mem::size_of::<winnt::MEMORY_BASIC_INFORMATION>() as SIZE_T,
            )
        };

        if length == 0 {
            let e = Error::last_system_error();

            // Past the end of the queryable address space.
            if e.raw_os_error() == Some(winerror::ERROR_INVALID_PARAMETER as i32) {
                return Ok(None);
            }

            return Err(e);
        }

        let state = match mbi.State {
            winnt::MEM_COMMIT => MemoryState::Commit,
            winnt::MEM_FREE => MemoryState::Free,
            winnt::MEM_RESERVE => MemoryState::Reserve,
            state => return Err(Error::BadRegionState(state)),
        };

        let kind = match (state, mbi.Type) {
            (MemoryState::Free, _) => MemoryKind::None,
            (_, winnt::MEM_IMAGE) => MemoryKind::Image,
            (_, winnt::MEM_MAPPED) => MemoryKind::Mapped,
            (_, winnt::MEM_PRIVATE) => MemoryKind::Private,
            (_, ty) => return Err(Error::BadRegionType(ty)),
        };

        let protect = if state == MemoryState::Free {
            Protect::empty()
        } else {
            decode_protect(mbi.Protect)
        };

        Ok(Some(RegionInfo {
            range: AddressRange::new(
                Address::new(mbi.BaseAddress as u64),
                mbi.RegionSize as u64,
            ),
            protect,
            state,
            kind,
        }))
    }

    fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<usize, Error> {
        let mut bytes_read: SIZE_T = 0;

        let ok = unsafe {
            memoryapi::ReadProcessMemory(
                *self.handle,
                address.as_u64() as *const _,
                buf.as_mut_ptr() as LPVOID,
                buf.len() as SIZE_T,
                &mut bytes_read as *mut SIZE_T,
            )
        };

        if ok == FALSE {
            let e = Error::last_system_error();

            // Inaccessible or partially unmapped regions read as empty.
            match e.raw_os_error() {
                Some(code)
                    if code == winerror::ERROR_PARTIAL_COPY as i32
                        || code == winerror::ERROR_NOACCESS as i32 =>
                {
                    return Ok(0)
                }
                _ => return Err(e),
            }
        }

        Ok(usize::try_from(bytes_read).unwrap_or(0))
    }

    fn address_bounds(&self) -> Result<AddressRange, Error> {
        let mut info: sysinfoapi::SYSTEM_INFO = unsafe { mem::zeroed() };

        unsafe {
            sysinfoapi::GetSystemInfo(&mut info);
        }

        let min = info.lpMinimumApplicationAddress as u64;
        let max = info.lpMaximumApplicationAddress as u64;

        Ok(AddressRange::new(Address::new(min), max.saturating_sub(min)))
    }
}
