//! Live process attachment and raw memory transfer.
//!
//! Windows-only at the OS boundary: process lookup goes through a ToolHelp
//! snapshot, transfers through `ReadProcessMemory`/`WriteProcessMemory`. On
//! other platforms every operation reports [`Error::ProcessUnsupported`] so
//! callers can fall back to offline data instead of crashing.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::memory::reader::{ReadMemory, WriteMemory};

/// A process located by executable name.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

#[derive(Debug)]
struct Attached {
    pid: u32,
    base_address: u64,
    #[cfg(target_os = "windows")]
    handle: platform::OwnedProcessHandle,
}

/// Handle lifecycle for the target game process.
///
/// `open` is idempotent while the same pid is alive; the handle is released
/// on [`GameProcess::close`] or drop. No state beyond the open handle and
/// the resolved module base is kept here.
#[derive(Debug)]
pub struct GameProcess {
    process_name: String,
    module_name: String,
    attached: Option<Attached>,
}

impl GameProcess {
    pub fn new(process_name: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            module_name: module_name.into(),
            attached: None,
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn is_open(&self) -> bool {
        self.attached.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.attached.as_ref().map(|a| a.pid)
    }

    /// Locate the target process, acquire a read/write handle and resolve
    /// the module base. Reuses the existing handle when already attached to
    /// the same pid.
    pub fn open(&mut self) -> Result<()> {
        let info = platform::find_process(&self.process_name)?;
        if let Some(attached) = &self.attached {
            if attached.pid == info.pid {
                return Ok(());
            }
            debug!(
                "Target pid changed ({} -> {}), reattaching",
                attached.pid, info.pid
            );
        }
        self.close();

        let attached = platform::attach(info.pid, &self.module_name)?;
        info!(
            "Attached to {} (pid {}, module base {:#x})",
            self.process_name, attached.pid, attached.base_address
        );
        self.attached = Some(attached);
        Ok(())
    }

    /// Release the process handle and clear cached address state.
    pub fn close(&mut self) {
        if let Some(attached) = self.attached.take() {
            debug!("Detached from pid {}", attached.pid);
        }
    }

    fn require_attached(&self, address: u64) -> Result<&Attached> {
        self.attached.as_ref().ok_or(Error::MemoryReadFailed {
            address,
            message: "process not attached".to_string(),
        })
    }
}

impl Drop for GameProcess {
    fn drop(&mut self) {
        self.close();
    }
}

impl ReadMemory for GameProcess {
    fn base_address(&self) -> u64 {
        self.attached.as_ref().map_or(0, |a| a.base_address)
    }

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let attached = self.require_attached(address)?;
        platform::read_bytes(attached, address, len)
    }
}

impl WriteMemory for GameProcess {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        let attached = self.require_attached(address)?;
        platform::write_bytes(attached, address, data)
    }
}

/// Seam between the roster model and the accessor so tests can substitute a
/// mock without a live process.
pub trait AttachProcess {
    fn attach(&mut self) -> Result<()>;
}

impl AttachProcess for GameProcess {
    fn attach(&mut self) -> Result<()> {
        self.open()
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::{Attached, ProcessInfo};
    use crate::error::{Error, Result};
    use std::ffi::c_void;

    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW, PROCESSENTRY32W,
        Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
        PROCESS_VM_WRITE,
    };

    /// HANDLE wrapper that closes on drop.
    #[derive(Debug)]
    pub(super) struct OwnedProcessHandle(HANDLE);

    impl Drop for OwnedProcessHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    fn utf16_name(buf: &[u16]) -> String {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len])
    }

    pub(super) fn find_process(name: &str) -> Result<ProcessInfo> {
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
                .map_err(|e| Error::ProcessOpenFailed(format!("process snapshot: {e}")))?;
            let mut entry = PROCESSENTRY32W {
                dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };
            let mut found = None;
            if Process32FirstW(snapshot, &mut entry).is_ok() {
                loop {
                    let exe = utf16_name(&entry.szExeFile);
                    if exe.eq_ignore_ascii_case(name) {
                        found = Some(ProcessInfo {
                            pid: entry.th32ProcessID,
                            name: exe,
                        });
                        break;
                    }
                    if Process32NextW(snapshot, &mut entry).is_err() {
                        break;
                    }
                }
            }
            let _ = CloseHandle(snapshot);
            found.ok_or_else(|| Error::ProcessNotFound(name.to_string()))
        }
    }

    fn module_base(pid: u32, module_name: &str) -> Result<u64> {
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
                .map_err(|e| Error::ProcessOpenFailed(format!("module snapshot: {e}")))?;
            let mut entry = MODULEENTRY32W {
                dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
                ..Default::default()
            };
            let mut base = None;
            if Module32FirstW(snapshot, &mut entry).is_ok() {
                loop {
                    let module = utf16_name(&entry.szModule);
                    if module.eq_ignore_ascii_case(module_name) {
                        base = Some(entry.modBaseAddr as u64);
                        break;
                    }
                    if Module32NextW(snapshot, &mut entry).is_err() {
                        break;
                    }
                }
            }
            let _ = CloseHandle(snapshot);
            base.ok_or_else(|| {
                Error::ProcessOpenFailed(format!("module {module_name} not found in pid {pid}"))
            })
        }
    }

    pub(super) fn attach(pid: u32, module_name: &str) -> Result<Attached> {
        let handle = unsafe {
            OpenProcess(
                PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION
                    | PROCESS_QUERY_INFORMATION,
                false,
                pid,
            )
        }
        .map_err(|e| Error::ProcessOpenFailed(format!("pid {pid}: {e}")))?;
        let handle = OwnedProcessHandle(handle);
        let base_address = module_base(pid, module_name)?;
        Ok(Attached {
            pid,
            base_address,
            handle,
        })
    }

    pub(super) fn read_bytes(attached: &Attached, address: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut read = 0usize;
        unsafe {
            ReadProcessMemory(
                attached.handle.0,
                address as *const c_void,
                buf.as_mut_ptr() as *mut c_void,
                len,
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;
        if read != len {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read: {read} of {len} bytes"),
            });
        }
        Ok(buf)
    }

    pub(super) fn write_bytes(attached: &Attached, address: u64, data: &[u8]) -> Result<()> {
        let mut written = 0usize;
        unsafe {
            WriteProcessMemory(
                attached.handle.0,
                address as *const c_void,
                data.as_ptr() as *const c_void,
                data.len(),
                Some(&mut written),
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;
        if written != data.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("short write: {written} of {} bytes", data.len()),
            });
        }
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use super::{Attached, ProcessInfo};
    use crate::error::{Error, Result};

    pub(super) fn find_process(_name: &str) -> Result<ProcessInfo> {
        Err(Error::ProcessUnsupported)
    }

    pub(super) fn attach(_pid: u32, _module_name: &str) -> Result<Attached> {
        Err(Error::ProcessUnsupported)
    }

    pub(super) fn read_bytes(_attached: &Attached, address: u64, _len: usize) -> Result<Vec<u8>> {
        Err(Error::MemoryReadFailed {
            address,
            message: "unsupported platform".to_string(),
        })
    }

    pub(super) fn write_bytes(_attached: &Attached, address: u64, _data: &[u8]) -> Result<()> {
        Err(Error::MemoryWriteFailed {
            address,
            message: "unsupported platform".to_string(),
        })
    }
}
