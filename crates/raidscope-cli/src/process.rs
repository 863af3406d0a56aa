//! Process attach adapter.
//!
//! Implements [`RemoteMemory`] over the Windows debug read API so the engine
//! can mirror a process on the same machine. The walk anchors at the game's
//! main module base.

use raidscope_core::RemoteMemory;

#[cfg(target_os = "windows")]
pub use imp::ProcessMemory;

#[cfg(target_os = "windows")]
mod imp {
    use super::*;

    use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE};
    use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW, PROCESSENTRY32W,
        Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
    };

    pub struct ProcessMemory {
        handle: HANDLE,
        base: u64,
        pid: u32,
    }

    impl ProcessMemory {
        /// Find the process by executable name and open a read-only handle.
        pub fn attach(process_name: &str) -> anyhow::Result<Self> {
            let pid = find_process_id(process_name)?;
            let base = find_module_base(pid, process_name)?;

            // SAFETY: OpenProcess returns an owned handle; it is closed in Drop.
            let handle = unsafe {
                OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_VM_READ, false, pid)
            }
            .map_err(|e| anyhow::anyhow!("Failed to open process {pid}: {e}"))?;

            Ok(Self { handle, base, pid })
        }

        pub fn pid(&self) -> u32 {
            self.pid
        }
    }

    impl RemoteMemory for ProcessMemory {
        fn read_bytes(&self, address: u64, buf: &mut [u8]) -> raidscope_core::Result<()> {
            let mut read = 0usize;
            // SAFETY: buf outlives the call and the byte count matches its length.
            let result = unsafe {
                ReadProcessMemory(
                    self.handle,
                    address as *const core::ffi::c_void,
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                    Some(&mut read),
                )
            };
            if result.is_err() || read != buf.len() {
                return Err(raidscope_core::Error::ReadFailed { address, len: buf.len() });
            }
            Ok(())
        }

        fn base_address(&self) -> u64 {
            self.base
        }

        fn process_alive(&self) -> bool {
            let mut code = 0u32;
            // SAFETY: the handle was opened with query access and code is a
            // valid out pointer.
            unsafe {
                GetExitCodeProcess(self.handle, &mut code).is_ok()
                    && code == STILL_ACTIVE.0 as u32
            }
        }
    }

    impl Drop for ProcessMemory {
        fn drop(&mut self) {
            // SAFETY: the handle is owned by this struct and closed exactly once.
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }

    fn find_process_id(name: &str) -> anyhow::Result<u32> {
        // SAFETY: the snapshot handle is closed on every path; the entry's
        // dwSize is set before the first call.
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
                .map_err(|e| anyhow::anyhow!("Failed to snapshot processes: {e}"))?;
            let mut entry = PROCESSENTRY32W {
                dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };
            let mut found = None;
            if Process32FirstW(snapshot, &mut entry).is_ok() {
                loop {
                    if utf16_matches(&entry.szExeFile, name) {
                        found = Some(entry.th32ProcessID);
                        break;
                    }
                    if Process32NextW(snapshot, &mut entry).is_err() {
                        break;
                    }
                }
            }
            let _ = CloseHandle(snapshot);
            found.ok_or_else(|| anyhow::anyhow!("Process '{name}' not found"))
        }
    }

    fn find_module_base(pid: u32, module: &str) -> anyhow::Result<u64> {
        // SAFETY: the snapshot handle is closed on every path; the entry's
        // dwSize is set before the first call.
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
                .map_err(|e| anyhow::anyhow!("Failed to snapshot modules of {pid}: {e}"))?;
            let mut entry = MODULEENTRY32W {
                dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
                ..Default::default()
            };
            let mut found = None;
            if Module32FirstW(snapshot, &mut entry).is_ok() {
                loop {
                    if utf16_matches(&entry.szModule, module) {
                        found = Some(entry.modBaseAddr as u64);
                        break;
                    }
                    if Module32NextW(snapshot, &mut entry).is_err() {
                        break;
                    }
                }
            }
            let _ = CloseHandle(snapshot);
            found.ok_or_else(|| anyhow::anyhow!("Module '{module}' not found in process {pid}"))
        }
    }

    fn utf16_matches(raw: &[u16], name: &str) -> bool {
        let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
        String::from_utf16_lossy(&raw[..len]).eq_ignore_ascii_case(name)
    }
}

#[cfg(not(target_os = "windows"))]
pub struct ProcessMemory;

#[cfg(not(target_os = "windows"))]
impl ProcessMemory {
    pub fn attach(_process_name: &str) -> anyhow::Result<Self> {
        anyhow::bail!("Process attach is only supported on Windows")
    }

    pub fn pid(&self) -> u32 {
        0
    }
}

#[cfg(not(target_os = "windows"))]
impl RemoteMemory for ProcessMemory {
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> raidscope_core::Result<()> {
        Err(raidscope_core::Error::ReadFailed { address, len: buf.len() })
    }

    fn base_address(&self) -> u64 {
        0
    }

    fn process_alive(&self) -> bool {
        false
    }
}
