//! Read access to the target process.
//!
//! `RemoteMemory` is the seam between the engine and whatever channel
//! delivers process memory (driver, debug API, test fake). Only raw byte
//! reads are required; typed reads, pointer chains and string decoding are
//! layered on top by `RemoteMemoryExt`.

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::memory::layout::collection;

/// Lowest user-space address a pointer may legally hold.
const PTR_MIN: u64 = 0x1_0000;
/// Highest canonical user-space address on x64.
const PTR_MAX: u64 = 0x7FFF_FFFF_FFFF;

/// Check that a value read from memory can be followed as a pointer.
pub fn is_valid_ptr(value: u64) -> bool {
    (PTR_MIN..=PTR_MAX).contains(&value)
}

/// One read in a scatter submission.
///
/// `data` is seeded by the caller and left untouched when the read fails,
/// so a failed entry falls back to whatever was there before.
pub struct ScatterRequest {
    pub address: u64,
    pub data: Vec<u8>,
    pub ok: bool,
}

impl ScatterRequest {
    pub fn new(address: u64, len: usize) -> Self {
        Self { address, data: vec![0u8; len], ok: false }
    }

    pub fn seeded(address: u64, data: Vec<u8>) -> Self {
        Self { address, data, ok: false }
    }
}

/// Byte-level access to the target process.
pub trait RemoteMemory: Send + Sync {
    /// Read exactly `buf.len()` bytes at `address`.
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Base address of the engine module inside the target process.
    fn base_address(&self) -> u64;

    /// Cheap liveness probe for the target process.
    fn process_alive(&self) -> bool;

    /// Submit many reads at once.
    ///
    /// The default implementation loops over `read_bytes`; a channel with
    /// native scatter support should override it. Per-entry failures set
    /// `ok = false` and never fail the submission itself.
    fn read_scatter(&self, requests: &mut [ScatterRequest]) -> Result<()> {
        for req in requests.iter_mut() {
            req.ok = self.read_bytes(req.address, &mut req.data).is_ok();
        }
        Ok(())
    }
}

/// Typed reads layered over [`RemoteMemory`].
pub trait RemoteMemoryExt: RemoteMemory {
    /// Read a plain-old-data value.
    fn read_value<T: Pod>(&self, address: u64) -> Result<T> {
        let mut value = T::zeroed();
        self.read_bytes(address, bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }

    /// Read a pointer and verify it lands in canonical user space.
    fn read_ptr(&self, address: u64) -> Result<u64> {
        let value = self.read_value::<u64>(address)?;
        if !is_valid_ptr(value) {
            return Err(Error::BadPointer { address, value });
        }
        Ok(value)
    }

    /// Follow a chain of pointer offsets from `base`.
    ///
    /// Every hop except the last is dereferenced; the final offset is
    /// dereferenced too, so the result is itself a validated pointer.
    fn read_ptr_chain(&self, base: u64, offsets: &[u64]) -> Result<u64> {
        let mut addr = base;
        for offset in offsets {
            addr = self.read_ptr(addr + offset)?;
        }
        Ok(addr)
    }

    /// Read a managed string (i32 length, UTF-16 payload).
    fn read_string(&self, address: u64, max_chars: usize) -> Result<String> {
        let len = self.read_value::<i32>(address + collection::STRING_LEN)?;
        if len < 0 || len as usize > max_chars {
            return Err(Error::BadString(address));
        }
        if len == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; len as usize * 2];
        self.read_bytes(address + collection::STRING_DATA, &mut buf)?;
        let (text, had_errors) = encoding_rs::UTF_16LE.decode_without_bom_handling(&buf);
        if had_errors {
            return Err(Error::BadString(address));
        }
        Ok(text.into_owned())
    }

    /// Read a NUL-terminated ASCII name (native object names).
    fn read_ascii(&self, address: u64, max_len: usize) -> Result<String> {
        let mut buf = vec![0u8; max_len];
        self.read_bytes(address, &mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let name = &buf[..end];
        if !name.iter().all(|b| (0x20..0x7F).contains(b)) {
            return Err(Error::BadString(address));
        }
        Ok(String::from_utf8_lossy(name).into_owned())
    }
}

impl<R: RemoteMemory + ?Sized> RemoteMemoryExt for R {}
