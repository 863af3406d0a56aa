//! In-memory fake of [`RemoteMemory`] for tests.
//!
//! Tests lay out regions of a fake address space with the builder, then
//! mutate or unmap them mid-test to drive failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::memory::layout::collection;
use crate::memory::reader::RemoteMemory;

pub const DEFAULT_BASE: u64 = 0x0001_4000_0000;

pub struct MockMemory {
    regions: Mutex<BTreeMap<u64, Vec<u8>>>,
    base: u64,
    alive: AtomicBool,
}

impl MockMemory {
    /// Overwrite or create a region starting at `address`.
    pub fn write_bytes(&self, address: u64, bytes: &[u8]) {
        self.regions.lock().insert(address, bytes.to_vec());
    }

    pub fn write_u64(&self, address: u64, value: u64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_i32(&self, address: u64, value: i32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    /// Unmap the region that starts at `address`; reads into it fail afterwards.
    pub fn unmap(&self, address: u64) {
        self.regions.lock().remove(&address);
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }
}

impl RemoteMemory for MockMemory {
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let regions = self.regions.lock();
        if let Some((start, data)) = regions.range(..=address).next_back() {
            let offset = (address - start) as usize;
            if offset + buf.len() <= data.len() {
                buf.copy_from_slice(&data[offset..offset + buf.len()]);
                return Ok(());
            }
        }
        Err(Error::ReadFailed { address, len: buf.len() })
    }

    fn base_address(&self) -> u64 {
        self.base
    }

    fn process_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

pub struct MockMemoryBuilder {
    regions: BTreeMap<u64, Vec<u8>>,
    base: u64,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self { regions: BTreeMap::new(), base: DEFAULT_BASE }
    }

    pub fn with_base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn with_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        self.regions.insert(address, bytes.to_vec());
        self
    }

    pub fn with_u64(self, address: u64, value: u64) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    pub fn with_i32(self, address: u64, value: i32) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    pub fn with_u8(self, address: u64, value: u8) -> Self {
        self.with_bytes(address, &[value])
    }

    pub fn with_f32(self, address: u64, value: f32) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    pub fn with_value<T: bytemuck::NoUninit>(self, address: u64, value: T) -> Self {
        self.with_bytes(address, bytemuck::bytes_of(&value))
    }

    /// Lay out a managed string: i32 length + UTF-16 code units.
    pub fn with_managed_string(self, address: u64, text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut data = Vec::with_capacity(units.len() * 2);
        for unit in &units {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        self.with_i32(address + collection::STRING_LEN, units.len() as i32)
            .with_bytes(address + collection::STRING_DATA, &data)
    }

    /// Lay out a NUL-terminated ASCII name, NUL-padded so fixed-size name
    /// reads (up to 64 bytes) stay inside the region.
    pub fn with_ascii(self, address: u64, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        data.resize(data.len().max(64), 0);
        self.with_bytes(address, &data)
    }

    /// Lay out a managed list of pointers plus its backing array.
    pub fn with_ptr_list(self, list: u64, backing: u64, items: &[u64]) -> Self {
        let mut data = Vec::with_capacity(items.len() * 8);
        for item in items {
            data.extend_from_slice(&item.to_le_bytes());
        }
        self.with_u64(list + collection::LIST_ITEMS, backing)
            .with_i32(list + collection::LIST_COUNT, items.len() as i32)
            .with_bytes(backing + collection::ARRAY_DATA, &data)
    }

    pub fn build(self) -> MockMemory {
        MockMemory {
            regions: Mutex::new(self.regions),
            base: self.base,
            alive: AtomicBool::new(true),
        }
    }
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
