//! Snapshots of remote managed collections.
//!
//! Arrays, lists, dictionaries and hash sets are decoded with one span read
//! into a pooled buffer. A snapshot owns its buffer exclusively and returns
//! it to the pool on drop, including every error path. Element counts are
//! bounds-checked before anything is allocated; a count above
//! [`SANITY_CEILING`] is treated as corruption and aborts the decode.

use std::fmt;
use std::marker::PhantomData;

use bytemuck::{AnyBitPattern, Pod, Zeroable};

use crate::error::{Error, Result};
use crate::memory::layout::collection;
use crate::memory::reader::{RemoteMemory, RemoteMemoryExt};

/// Hard upper bound on plausible element counts.
pub const SANITY_CEILING: u32 = 16_384;

/// Per-entry bookkeeping prefix in dictionary entries (hash + bucket link).
const DICT_ENTRY_HEADER: usize = 8;
/// Per-entry bookkeeping prefix in hash-set slots (i32 hash + i32 next).
const SET_ENTRY_HEADER: usize = 8;

pub mod pool {
    //! Thread-local freelist backing collection snapshots.
    //!
    //! Each polling tier reuses its own buffers; a thread's pool is freed
    //! when the thread exits.

    use std::cell::RefCell;

    const MAX_POOLED: usize = 32;

    thread_local! {
        static FREE: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
    }

    pub(super) fn take(len: usize) -> Vec<u8> {
        FREE.with(|free| match free.borrow_mut().pop() {
            Some(mut buf) => {
                buf.clear();
                buf.resize(len, 0);
                buf
            }
            None => vec![0u8; len],
        })
    }

    pub(super) fn put(buf: Vec<u8>) {
        if buf.capacity() == 0 {
            return;
        }
        FREE.with(|free| {
            let mut free = free.borrow_mut();
            if free.len() < MAX_POOLED {
                free.push(buf);
            }
        });
    }

    /// Drop every buffer pooled by the calling thread.
    pub fn trim() {
        FREE.with(|free| {
            let mut free = free.borrow_mut();
            free.clear();
            free.shrink_to_fit();
        });
    }

    #[cfg(test)]
    pub(super) fn pooled() -> usize {
        FREE.with(|free| free.borrow().len())
    }
}

fn checked_count(address: u64, raw: i32) -> Result<usize> {
    // A negative count wraps to a huge u32 and fails the same check.
    let count = raw as u32;
    if count > SANITY_CEILING {
        return Err(Error::CollectionTooLarge { address, count, ceiling: SANITY_CEILING });
    }
    Ok(count as usize)
}

fn align_to(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Pooled backing storage shared by the snapshot types.
struct Block {
    buf: Vec<u8>,
    stride: usize,
    count: usize,
}

impl Block {
    fn empty() -> Self {
        Self { buf: Vec::new(), stride: 0, count: 0 }
    }

    fn read(mem: &dyn RemoteMemory, data_addr: u64, count: usize, stride: usize) -> Result<Self> {
        if count == 0 {
            return Ok(Self::empty());
        }
        let mut buf = pool::take(count * stride);
        if let Err(err) = mem.read_bytes(data_addr, &mut buf) {
            pool::put(buf);
            return Err(err);
        }
        Ok(Self { buf, stride, count })
    }

    fn field<T: AnyBitPattern>(&self, index: usize, offset: usize) -> T {
        let start = index * self.stride + offset;
        bytemuck::pod_read_unaligned(&self.buf[start..start + size_of::<T>()])
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        pool::put(std::mem::take(&mut self.buf));
    }
}

/// Snapshot of a remote managed array `T[]`.
pub struct RemoteArray<T> {
    block: Block,
    _marker: PhantomData<T>,
}

impl<T: AnyBitPattern> RemoteArray<T> {
    /// Decode the array object at `address`.
    pub fn read(mem: &dyn RemoteMemory, address: u64) -> Result<Self> {
        let raw = mem.read_value::<i32>(address + collection::ARRAY_COUNT)?;
        let count = checked_count(address, raw)?;
        let block = Block::read(mem, address + collection::ARRAY_DATA, count, size_of::<T>())?;
        Ok(Self { block, _marker: PhantomData })
    }

    /// Decode the managed list at `address` by following its backing array.
    pub fn read_list(mem: &dyn RemoteMemory, address: u64) -> Result<Self> {
        let raw = mem.read_value::<i32>(address + collection::LIST_COUNT)?;
        let count = checked_count(address, raw)?;
        if count == 0 {
            return Ok(Self { block: Block::empty(), _marker: PhantomData });
        }
        let items = mem.read_ptr(address + collection::LIST_ITEMS)?;
        let block = Block::read(mem, items + collection::ARRAY_DATA, count, size_of::<T>())?;
        Ok(Self { block, _marker: PhantomData })
    }

    pub fn len(&self) -> usize {
        self.block.count
    }

    pub fn is_empty(&self) -> bool {
        self.block.count == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        (index < self.block.count).then(|| self.block.field(index, 0))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.block.count).map(|i| self.block.field(i, 0))
    }
}

/// Snapshot of a remote managed dictionary.
///
/// Entries carry 8 bytes of hash/bucket bookkeeping ahead of the key; the
/// stride skips it without decoding.
pub struct RemoteDict<K, V> {
    block: Block,
    _marker: PhantomData<(K, V)>,
}

impl<K: AnyBitPattern, V: AnyBitPattern> RemoteDict<K, V> {
    pub fn read(mem: &dyn RemoteMemory, address: u64) -> Result<Self> {
        let raw = mem.read_value::<i32>(address + collection::DICT_COUNT)?;
        let count = checked_count(address, raw)?;
        if count == 0 {
            return Ok(Self { block: Block::empty(), _marker: PhantomData });
        }
        let entries = mem.read_ptr(address + collection::DICT_ENTRIES)?;
        let stride = align_to(DICT_ENTRY_HEADER + size_of::<K>() + size_of::<V>(), 8);
        let block = Block::read(mem, entries + collection::DICT_DATA, count, stride)?;
        Ok(Self { block, _marker: PhantomData })
    }

    pub fn len(&self) -> usize {
        self.block.count
    }

    pub fn is_empty(&self) -> bool {
        self.block.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        (0..self.block.count).map(|i| {
            (
                self.block.field(i, DICT_ENTRY_HEADER),
                self.block.field(i, DICT_ENTRY_HEADER + size_of::<K>()),
            )
        })
    }
}

/// Snapshot of a remote managed hash set.
pub struct RemoteHashSet<T> {
    block: Block,
    _marker: PhantomData<T>,
}

impl<T: AnyBitPattern> RemoteHashSet<T> {
    pub fn read(mem: &dyn RemoteMemory, address: u64) -> Result<Self> {
        let raw = mem.read_value::<i32>(address + collection::SET_COUNT)?;
        let count = checked_count(address, raw)?;
        if count == 0 {
            return Ok(Self { block: Block::empty(), _marker: PhantomData });
        }
        let slots = mem.read_ptr(address + collection::SET_SLOTS)?;
        let stride = align_to(SET_ENTRY_HEADER + size_of::<T>(), 4);
        let block = Block::read(mem, slots + collection::SET_DATA, count, stride)?;
        Ok(Self { block, _marker: PhantomData })
    }

    pub fn len(&self) -> usize {
        self.block.count
    }

    pub fn is_empty(&self) -> bool {
        self.block.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.block.count).map(|i| self.block.field(i, SET_ENTRY_HEADER))
    }
}

/// A 12-byte object id as stored in remote memory.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct MongoId {
    raw: [u8; 12],
}

impl MongoId {
    /// Freed hash-set slots and unset dictionary keys read back as zero.
    pub fn is_zero(&self) -> bool {
        self.raw.iter().all(|&b| b == 0)
    }

    /// Render as the 24-char lowercase hex form used by the item database.
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        let mut out = String::with_capacity(24);
        for byte in &self.raw {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    #[cfg(test)]
    pub fn from_hex(text: &str) -> Self {
        assert_eq!(text.len(), 24);
        let mut raw = [0u8; 12];
        for (i, chunk) in text.as_bytes().chunks(2).enumerate() {
            raw[i] = u8::from_str_radix(std::str::from_utf8(chunk).unwrap(), 16).unwrap();
        }
        Self { raw }
    }
}

impl fmt::Debug for MongoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
