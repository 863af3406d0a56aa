//! Batched reads.
//!
//! [`ScatterBatch`] submits independent reads in one round trip; a failed
//! entry reports the value it was seeded with, so callers keep the last
//! known state. [`ScatterRounds`] chains rounds whose read addresses derive
//! from pointers produced by earlier rounds; there a failed or implausible
//! upstream pointer marks the dependent entries failed instead.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::error::Result;
use crate::memory::reader::{RemoteMemory, ScatterRequest, is_valid_ptr};

/// Typed handle to a flat batch entry.
#[derive(Clone, Copy)]
pub struct Entry<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

/// A flat scatter batch. Queue reads, execute once, read values out.
#[derive(Default)]
pub struct ScatterBatch {
    requests: Vec<ScatterRequest>,
}

impl ScatterBatch {
    pub fn new() -> Self {
        Self { requests: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Queue a read of `T` at `address`, seeded with the value to report
    /// if the read fails.
    pub fn add_value<T: Pod>(&mut self, address: u64, seed: T) -> Entry<T> {
        let index = self.requests.len();
        self.requests.push(ScatterRequest::seeded(address, bytemuck::bytes_of(&seed).to_vec()));
        Entry { index, _marker: PhantomData }
    }

    /// Submit every queued read in one scatter.
    pub fn execute(&mut self, mem: &dyn RemoteMemory) -> Result<()> {
        mem.read_scatter(&mut self.requests)
    }

    /// The fresh value if the entry's read succeeded, its seed otherwise.
    pub fn value<T: Pod>(&self, entry: Entry<T>) -> T {
        bytemuck::pod_read_unaligned(&self.requests[entry.index].data)
    }

    pub fn succeeded<T>(&self, entry: Entry<T>) -> bool {
        self.requests[entry.index].ok
    }
}

/// Handle to one round of a [`ScatterRounds`] batch.
#[derive(Clone, Copy)]
pub struct RoundHandle(usize);

/// Typed handle to a rounds entry.
#[derive(Clone, Copy)]
pub struct Slot<T> {
    round: usize,
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

enum Source {
    Fixed(u64),
    /// Address = an earlier round's pointer value + offset.
    Derived { base: Slot<u64>, offset: u64 },
}

struct RoundEntry {
    source: Source,
    data: Vec<u8>,
    ok: bool,
}

/// Ordered rounds of scatter reads with address dependencies between rounds.
#[derive(Default)]
pub struct ScatterRounds {
    rounds: Vec<Vec<RoundEntry>>,
}

impl ScatterRounds {
    pub fn new() -> Self {
        Self { rounds: Vec::new() }
    }

    pub fn add_round(&mut self) -> RoundHandle {
        self.rounds.push(Vec::new());
        RoundHandle(self.rounds.len() - 1)
    }

    /// Queue a read of `T` at a fixed address in `round`.
    pub fn read<T: Pod>(&mut self, round: RoundHandle, address: u64) -> Slot<T> {
        self.push::<T>(round, Source::Fixed(address))
    }

    /// Queue a read of `T` at `base`'s pointer value plus `offset`.
    /// `base` must come from an earlier round.
    pub fn read_at<T: Pod>(&mut self, round: RoundHandle, base: Slot<u64>, offset: u64) -> Slot<T> {
        debug_assert!(base.round < round.0, "derived read must depend on an earlier round");
        self.push::<T>(round, Source::Derived { base, offset })
    }

    fn push<T: Pod>(&mut self, round: RoundHandle, source: Source) -> Slot<T> {
        let entries = &mut self.rounds[round.0];
        entries.push(RoundEntry { source, data: vec![0u8; size_of::<T>()], ok: false });
        Slot { round: round.0, index: entries.len() - 1, _marker: PhantomData }
    }

    /// Execute all rounds in order.
    ///
    /// Entries whose upstream pointer failed or is implausible are marked
    /// failed and skipped; only a protocol-level error aborts.
    pub fn execute(&mut self, mem: &dyn RemoteMemory) -> Result<()> {
        for i in 0..self.rounds.len() {
            let (before, rest) = self.rounds.split_at_mut(i);
            let current = &mut rest[0];

            let mut indices = Vec::new();
            let mut requests = Vec::new();
            for (j, entry) in current.iter_mut().enumerate() {
                let address = match entry.source {
                    Source::Fixed(address) => Some(address),
                    Source::Derived { base, offset } => {
                        resolve_ptr(before, base).map(|ptr| ptr + offset)
                    }
                };
                match address {
                    Some(address) => {
                        indices.push(j);
                        requests
                            .push(ScatterRequest::seeded(address, std::mem::take(&mut entry.data)));
                    }
                    None => entry.ok = false,
                }
            }
            if requests.is_empty() {
                continue;
            }
            mem.read_scatter(&mut requests)?;
            for (j, req) in indices.into_iter().zip(requests) {
                current[j].data = req.data;
                current[j].ok = req.ok;
            }
        }
        Ok(())
    }

    /// The entry's value, or `None` if its read failed or never resolved.
    pub fn value<T: Pod>(&self, slot: Slot<T>) -> Option<T> {
        let entry = &self.rounds[slot.round][slot.index];
        entry.ok.then(|| bytemuck::pod_read_unaligned(&entry.data))
    }
}

fn resolve_ptr(rounds: &[Vec<RoundEntry>], base: Slot<u64>) -> Option<u64> {
    let entry = &rounds[base.round][base.index];
    if !entry.ok {
        return None;
    }
    let ptr: u64 = bytemuck::pod_read_unaligned(&entry.data);
    is_valid_ptr(ptr).then_some(ptr)
}
