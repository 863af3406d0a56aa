//! Thrown grenades and tripwires.
//!
//! The one catalog where entries disappear: exploded grenades and disarmed
//! tripwires are dropped, not flagged. Grenades move, so each tracked
//! grenade caches its position address once and the per-tick refresh updates
//! every position with a single flat scatter.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use strum::FromRepr;
use tracing::{debug, trace};

use crate::error::Result;
use crate::math::Vec3;
use crate::memory::layout::{game_world, grenade, transform, tripwire};
use crate::memory::{RemoteArray, RemoteMemory, RemoteMemoryExt, ScatterBatch, is_valid_ptr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
enum TripwireState {
    None = 0,
    Wait = 1,
    Active = 2,
    Exploded = 3,
    Inert = 4,
}

impl TripwireState {
    fn is_armed(&self) -> bool {
        matches!(self, Self::Wait | Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosiveKind {
    Grenade,
    Tripwire,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosive {
    pub address: u64,
    pub kind: ExplosiveKind,
    pub position: Vec3,
}

struct TrackedGrenade {
    pos_addr: u64,
    pos: Vec3,
}

pub struct ExplosivesCatalog {
    grenades: Mutex<HashMap<u64, TrackedGrenade>>,
    snapshot: RwLock<Arc<Vec<Explosive>>>,
}

impl ExplosivesCatalog {
    pub fn new() -> Self {
        Self {
            grenades: Mutex::new(HashMap::new()),
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// One explosives tick: reconcile the grenade list, batch-update
    /// positions, re-read tripwire states, publish the combined snapshot.
    pub(crate) fn refresh(&self, mem: &dyn RemoteMemory, world: u64) -> Result<()> {
        let mut entries = Vec::new();
        self.refresh_grenades(mem, world, &mut entries)?;
        self.refresh_tripwires(mem, world, &mut entries)?;
        *self.snapshot.write() = Arc::new(entries);
        Ok(())
    }

    fn refresh_grenades(
        &self,
        mem: &dyn RemoteMemory,
        world: u64,
        entries: &mut Vec<Explosive>,
    ) -> Result<()> {
        let owner = mem.read_ptr(world + game_world::GRENADES)?;
        let list = mem.read_ptr(owner + game_world::GRENADE_LIST)?;
        let listed = RemoteArray::<u64>::read_list(mem, list)?;
        let live: HashSet<u64> = listed.iter().filter(|p| is_valid_ptr(*p)).collect();

        let mut grenades = self.grenades.lock();
        grenades.retain(|addr, _| {
            let keep = live.contains(addr);
            if !keep {
                debug!(addr = format_args!("{addr:#x}"), "grenade gone");
            }
            keep
        });

        for addr in live {
            if grenades.contains_key(&addr) {
                continue;
            }
            // A just-thrown grenade may not have its transform yet; it stays
            // unlisted and is picked up on a later tick.
            match resolve_grenade(mem, addr) {
                Ok(tracked) => {
                    debug!(addr = format_args!("{addr:#x}"), "grenade tracked");
                    grenades.insert(addr, tracked);
                }
                Err(err) => trace!(addr = format_args!("{addr:#x}"), %err, "grenade not ready"),
            }
        }

        if !grenades.is_empty() {
            let mut batch = ScatterBatch::new();
            let handles: Vec<_> = grenades
                .iter()
                .map(|(addr, g)| {
                    (
                        *addr,
                        batch.add_value(g.pos_addr, g.pos),
                        batch.add_value(*addr + grenade::IS_DESTROYED, 0u8),
                    )
                })
                .collect();
            batch.execute(mem)?;
            for (addr, pos_entry, destroyed_entry) in handles {
                if batch.succeeded(destroyed_entry) && batch.value(destroyed_entry) != 0 {
                    debug!(addr = format_args!("{addr:#x}"), "grenade detonated");
                    grenades.remove(&addr);
                    continue;
                }
                let pos = batch.value(pos_entry);
                if pos.is_sane() {
                    if let Some(tracked) = grenades.get_mut(&addr) {
                        tracked.pos = pos;
                    }
                }
            }
        }

        entries.extend(grenades.iter().map(|(addr, g)| Explosive {
            address: *addr,
            kind: ExplosiveKind::Grenade,
            position: g.pos,
        }));
        Ok(())
    }

    fn refresh_tripwires(
        &self,
        mem: &dyn RemoteMemory,
        world: u64,
        entries: &mut Vec<Explosive>,
    ) -> Result<()> {
        let sync = mem.read_ptr(world + game_world::SYNC_PROCESSOR)?;
        let list = mem.read_ptr(sync + game_world::TRIPWIRE_LIST)?;
        let wires = RemoteArray::<u64>::read_list(mem, list)?;

        for addr in wires.iter().filter(|p| is_valid_ptr(*p)) {
            let armed = mem
                .read_value::<i32>(addr + tripwire::STATE)
                .ok()
                .and_then(TripwireState::from_repr)
                .is_some_and(|state| state.is_armed());
            if !armed {
                continue;
            }
            match mem.read_value::<Vec3>(addr + tripwire::POSITION) {
                Ok(position) if position.is_sane() => entries.push(Explosive {
                    address: addr,
                    kind: ExplosiveKind::Tripwire,
                    position,
                }),
                Ok(_) => {}
                Err(err) => trace!(addr = format_args!("{addr:#x}"), %err, "tripwire unreadable"),
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<Vec<Explosive>> {
        self.snapshot.read().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }
}

impl Default for ExplosivesCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_grenade(mem: &dyn RemoteMemory, addr: u64) -> Result<TrackedGrenade> {
    let ti = mem.read_ptr_chain(addr, &grenade::TRANSFORM)?;
    let vertices = mem.read_ptr(ti + transform::VERTICES)?;
    let pos_addr = vertices + transform::POSITION;
    let pos = mem.read_value::<Vec3>(pos_addr)?;
    Ok(TrackedGrenade { pos_addr, pos })
}
