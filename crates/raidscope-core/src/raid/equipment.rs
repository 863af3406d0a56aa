//! Worn equipment for human players.
//!
//! Gear lives deep behind the inventory controller and is often not yet
//! materialized when a player first registers, so the snapshot is taken
//! through a bounded retry machine instead of a one-shot read. A player
//! whose gear never becomes readable stays tracked with an empty loadout.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::data::DataRegistry;
use crate::error::Result;
use crate::memory::layout::{inventory, item, item_template, player, slot, timing};
use crate::memory::{MongoId, RemoteArray, RemoteMemory, RemoteMemoryExt, is_valid_ptr};

const MAX_SLOT_NAME_CHARS: usize = 32;

/// Slots that never carry display-relevant gear.
const SKIPPED_SLOTS: [&str; 4] = ["SecuredContainer", "Dogtag", "Compass", "ArmBand"];

/// One resolved equipment slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearSlot {
    /// Remote slot identifier, e.g. `FirstPrimaryWeapon`.
    pub slot: String,
    /// Short market name, or the raw template id when unknown.
    pub name: String,
    pub price: i64,
}

#[derive(Debug)]
enum State {
    Pending { attempts: u32, retry_at: Instant },
    Ready(Vec<GearSlot>),
    Failed,
}

#[derive(Debug)]
pub struct Equipment {
    player_base: u64,
    state: Mutex<State>,
    value: AtomicI64,
}

impl Equipment {
    pub(crate) fn new(player_base: u64) -> Self {
        Self {
            player_base,
            state: Mutex::new(State::Pending { attempts: 0, retry_at: Instant::now() }),
            value: AtomicI64::new(0),
        }
    }

    /// Drive the snapshot machine. No-op once ready or given up.
    pub(crate) fn tick(&self, mem: &dyn RemoteMemory, data: &DataRegistry, pmc: bool) {
        let mut state = self.state.lock();
        let attempts = match &*state {
            State::Pending { attempts, retry_at } if Instant::now() >= *retry_at => *attempts,
            _ => return,
        };

        match read_loadout(mem, self.player_base, data, pmc) {
            Ok(slots) => {
                let total: i64 = slots.iter().map(|s| s.price).sum();
                self.value.store(total, Ordering::Relaxed);
                debug!(player = format_args!("{:#x}", self.player_base), slots = slots.len(), "equipment snapshot ready");
                *state = State::Ready(slots);
            }
            Err(err) => {
                let attempts = attempts + 1;
                if attempts >= timing::EQUIPMENT_INIT_ATTEMPTS {
                    debug!(player = format_args!("{:#x}", self.player_base), %err, "equipment unreadable, giving up");
                    *state = State::Failed;
                } else {
                    trace!(attempts, %err, "equipment read failed, will retry");
                    *state = State::Pending {
                        attempts,
                        retry_at: Instant::now() + Duration::from_millis(timing::EQUIPMENT_RETRY_MS),
                    };
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.lock(), State::Ready(_))
    }

    /// Resolved slots; empty while pending or after giving up.
    pub fn slots(&self) -> Vec<GearSlot> {
        match &*self.state.lock() {
            State::Ready(slots) => slots.clone(),
            _ => Vec::new(),
        }
    }

    /// Total market value of the loadout.
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn expire_retry(&self) {
        if let State::Pending { retry_at, .. } = &mut *self.state.lock() {
            *retry_at = Instant::now();
        }
    }
}

fn read_loadout(
    mem: &dyn RemoteMemory,
    player_base: u64,
    data: &DataRegistry,
    pmc: bool,
) -> Result<Vec<GearSlot>> {
    let controller = mem.read_ptr(player_base + player::INVENTORY_CONTROLLER)?;
    let inv = mem.read_ptr(controller + inventory::INVENTORY)?;
    let equipment = mem.read_ptr(inv + inventory::EQUIPMENT)?;
    let slot_array = mem.read_ptr(equipment + inventory::SLOTS)?;
    let slot_ptrs = RemoteArray::<u64>::read(mem, slot_array)?;

    let mut slots = Vec::new();
    for slot_ptr in slot_ptrs.iter().filter(|p| is_valid_ptr(*p)) {
        let name_ptr = mem.read_ptr(slot_ptr + slot::NAME)?;
        let slot_name = mem.read_string(name_ptr, MAX_SLOT_NAME_CHARS)?;
        if SKIPPED_SLOTS.contains(&slot_name.as_str()) {
            continue;
        }
        // PMCs carry a default melee weapon nobody cares about.
        if pmc && slot_name == "Scabbard" {
            continue;
        }

        let contained = mem.read_value::<u64>(slot_ptr + slot::CONTAINED_ITEM)?;
        if !is_valid_ptr(contained) {
            continue;
        }
        let template = mem.read_ptr(contained + item::TEMPLATE)?;
        let template_id = mem.read_value::<MongoId>(template + item_template::ID)?.to_hex();

        let (name, price) = match data.item(&template_id) {
            Some(entry) => (entry.short_name.clone(), entry.best_price()),
            None => (template_id, 0),
        };
        slots.push(GearSlot { slot: slot_name, name, price });
    }
    Ok(slots)
}
