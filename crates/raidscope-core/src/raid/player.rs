//! Player entities.
//!
//! Every participant in a raid is one `Player`: the local player, remote
//! humans, AI bots and the synthetic armored-vehicle turret operator. They
//! share one read-only contract; what differs is how fields were sourced
//! at construction and which refreshes apply.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use strum::{Display, FromRepr, IntoStaticStr};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::math::{Vec2, Vec3};
use crate::memory::layout::{
    body, movement_context, player, player_info, profile, transform, wishlist,
};
use crate::memory::scatter::{Entry, RoundHandle, ScatterBatch, ScatterRounds, Slot};
use crate::memory::{MongoId, RemoteDict, RemoteMemory, RemoteMemoryExt};
use crate::raid::equipment::Equipment;
use crate::raid::registry::GroupMap;

const MAX_NAME_CHARS: usize = 48;
const MAX_ID_CHARS: usize = 40;

/// Faction decoded from the remote side field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, IntoStaticStr, Display)]
#[repr(i32)]
pub enum PlayerSide {
    Usec = 1,
    Bear = 2,
    Savage = 4,
}

impl PlayerSide {
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::from_repr(value)
    }

    pub fn is_pmc(&self) -> bool {
        matches!(self, Self::Usec | Self::Bear)
    }
}

/// How a player entity is controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
pub enum PlayerKind {
    /// The player this process belongs to.
    Local,
    /// A remote human.
    Human,
    /// An AI bot.
    Ai,
    /// Synthetic entity for the armored vehicle's turret operator.
    BtrTurret,
}

/// Cached transform bookkeeping, re-validated by the slow tier.
#[derive(Debug)]
struct TransformHandle {
    ti: u64,
    vertices: u64,
}

#[derive(Debug)]
pub struct Player {
    base: u64,
    kind: PlayerKind,
    side: PlayerSide,
    name: String,
    account_id: String,
    group: i32,
    profile: u64,
    corpse_addr: u64,
    rotation_addr: u64,
    transform: Mutex<TransformHandle>,
    pos_addr: AtomicU64,
    pos: RwLock<Vec3>,
    rot: RwLock<Vec2>,
    active: AtomicBool,
    alive: AtomicBool,
    wishlist: RwLock<HashSet<String>>,
    equipment: Option<Equipment>,
}

impl Player {
    /// Build a player from its remote object.
    ///
    /// `kind_hint` is `Some` for the local player (matched by pointer) and
    /// the turret operator; everyone else is classified by the account
    /// registration date, which AI profiles leave at zero.
    pub(crate) fn read_from(
        mem: &dyn RemoteMemory,
        base: u64,
        kind_hint: Option<PlayerKind>,
        groups: &GroupMap,
    ) -> Result<Self> {
        let profile_ptr = mem.read_ptr(base + player::PROFILE)?;
        let info = mem.read_ptr(profile_ptr + profile::INFO)?;

        let side_raw = mem.read_value::<i32>(info + player_info::SIDE)?;
        let side = PlayerSide::from_i32(side_raw)
            .ok_or(Error::UnexpectedValue { what: "player side", value: side_raw as i64 })?;

        let kind = match kind_hint {
            Some(kind) => kind,
            None => {
                let registered = mem.read_value::<i32>(info + player_info::REGISTRATION_DATE)?;
                if registered == 0 { PlayerKind::Ai } else { PlayerKind::Human }
            }
        };

        let (name, account_id, group) = match kind {
            PlayerKind::BtrTurret => ("BTR".to_string(), String::new(), -1),
            PlayerKind::Ai => {
                let name_ptr = mem.read_ptr(info + player_info::NICKNAME)?;
                (mem.read_string(name_ptr, MAX_NAME_CHARS)?, String::new(), groups.resolve(mem, info))
            }
            PlayerKind::Local | PlayerKind::Human => {
                let name_ptr = mem.read_ptr(info + player_info::NICKNAME)?;
                let account_ptr = mem.read_ptr(info + player_info::ACCOUNT_ID)?;
                (
                    mem.read_string(name_ptr, MAX_NAME_CHARS)?,
                    mem.read_string(account_ptr, MAX_ID_CHARS)?,
                    groups.resolve(mem, info),
                )
            }
        };

        // The vehicle bot steers through the vehicle, not a movement context.
        let rotation_addr = if kind == PlayerKind::BtrTurret {
            0
        } else {
            let context = mem.read_ptr(base + player::MOVEMENT_CONTEXT)?;
            let owner = mem.read_ptr(context + movement_context::PLAYER)?;
            if owner != base {
                return Err(Error::Integrity("movement context owner"));
            }
            context + movement_context::ROTATION
        };

        let ti = mem.read_ptr_chain(
            base,
            &[player::BODY, body::SKELETON_ROOT, body::TRANSFORM_INTERNAL],
        )?;
        let vertices = mem.read_ptr(ti + transform::VERTICES)?;
        let pos_addr = vertices + transform::POSITION;
        let pos = mem.read_value::<Vec3>(pos_addr)?;

        let equipment = (kind == PlayerKind::Human).then(|| Equipment::new(base));

        Ok(Self {
            base,
            kind,
            side,
            name,
            account_id,
            group,
            profile: profile_ptr,
            corpse_addr: base + player::CORPSE,
            rotation_addr,
            transform: Mutex::new(TransformHandle { ti, vertices }),
            pos_addr: AtomicU64::new(pos_addr),
            pos: RwLock::new(pos),
            rot: RwLock::new(Vec2::ZERO),
            active: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            wishlist: RwLock::new(HashSet::new()),
            equipment,
        })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub fn side(&self) -> PlayerSide {
        self.side
    }

    pub fn is_pmc(&self) -> bool {
        self.side.is_pmc()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account identifier; empty for AI and the turret operator.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Session-local group number, -1 when ungrouped.
    pub fn group(&self) -> i32 {
        self.group
    }

    pub fn position(&self) -> Vec3 {
        *self.pos.read()
    }

    pub fn rotation(&self) -> Vec2 {
        *self.rot.read()
    }

    /// Still present in the remote player list.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn equipment(&self) -> Option<&Equipment> {
        self.equipment.as_ref()
    }

    pub fn is_wishlisted(&self, item_id: &str) -> bool {
        self.wishlist.read().contains(item_id)
    }

    /// Copy of the tracked wishlist ids.
    pub fn wishlist(&self) -> HashSet<String> {
        self.wishlist.read().clone()
    }

    pub(crate) fn profile_addr(&self) -> u64 {
        self.profile
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Queue this player's realtime reads: position, rotation, corpse slot.
    /// Position and rotation are seeded with the last known values.
    pub(crate) fn register_realtime(&self, batch: &mut ScatterBatch) -> RealtimeSet {
        RealtimeSet {
            pos: batch.add_value(self.pos_addr.load(Ordering::Relaxed), *self.pos.read()),
            rot: (self.rotation_addr != 0)
                .then(|| batch.add_value(self.rotation_addr, *self.rot.read())),
            corpse: batch.add_value(self.corpse_addr, 0u64),
        }
    }

    pub(crate) fn apply_realtime(&self, batch: &ScatterBatch, set: &RealtimeSet) {
        let pos = batch.value(set.pos);
        if pos.is_sane() {
            *self.pos.write() = pos;
        }
        if let Some(rot) = set.rot {
            *self.rot.write() = batch.value(rot);
        }
        if batch.succeeded(set.corpse)
            && batch.value(set.corpse) != 0
            && self.alive.swap(false, Ordering::Relaxed)
        {
            debug!(name = %self.name, "player died");
        }
    }

    /// Queue the two-round transform sanity probe: re-read the vertex block
    /// pointer, then a position through it.
    pub(crate) fn register_sanity(
        &self,
        rounds: &mut ScatterRounds,
        r1: RoundHandle,
        r2: RoundHandle,
    ) -> SanitySet {
        let ti = self.transform.lock().ti;
        let vertices = rounds.read::<u64>(r1, ti + transform::VERTICES);
        let probe = rounds.read_at::<Vec3>(r2, vertices, transform::POSITION);
        SanitySet { vertices, probe }
    }

    /// Resolve a sanity probe. A moved vertex block is re-cached; failures
    /// are logged and the player stays tracked.
    pub(crate) fn apply_sanity(&self, rounds: &ScatterRounds, set: &SanitySet) {
        match (rounds.value(set.vertices), rounds.value(set.probe)) {
            (Some(vertices), Some(probe)) if probe.is_sane() => {
                let mut handle = self.transform.lock();
                if handle.vertices != vertices {
                    debug!(name = %self.name, "transform storage moved, re-caching");
                    handle.vertices = vertices;
                    self.pos_addr.store(vertices + transform::POSITION, Ordering::Relaxed);
                }
            }
            _ => warn!(name = %self.name, "transform sanity check failed"),
        }
    }

    /// Re-read the local player's wishlist into the shared id set.
    pub(crate) fn refresh_wishlist(&self, mem: &dyn RemoteMemory) -> Result<()> {
        let manager = mem.read_ptr(self.profile + profile::WISHLIST_MANAGER)?;
        let dict = mem.read_ptr(manager + wishlist::ITEMS)?;
        let entries = RemoteDict::<MongoId, i32>::read(mem, dict)?;
        let ids: HashSet<String> =
            entries.iter().filter(|(id, _)| !id.is_zero()).map(|(id, _)| id.to_hex()).collect();
        *self.wishlist.write() = ids;
        Ok(())
    }
}

/// Handles for one player's realtime batch entries.
pub(crate) struct RealtimeSet {
    pos: Entry<Vec3>,
    rot: Option<Entry<Vec2>>,
    corpse: Entry<u64>,
}

/// Handles for one player's transform sanity probe.
pub(crate) struct SanitySet {
    vertices: Slot<u64>,
    probe: Slot<Vec3>,
}
