//! The raid roster.
//!
//! One registry per raid owns every player seen during the session. Players
//! are never removed: leaving the remote list flips them inactive so late
//! observers still see the full history, and a re-listed pointer flips the
//! same entity back to active.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::memory::layout::player_info;
use crate::memory::{RemoteArray, RemoteMemory, RemoteMemoryExt, is_valid_ptr};
use crate::raid::player::{Player, PlayerKind};

const MAX_GROUP_CHARS: usize = 32;

/// Session-scoped squad numbering.
///
/// Remote group ids are opaque strings; observers want small stable numbers.
/// The first group seen becomes 1, the next 2, and so on for the lifetime of
/// the raid. Players without a readable group id get -1.
pub struct GroupMap {
    inner: Mutex<GroupInner>,
}

struct GroupInner {
    ids: HashMap<String, i32>,
    next: i32,
}

impl GroupMap {
    pub fn new() -> Self {
        Self { inner: Mutex::new(GroupInner { ids: HashMap::new(), next: 1 }) }
    }

    /// Map the group id stored behind `info` to its session number.
    pub(crate) fn resolve(&self, mem: &dyn RemoteMemory, info: u64) -> i32 {
        let id = match read_group_id(mem, info) {
            Some(id) => id,
            None => return -1,
        };
        let mut inner = self.inner.lock();
        if let Some(&number) = inner.ids.get(&id) {
            return number;
        }
        let number = inner.next;
        inner.next += 1;
        inner.ids.insert(id, number);
        number
    }
}

impl Default for GroupMap {
    fn default() -> Self {
        Self::new()
    }
}

fn read_group_id(mem: &dyn RemoteMemory, info: u64) -> Option<String> {
    let ptr = mem.read_value::<u64>(info + player_info::GROUP_ID).ok()?;
    if !is_valid_ptr(ptr) {
        return None;
    }
    mem.read_string(ptr, MAX_GROUP_CHARS).ok().filter(|id| !id.is_empty())
}

pub struct PlayerRegistry {
    players: RwLock<HashMap<u64, Arc<Player>>>,
    local: RwLock<Option<Arc<Player>>>,
    groups: GroupMap,
    btr_allocated: AtomicBool,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            local: RwLock::new(None),
            groups: GroupMap::new(),
            btr_allocated: AtomicBool::new(false),
        }
    }

    /// Reconcile the roster against the remote registered-players list.
    ///
    /// Pointers that left the list go inactive, re-listed ones come back,
    /// and newcomers are constructed. One unreadable player never fails the
    /// refresh; it is logged and picked up on a later pass.
    pub(crate) fn refresh(
        &self,
        mem: &dyn RemoteMemory,
        list_addr: u64,
        main_ptr: u64,
    ) -> Result<()> {
        let bases = RemoteArray::<u64>::read_list(mem, list_addr)?;
        let listed: Vec<u64> = bases.iter().filter(|p| is_valid_ptr(*p)).collect();
        let listed_set: HashSet<u64> = listed.iter().copied().collect();

        {
            let players = self.players.read();
            for (base, player) in players.iter() {
                let present = listed_set.contains(base);
                if player.is_active() != present {
                    player.set_active(present);
                    debug!(name = %player.name(), present, "player list membership changed");
                }
            }
        }

        // Construct newcomers in list order so group numbers stay stable.
        for base in listed {
            if self.players.read().contains_key(&base) {
                continue;
            }
            let hint = (base == main_ptr).then_some(PlayerKind::Local);
            match Player::read_from(mem, base, hint, &self.groups) {
                Ok(player) => {
                    let player = Arc::new(player);
                    info!(
                        name = %player.name(),
                        kind = %player.kind(),
                        side = %player.side(),
                        group = player.group(),
                        "player registered"
                    );
                    if player.kind() == PlayerKind::Local {
                        *self.local.write() = Some(player.clone());
                    }
                    self.players.write().insert(base, player);
                }
                Err(err) => {
                    warn!(base = format_args!("{base:#x}"), %err, "player construction failed")
                }
            }
        }
        Ok(())
    }

    /// Allocate the synthetic turret player for the vehicle operator bot.
    /// At most one turret entity exists per session; later probes are no-ops.
    pub(crate) fn try_allocate_btr(&self, mem: &dyn RemoteMemory, operator: u64) -> Result<()> {
        if self.btr_allocated.load(Ordering::Relaxed) || self.contains(operator) {
            return Ok(());
        }
        let player =
            Arc::new(Player::read_from(mem, operator, Some(PlayerKind::BtrTurret), &self.groups)?);
        self.insert(player);
        self.btr_allocated.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Add an entity discovered outside the registered-players list, such as
    /// the vehicle turret operator.
    pub(crate) fn insert(&self, player: Arc<Player>) {
        info!(name = %player.name(), kind = %player.kind(), "player registered");
        self.players.write().insert(player.base(), player);
    }

    pub(crate) fn contains(&self, base: u64) -> bool {
        self.players.read().contains_key(&base)
    }

    /// Every player ever seen this raid, active or not.
    pub fn snapshot(&self) -> Vec<Arc<Player>> {
        self.players.read().values().cloned().collect()
    }

    /// Players currently present in the raid.
    pub fn active(&self) -> Vec<Arc<Player>> {
        self.players.read().values().filter(|p| p.is_active()).cloned().collect()
    }

    pub fn local(&self) -> Option<Arc<Player>> {
        self.local.read().clone()
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
