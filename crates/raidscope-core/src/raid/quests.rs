//! Quest progress.
//!
//! Walks the local profile's quest list for started tasks, intersects their
//! objectives with the completed-condition set, and publishes two views:
//! objective zones on the current map and the set of item ids still needed,
//! which the loot filter flags.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use strum::FromRepr;
use tracing::{debug, trace};

use crate::config::QuestConfig;
use crate::data::DataRegistry;
use crate::error::Result;
use crate::math::Vec3;
use crate::memory::layout::{profile, quest_data};
use crate::memory::{
    MongoId, RemoteArray, RemoteHashSet, RemoteMemory, RemoteMemoryExt, is_valid_ptr,
};

const MAX_TASK_ID_CHARS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
enum QuestStatus {
    Locked = 0,
    AvailableForStart = 1,
    Started = 2,
    AvailableForFinish = 3,
    Success = 4,
    Fail = 5,
    FailRestartable = 6,
    MarkedAsFailed = 7,
    Expired = 8,
    AvailableAfter = 9,
}

/// An uncompleted objective zone on the current map.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestLocation {
    pub task: String,
    pub zone: String,
    pub position: Vec3,
}

pub struct QuestCatalog {
    locations: RwLock<Arc<Vec<QuestLocation>>>,
    needed_items: RwLock<Arc<HashSet<String>>>,
}

impl QuestCatalog {
    pub fn new() -> Self {
        Self {
            locations: RwLock::new(Arc::new(Vec::new())),
            needed_items: RwLock::new(Arc::new(HashSet::new())),
        }
    }

    /// Re-read quest progress from the local profile. A quest that cannot
    /// be read is skipped for this pass only.
    pub(crate) fn refresh(
        &self,
        mem: &dyn RemoteMemory,
        profile_addr: u64,
        map_id: &str,
        data: &DataRegistry,
        config: &QuestConfig,
    ) -> Result<()> {
        let list = mem.read_ptr(profile_addr + profile::QUESTS_DATA)?;
        let quests = RemoteArray::<u64>::read_list(mem, list)?;

        let mut locations = Vec::new();
        let mut needed = HashSet::new();
        for addr in quests.iter().filter(|p| is_valid_ptr(*p)) {
            if let Err(err) =
                collect_quest(mem, addr, map_id, data, config, &mut locations, &mut needed)
            {
                trace!(addr = format_args!("{addr:#x}"), %err, "quest entry unreadable");
            }
        }

        debug!(locations = locations.len(), needed = needed.len(), "quest catalog refreshed");
        *self.locations.write() = Arc::new(locations);
        *self.needed_items.write() = Arc::new(needed);
        Ok(())
    }

    /// Zones of uncompleted objectives on the current map.
    pub fn locations(&self) -> Arc<Vec<QuestLocation>> {
        self.locations.read().clone()
    }

    /// Item ids still needed by started quests.
    pub fn needed_items(&self) -> Arc<HashSet<String>> {
        self.needed_items.read().clone()
    }
}

impl Default for QuestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_quest(
    mem: &dyn RemoteMemory,
    addr: u64,
    map_id: &str,
    data: &DataRegistry,
    config: &QuestConfig,
    locations: &mut Vec<QuestLocation>,
    needed: &mut HashSet<String>,
) -> Result<()> {
    let status_raw = mem.read_value::<i32>(addr + quest_data::STATUS)?;
    if QuestStatus::from_repr(status_raw) != Some(QuestStatus::Started) {
        return Ok(());
    }

    let id_ptr = mem.read_ptr(addr + quest_data::ID)?;
    let task_id = mem.read_string(id_ptr, MAX_TASK_ID_CHARS)?;
    if config.blacklisted_tasks.contains(&task_id) {
        return Ok(());
    }
    let task = match data.task(&task_id) {
        Some(task) => task.clone(),
        None => return Ok(()),
    };

    let conditions = mem.read_ptr(addr + quest_data::COMPLETED_CONDITIONS)?;
    let completed = RemoteHashSet::<MongoId>::read(mem, conditions)?;
    let done: HashSet<String> =
        completed.iter().filter(|id| !id.is_zero()).map(|id| id.to_hex()).collect();

    for objective in &task.objectives {
        if done.contains(&objective.id) {
            continue;
        }
        needed.extend(objective.required_items.iter().cloned());
        for zone in &objective.zones {
            if zone.map == map_id {
                locations.push(QuestLocation {
                    task: task.name.clone(),
                    zone: zone.id.clone(),
                    position: zone.position,
                });
            }
        }
    }
    Ok(())
}
