//! Reference data: the item market database, map furniture and task
//! definitions. Loaded once from a JSON file, indexed, and shared read-only
//! behind an `Arc`.

mod item;
mod map;
mod task;

pub use item::MarketItem;
pub use map::{ExitSide, ExtractEntry, HazardEntry, MapEntry, TransitEntry};
pub use task::{TaskEntry, TaskObjective, TaskZone};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::math::Vec3;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataFile {
    #[serde(default)]
    items: Vec<MarketItem>,
    #[serde(default)]
    maps: Vec<MapEntry>,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

/// All reference catalogs, indexed for lookup.
#[derive(Debug)]
pub struct DataRegistry {
    items: HashMap<String, Arc<MarketItem>>,
    containers: HashMap<String, Arc<MarketItem>>,
    maps: HashMap<String, MapEntry>,
    tasks: HashMap<String, Arc<TaskEntry>>,
    /// map id -> zone id -> position
    task_zones: HashMap<String, HashMap<String, Vec3>>,
}

impl DataRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let registry = Self::from_slice(&raw)?;
        info!(
            items = registry.items.len(),
            containers = registry.containers.len(),
            maps = registry.maps.len(),
            tasks = registry.tasks.len(),
            "reference data loaded"
        );
        Ok(registry)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let file: DataFile = serde_json::from_slice(raw)?;

        let mut items = HashMap::new();
        let mut containers = HashMap::new();
        for entry in file.items {
            let entry = Arc::new(entry);
            if entry.is_container() {
                containers.insert(entry.id.clone(), entry);
            } else {
                items.insert(entry.id.clone(), entry);
            }
        }

        let mut tasks = HashMap::new();
        let mut task_zones: HashMap<String, HashMap<String, Vec3>> = HashMap::new();
        for task in file.tasks {
            for objective in &task.objectives {
                for zone in &objective.zones {
                    task_zones
                        .entry(zone.map.clone())
                        .or_default()
                        .insert(zone.id.clone(), zone.position);
                }
            }
            tasks.insert(task.id.clone(), Arc::new(task));
        }

        let maps = file.maps.into_iter().map(|m| (m.id.clone(), m)).collect();
        Ok(Self { items, containers, maps, tasks, task_zones })
    }

    pub fn item(&self, id: &str) -> Option<&Arc<MarketItem>> {
        self.items.get(id)
    }

    pub fn container(&self, id: &str) -> Option<&Arc<MarketItem>> {
        self.containers.get(id)
    }

    pub fn map(&self, id: &str) -> Option<&MapEntry> {
        self.maps.get(id)
    }

    pub fn task(&self, id: &str) -> Option<&Arc<TaskEntry>> {
        self.tasks.get(id)
    }

    pub fn zone_position(&self, map_id: &str, zone_id: &str) -> Option<Vec3> {
        self.task_zones.get(map_id).and_then(|zones| zones.get(zone_id)).copied()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
