//! User configuration: loot thresholds and quest helper toggles.
//!
//! The engine treats this as read-only reference input; nothing here is
//! mutated at runtime.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which price source values an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    #[default]
    Flea,
    Trader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LootConfig {
    /// Minimum value for an item to be listed at all.
    pub min_value: i64,
    /// Minimum value for the valuable tier.
    pub min_valuable_value: i64,
    pub price_mode: PriceMode,
    /// Value items by price per occupied grid cell.
    pub price_per_slot: bool,
    /// Track the local player's wishlist and flag matching loot.
    pub show_wishlist: bool,
    /// Item ids always flagged important.
    pub important_items: HashSet<String>,
    /// Item ids never listed.
    pub blacklisted_items: HashSet<String>,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            min_value: 50_000,
            min_valuable_value: 200_000,
            price_mode: PriceMode::Flea,
            price_per_slot: false,
            show_wishlist: true,
            important_items: HashSet::new(),
            blacklisted_items: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestConfig {
    /// Resolve objective zones and flag needed items.
    pub enabled: bool,
    /// Task ids excluded from tracking.
    pub blacklisted_tasks: HashSet<String>,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self { enabled: true, blacklisted_tasks: HashSet::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub loot: LootConfig,
    pub quests: QuestConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
