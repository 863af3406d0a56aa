//! Ground loot and static containers.
//!
//! The remote loot list is re-enumerated on the slow tier and published as a
//! whole-catalog snapshot. Loot never moves, so each entry's position is
//! resolved once per refresh pass; readers iterate the last published
//! snapshot without blocking the refresher.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::LootConfig;
use crate::data::{DataRegistry, MarketItem};
use crate::error::Result;
use crate::math::Vec3;
use crate::memory::layout::{item, item_template, loot_entry, transform};
use crate::memory::{MongoId, RemoteArray, RemoteMemory, RemoteMemoryExt, is_valid_ptr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LootKind {
    /// An item lying in the world or inside a corpse.
    Loose,
    /// A static searchable container.
    Container,
}

/// Why a filtered entry is worth showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LootHighlight {
    Regular,
    Valuable,
    Wishlisted,
    Important,
    QuestNeeded,
}

pub struct LootEntry {
    pub address: u64,
    pub kind: LootKind,
    pub item: Arc<MarketItem>,
    pub position: Vec3,
}

impl LootEntry {
    /// Raw price under the configured source.
    pub fn price(&self, config: &LootConfig) -> i64 {
        let base = match config.price_mode {
            crate::config::PriceMode::Flea => self.item.flea_price,
            crate::config::PriceMode::Trader => self.item.trader_price,
        };
        if config.price_per_slot { base / self.item.grid_count() } else { base }
    }
}

/// A loot entry that passed the display filter.
pub struct FilteredLoot {
    pub entry: Arc<LootEntry>,
    pub highlight: LootHighlight,
}

pub struct LootCatalog {
    entries: RwLock<Arc<Vec<Arc<LootEntry>>>>,
}

impl LootCatalog {
    pub fn new() -> Self {
        Self { entries: RwLock::new(Arc::new(Vec::new())) }
    }

    /// Re-enumerate the remote loot list and publish a fresh snapshot.
    /// Entries that cannot be read or resolved are left out of this pass.
    pub(crate) fn refresh(
        &self,
        mem: &dyn RemoteMemory,
        list_addr: u64,
        data: &DataRegistry,
    ) -> Result<()> {
        let ptrs = RemoteArray::<u64>::read_list(mem, list_addr)?;
        let mut entries = Vec::new();
        for addr in ptrs.iter().filter(|p| is_valid_ptr(*p)) {
            match read_entry(mem, addr, data) {
                Ok(Some(entry)) => entries.push(Arc::new(entry)),
                Ok(None) => {}
                Err(err) => trace!(addr = format_args!("{addr:#x}"), %err, "loot entry unreadable"),
            }
        }
        debug!(count = entries.len(), "loot catalog refreshed");
        *self.entries.write() = Arc::new(entries);
        Ok(())
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Arc<LootEntry>>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Static containers in the current snapshot.
    pub fn containers(&self) -> Vec<Arc<LootEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.kind == LootKind::Container)
            .cloned()
            .collect()
    }

    /// Loose loot worth displaying under the given config. Quest-needed,
    /// important and wishlisted items bypass the value threshold;
    /// blacklisted items never show.
    pub fn filtered(
        &self,
        config: &LootConfig,
        wishlist: &HashSet<String>,
        quest_needed: &HashSet<String>,
    ) -> Vec<FilteredLoot> {
        let snapshot = self.snapshot();
        let mut out = Vec::new();
        for entry in snapshot.iter() {
            if entry.kind != LootKind::Loose {
                continue;
            }
            let id = &entry.item.id;
            if config.blacklisted_items.contains(id) {
                continue;
            }
            let highlight = if quest_needed.contains(id) || entry.item.is_quest_item() {
                LootHighlight::QuestNeeded
            } else if config.important_items.contains(id) {
                LootHighlight::Important
            } else if config.show_wishlist && wishlist.contains(id) {
                LootHighlight::Wishlisted
            } else {
                let price = entry.price(config);
                if price >= config.min_valuable_value {
                    LootHighlight::Valuable
                } else if price >= config.min_value {
                    LootHighlight::Regular
                } else {
                    continue;
                }
            };
            out.push(FilteredLoot { entry: entry.clone(), highlight });
        }
        out
    }
}

impl Default for LootCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn read_entry(mem: &dyn RemoteMemory, addr: u64, data: &DataRegistry) -> Result<Option<LootEntry>> {
    let item_obj = mem.read_ptr(addr + loot_entry::ITEM)?;
    let template = mem.read_ptr(item_obj + item::TEMPLATE)?;
    let id = mem.read_value::<MongoId>(template + item_template::ID)?.to_hex();

    let (resolved, kind) = match data.item(&id) {
        Some(entry) => (entry.clone(), LootKind::Loose),
        None => match data.container(&id) {
            Some(entry) => (entry.clone(), LootKind::Container),
            // Not in the reference database; nothing useful to display.
            None => return Ok(None),
        },
    };

    let ti = mem.read_ptr_chain(addr, &loot_entry::TRANSFORM)?;
    let vertices = mem.read_ptr(ti + transform::VERTICES)?;
    let position = mem.read_value::<Vec3>(vertices + transform::POSITION)?;
    Ok(Some(LootEntry { address: addr, kind, item: resolved, position }))
}
