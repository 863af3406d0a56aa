//! Raid domain: session lifecycle, the player roster and the entity catalogs.

mod equipment;
mod exits;
mod explosives;
mod hazards;
mod loot;
mod player;
mod quests;
mod registry;
mod session;

#[cfg(test)]
pub(crate) mod fixtures;

pub use equipment::{Equipment, GearSlot};
pub use exits::ExitList;
pub use explosives::{Explosive, ExplosiveKind, ExplosivesCatalog};
pub use hazards::HazardList;
pub use loot::{FilteredLoot, LootCatalog, LootEntry, LootHighlight, LootKind};
pub use player::{Player, PlayerKind, PlayerSide};
pub use quests::{QuestCatalog, QuestLocation};
pub use registry::{GroupMap, PlayerRegistry};
pub use session::RaidSession;
