//! # raidscope-core
//!
//! Core library for the Raidscope live raid tracker.
//!
//! This crate provides:
//! - Remote process memory access (single reads, scatter batches, managed
//!   collection decoding)
//! - Raid discovery and the session lifecycle
//! - Player roster, equipment, loot, explosive, quest and exit catalogs
//! - Reference data (market prices, map furniture, task definitions)
//!
//! The engine never writes to the remote process; everything here is a
//! read-only mirror of one running raid.

pub mod config;
pub mod data;
pub mod error;
pub mod math;
pub mod memory;
pub mod raid;
pub mod worker;

pub use config::{Config, LootConfig, PriceMode, QuestConfig};
pub use data::{
    DataRegistry, ExitSide, ExtractEntry, HazardEntry, MapEntry, MarketItem, TaskEntry,
    TaskObjective, TaskZone, TransitEntry,
};
pub use error::{Error, Result};
pub use math::{Vec2, Vec3};
pub use memory::{
    MongoId, RemoteArray, RemoteDict, RemoteHashSet, RemoteMemory, RemoteMemoryExt, ScatterBatch,
    ScatterRounds, is_valid_ptr,
};
pub use raid::{
    Equipment, ExitList, Explosive, ExplosiveKind, ExplosivesCatalog, FilteredLoot, GearSlot,
    HazardList, LootCatalog, LootEntry, LootHighlight, LootKind, Player, PlayerKind,
    PlayerRegistry, PlayerSide, QuestCatalog, QuestLocation, RaidSession,
};
pub use worker::{
    CancelToken, Flow, RateLimiter, SleepMode, WorkerConfig, WorkerPriority, WorkerThread,
};
