//! Memory layout constants for remote game structures
//!
//! Everything the engine reads is addressed through the fixed offsets below.
//! Constants are organized by structure type; managed collection headers are
//! shared shapes and live in `collection`.

/// Managed runtime object shapes (strings, arrays, dictionaries, sets)
pub mod collection {
    /// Managed string: i32 length followed by UTF-16 code units
    pub const STRING_LEN: u64 = 0x10;
    pub const STRING_DATA: u64 = 0x14;

    /// Managed array: i32 count, elements begin at ARRAY_DATA
    pub const ARRAY_COUNT: u64 = 0x18;
    pub const ARRAY_DATA: u64 = 0x20;

    /// Managed list wraps a backing array
    pub const LIST_ITEMS: u64 = 0x10;
    pub const LIST_COUNT: u64 = 0x18;

    /// Managed dictionary: entries array pointer + live pair count
    pub const DICT_ENTRIES: u64 = 0x18;
    pub const DICT_COUNT: u64 = 0x20;
    /// First entry inside the entries array
    pub const DICT_DATA: u64 = 0x20;

    /// Managed hash set: slot array pointer + live count
    pub const SET_SLOTS: u64 = 0x18;
    pub const SET_COUNT: u64 = 0x38;
    /// First slot inside the slot array
    pub const SET_DATA: u64 = 0x20;
}

/// Engine-runtime anchors: object manager and the native object graph
pub mod runtime {
    /// Object manager pointer, relative to the engine module base
    pub const OBJECT_MANAGER: u64 = 0x17F_FD28;

    // Doubly linked node ring of active native objects
    pub const NODE_NEXT: u64 = 0x8;
    pub const NODE_OBJECT: u64 = 0x10;
    pub const LAST_ACTIVE_NODE: u64 = 0x20;
    pub const FIRST_ACTIVE_NODE: u64 = 0x28;

    /// Native object: ASCII name pointer
    pub const OBJECT_NAME: u64 = 0x60;
    /// Chain from a native object to its managed world component
    pub const WORLD_COMPONENT: [u64; 3] = [0x30, 0x18, 0x28];
    /// Name of the native object that owns the raid world component
    pub const WORLD_OBJECT_NAME: &str = "GameWorld";
}

/// Raid world root
pub mod game_world {
    /// Managed string with the map id of the current raid
    pub const LOCATION_ID: u64 = 0x98;
    /// Managed list of interactive loot objects
    pub const LOOT_LIST: u64 = 0x118;
    /// Managed list of player objects
    pub const REGISTERED_PLAYERS: u64 = 0x140;
    /// Pointer to the locally controlled player
    pub const MAIN_PLAYER: u64 = 0x1B0;
    /// Thrown-grenade registry; the backing list sits at GRENADE_LIST inside
    pub const GRENADES: u64 = 0x210;
    pub const GRENADE_LIST: u64 = 0x18;
    /// Synchronizable object processor (tripwires live here)
    pub const SYNC_PROCESSOR: u64 = 0x248;
    pub const TRIPWIRE_LIST: u64 = 0x58;
    pub const BTR_CONTROLLER: u64 = 0x268;
}

/// Armored vehicle controller chain down to the turret operator
pub mod btr {
    pub const VIEW: u64 = 0x40;
    pub const TURRET: u64 = 0x110;
    pub const OPERATOR: u64 = 0x68;
}

/// Player root object (shared by the local player and networked players)
pub mod player {
    pub const MOVEMENT_CONTEXT: u64 = 0x58;
    pub const BODY: u64 = 0xB0;
    pub const CORPSE: u64 = 0x3E0;
    pub const PROFILE: u64 = 0x5F0;
    pub const INVENTORY_CONTROLLER: u64 = 0x658;
}

/// Player profile
pub mod profile {
    pub const ID: u64 = 0x10;
    pub const INFO: u64 = 0x28;
    pub const QUESTS_DATA: u64 = 0x88;
    pub const WISHLIST_MANAGER: u64 = 0xC0;
}

/// Profile info block
pub mod player_info {
    pub const NICKNAME: u64 = 0x10;
    pub const GROUP_ID: u64 = 0x28;
    pub const SIDE: u64 = 0x68;
    /// Account registration timestamp; zero for AI-controlled players
    pub const REGISTRATION_DATE: u64 = 0x6C;
    pub const ACCOUNT_ID: u64 = 0x20;
}

/// Movement context hanging off a player
pub mod movement_context {
    /// Back-pointer to the owning player, used as an integrity check
    pub const PLAYER: u64 = 0x10;
    /// Vec2 view rotation (yaw, pitch)
    pub const ROTATION: u64 = 0x23C;
}

/// Player body / skeleton
pub mod body {
    pub const SKELETON_ROOT: u64 = 0x30;
    pub const TRANSFORM_INTERNAL: u64 = 0x10;
}

/// Native transform internals
pub mod transform {
    /// Pointer to the vertex block holding world-space data
    pub const VERTICES: u64 = 0x18;
    /// Vec3 world position inside the vertex block
    pub const POSITION: u64 = 0x90;
}

/// Wishlist manager inside a profile
pub mod wishlist {
    /// Managed dictionary of 12-byte item id -> priority
    pub const ITEMS: u64 = 0x20;
}

/// Inventory chain from controller down to equipment slots
pub mod inventory {
    /// On the inventory controller
    pub const INVENTORY: u64 = 0x128;
    pub const EQUIPMENT: u64 = 0x10;
    /// Managed array of slot pointers
    pub const SLOTS: u64 = 0x80;
}

/// One equipment slot
pub mod slot {
    /// Managed string name ("FirstPrimaryWeapon", "Backpack", ...)
    pub const NAME: u64 = 0x10;
    pub const CONTAINED_ITEM: u64 = 0x40;
}

/// An item instance and its template
pub mod item {
    pub const TEMPLATE: u64 = 0x40;
}

pub mod item_template {
    /// Managed string of 24 lowercase hex chars
    pub const ID: u64 = 0x50;
}

/// One interactive loot object from the world loot list
pub mod loot_entry {
    pub const ITEM: u64 = 0xB0;
    /// Chain to the native transform internal
    pub const TRANSFORM: [u64; 3] = [0x10, 0x30, 0x10];
}

/// A thrown grenade
pub mod grenade {
    /// Chain to the native transform internal
    pub const TRANSFORM: [u64; 3] = [0x10, 0x30, 0x10];
    /// u8 flag set once the grenade has detonated
    pub const IS_DESTROYED: u64 = 0x5D;
}

/// A placed tripwire
pub mod tripwire {
    /// i32 state, see `TripwireState`
    pub const STATE: u64 = 0x40;
    /// Vec3 stored inline (tripwires never move once placed)
    pub const POSITION: u64 = 0x168;
}

/// One quest record inside the profile quest list
pub mod quest_data {
    /// Managed string quest template id
    pub const ID: u64 = 0x10;
    /// i32, see `QuestStatus`
    pub const STATUS: u64 = 0x34;
    /// Managed hash set of completed condition ids (12-byte ids)
    pub const COMPLETED_CONDITIONS: u64 = 0x78;
}

/// Polling cadence and retry budgets
pub mod timing {
    /// Realtime tier target interval (ms)
    pub const REALTIME_INTERVAL_MS: u64 = 8;
    /// Slow tier target interval (ms)
    pub const SLOW_INTERVAL_MS: u64 = 50;
    /// Explosives tier target interval (ms)
    pub const EXPLOSIVES_INTERVAL_MS: u64 = 30;

    /// Pause between raid discovery attempts (ms)
    pub const DISCOVERY_RETRY_MS: u64 = 1000;

    /// Raid validity check retry budget
    pub const RAID_CHECK_ATTEMPTS: u32 = 5;
    pub const RAID_CHECK_DELAY_MS: u64 = 10;

    /// Equipment lazy-init retry budget
    pub const EQUIPMENT_INIT_ATTEMPTS: u32 = 3;
    pub const EQUIPMENT_RETRY_MS: u64 = 2000;

    /// Slow-tier refresh throttles (ms)
    pub const LOOT_REFRESH_MS: u64 = 1000;
    pub const WISHLIST_REFRESH_MS: u64 = 10_000;
    pub const QUEST_REFRESH_MS: u64 = 5000;
}
