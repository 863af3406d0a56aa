//! Shared mock layouts for raid tests.
//!
//! Builders here lay out the remote object graphs the way the live process
//! does, with every sub-object derived from the owning base address so
//! multiple fixtures can coexist in one mock.

use crate::data::DataRegistry;
use crate::math::{Vec2, Vec3};
use crate::memory::MongoId;
use crate::memory::layout::{
    body, btr, collection, game_world, grenade, inventory, item, item_template, loot_entry,
    movement_context, player, player_info, profile, quest_data, runtime, slot, transform, tripwire,
    wishlist,
};
use crate::memory::mock::{MockMemory, MockMemoryBuilder};
use crate::raid::player::PlayerSide;

pub(crate) struct PlayerFixture {
    pub base: u64,
    pub profile: u64,
    pub info: u64,
    pub context: u64,
    pub ti: u64,
    pub vertices: u64,
    pub pos: Vec3,
    pub side_raw: i32,
    pub registered: i32,
    pub name: &'static str,
    pub account: &'static str,
    pub group: Option<&'static str>,
    /// Override for the movement-context back-pointer.
    pub context_owner: Option<u64>,
}

impl PlayerFixture {
    fn at(
        base: u64,
        name: &'static str,
        account: &'static str,
        side: PlayerSide,
        registered: i32,
    ) -> Self {
        Self {
            base,
            profile: base + 0x1000,
            info: base + 0x2000,
            context: base + 0x4000,
            ti: base + 0x6000,
            vertices: base + 0x7000,
            pos: Vec3::new(10.0, 1.0, -5.0),
            side_raw: side as i32,
            registered,
            name,
            account,
            group: None,
            context_owner: None,
        }
    }

    pub fn human(base: u64, name: &'static str, account: &'static str, side: PlayerSide) -> Self {
        Self::at(base, name, account, side, 1_600_000_000)
    }

    pub fn ai(base: u64, name: &'static str, side: PlayerSide) -> Self {
        Self::at(base, name, "", side, 0)
    }

    pub fn with_group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    pub fn pos_addr(&self) -> u64 {
        self.vertices + transform::POSITION
    }
}

/// Lay out one player object graph.
pub(crate) fn mock_player(builder: MockMemoryBuilder, f: &PlayerFixture) -> MockMemoryBuilder {
    let name_str = f.base + 0x3000;
    let account_str = f.base + 0x3100;
    let group_str = f.base + 0x3200;
    let body_obj = f.base + 0x5000;
    let root = f.base + 0x5800;

    let builder = builder
        .with_u64(f.base + player::PROFILE, f.profile)
        .with_u64(f.profile + profile::INFO, f.info)
        .with_i32(f.info + player_info::SIDE, f.side_raw)
        .with_i32(f.info + player_info::REGISTRATION_DATE, f.registered)
        .with_u64(f.info + player_info::NICKNAME, name_str)
        .with_managed_string(name_str, f.name)
        .with_u64(f.info + player_info::ACCOUNT_ID, account_str)
        .with_managed_string(account_str, f.account)
        .with_u64(f.base + player::MOVEMENT_CONTEXT, f.context)
        .with_u64(f.context + movement_context::PLAYER, f.context_owner.unwrap_or(f.base))
        .with_value(f.context + movement_context::ROTATION, Vec2::ZERO)
        .with_u64(f.base + player::CORPSE, 0)
        .with_u64(f.base + player::BODY, body_obj)
        .with_u64(body_obj + body::SKELETON_ROOT, root)
        .with_u64(root + body::TRANSFORM_INTERNAL, f.ti)
        .with_u64(f.ti + transform::VERTICES, f.vertices)
        .with_value(f.vertices + transform::POSITION, f.pos);

    match f.group {
        Some(group) => builder
            .with_u64(f.info + player_info::GROUP_ID, group_str)
            .with_managed_string(group_str, group),
        None => builder.with_u64(f.info + player_info::GROUP_ID, 0),
    }
}

/// Attach a wishlist dictionary to an already-built player profile.
pub(crate) fn mock_wishlist(mem: &MockMemory, profile_addr: u64, ids: &[&str]) {
    let manager = profile_addr + 0x10_000;
    let dict = manager + 0x100;
    let entries = manager + 0x200;

    mem.write_u64(profile_addr + profile::WISHLIST_MANAGER, manager);
    mem.write_u64(manager + wishlist::ITEMS, dict);
    mem.write_i32(dict + collection::DICT_COUNT, ids.len() as i32);
    mem.write_u64(dict + collection::DICT_ENTRIES, entries);

    let mut data = Vec::new();
    for id in ids {
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(bytemuck::bytes_of(&MongoId::from_hex(id)));
        data.extend_from_slice(&1i32.to_le_bytes());
    }
    mem.write_bytes(entries + collection::DICT_DATA, &data);
}

/// Lay out the inventory chain for a player: `(slot name, template id)`,
/// with `None` for an empty slot.
pub(crate) fn mock_equipment(
    builder: MockMemoryBuilder,
    base: u64,
    slots: &[(&str, Option<&str>)],
) -> MockMemoryBuilder {
    let controller = base + 0x8000;
    let inv = base + 0x8200;
    let equip = base + 0x8400;
    let slot_array = base + 0x8600;

    let mut builder = builder
        .with_u64(base + player::INVENTORY_CONTROLLER, controller)
        .with_u64(controller + inventory::INVENTORY, inv)
        .with_u64(inv + inventory::EQUIPMENT, equip)
        .with_u64(equip + inventory::SLOTS, slot_array)
        .with_i32(slot_array + collection::ARRAY_COUNT, slots.len() as i32);

    let mut ptrs = Vec::new();
    for (i, (name, template)) in slots.iter().enumerate() {
        let slot_obj = base + 0x9000 + i as u64 * 0x400;
        let name_str = slot_obj + 0x100;
        ptrs.extend_from_slice(&slot_obj.to_le_bytes());

        builder = builder
            .with_u64(slot_obj + slot::NAME, name_str)
            .with_managed_string(name_str, name);

        builder = match template {
            Some(id) => {
                let item_obj = slot_obj + 0x200;
                let template_obj = slot_obj + 0x300;
                builder
                    .with_u64(slot_obj + slot::CONTAINED_ITEM, item_obj)
                    .with_u64(item_obj + item::TEMPLATE, template_obj)
                    .with_bytes(
                        template_obj + item_template::ID,
                        bytemuck::bytes_of(&MongoId::from_hex(id)),
                    )
            }
            None => builder.with_u64(slot_obj + slot::CONTAINED_ITEM, 0),
        };
    }
    builder.with_bytes(slot_array + collection::ARRAY_DATA, &ptrs)
}

/// Lay out the engine object walk down to an empty but consistent world:
/// named-object registry, world component chain, map id, player list, and
/// empty loot, grenade and tripwire lists. Returns the world address.
pub(crate) fn mock_world(
    builder: MockMemoryBuilder,
    map_id: &str,
    main_ptr: u64,
    player_bases: &[u64],
) -> (MockMemoryBuilder, u64) {
    let module_base = crate::memory::mock::DEFAULT_BASE;
    let gom = 0xD0_0000;
    let decoy_node = 0xD1_0000;
    let decoy_obj = 0xD1_1000;
    let world_node = 0xD2_0000;
    let world_obj = 0xD2_1000;
    let component_a = 0xD3_0000;
    let component_b = 0xD4_0000;
    let world = 0xE0_0000;
    let map_str = 0xE1_0000;
    let players_list = 0xE2_0000;
    let grenades_owner = 0xE4_0000;
    let grenade_list = 0xE4_1000;
    let sync = 0xE5_0000;
    let tripwire_list = 0xE5_1000;
    let loot_list = 0xE6_0000;

    let builder = builder
        .with_u64(module_base + runtime::OBJECT_MANAGER, gom)
        .with_u64(gom + runtime::FIRST_ACTIVE_NODE, decoy_node)
        .with_u64(gom + runtime::LAST_ACTIVE_NODE, world_node)
        .with_u64(decoy_node + runtime::NODE_OBJECT, decoy_obj)
        .with_u64(decoy_obj + runtime::OBJECT_NAME, decoy_obj + 0x100)
        .with_ascii(decoy_obj + 0x100, "Main Camera")
        .with_u64(decoy_node + runtime::NODE_NEXT, world_node)
        .with_u64(world_node + runtime::NODE_OBJECT, world_obj)
        .with_u64(world_obj + runtime::OBJECT_NAME, world_obj + 0x100)
        .with_ascii(world_obj + 0x100, runtime::WORLD_OBJECT_NAME)
        .with_u64(world_obj + runtime::WORLD_COMPONENT[0], component_a)
        .with_u64(component_a + runtime::WORLD_COMPONENT[1], component_b)
        .with_u64(component_b + runtime::WORLD_COMPONENT[2], world)
        .with_u64(world + game_world::LOCATION_ID, map_str)
        .with_managed_string(map_str, map_id)
        .with_u64(world + game_world::MAIN_PLAYER, main_ptr)
        .with_u64(world + game_world::REGISTERED_PLAYERS, players_list)
        .with_ptr_list(players_list, players_list + 0x8000, player_bases)
        .with_u64(world + game_world::GRENADES, grenades_owner)
        .with_u64(grenades_owner + game_world::GRENADE_LIST, grenade_list)
        .with_ptr_list(grenade_list, grenade_list + 0x8000, &[])
        .with_u64(world + game_world::SYNC_PROCESSOR, sync)
        .with_u64(sync + game_world::TRIPWIRE_LIST, tripwire_list)
        .with_ptr_list(tripwire_list, tripwire_list + 0x8000, &[])
        .with_u64(world + game_world::LOOT_LIST, loot_list)
        .with_ptr_list(loot_list, loot_list + 0x8000, &[])
        .with_u64(world + game_world::BTR_CONTROLLER, 0);

    (builder, world)
}

/// Lay out one loot-list entry: item template plus transform chain.
pub(crate) fn mock_loot_entry(
    builder: MockMemoryBuilder,
    addr: u64,
    template_id: &str,
    pos: Vec3,
) -> MockMemoryBuilder {
    let item_obj = addr + 0x100;
    let template_obj = addr + 0x200;
    let hop_a = addr + 0x300;
    let hop_b = addr + 0x400;
    let ti = addr + 0x500;
    let vertices = addr + 0x600;
    builder
        .with_u64(addr + loot_entry::ITEM, item_obj)
        .with_u64(item_obj + item::TEMPLATE, template_obj)
        .with_bytes(
            template_obj + item_template::ID,
            bytemuck::bytes_of(&MongoId::from_hex(template_id)),
        )
        .with_u64(addr + loot_entry::TRANSFORM[0], hop_a)
        .with_u64(hop_a + loot_entry::TRANSFORM[1], hop_b)
        .with_u64(hop_b + loot_entry::TRANSFORM[2], ti)
        .with_u64(ti + transform::VERTICES, vertices)
        .with_value(vertices + transform::POSITION, pos)
}

/// Lay out a thrown grenade: destroyed flag plus transform chain.
pub(crate) fn mock_grenade(builder: MockMemoryBuilder, addr: u64, pos: Vec3) -> MockMemoryBuilder {
    let hop_a = addr + 0x300;
    let hop_b = addr + 0x400;
    let ti = addr + 0x500;
    let vertices = addr + 0x600;
    builder
        .with_u8(addr + grenade::IS_DESTROYED, 0)
        .with_u64(addr + grenade::TRANSFORM[0], hop_a)
        .with_u64(hop_a + grenade::TRANSFORM[1], hop_b)
        .with_u64(hop_b + grenade::TRANSFORM[2], ti)
        .with_u64(ti + transform::VERTICES, vertices)
        .with_value(vertices + transform::POSITION, pos)
}

/// A tripwire with its state and inline position.
pub(crate) fn mock_tripwire(
    builder: MockMemoryBuilder,
    addr: u64,
    state: i32,
    pos: Vec3,
) -> MockMemoryBuilder {
    builder.with_i32(addr + tripwire::STATE, state).with_value(addr + tripwire::POSITION, pos)
}

/// One quest-progress entry with its completed-condition set.
pub(crate) fn mock_quest(
    builder: MockMemoryBuilder,
    addr: u64,
    task_id: &str,
    status: i32,
    completed: &[&str],
) -> MockMemoryBuilder {
    let id_str = addr + 0x100;
    let set = addr + 0x200;
    let slots = addr + 0x300;
    let builder = builder
        .with_u64(addr + quest_data::ID, id_str)
        .with_managed_string(id_str, task_id)
        .with_i32(addr + quest_data::STATUS, status)
        .with_u64(addr + quest_data::COMPLETED_CONDITIONS, set)
        .with_i32(set + collection::SET_COUNT, completed.len() as i32)
        .with_u64(set + collection::SET_SLOTS, slots);

    let mut data = Vec::new();
    for id in completed {
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(bytemuck::bytes_of(&MongoId::from_hex(id)));
    }
    builder.with_bytes(slots + collection::SET_DATA, &data)
}

/// Wire the armored-vehicle chain up to an operator bot.
pub(crate) fn mock_btr(mem: &MockMemory, world: u64, operator_base: u64) {
    let controller = 0xE7_0000;
    let view = 0xE7_1000;
    let turret = 0xE7_2000;
    mem.write_u64(world + game_world::BTR_CONTROLLER, controller);
    mem.write_u64(controller + btr::VIEW, view);
    mem.write_u64(view + btr::TURRET, turret);
    mem.write_u64(turret + btr::OPERATOR, operator_base);
}

/// A small reference database: a weapon, money, a valuable, a bulky item,
/// a quest item, a container, two maps and one zoned task.
pub(crate) fn sample_data() -> DataRegistry {
    DataRegistry::from_slice(SAMPLE_DATA.as_bytes()).unwrap()
}

const SAMPLE_DATA: &str = r#"{
    "items": [
        {
            "id": "5447a9cd4bdc2dbd208b4567",
            "name": "SIG MDR 5.56x45 assault rifle",
            "shortName": "MDR",
            "fleaPrice": 60000,
            "traderPrice": 85000,
            "slots": 10,
            "tags": ["Weapon"]
        },
        {
            "id": "5449016a4bdc2d6f028b456f",
            "name": "Roubles",
            "shortName": "RUB",
            "fleaPrice": 1,
            "traderPrice": 1,
            "slots": 1,
            "tags": ["Currency"]
        },
        {
            "id": "5c0530ee86f774697952d952",
            "name": "LEDX Skin Transilluminator",
            "shortName": "LEDX",
            "fleaPrice": 800000,
            "traderPrice": 250000,
            "slots": 1,
            "tags": ["Meds"]
        },
        {
            "id": "5733279d245977289b77ec24",
            "name": "Car battery",
            "shortName": "Battery",
            "fleaPrice": 120000,
            "traderPrice": 18000,
            "slots": 4,
            "tags": []
        },
        {
            "id": "590c621186f774138d11ea29",
            "name": "Secure Flash drive",
            "shortName": "Flash",
            "slots": 1,
            "tags": ["Quest Item"]
        },
        {
            "id": "578f87b7245977356274f2cd",
            "name": "Weapon crate",
            "shortName": "Crate",
            "tags": ["Static Container"]
        }
    ],
    "maps": [
        {
            "id": "woods",
            "name": "Woods",
            "hasVehicle": true,
            "extracts": [
                {
                    "name": "Outskirts",
                    "position": { "x": 410.2, "y": 12.5, "z": -220.8 },
                    "sides": ["shared"]
                },
                {
                    "name": "RUAF Roadblock",
                    "position": { "x": -128.0, "y": 3.1, "z": 90.4 },
                    "sides": ["pmc"]
                },
                {
                    "name": "Scav Bunker",
                    "position": { "x": 244.7, "y": 18.0, "z": 301.2 },
                    "sides": ["scav"]
                }
            ],
            "transits": [
                {
                    "name": "Railway Crossing",
                    "position": { "x": 500.0, "y": 11.0, "z": -40.0 }
                }
            ],
            "hazards": [
                { "kind": "Minefield", "position": { "x": -300.0, "y": 8.0, "z": 45.0 } }
            ]
        },
        {
            "id": "factory4_day",
            "name": "Factory",
            "hasVehicle": false,
            "extracts": [],
            "transits": [],
            "hazards": []
        }
    ],
    "tasks": [
        {
            "id": "59674cd986f7744ab26e32f2",
            "name": "Shootout Picnic",
            "objectives": [
                {
                    "id": "59674eb386f774539f14813a",
                    "requiredItems": ["590c621186f774138d11ea29"],
                    "zones": [
                        {
                            "id": "picnic_zone",
                            "map": "woods",
                            "position": { "x": 120.0, "y": 10.0, "z": 33.0 }
                        }
                    ]
                }
            ]
        }
    ]
}"#;
