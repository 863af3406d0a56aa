//! Raid session lifecycle.
//!
//! One `RaidSession` spans one raid: discovery locates the world object
//! inside the remote process, construction takes the one-time reads that
//! pin the session's identity (world address, map id, local player), and
//! three polling workers keep the catalogs current until the validity
//! checks say the raid is over.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data::DataRegistry;
use crate::error::{Error, Result};
use crate::memory::layout::{btr, collection, game_world, runtime, timing};
use crate::memory::{RemoteMemory, RemoteMemoryExt, ScatterBatch, ScatterRounds, is_valid_ptr, pool};
use crate::raid::exits::ExitList;
use crate::raid::explosives::ExplosivesCatalog;
use crate::raid::hazards::HazardList;
use crate::raid::loot::{FilteredLoot, LootCatalog};
use crate::raid::player::Player;
use crate::raid::quests::QuestCatalog;
use crate::raid::registry::PlayerRegistry;
use crate::worker::{
    CancelToken, Flow, RateLimiter, SleepMode, WorkerConfig, WorkerPriority, WorkerThread,
};

const MAX_OBJECT_NAME_CHARS: usize = 64;
const MAX_MAP_ID_CHARS: usize = 64;
/// Upper bound on the named-object walk; a longer chain means a torn list.
const MAX_WALK_NODES: usize = 4096;

pub struct RaidSession {
    mem: Arc<dyn RemoteMemory>,
    data: Arc<DataRegistry>,
    config: Arc<Config>,
    world: u64,
    map_id: String,
    main_ptr: u64,
    players_list: u64,
    loot_list: u64,
    vehicle_map: bool,
    started_at: DateTime<Utc>,
    local: Arc<Player>,
    registry: PlayerRegistry,
    loot: LootCatalog,
    explosives: ExplosivesCatalog,
    quests: QuestCatalog,
    hazards: HazardList,
    exits: ExitList,
    loot_limiter: RateLimiter,
    wishlist_limiter: RateLimiter,
    quest_limiter: RateLimiter,
    token: CancelToken,
    active: AtomicBool,
    disposed: AtomicBool,
    workers: Mutex<Vec<WorkerThread>>,
}

impl std::fmt::Debug for RaidSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaidSession")
            .field("world", &self.world)
            .field("map_id", &self.map_id)
            .finish_non_exhaustive()
    }
}

impl RaidSession {
    /// Block until a raid becomes joinable, the token cancels (`Ok(None)`),
    /// or the remote process dies (`Err(ProcessNotRunning)`).
    ///
    /// Outside a raid this loop is the steady state; failures to locate the
    /// world are expected and not logged as errors.
    pub fn discover(
        mem: Arc<dyn RemoteMemory>,
        data: Arc<DataRegistry>,
        config: Arc<Config>,
        token: CancelToken,
    ) -> Result<Option<Self>> {
        loop {
            if token.is_cancelled() {
                return Ok(None);
            }
            if !mem.process_alive() {
                return Err(Error::ProcessNotRunning);
            }
            // Long waits outside a raid should not hold decode buffers.
            pool::trim();

            match Self::try_start(&mem, &data, &config) {
                Ok(session) => return Ok(Some(session)),
                Err(err) => debug!(%err, "no raid yet"),
            }

            if token.wait(Duration::from_millis(timing::DISCOVERY_RETRY_MS)) {
                return Ok(None);
            }
        }
    }

    fn try_start(
        mem: &Arc<dyn RemoteMemory>,
        data: &Arc<DataRegistry>,
        config: &Arc<Config>,
    ) -> Result<Self> {
        let (world, map_id) = locate_world(mem.as_ref())?;
        let main_ptr = mem.read_ptr(world + game_world::MAIN_PLAYER)?;
        let players_list = mem.read_ptr(world + game_world::REGISTERED_PLAYERS)?;
        let loot_list = mem.read_ptr(world + game_world::LOOT_LIST)?;

        let registry = PlayerRegistry::new();
        registry.refresh(mem.as_ref(), players_list, main_ptr)?;
        let local = registry.local().ok_or(Error::Integrity("local player missing"))?;

        let hazards = HazardList::build(data, &map_id);
        let exits = ExitList::build(data, &map_id, local.side());
        let vehicle_map = data.map(&map_id).is_some_and(|map| map.has_vehicle);

        let session = Self {
            mem: mem.clone(),
            data: data.clone(),
            config: config.clone(),
            world,
            map_id,
            main_ptr,
            players_list,
            loot_list,
            vehicle_map,
            started_at: Utc::now(),
            local,
            registry,
            loot: LootCatalog::new(),
            explosives: ExplosivesCatalog::new(),
            quests: QuestCatalog::new(),
            hazards,
            exits,
            loot_limiter: RateLimiter::new(Duration::from_millis(timing::LOOT_REFRESH_MS)),
            wishlist_limiter: RateLimiter::new(Duration::from_millis(timing::WISHLIST_REFRESH_MS)),
            quest_limiter: RateLimiter::new(Duration::from_millis(timing::QUEST_REFRESH_MS)),
            // The session owns its token; the caller's token only governs
            // discovery. Raid teardown must never cancel the outer loop.
            token: CancelToken::new(),
            active: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        };

        // Best-effort initial fills; the slow tier repairs whatever failed.
        if let Err(err) = session.loot.refresh(session.mem.as_ref(), loot_list, data) {
            debug!(%err, "initial loot fill failed");
        }
        if session.config.quests.enabled {
            if let Err(err) = session.quests.refresh(
                session.mem.as_ref(),
                session.local.profile_addr(),
                &session.map_id,
                data,
                &session.config.quests,
            ) {
                debug!(%err, "initial quest fill failed");
            }
        }

        info!(
            map = %session.map_id,
            players = session.registry.len(),
            loot = session.loot.len(),
            "raid session started"
        );
        Ok(session)
    }

    /// Spin up the three polling tiers. Safe to call once per session.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() || self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let session = Arc::clone(self);
        let ender = Arc::clone(self);
        workers.push(WorkerThread::spawn(
            WorkerConfig {
                name: "realtime",
                interval: Duration::from_millis(timing::REALTIME_INTERVAL_MS),
                sleep: SleepMode::Dynamic,
                priority: WorkerPriority::AboveNormal,
            },
            self.token.clone(),
            move || session.realtime_tick(),
            move || ender.mark_ended(),
        )?);

        let session = Arc::clone(self);
        let ender = Arc::clone(self);
        workers.push(WorkerThread::spawn(
            WorkerConfig {
                name: "slow",
                interval: Duration::from_millis(timing::SLOW_INTERVAL_MS),
                sleep: SleepMode::Fixed,
                priority: WorkerPriority::BelowNormal,
            },
            self.token.clone(),
            move || session.slow_tick(),
            move || ender.mark_ended(),
        )?);

        let session = Arc::clone(self);
        let ender = Arc::clone(self);
        workers.push(WorkerThread::spawn(
            WorkerConfig {
                name: "explosives",
                interval: Duration::from_millis(timing::EXPLOSIVES_INTERVAL_MS),
                sleep: SleepMode::Dynamic,
                priority: WorkerPriority::Normal,
            },
            self.token.clone(),
            move || session.explosives_tick(),
            move || ender.mark_ended(),
        )?);
        Ok(())
    }

    /// One realtime tick: a flat batch with one read-set per live player.
    fn realtime_tick(&self) -> Result<Flow> {
        let players: Vec<Arc<Player>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|p| p.is_active() && p.is_alive())
            .collect();
        if players.is_empty() {
            return Ok(Flow::Continue);
        }

        let mut batch = ScatterBatch::new();
        let sets: Vec<_> = players.iter().map(|p| p.register_realtime(&mut batch)).collect();
        batch.execute(self.mem.as_ref())?;
        for (player, set) in players.iter().zip(&sets) {
            player.apply_realtime(&batch, set);
        }
        Ok(Flow::Continue)
    }

    /// One slow tick: session validity first, then the heavyweight refreshes
    /// with cancellation checks between them.
    fn slow_tick(&self) -> Result<Flow> {
        if self.check_raid_active() == Flow::Ended {
            return Ok(Flow::Ended);
        }

        self.try_allocate_vehicle_operator();
        if let Err(err) = self.registry.refresh(self.mem.as_ref(), self.players_list, self.main_ptr)
        {
            warn!(%err, "registry refresh failed");
        }
        self.validate_transforms();

        if self.token.is_cancelled() {
            return Ok(Flow::Continue);
        }
        if self.loot_limiter.ready() {
            if let Err(err) = self.loot.refresh(self.mem.as_ref(), self.loot_list, &self.data) {
                warn!(%err, "loot refresh failed");
            }
        }
        if self.config.loot.show_wishlist && self.wishlist_limiter.ready() {
            if let Err(err) = self.local.refresh_wishlist(self.mem.as_ref()) {
                debug!(%err, "wishlist refresh failed");
            }
        }

        for player in self.registry.active() {
            if let Some(equipment) = player.equipment() {
                equipment.tick(self.mem.as_ref(), &self.data, player.is_pmc());
            }
        }

        if self.config.quests.enabled && self.quest_limiter.ready() {
            if let Err(err) = self.quests.refresh(
                self.mem.as_ref(),
                self.local.profile_addr(),
                &self.map_id,
                &self.data,
                &self.config.quests,
            ) {
                debug!(%err, "quest refresh failed");
            }
        }
        Ok(Flow::Continue)
    }

    fn explosives_tick(&self) -> Result<Flow> {
        self.explosives.refresh(self.mem.as_ref(), self.world)?;
        Ok(Flow::Continue)
    }

    /// Re-check the session invariant: the remote main-player pointer still
    /// matches and at least one player is registered. A single failed read
    /// from a busy process is expected, so the check retries briefly before
    /// declaring the raid over.
    fn check_raid_active(&self) -> Flow {
        for attempt in 0..timing::RAID_CHECK_ATTEMPTS {
            if attempt > 0
                && self.token.wait(Duration::from_millis(timing::RAID_CHECK_DELAY_MS))
            {
                return Flow::Ended;
            }
            match self.read_validity() {
                Ok(true) => return Flow::Continue,
                Ok(false) => debug!(attempt, "validity check mismatch"),
                Err(err) => debug!(attempt, %err, "validity check failed"),
            }
        }
        info!("raid validity lost");
        Flow::Ended
    }

    fn read_validity(&self) -> Result<bool> {
        let main = self.mem.read_value::<u64>(self.world + game_world::MAIN_PLAYER)?;
        if main != self.main_ptr {
            return Ok(false);
        }
        let count = self.mem.read_value::<i32>(self.players_list + collection::LIST_COUNT)?;
        Ok(count > 0)
    }

    /// Probe the vehicle chain and allocate the turret entity if an operator
    /// bot is present. No-op on maps without the vehicle.
    pub fn try_allocate_vehicle_operator(&self) {
        if !self.vehicle_map {
            return;
        }
        let mut rounds = ScatterRounds::new();
        let r1 = rounds.add_round();
        let r2 = rounds.add_round();
        let r3 = rounds.add_round();
        let r4 = rounds.add_round();
        let controller = rounds.read::<u64>(r1, self.world + game_world::BTR_CONTROLLER);
        let view = rounds.read_at::<u64>(r2, controller, btr::VIEW);
        let turret = rounds.read_at::<u64>(r3, view, btr::TURRET);
        let operator = rounds.read_at::<u64>(r4, turret, btr::OPERATOR);
        if rounds.execute(self.mem.as_ref()).is_err() {
            return;
        }
        let operator = match rounds.value(operator) {
            Some(addr) if is_valid_ptr(addr) => addr,
            _ => return,
        };
        if let Err(err) = self.registry.try_allocate_btr(self.mem.as_ref(), operator) {
            debug!(%err, "vehicle operator not readable yet");
        }
    }

    /// Two-round transform sanity pass over the live players.
    fn validate_transforms(&self) {
        let players: Vec<Arc<Player>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|p| p.is_active() && p.is_alive())
            .collect();
        if players.is_empty() {
            return;
        }

        let mut rounds = ScatterRounds::new();
        let r1 = rounds.add_round();
        let r2 = rounds.add_round();
        let sets: Vec<_> = players.iter().map(|p| p.register_sanity(&mut rounds, r1, r2)).collect();
        if let Err(err) = rounds.execute(self.mem.as_ref()) {
            warn!(%err, "transform validation batch failed");
            return;
        }
        for (player, set) in players.iter().zip(&sets) {
            player.apply_sanity(&rounds, set);
        }
    }

    /// Flip the session to ended and wake every worker. Does not join;
    /// workers call this from their own threads.
    fn mark_ended(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(map = %self.map_id, "raid ended");
        self.token.trigger();
    }

    /// Stop the workers and release everything. Idempotent; also run by
    /// `Drop`. Must be called from outside the worker threads.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.mark_ended();
        let mut workers = std::mem::take(&mut *self.workers.lock());
        for worker in &mut workers {
            worker.join();
        }
        info!(map = %self.map_id, "raid session disposed");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn local_player(&self) -> &Arc<Player> {
        &self.local
    }

    pub fn players(&self) -> Vec<Arc<Player>> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn loot(&self) -> &LootCatalog {
        &self.loot
    }

    /// Loose loot under the configured filter, with the local wishlist and
    /// quest-needed items applied.
    pub fn filtered_loot(&self) -> Vec<FilteredLoot> {
        let wishlist = self.local.wishlist();
        let needed = self.quests.needed_items();
        self.loot.filtered(&self.config.loot, &wishlist, &needed)
    }

    pub fn explosives(&self) -> &ExplosivesCatalog {
        &self.explosives
    }

    pub fn quests(&self) -> &QuestCatalog {
        &self.quests
    }

    pub fn hazards(&self) -> &HazardList {
        &self.hazards
    }

    pub fn exits(&self) -> &ExitList {
        &self.exits
    }
}

impl Drop for RaidSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Walk the engine's named-object registry for the world object, then
/// follow its component chain to the live world and read the map id.
fn locate_world(mem: &dyn RemoteMemory) -> Result<(u64, String)> {
    let manager = mem.read_ptr(mem.base_address() + runtime::OBJECT_MANAGER)?;
    let last = mem.read_ptr(manager + runtime::LAST_ACTIVE_NODE)?;
    let mut node = mem.read_ptr(manager + runtime::FIRST_ACTIVE_NODE)?;

    for _ in 0..MAX_WALK_NODES {
        let object = mem.read_ptr(node + runtime::NODE_OBJECT)?;
        let name_ptr = mem.read_ptr(object + runtime::OBJECT_NAME)?;
        let name = mem.read_ascii(name_ptr, MAX_OBJECT_NAME_CHARS)?;
        if name == runtime::WORLD_OBJECT_NAME {
            let world = mem.read_ptr_chain(object, &runtime::WORLD_COMPONENT)?;
            let map_ptr = mem.read_ptr(world + game_world::LOCATION_ID)?;
            let map_id = mem.read_string(map_ptr, MAX_MAP_ID_CHARS)?;
            if map_id.is_empty() {
                return Err(Error::WorldNotFound);
            }
            return Ok((world, map_id));
        }
        if node == last {
            break;
        }
        node = mem.read_ptr(node + runtime::NODE_NEXT)?;
    }
    Err(Error::WorldNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::{MockMemory, MockMemoryBuilder};
    use crate::raid::fixtures::{PlayerFixture, mock_btr, mock_player, mock_world};
    use crate::raid::player::{PlayerKind, PlayerSide};
    use std::thread;
    use std::time::Instant;

    fn dyn_mem(mem: &Arc<MockMemory>) -> Arc<dyn RemoteMemory> {
        mem.clone()
    }

    fn sample() -> (Arc<DataRegistry>, Arc<Config>) {
        (Arc::new(crate::raid::fixtures::sample_data()), Arc::new(Config::default()))
    }

    fn raid_mock(map: &str) -> (Arc<MockMemory>, PlayerFixture, u64) {
        let me = PlayerFixture::human(0x10_0000, "Me", "acc-0", PlayerSide::Usec);
        let scav = PlayerFixture::ai(0x20_0000, "Scav", PlayerSide::Savage);
        let mut builder = mock_player(MockMemoryBuilder::new(), &me);
        builder = mock_player(builder, &scav);
        let (builder, world) = mock_world(builder, map, me.base, &[me.base, scav.base]);
        (Arc::new(builder.build()), me, world)
    }

    #[test]
    fn test_discover_builds_session() {
        let (mem, me, _) = raid_mock("woods");
        let (data, config) = sample();

        let session =
            RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
                .unwrap()
                .expect("session");

        assert!(session.is_active());
        assert_eq!(session.map_id(), "woods");
        assert_eq!(session.players().len(), 2);
        assert_eq!(session.local_player().name(), "Me");
        assert_eq!(session.local_player().base(), me.base);
        assert_eq!(session.local_player().kind(), PlayerKind::Local);
        assert_eq!(session.hazards().len(), 1);
        assert!(!session.exits().is_empty());
    }

    #[test]
    fn test_discover_dead_process_is_fatal() {
        let (mem, _, _) = raid_mock("woods");
        mem.set_alive(false);
        let (data, config) = sample();

        let err = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::ProcessNotRunning));
    }

    #[test]
    fn test_discover_cancels_while_waiting() {
        // No world object mapped at all; discovery keeps retrying.
        let mem: Arc<MockMemory> = Arc::new(MockMemoryBuilder::new().build());
        let (data, config) = sample();
        let token = CancelToken::new();

        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.trigger();
        });

        let start = Instant::now();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, token).unwrap();
        assert!(session.is_none());
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_validity_retries_then_ends_on_mismatch() {
        let (mem, _, world) = raid_mock("woods");
        let (data, config) = sample();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap()
            .unwrap();

        assert_eq!(session.check_raid_active(), Flow::Continue);

        mem.write_u64(world + game_world::MAIN_PLAYER, 0xBEEF_0000);
        let start = Instant::now();
        assert_eq!(session.check_raid_active(), Flow::Ended);
        // Four retry delays sit between the five attempts.
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_validity_ends_on_zero_players() {
        let (mem, _, world) = raid_mock("woods");
        let (data, config) = sample();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap()
            .unwrap();

        let players_list = mem.read_ptr(world + game_world::REGISTERED_PLAYERS).unwrap();
        mem.write_i32(players_list + collection::LIST_COUNT, 0);
        assert_eq!(session.check_raid_active(), Flow::Ended);
    }

    #[test]
    fn test_workers_stop_when_validity_lost() {
        let (mem, _, world) = raid_mock("woods");
        let (data, config) = sample();
        let session = Arc::new(
            RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
                .unwrap()
                .unwrap(),
        );
        session.start().unwrap();
        assert!(session.is_active());

        mem.write_u64(world + game_world::MAIN_PLAYER, 0xBEEF_0000);

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_active() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!session.is_active());

        session.dispose();
        // A second dispose must be a harmless no-op.
        session.dispose();
        assert!(session.workers.lock().is_empty());
    }

    #[test]
    fn test_dispose_without_start_is_idempotent() {
        let (mem, _, _) = raid_mock("woods");
        let (data, config) = sample();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap()
            .unwrap();

        session.dispose();
        session.dispose();
        assert!(!session.is_active());
    }

    #[test]
    fn test_realtime_tick_moves_players() {
        let (mem, me, _) = raid_mock("woods");
        let (data, config) = sample();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap()
            .unwrap();

        mem.write_bytes(
            me.pos_addr(),
            bytemuck::bytes_of(&crate::math::Vec3::new(77.0, 3.0, -12.0)),
        );
        session.realtime_tick().unwrap();
        assert_eq!(session.local_player().position(), crate::math::Vec3::new(77.0, 3.0, -12.0));
    }

    #[test]
    fn test_vehicle_operator_allocated_once_on_vehicle_maps() {
        let bot = PlayerFixture::ai(0x30_0000, "BtrBot", PlayerSide::Savage);
        let me = PlayerFixture::human(0x10_0000, "Me", "acc-0", PlayerSide::Usec);
        let mut builder = mock_player(MockMemoryBuilder::new(), &me);
        builder = mock_player(builder, &bot);
        let (builder, world) = mock_world(builder, "woods", me.base, &[me.base]);
        let mem = Arc::new(builder.build());
        let (data, config) = sample();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap()
            .unwrap();

        // Nothing allocated while the controller pointer is null.
        session.try_allocate_vehicle_operator();
        assert_eq!(session.players().len(), 1);

        mock_btr(&mem, world, bot.base);
        session.try_allocate_vehicle_operator();
        session.try_allocate_vehicle_operator();
        let turrets: Vec<_> = session
            .players()
            .into_iter()
            .filter(|p| p.kind() == PlayerKind::BtrTurret)
            .collect();
        assert_eq!(turrets.len(), 1);
        assert_eq!(turrets[0].name(), "BTR");
    }

    #[test]
    fn test_no_vehicle_probe_on_other_maps() {
        let bot = PlayerFixture::ai(0x30_0000, "BtrBot", PlayerSide::Savage);
        let me = PlayerFixture::human(0x10_0000, "Me", "acc-0", PlayerSide::Usec);
        let mut builder = mock_player(MockMemoryBuilder::new(), &me);
        builder = mock_player(builder, &bot);
        let (builder, world) = mock_world(builder, "factory4_day", me.base, &[me.base]);
        let mem = Arc::new(builder.build());
        let (data, config) = sample();
        let session = RaidSession::discover(dyn_mem(&mem), data, config, CancelToken::new())
            .unwrap()
            .unwrap();

        mock_btr(&mem, world, bot.base);
        session.try_allocate_vehicle_operator();
        assert_eq!(session.players().len(), 1);
    }
}
