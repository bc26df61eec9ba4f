//! The engine root.
//!
//! [`Guard`] builds every registry and scheduler from injected collaborators
//! and exposes the operations a command layer calls. Arguments arrive already
//! authorized; this layer validates values (durations, clock times, world
//! names), applies the change, and persists it.
use std::sync::Arc;

use bastion_utils::{Vector3, duration, time_of_day};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::admission::SpawnAdmission;
use crate::bypass::{BypassFlags, BypassRegistry, BypassRule};
use crate::clock::Clock;
use crate::despawn::{DespawnScheduler, DespawnSettings};
use crate::enforce::Enforcer;
use crate::error::GuardError;
use crate::placed::PlacedObjectRegistry;
use crate::rules::{RuleBook, SpawnWindow, WorldRules};
use crate::spawn_point::{SpawnPointDefinition, SpawnPointKey, SpawnPointScheduler};
use crate::store::GuardStore;
use crate::ticks::TaskScheduler;
use crate::world::WorldAccess;

/// Timings the engine runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardSettings {
    /// Despawn sweep timings.
    pub despawn: DespawnSettings,
}

/// Owns the engine state and runs commands against it.
pub struct Guard {
    rules: Arc<RuleBook>,
    bypass: Arc<BypassRegistry>,
    placed: Arc<PlacedObjectRegistry>,
    despawn: Arc<DespawnScheduler>,
    spawn_points: Arc<SpawnPointScheduler>,
    enforcer: Enforcer,
    store: Arc<dyn GuardStore>,
    world: Arc<dyn WorldAccess>,
    settings: Mutex<GuardSettings>,
}

impl Guard {
    /// Wires the engine together. Nothing runs until [`Guard::start`].
    #[must_use]
    pub fn new(
        store: Arc<dyn GuardStore>,
        world: Arc<dyn WorldAccess>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<TaskScheduler>,
        settings: GuardSettings,
    ) -> Arc<Self> {
        let rules = Arc::new(RuleBook::new());
        let bypass = Arc::new(BypassRegistry::new());
        let placed = Arc::new(PlacedObjectRegistry::new(clock.clone()));
        let admission = Arc::new(SpawnAdmission::new(
            rules.clone(),
            world.clone(),
            clock.clone(),
        ));
        let despawn = DespawnScheduler::new(
            placed.clone(),
            rules.clone(),
            world.clone(),
            clock,
            scheduler.clone(),
            settings.despawn,
        );
        let spawn_points =
            SpawnPointScheduler::new(scheduler, admission.clone(), world.clone());
        let enforcer = Enforcer::new(rules.clone(), bypass.clone(), placed.clone(), admission);

        Arc::new(Self {
            rules,
            bypass,
            placed,
            despawn,
            spawn_points,
            enforcer,
            store,
            world,
            settings: Mutex::new(settings),
        })
    }

    /// Loads persisted state and starts both schedulers.
    pub fn start(&self) -> Result<(), GuardError> {
        let placed = self.store.placed_objects()?;
        self.placed.clear();
        let count = placed.len();
        for (key, record) in placed {
            self.placed.insert_raw(key, record);
        }
        log::info!("Loaded {count} placed block(s)");

        self.reload()
    }

    /// Re-reads rules and spawn points from the store and restarts both
    /// schedulers. The placed registry and bypasses are left as they are.
    pub fn reload(&self) -> Result<(), GuardError> {
        let worlds = self.store.worlds()?;
        let definitions = self.store.spawn_points()?;

        self.despawn.stop();
        self.rules
            .replace(worlds.into_iter().collect::<FxHashMap<_, _>>());
        self.spawn_points.reload(definitions);
        let despawn_settings = self.settings.lock().despawn;
        self.despawn.restart(despawn_settings);
        Ok(())
    }

    /// Replaces the timings. Takes effect immediately.
    pub fn apply_settings(&self, settings: GuardSettings) {
        *self.settings.lock() = settings;
        self.despawn.restart(settings.despawn);
    }

    /// Writes the placed registry to the store.
    ///
    /// This is blocking store I/O. Timers never call it.
    pub fn save(&self) -> Result<(), GuardError> {
        let snapshot = self.placed.snapshot();
        self.store.replace_placed_objects(&snapshot)?;
        log::debug!("Saved {} placed block(s)", snapshot.len());
        Ok(())
    }

    /// Stops every timer, saves, and drops every bypass.
    pub fn shutdown(&self) -> Result<(), GuardError> {
        self.despawn.stop();
        self.spawn_points.shutdown();
        let saved = self.save();
        self.bypass.clear_all();
        saved
    }

    // Despawn

    /// Turns block despawn on or off for a world.
    pub fn set_despawn_enabled(&self, world: &str, enabled: bool) -> Result<(), GuardError> {
        self.edit_rules(world, |rules| rules.block_despawn.enabled = enabled)?;
        Ok(())
    }

    /// Sets how long placed blocks live in a world.
    ///
    /// Returns the lifetime in millis.
    pub fn set_despawn_lifetime(&self, world: &str, text: &str) -> Result<u64, GuardError> {
        let millis = duration::parse(text).map_err(|err| GuardError::duration(text, err))?;
        let text = text.trim().to_string();
        self.edit_rules(world, |rules| rules.block_despawn.time = text)?;
        Ok(millis)
    }

    // Spawn points

    /// Creates a spawn point and starts its timer.
    pub fn add_spawn_point(
        &self,
        world: &str,
        name: &str,
        entity: &str,
        location: Vector3<f64>,
        interval: &str,
    ) -> Result<SpawnPointDefinition, GuardError> {
        self.ensure_world(world)?;
        if !SpawnPointKey::is_valid_name(name) {
            return Err(GuardError::InvalidSpawnPointName(name.to_string()));
        }
        let interval_ticks = parse_interval(interval)?;
        let key = SpawnPointKey::new(world, name);
        if self.spawn_points.get(&key).is_some() {
            return Err(GuardError::DuplicateSpawnPoint(key));
        }

        let definition = SpawnPointDefinition {
            key,
            entity: entity.to_string(),
            location,
            interval_ticks,
        };
        self.spawn_points.register(definition.clone());
        self.store.put_spawn_point(&definition)?;
        log::info!(
            "Added spawn point {} for {entity} every {}",
            definition.key,
            duration::format(duration::ticks_to_millis(interval_ticks))
        );
        Ok(definition)
    }

    /// Deletes a spawn point. Its timer is stopped before this returns.
    pub fn remove_spawn_point(
        &self,
        world: &str,
        name: &str,
    ) -> Result<SpawnPointDefinition, GuardError> {
        let key = SpawnPointKey::new(world, name);
        let Some(definition) = self.spawn_points.unregister(&key) else {
            return Err(GuardError::UnknownSpawnPoint(key));
        };
        self.store.delete_spawn_point(&key)?;
        log::info!("Removed spawn point {key}");
        Ok(definition)
    }

    /// Changes a spawn point's interval. The next firing is one full new
    /// interval away.
    pub fn set_spawn_point_interval(
        &self,
        world: &str,
        name: &str,
        interval: &str,
    ) -> Result<SpawnPointDefinition, GuardError> {
        let interval_ticks = parse_interval(interval)?;
        let key = SpawnPointKey::new(world, name);
        let Some(definition) = self.spawn_points.update_interval(&key, interval_ticks) else {
            return Err(GuardError::UnknownSpawnPoint(key));
        };
        self.store.put_spawn_point(&definition)?;
        Ok(definition)
    }

    /// Spawns a point's entity now, skipping admission.
    ///
    /// Returns whether the world accepted the spawn.
    pub fn force_spawn(&self, world: &str, name: &str) -> Result<bool, GuardError> {
        let key = SpawnPointKey::new(world, name);
        if self.spawn_points.get(&key).is_none() {
            return Err(GuardError::UnknownSpawnPoint(key));
        }
        Ok(self.spawn_points.force_spawn(&key))
    }

    /// One spawn point.
    #[must_use]
    pub fn spawn_point(&self, world: &str, name: &str) -> Option<SpawnPointDefinition> {
        self.spawn_points.get(&SpawnPointKey::new(world, name))
    }

    /// Every spawn point in a world, sorted by name.
    #[must_use]
    pub fn spawn_points(&self, world: &str) -> Vec<SpawnPointDefinition> {
        self.spawn_points.in_world(world)
    }

    /// Stops the timers of every spawn point in an unloaded world.
    ///
    /// The definitions stay persisted and come back on the next reload.
    pub fn unload_world(&self, world: &str) {
        for definition in self.spawn_points.in_world(world) {
            self.spawn_points.unregister(&definition.key);
        }
    }

    // Bypass

    /// Flips a bypass and returns its new value.
    pub fn toggle_bypass(&self, actor: Uuid, rule: BypassRule) -> bool {
        self.bypass.toggle(actor, rule)
    }

    /// Sets a bypass.
    pub fn set_bypass(&self, actor: Uuid, rule: BypassRule, value: bool) {
        self.bypass.set(actor, rule, value);
    }

    /// Returns whether an actor bypasses a rule.
    #[must_use]
    pub fn bypass(&self, actor: Uuid, rule: BypassRule) -> bool {
        self.bypass.get(actor, rule)
    }

    /// Every rule an actor bypasses.
    #[must_use]
    pub fn bypasses(&self, actor: Uuid) -> BypassFlags {
        self.bypass.flags(actor)
    }

    // World toggles

    /// Lets water spread, or not.
    pub fn set_water_flow(&self, world: &str, enabled: bool) -> Result<(), GuardError> {
        self.edit_rules(world, |rules| rules.water_flow = enabled)?;
        Ok(())
    }

    /// Lets lava spread, or not.
    pub fn set_lava_flow(&self, world: &str, enabled: bool) -> Result<(), GuardError> {
        self.edit_rules(world, |rules| rules.lava_flow = enabled)?;
        Ok(())
    }

    /// Freezes redstone, or unfreezes it.
    pub fn set_redstone_blocked(&self, world: &str, blocked: bool) -> Result<(), GuardError> {
        self.edit_rules(world, |rules| rules.block_redstone_mechanism = blocked)?;
        Ok(())
    }

    /// Allows breaking blocks nobody placed, or protects them.
    pub fn set_destruction_allowed(&self, world: &str, allowed: bool) -> Result<(), GuardError> {
        self.edit_rules(world, |rules| rules.block_destruction = allowed)?;
        Ok(())
    }

    // Entity rules

    /// Caps the population of an entity kind.
    pub fn add_entity_limit(&self, world: &str, entity: &str, limit: u32) -> Result<(), GuardError> {
        self.edit_rules(world, |rules| {
            rules.entity_limits.insert(entity.to_string(), limit);
        })?;
        Ok(())
    }

    /// Removes a population cap. Returns whether one was set.
    pub fn remove_entity_limit(&self, world: &str, entity: &str) -> Result<bool, GuardError> {
        self.edit_rules(world, |rules| rules.entity_limits.remove(entity).is_some())
    }

    /// Restricts an entity kind to spawning between two clock times.
    pub fn set_spawn_time(
        &self,
        world: &str,
        entity: &str,
        from: &str,
        to: &str,
    ) -> Result<(), GuardError> {
        for text in [from, to] {
            if time_of_day::parse(text).is_none() {
                return Err(GuardError::InvalidTimeOfDay(text.to_string()));
            }
        }
        let window = SpawnWindow {
            from: from.trim().to_string(),
            to: to.trim().to_string(),
        };
        self.edit_rules(world, |rules| {
            rules.entity_spawn_times.insert(entity.to_string(), window);
        })?;
        Ok(())
    }

    /// Lifts a spawn time restriction. Returns whether one was set.
    pub fn remove_spawn_time(&self, world: &str, entity: &str) -> Result<bool, GuardError> {
        self.edit_rules(world, |rules| {
            rules.entity_spawn_times.remove(entity).is_some()
        })
    }

    /// Bans an entity kind. Returns false if it already was.
    pub fn add_disallowed_entity(&self, world: &str, entity: &str) -> Result<bool, GuardError> {
        self.edit_rules(world, |rules| add_unique(&mut rules.disallowed_entities, entity))
    }

    /// Unbans an entity kind. Returns false if it was not banned.
    pub fn remove_disallowed_entity(&self, world: &str, entity: &str) -> Result<bool, GuardError> {
        self.edit_rules(world, |rules| remove_all(&mut rules.disallowed_entities, entity))
    }

    /// Bans placing a block kind. Returns false if it already was.
    pub fn add_disallowed_block(&self, world: &str, block: &str) -> Result<bool, GuardError> {
        self.edit_rules(world, |rules| add_unique(&mut rules.disallowed_blocks, block))
    }

    /// Unbans a block kind. Returns false if it was not banned.
    pub fn remove_disallowed_block(&self, world: &str, block: &str) -> Result<bool, GuardError> {
        self.edit_rules(world, |rules| remove_all(&mut rules.disallowed_blocks, block))
    }

    /// A copy of a world's rules.
    #[must_use]
    pub fn world_rules(&self, world: &str) -> WorldRules {
        self.rules.get(world)
    }

    // Accessors

    /// Event handlers bound to this engine.
    #[must_use]
    pub fn events(&self) -> &Enforcer {
        &self.enforcer
    }

    /// The placed block registry.
    #[must_use]
    pub fn placed(&self) -> &Arc<PlacedObjectRegistry> {
        &self.placed
    }

    /// The despawn scheduler.
    #[must_use]
    pub fn despawn(&self) -> &Arc<DespawnScheduler> {
        &self.despawn
    }

    fn ensure_world(&self, world: &str) -> Result<(), GuardError> {
        if self.world.world_exists(world) {
            Ok(())
        } else {
            Err(GuardError::UnknownWorld(world.to_string()))
        }
    }

    /// Applies an edit to a world's rules and persists the result.
    fn edit_rules<R>(
        &self,
        world: &str,
        f: impl FnOnce(&mut WorldRules) -> R,
    ) -> Result<R, GuardError> {
        self.ensure_world(world)?;
        let (result, rules) = self.rules.edit(world, f);
        self.store.put_world(world, &rules)?;
        Ok(result)
    }
}

/// Converts interval text to ticks, rejecting anything under one tick.
fn parse_interval(text: &str) -> Result<u64, GuardError> {
    duration::parse_ticks(text).map_err(|err| match err {
        duration::DurationError::NotPositive => GuardError::NonPositiveInterval,
        err => GuardError::duration(text, err),
    })
}

fn add_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

fn remove_all(list: &mut Vec<String>, value: &str) -> bool {
    let before = list.len();
    list.retain(|v| v != value);
    list.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::placed::PlacedKind;
    use crate::store::{MemoryStore, StoreDocument};
    use crate::world::MemoryWorld;
    use bastion_utils::{BlockCell, BlockPos};

    struct Fixture {
        store: Arc<MemoryStore>,
        world: Arc<MemoryWorld>,
        clock: Arc<ManualClock>,
        scheduler: Arc<TaskScheduler>,
        guard: Arc<Guard>,
    }

    fn setup_with(document: StoreDocument) -> Fixture {
        let store = Arc::new(MemoryStore::with_document(document));
        let world = Arc::new(MemoryWorld::with_worlds(["arena"]));
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Arc::new(TaskScheduler::new());
        let guard = Guard::new(
            store.clone(),
            world.clone(),
            clock.clone(),
            scheduler.clone(),
            GuardSettings::default(),
        );
        guard.start().expect("store is readable");
        Fixture {
            store,
            world,
            clock,
            scheduler,
            guard,
        }
    }

    fn setup() -> Fixture {
        setup_with(StoreDocument::default())
    }

    #[test]
    fn test_despawn_commands_persist() {
        let f = setup();
        f.guard.set_despawn_enabled("arena", true).expect("valid");
        assert_eq!(f.guard.set_despawn_lifetime("arena", "1m30s").expect("valid"), 90_000);

        let stored = f.store.document().worlds["arena"].clone();
        assert!(stored.block_despawn.enabled);
        assert_eq!(stored.block_despawn.time, "1m30s");
        assert!(matches!(
            f.guard.set_despawn_lifetime("arena", "soon"),
            Err(GuardError::InvalidDuration { .. })
        ));
        assert!(matches!(
            f.guard.set_despawn_enabled("nether", true),
            Err(GuardError::UnknownWorld(_))
        ));
    }

    #[test]
    fn test_placed_block_despawns_end_to_end() {
        let f = setup();
        f.guard.set_despawn_enabled("arena", true).expect("valid");
        f.guard.set_despawn_lifetime("arena", "10s").expect("valid");

        let actor = Uuid::new_v4();
        let cell = BlockCell::new("arena", BlockPos::new(0, 64, 0));
        f.world.set_block(&cell, "DIRT");
        f.guard
            .events()
            .on_block_place(actor, &cell, "DIRT", PlacedKind::Block)
            .expect("allowed");

        f.clock.set_millis(11_000);
        f.scheduler.advance(20);
        assert!(f.world.block_at(&cell).is_none());
        assert!(!f.guard.placed().contains(&cell));
    }

    #[test]
    fn test_spawn_point_lifecycle() {
        let f = setup();
        let location = Vector3::new(0.5, 64.0, 0.5);
        f.guard
            .add_spawn_point("arena", "gate", "ZOMBIE", location, "5s")
            .expect("valid");
        assert_eq!(f.guard.spawn_point("arena", "gate").map(|p| p.interval_ticks), Some(100));
        assert!(matches!(
            f.guard.add_spawn_point("arena", "gate", "ZOMBIE", location, "5s"),
            Err(GuardError::DuplicateSpawnPoint(_))
        ));
        assert!(matches!(
            f.guard.add_spawn_point("arena", "fast", "ZOMBIE", location, "10ms"),
            Err(GuardError::NonPositiveInterval)
        ));

        f.scheduler.advance(100);
        assert_eq!(f.world.spawned().len(), 1);

        f.guard
            .set_spawn_point_interval("arena", "gate", "1s")
            .expect("valid");
        assert_eq!(f.store.document().spawn_points["arena/gate"].interval, 20);
        f.scheduler.advance(20);
        assert_eq!(f.world.spawned().len(), 2);

        assert!(f.guard.force_spawn("arena", "gate").expect("known point"));
        assert_eq!(f.world.spawned().len(), 3);

        f.guard.remove_spawn_point("arena", "gate").expect("known point");
        assert!(f.store.document().spawn_points.is_empty());
        f.scheduler.advance(100);
        assert_eq!(f.world.spawned().len(), 3);
        assert!(matches!(
            f.guard.force_spawn("arena", "gate"),
            Err(GuardError::UnknownSpawnPoint(_))
        ));
    }

    #[test]
    fn test_spawn_point_name_must_round_trip() {
        let f = setup();
        let location = Vector3::new(0.0, 64.0, 0.0);
        assert!(matches!(
            f.guard.add_spawn_point("arena", "a/b", "ZOMBIE", location, "1t"),
            Err(GuardError::InvalidSpawnPointName(_))
        ));
        assert!(matches!(
            f.guard.add_spawn_point("arena", "", "ZOMBIE", location, "1t"),
            Err(GuardError::InvalidSpawnPointName(_))
        ));
        assert!(f.store.document().spawn_points.is_empty());
        f.scheduler.advance(10);
        assert!(f.world.spawned().is_empty());

        f.guard
            .add_spawn_point("arena", "gate-2", "ZOMBIE", location, "1t")
            .expect("valid");
        f.guard.reload().expect("store is readable");
        assert!(f.guard.spawn_point("arena", "gate-2").is_some());
        f.guard
            .remove_spawn_point("arena", "gate-2")
            .expect("known point");
    }

    #[test]
    fn test_start_loads_store() {
        let document: StoreDocument = serde_json::from_str(
            r#"{
                "worlds": {"arena": {"waterFlow": false}},
                "placedBlocks": {"arena:0:64:0": 10},
                "spawnPoints": {"arena/gate": {"entity": "COW", "x": 0, "y": 64, "z": 0, "interval": 10}}
            }"#,
        )
        .expect("valid document");
        let f = setup_with(document);

        assert!(!f.guard.world_rules("arena").water_flow);
        assert_eq!(f.guard.placed().len(), 1);
        assert_eq!(f.guard.spawn_points("arena").len(), 1);
        f.scheduler.advance(10);
        assert_eq!(f.world.entity_count("arena", "COW"), 1);
    }

    #[test]
    fn test_reload_keeps_placed_and_bypasses() {
        let f = setup();
        let actor = Uuid::new_v4();
        f.guard.set_bypass(actor, BypassRule::Despawn, true);
        let cell = BlockCell::new("arena", BlockPos::new(1, 2, 3));
        f.guard
            .events()
            .on_block_place(actor, &cell, "STONE", PlacedKind::Block)
            .expect("allowed");

        f.guard.reload().expect("store is readable");
        assert!(f.guard.bypass(actor, BypassRule::Despawn));
        assert!(f.guard.placed().contains(&cell));
        assert!(f.guard.despawn().is_running());
    }

    #[test]
    fn test_rule_edits() {
        let f = setup();
        assert!(f.guard.add_disallowed_block("arena", "TNT").expect("valid"));
        assert!(!f.guard.add_disallowed_block("arena", "TNT").expect("valid"));
        assert!(f.guard.add_disallowed_entity("arena", "CREEPER").expect("valid"));
        f.guard.add_entity_limit("arena", "COW", 10).expect("valid");
        f.guard.set_spawn_time("arena", "BAT", "22:00", "06:00").expect("valid");
        f.guard.set_water_flow("arena", false).expect("valid");
        f.guard.set_redstone_blocked("arena", true).expect("valid");
        f.guard.set_destruction_allowed("arena", false).expect("valid");
        assert!(matches!(
            f.guard.set_spawn_time("arena", "BAT", "25:00", "06:00"),
            Err(GuardError::InvalidTimeOfDay(_))
        ));

        let rules = f.store.document().worlds["arena"].clone();
        assert_eq!(rules, f.guard.world_rules("arena"));
        assert_eq!(rules.entity_limits.get("COW"), Some(&10));
        assert!(!rules.water_flow && rules.block_redstone_mechanism && !rules.block_destruction);

        assert!(f.guard.remove_disallowed_block("arena", "TNT").expect("valid"));
        assert!(f.guard.remove_disallowed_entity("arena", "CREEPER").expect("valid"));
        assert!(f.guard.remove_entity_limit("arena", "COW").expect("valid"));
        assert!(f.guard.remove_spawn_time("arena", "BAT").expect("valid"));
        assert!(!f.guard.remove_spawn_time("arena", "BAT").expect("valid"));
    }

    #[test]
    fn test_bypass_toggle() {
        let f = setup();
        let actor = Uuid::new_v4();
        assert!(f.guard.toggle_bypass(actor, BypassRule::WaterFlow));
        assert!(f.guard.bypass(actor, BypassRule::WaterFlow));
        assert!(!f.guard.toggle_bypass(actor, BypassRule::WaterFlow));
        assert!(!f.guard.bypass(actor, BypassRule::WaterFlow));
    }

    #[test]
    fn test_shutdown_saves_and_stops() {
        let f = setup();
        let actor = Uuid::new_v4();
        f.guard.set_bypass(actor, BypassRule::LavaFlow, true);
        f.guard
            .add_spawn_point("arena", "gate", "ZOMBIE", Vector3::new(0.0, 0.0, 0.0), "1t")
            .expect("valid");
        let cell = BlockCell::new("arena", BlockPos::new(0, 0, 0));
        f.guard
            .events()
            .on_block_place(actor, &cell, "STONE", PlacedKind::Block)
            .expect("allowed");

        f.guard.shutdown().expect("store is writable");
        assert_eq!(f.scheduler.pending(), 0);
        assert!(!f.guard.bypass(actor, BypassRule::LavaFlow));
        assert!(f.store.document().placed_blocks.contains_key("arena:0:0:0"));
    }

    #[test]
    fn test_unload_world_stops_timers() {
        let f = setup();
        f.guard
            .add_spawn_point("arena", "gate", "ZOMBIE", Vector3::new(0.0, 0.0, 0.0), "1t")
            .expect("valid");
        f.guard.unload_world("arena");
        f.scheduler.advance(10);
        assert!(f.world.spawned().is_empty());
        assert!(f.guard.spawn_points("arena").is_empty());

        // Still persisted, so a reload brings it back
        f.guard.reload().expect("store is readable");
        assert!(f.guard.spawn_point("arena", "gate").is_some());
        f.scheduler.advance(1);
        assert_eq!(f.world.spawned().len(), 1);
    }

    #[test]
    fn test_apply_settings_restarts_despawn() {
        let f = setup();
        f.guard.apply_settings(GuardSettings {
            despawn: DespawnSettings {
                check_interval_ticks: 1,
                removal_delay_ticks: 0,
            },
        });
        // Only the despawn sweep is registered
        assert_eq!(f.scheduler.pending(), 1);
        assert!(f.guard.despawn().is_running());
    }

    #[test]
    fn test_timers_never_save() {
        let f = setup();
        let cell = BlockCell::new("arena", BlockPos::new(0, 0, 0));
        f.guard
            .events()
            .on_block_place(Uuid::new_v4(), &cell, "STONE", PlacedKind::Block)
            .expect("allowed");

        f.scheduler.advance(12_000);
        assert!(f.store.document().placed_blocks.is_empty());
        f.guard.save().expect("store is writable");
        assert_eq!(f.store.document().placed_blocks.len(), 1);
    }
}
