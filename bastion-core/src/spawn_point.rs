//! Spawn points: named locations that periodically spawn an entity.
//!
//! Every registered definition owns exactly one repeating task on the host
//! tick clock. Adding, editing, removing and reloading all swap timers through
//! the same replacement routine under one lock, so no task is ever orphaned.
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::{Arc, Weak};

use bastion_utils::Vector3;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use scc::HashMap;

use crate::admission::SpawnAdmission;
use crate::ticks::{TaskControl, TaskId, TaskScheduler};
use crate::world::WorldAccess;

/// Identifies a spawn point: its world plus a name unique within that world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnPointKey {
    /// The world the point lives in.
    pub world: String,
    /// The point's name.
    pub name: String,
}

impl SpawnPointKey {
    /// Creates a new key.
    pub fn new(world: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            world: world.into(),
            name: name.into(),
        }
    }

    /// Whether `name` survives the `world/name` encoding unchanged.
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        !name.trim().is_empty() && !name.contains('/')
    }
}

impl Display for SpawnPointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.world, self.name)
    }
}

impl FromStr for SpawnPointKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('/') {
            Some((world, name)) if !world.is_empty() && !name.is_empty() => {
                Ok(Self::new(world, name))
            }
            _ => Err(format!("Invalid spawn point key: {s}")),
        }
    }
}

/// A spawn point definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPointDefinition {
    /// World and name.
    pub key: SpawnPointKey,
    /// Entity kind to spawn.
    pub entity: String,
    /// Where to spawn it.
    pub location: Vector3<f64>,
    /// Ticks between attempts. Always positive.
    pub interval_ticks: u64,
}

/// Owns one repeating timer per spawn point.
pub struct SpawnPointScheduler {
    this: Weak<Self>,
    definitions: HashMap<SpawnPointKey, SpawnPointDefinition>,
    /// Live timer per key. Locked for the whole of every timer replacement.
    timers: Mutex<FxHashMap<SpawnPointKey, TaskId>>,
    scheduler: Arc<TaskScheduler>,
    admission: Arc<SpawnAdmission>,
    world: Arc<dyn WorldAccess>,
}

impl SpawnPointScheduler {
    /// Creates a scheduler with no spawn points.
    #[must_use]
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        admission: Arc<SpawnAdmission>,
        world: Arc<dyn WorldAccess>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            definitions: HashMap::new(),
            timers: Mutex::new(FxHashMap::default()),
            scheduler,
            admission,
            world,
        })
    }

    /// Stops every timer and starts one per given definition.
    pub fn reload(&self, definitions: Vec<SpawnPointDefinition>) {
        let mut timers = self.timers.lock();
        for (_, id) in timers.drain() {
            self.scheduler.cancel(id);
        }
        self.definitions.clear_sync();

        let count = definitions.len();
        for definition in definitions {
            let key = definition.key.clone();
            let interval = definition.interval_ticks;
            let _ = self.definitions.upsert_sync(key.clone(), definition);
            self.replace_timer_locked(&mut timers, &key, Some(interval));
        }
        log::info!("Loaded {count} spawn point(s)");
    }

    /// Registers a definition, or replaces the one with the same key.
    ///
    /// The next firing is one full interval from now.
    pub fn register(&self, definition: SpawnPointDefinition) {
        let mut timers = self.timers.lock();
        let key = definition.key.clone();
        let interval = definition.interval_ticks;
        let _ = self.definitions.upsert_sync(key.clone(), definition);
        self.replace_timer_locked(&mut timers, &key, Some(interval));
    }

    /// Changes the interval of a registered point, restarting its timer.
    ///
    /// Returns the updated definition, or `None` if the point is unknown.
    pub fn update_interval(
        &self,
        key: &SpawnPointKey,
        interval_ticks: u64,
    ) -> Option<SpawnPointDefinition> {
        let mut timers = self.timers.lock();
        let mut definition = self.get(key)?;
        definition.interval_ticks = interval_ticks;
        let _ = self.definitions.upsert_sync(key.clone(), definition.clone());
        self.replace_timer_locked(&mut timers, key, Some(interval_ticks));
        Some(definition)
    }

    /// Removes a point and stops its timer before returning.
    pub fn unregister(&self, key: &SpawnPointKey) -> Option<SpawnPointDefinition> {
        let mut timers = self.timers.lock();
        // Definition first, so a firing already in flight sees it gone.
        let removed = self
            .definitions
            .remove_sync(key)
            .map(|(_, definition)| definition);
        self.replace_timer_locked(&mut timers, key, None);
        removed
    }

    /// Stops every timer and forgets every definition.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock();
        for (_, id) in timers.drain() {
            self.scheduler.cancel(id);
        }
        self.definitions.clear_sync();
    }

    /// The current definition for `key`.
    #[must_use]
    pub fn get(&self, key: &SpawnPointKey) -> Option<SpawnPointDefinition> {
        self.definitions.read_sync(key, |_, definition| definition.clone())
    }

    /// Every definition in `world`, sorted by name.
    #[must_use]
    pub fn in_world(&self, world: &str) -> Vec<SpawnPointDefinition> {
        let mut points = Vec::new();
        self.definitions.iter_sync(|key, definition| {
            if key.world == world {
                points.push(definition.clone());
            }
            true
        });
        points.sort_by(|a, b| a.key.cmp(&b.key));
        points
    }

    /// Returns whether `key` has a live timer.
    #[must_use]
    pub fn has_timer(&self, key: &SpawnPointKey) -> bool {
        self.timers
            .lock()
            .get(key)
            .is_some_and(|id| self.scheduler.is_scheduled(*id))
    }

    /// Number of live timers.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.lock().len()
    }

    /// Spawns the point's entity right away, skipping admission.
    ///
    /// Returns false if the point or its world does not exist.
    pub fn force_spawn(&self, key: &SpawnPointKey) -> bool {
        let Some(definition) = self.get(key) else {
            return false;
        };
        if !self.world.world_exists(&key.world) {
            return false;
        }
        self.world
            .spawn_entity(&key.world, &definition.entity, definition.location)
    }

    /// Stops the timer for `key` and, given an interval, starts a new one.
    ///
    /// Every timer change goes through here with `timers` held.
    fn replace_timer_locked(
        &self,
        timers: &mut FxHashMap<SpawnPointKey, TaskId>,
        key: &SpawnPointKey,
        interval: Option<u64>,
    ) {
        if let Some(old) = timers.remove(key) {
            self.scheduler.cancel(old);
        }

        let Some(interval) = interval else {
            log::debug!("Stopped spawn point timer {key}");
            return;
        };

        let this = self.this.clone();
        let timer_key = key.clone();
        let id = self
            .scheduler
            .schedule_repeating(interval, interval, move |_| match this.upgrade() {
                Some(points) => points.fire(&timer_key),
                None => TaskControl::Cancel,
            });
        timers.insert(key.clone(), id);
        log::debug!("Started spawn point timer {key} every {interval} tick(s) ({id})");
    }

    fn fire(&self, key: &SpawnPointKey) -> TaskControl {
        let Some(definition) = self.get(key) else {
            return TaskControl::Cancel;
        };
        if !self.world.world_exists(&key.world) {
            return TaskControl::Continue;
        }

        match self.admission.check(&key.world, &definition.entity) {
            Ok(()) => {
                if !self
                    .world
                    .spawn_entity(&key.world, &definition.entity, definition.location)
                {
                    log::debug!("World refused spawn of {} at {key}", definition.entity);
                }
            }
            Err(rejection) => {
                log::trace!("Spawn point {key} skipped: {rejection}");
            }
        }
        TaskControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rules::{RuleBook, SpawnWindow};
    use crate::world::MemoryWorld;
    use bastion_utils::time_of_day;

    struct Fixture {
        scheduler: Arc<TaskScheduler>,
        rules: Arc<RuleBook>,
        world: Arc<MemoryWorld>,
        clock: Arc<ManualClock>,
        points: Arc<SpawnPointScheduler>,
    }

    fn setup() -> Fixture {
        let scheduler = Arc::new(TaskScheduler::new());
        let rules = Arc::new(RuleBook::new());
        let world = Arc::new(MemoryWorld::with_worlds(["arena"]));
        let clock = Arc::new(ManualClock::new(0));
        let admission = Arc::new(SpawnAdmission::new(
            rules.clone(),
            world.clone(),
            clock.clone(),
        ));
        let points = SpawnPointScheduler::new(scheduler.clone(), admission, world.clone());
        Fixture {
            scheduler,
            rules,
            world,
            clock,
            points,
        }
    }

    fn point(name: &str, entity: &str, interval_ticks: u64) -> SpawnPointDefinition {
        SpawnPointDefinition {
            key: SpawnPointKey::new("arena", name),
            entity: entity.to_string(),
            location: Vector3::new(0.5, 64.0, 0.5),
            interval_ticks,
        }
    }

    #[test]
    fn test_independent_intervals() {
        let f = setup();
        f.points.register(point("fast", "ZOMBIE", 100));
        f.points.register(point("slow", "SKELETON", 300));

        f.scheduler.advance(300);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 3);
        assert_eq!(f.world.entity_count("arena", "SKELETON"), 1);
    }

    #[test]
    fn test_interval_update_restarts_timer() {
        let f = setup();
        let key = SpawnPointKey::new("arena", "gate");
        f.points.register(point("gate", "ZOMBIE", 10));

        f.scheduler.advance(9);
        f.points.update_interval(&key, 20).expect("registered");
        assert_eq!(f.points.timer_count(), 1);

        // Old timer would have fired on tick 10
        f.scheduler.advance(19);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 0);
        f.scheduler.tick();
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 1);
        assert_eq!(f.points.get(&key).map(|p| p.interval_ticks), Some(20));
    }

    #[test]
    fn test_unregister_stops_due_firing() {
        let f = setup();
        let key = SpawnPointKey::new("arena", "gate");
        f.points.register(point("gate", "ZOMBIE", 5));

        f.scheduler.advance(4);
        assert!(f.points.unregister(&key).is_some());
        assert!(!f.points.has_timer(&key));
        f.scheduler.advance(50);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 0);
        assert_eq!(f.scheduler.pending(), 0);
    }

    #[test]
    fn test_re_register_keeps_single_timer() {
        let f = setup();
        f.points.register(point("gate", "ZOMBIE", 5));
        f.points.register(point("gate", "ZOMBIE", 5));
        f.points.register(point("gate", "ZOMBIE", 5));

        assert_eq!(f.points.timer_count(), 1);
        assert_eq!(f.scheduler.pending(), 1);
        f.scheduler.advance(5);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 1);
    }

    #[test]
    fn test_admission_rejections_are_silent() {
        let f = setup();
        f.rules.update("arena", |rules| {
            rules.entity_limits.insert("ZOMBIE".to_string(), 2);
        });
        f.points.register(point("gate", "ZOMBIE", 1));

        f.scheduler.advance(10);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 2);
        assert!(f.points.has_timer(&SpawnPointKey::new("arena", "gate")));
    }

    #[test]
    fn test_time_window_gates_firing() {
        let f = setup();
        f.rules.update("arena", |rules| {
            rules.entity_spawn_times.insert(
                "ZOMBIE".to_string(),
                SpawnWindow {
                    from: "22:00".to_string(),
                    to: "06:00".to_string(),
                },
            );
        });
        f.points.register(point("gate", "ZOMBIE", 1));

        f.clock
            .set_time_of_day(time_of_day::parse("12:00").expect("valid time"));
        f.scheduler.advance(3);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 0);

        f.clock
            .set_time_of_day(time_of_day::parse("23:30").expect("valid time"));
        f.scheduler.advance(3);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 3);
    }

    #[test]
    fn test_force_spawn_skips_admission() {
        let f = setup();
        f.rules.update("arena", |rules| {
            rules.disallowed_entities.push("ZOMBIE".to_string());
        });
        let key = SpawnPointKey::new("arena", "gate");
        f.points.register(point("gate", "ZOMBIE", 1_000));

        assert!(f.points.force_spawn(&key));
        assert!(!f.points.force_spawn(&SpawnPointKey::new("arena", "missing")));
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 1);
    }

    #[test]
    fn test_reload_replaces_everything() {
        let f = setup();
        f.points.register(point("old", "ZOMBIE", 5));
        f.points
            .reload(vec![point("a", "COW", 5), point("b", "PIG", 10)]);

        assert_eq!(f.points.timer_count(), 2);
        assert_eq!(f.scheduler.pending(), 2);
        assert!(f.points.get(&SpawnPointKey::new("arena", "old")).is_none());

        f.scheduler.advance(10);
        assert_eq!(f.world.entity_count("arena", "ZOMBIE"), 0);
        assert_eq!(f.world.entity_count("arena", "COW"), 2);
        assert_eq!(f.world.entity_count("arena", "PIG"), 1);
    }

    #[test]
    fn test_missing_world_skips_firing() {
        let f = setup();
        let mut lost = point("gate", "ZOMBIE", 1);
        lost.key = SpawnPointKey::new("lost", "gate");
        f.points.register(lost);

        f.scheduler.advance(5);
        assert_eq!(f.world.spawned().len(), 0);
        assert!(f.points.has_timer(&SpawnPointKey::new("lost", "gate")));
    }

    #[test]
    fn test_key_encoding() {
        let key: SpawnPointKey = "arena/gate".parse().expect("valid key");
        assert_eq!(key, SpawnPointKey::new("arena", "gate"));
        assert_eq!(key.to_string(), "arena/gate");
        assert!("arena".parse::<SpawnPointKey>().is_err());
        assert!("arena/".parse::<SpawnPointKey>().is_err());

        assert!(SpawnPointKey::is_valid_name("gate"));
        assert!(!SpawnPointKey::is_valid_name(""));
        assert!(!SpawnPointKey::is_valid_name("  "));
        assert!(!SpawnPointKey::is_valid_name("a/b"));
    }
}
