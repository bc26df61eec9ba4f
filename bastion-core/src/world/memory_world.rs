//! In-memory world.
//!
//! Keeps block kinds and entity populations in plain maps. Useful for:
//! - Tests
//! - Running the engine headless, without a game server attached

use bastion_utils::{BlockCell, Vector3};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use super::WorldAccess;

/// An entity spawned through [`WorldAccess::spawn_entity`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedEntity {
    /// The world it was spawned in.
    pub world: String,
    /// Its kind.
    pub entity: String,
    /// Where it was spawned.
    pub location: Vector3<f64>,
}

/// A world that lives entirely in memory.
#[derive(Default)]
pub struct MemoryWorld {
    worlds: RwLock<FxHashSet<String>>,
    blocks: Mutex<FxHashMap<BlockCell, String>>,
    populations: Mutex<FxHashMap<(String, String), usize>>,
    /// Cells cleared through [`WorldAccess::clear_block`], in order.
    cleared: Mutex<Vec<BlockCell>>,
    spawned: Mutex<Vec<SpawnedEntity>>,
}

impl MemoryWorld {
    /// Creates a host with no worlds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host with the given worlds loaded.
    pub fn with_worlds<I, S>(worlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let host = Self::new();
        for world in worlds {
            host.add_world(world);
        }
        host
    }

    /// Loads a world.
    pub fn add_world(&self, world: impl Into<String>) {
        self.worlds.write().insert(world.into());
    }

    /// Unloads a world. Its blocks and entities are kept for when it returns.
    pub fn remove_world(&self, world: &str) {
        self.worlds.write().remove(world);
    }

    /// Places a block of the given kind.
    pub fn set_block(&self, cell: &BlockCell, kind: impl Into<String>) {
        self.blocks.lock().insert(cell.clone(), kind.into());
    }

    /// The kind of block at `cell`, if any.
    #[must_use]
    pub fn block_at(&self, cell: &BlockCell) -> Option<String> {
        self.blocks.lock().get(cell).cloned()
    }

    /// Adds entities of a kind without going through a spawn.
    pub fn add_entities(&self, world: &str, entity: &str, count: usize) {
        *self
            .populations
            .lock()
            .entry((world.to_string(), entity.to_string()))
            .or_default() += count;
    }

    /// Every cell cleared so far, in the order it happened.
    #[must_use]
    pub fn cleared(&self) -> Vec<BlockCell> {
        self.cleared.lock().clone()
    }

    /// Every entity spawned so far, in the order it happened.
    #[must_use]
    pub fn spawned(&self) -> Vec<SpawnedEntity> {
        self.spawned.lock().clone()
    }
}

impl WorldAccess for MemoryWorld {
    fn world_exists(&self, world: &str) -> bool {
        self.worlds.read().contains(world)
    }

    fn clear_block(&self, cell: &BlockCell) -> bool {
        if !self.world_exists(&cell.world) {
            return false;
        }
        if self.blocks.lock().remove(cell).is_none() {
            return false;
        }
        self.cleared.lock().push(cell.clone());
        true
    }

    fn entity_count(&self, world: &str, entity: &str) -> usize {
        self.populations
            .lock()
            .get(&(world.to_string(), entity.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn spawn_entity(&self, world: &str, entity: &str, location: Vector3<f64>) -> bool {
        if !self.world_exists(world) {
            return false;
        }
        self.add_entities(world, entity, 1);
        self.spawned.lock().push(SpawnedEntity {
            world: world.to_string(),
            entity: entity.to_string(),
            location,
        });
        true
    }
}
