//! The game world as seen by the rule engine.
//!
//! The host server implements [`WorldAccess`]; the engine only asks it about
//! world existence and entity populations, and delegates the actual block
//! removal and entity spawning to it.
use bastion_utils::{BlockCell, Vector3};

mod memory_world;

pub use memory_world::{MemoryWorld, SpawnedEntity};

/// Operations the engine performs on the host's worlds.
pub trait WorldAccess: Send + Sync {
    /// Returns whether a world with this name is loaded.
    fn world_exists(&self, world: &str) -> bool;

    /// Replaces the block at `cell` with air.
    ///
    /// Returns false if the cell was already empty or its world is gone.
    fn clear_block(&self, cell: &BlockCell) -> bool;

    /// Number of live entities of the given kind in the world.
    fn entity_count(&self, world: &str, entity: &str) -> usize;

    /// Spawns one entity. Returns false if the host refused.
    fn spawn_entity(&self, world: &str, entity: &str, location: Vector3<f64>) -> bool;
}
