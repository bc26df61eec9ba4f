//! RAM-only store.
//!
//! Nothing is written anywhere. Useful for:
//! - Tests
//! - Ephemeral worlds that should start clean on every boot

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{GuardStore, StoreDocument};
use crate::error::StoreError;
use crate::placed::PlacedObjectRecord;
use crate::rules::WorldRules;
use crate::spawn_point::{SpawnPointDefinition, SpawnPointKey};

/// A store whose contents live only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with `document`.
    #[must_use]
    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    /// A copy of everything stored.
    #[must_use]
    pub fn document(&self) -> StoreDocument {
        self.document.lock().clone()
    }
}

impl GuardStore for MemoryStore {
    fn worlds(&self) -> Result<BTreeMap<String, WorldRules>, StoreError> {
        Ok(self.document.lock().worlds.clone())
    }

    fn get_world(&self, world: &str) -> Result<Option<WorldRules>, StoreError> {
        Ok(self.document.lock().worlds.get(world).cloned())
    }

    fn put_world(&self, world: &str, rules: &WorldRules) -> Result<(), StoreError> {
        self.document
            .lock()
            .worlds
            .insert(world.to_string(), rules.clone());
        Ok(())
    }

    fn placed_objects(&self) -> Result<Vec<(String, PlacedObjectRecord)>, StoreError> {
        Ok(self.document.lock().placed_objects())
    }

    fn replace_placed_objects(
        &self,
        entries: &[(String, PlacedObjectRecord)],
    ) -> Result<(), StoreError> {
        self.document.lock().replace_placed_objects(entries);
        Ok(())
    }

    fn spawn_points(&self) -> Result<Vec<SpawnPointDefinition>, StoreError> {
        Ok(self.document.lock().spawn_points())
    }

    fn put_spawn_point(&self, definition: &SpawnPointDefinition) -> Result<(), StoreError> {
        self.document.lock().put_spawn_point(definition);
        Ok(())
    }

    fn delete_spawn_point(&self, key: &SpawnPointKey) -> Result<bool, StoreError> {
        Ok(self.document.lock().delete_spawn_point(key))
    }
}
