//! JSON file store.
//!
//! The file is read once at open (JSON5 is accepted, so hand-edited files with
//! comments or trailing commas still load) and rewritten in full after every
//! change. Writes go to a sibling temp file first and are renamed into place.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{GuardStore, StoreDocument};
use crate::error::StoreError;
use crate::placed::PlacedObjectRecord;
use crate::rules::WorldRules;
use crate::spawn_point::{SpawnPointDefinition, SpawnPointKey};

/// A store backed by one JSON document on disk.
pub struct JsonStore {
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl JsonStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json5::from_str(&content)
                .map_err(|err| StoreError::Parse(format!("{}: {err}", path.display())))?
        } else {
            log::info!("No data file at {}, starting empty", path.display());
            StoreDocument::default()
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// The file this store writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` on the document and writes the result to disk.
    fn write<R>(&self, f: impl FnOnce(&mut StoreDocument) -> R) -> Result<R, StoreError> {
        let mut document = self.document.lock();
        let result = f(&mut document);
        let encoded = serde_json::to_string_pretty(&*document)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, encoded)?;
        fs::rename(&temp, &self.path)?;
        Ok(result)
    }
}

impl GuardStore for JsonStore {
    fn worlds(&self) -> Result<BTreeMap<String, WorldRules>, StoreError> {
        Ok(self.document.lock().worlds.clone())
    }

    fn get_world(&self, world: &str) -> Result<Option<WorldRules>, StoreError> {
        Ok(self.document.lock().worlds.get(world).cloned())
    }

    fn put_world(&self, world: &str, rules: &WorldRules) -> Result<(), StoreError> {
        self.write(|document| {
            document.worlds.insert(world.to_string(), rules.clone());
        })
    }

    fn placed_objects(&self) -> Result<Vec<(String, PlacedObjectRecord)>, StoreError> {
        Ok(self.document.lock().placed_objects())
    }

    fn replace_placed_objects(
        &self,
        entries: &[(String, PlacedObjectRecord)],
    ) -> Result<(), StoreError> {
        self.write(|document| document.replace_placed_objects(entries))
    }

    fn spawn_points(&self) -> Result<Vec<SpawnPointDefinition>, StoreError> {
        Ok(self.document.lock().spawn_points())
    }

    fn put_spawn_point(&self, definition: &SpawnPointDefinition) -> Result<(), StoreError> {
        self.write(|document| document.put_spawn_point(definition))
    }

    fn delete_spawn_point(&self, key: &SpawnPointKey) -> Result<bool, StoreError> {
        self.write(|document| document.delete_spawn_point(key))
    }
}
