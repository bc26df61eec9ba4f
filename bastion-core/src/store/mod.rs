//! Persistence of world rules, placed blocks and spawn points.
//!
//! The engine only needs table-level get/put/delete. Two backends exist:
//! [`MemoryStore`] keeps everything in RAM, [`JsonStore`] mirrors the same
//! document into a JSON file after every write.
//!
//! Document shape:
//! ```json
//! {
//!   "worlds": { "arena": { "blockDespawn": { "enabled": true, "time": "10m" } } },
//!   "placedBlocks": { "arena:0:64:0": { "time": 0, "player": "...", "bypassDespawn": false } },
//!   "spawnPoints": { "arena/gate": { "entity": "ZOMBIE", "x": 0.5, "y": 64.0, "z": 0.5, "interval": 200 } }
//! }
//! ```
use std::collections::BTreeMap;

use bastion_utils::Vector3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::placed::{PlacedKind, PlacedObjectRecord};
use crate::rules::WorldRules;
use crate::spawn_point::{SpawnPointDefinition, SpawnPointKey};

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Table-level access to persisted state.
pub trait GuardStore: Send + Sync {
    /// Rules of every world with an entry.
    fn worlds(&self) -> Result<BTreeMap<String, WorldRules>, StoreError>;

    /// Rules of one world.
    fn get_world(&self, world: &str) -> Result<Option<WorldRules>, StoreError>;

    /// Stores one world's rules.
    fn put_world(&self, world: &str, rules: &WorldRules) -> Result<(), StoreError>;

    /// Every placed block row, keyed by its raw cell key.
    fn placed_objects(&self) -> Result<Vec<(String, PlacedObjectRecord)>, StoreError>;

    /// Replaces the whole placed block table.
    fn replace_placed_objects(
        &self,
        entries: &[(String, PlacedObjectRecord)],
    ) -> Result<(), StoreError>;

    /// Every spawn point definition that decodes.
    fn spawn_points(&self) -> Result<Vec<SpawnPointDefinition>, StoreError>;

    /// Stores one spawn point, replacing any with the same key.
    fn put_spawn_point(&self, definition: &SpawnPointDefinition) -> Result<(), StoreError>;

    /// Deletes one spawn point. Returns whether it existed.
    fn delete_spawn_point(&self, key: &SpawnPointKey) -> Result<bool, StoreError>;
}

/// The whole persisted state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreDocument {
    /// Rules per world.
    pub worlds: BTreeMap<String, WorldRules>,
    /// Placed blocks keyed `world:x:y:z`.
    pub placed_blocks: BTreeMap<String, PlacedRow>,
    /// Spawn points keyed `world/name`.
    pub spawn_points: BTreeMap<String, SpawnPointRow>,
}

/// One placed block row.
///
/// Old data files stored only the placement time, as a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlacedRow {
    /// Current format.
    Full {
        /// Epoch millis of the placement.
        time: i64,
        /// Who placed it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<String>,
        /// Snapshot of the owner's despawn bypass.
        #[serde(default, rename = "bypassDespawn")]
        bypass_despawn: bool,
        /// Block or fluid.
        #[serde(default)]
        kind: PlacedKind,
    },
    /// Placement time only.
    Legacy(i64),
}

impl PlacedRow {
    /// Converts the row into a registry record.
    ///
    /// An owner that is not a valid UUID is dropped, leaving the record
    /// unattributed.
    #[must_use]
    pub fn into_record(self) -> PlacedObjectRecord {
        match self {
            Self::Full {
                time,
                player,
                bypass_despawn,
                kind,
            } => PlacedObjectRecord {
                placed_at: time,
                owner: player.and_then(|p| p.parse::<Uuid>().ok()),
                bypass_despawn,
                kind,
            },
            Self::Legacy(time) => PlacedObjectRecord {
                placed_at: time,
                owner: None,
                bypass_despawn: false,
                kind: PlacedKind::Block,
            },
        }
    }
}

impl From<&PlacedObjectRecord> for PlacedRow {
    fn from(record: &PlacedObjectRecord) -> Self {
        Self::Full {
            time: record.placed_at,
            player: record.owner.map(|owner| owner.to_string()),
            bypass_despawn: record.bypass_despawn,
            kind: record.kind,
        }
    }
}

/// One spawn point row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPointRow {
    /// Entity kind.
    pub entity: String,
    /// Spawn x.
    pub x: f64,
    /// Spawn y.
    pub y: f64,
    /// Spawn z.
    pub z: f64,
    /// Ticks between attempts.
    pub interval: u64,
}

impl From<&SpawnPointDefinition> for SpawnPointRow {
    fn from(definition: &SpawnPointDefinition) -> Self {
        Self {
            entity: definition.entity.clone(),
            x: definition.location.x,
            y: definition.location.y,
            z: definition.location.z,
            interval: definition.interval_ticks,
        }
    }
}

impl StoreDocument {
    pub(crate) fn placed_objects(&self) -> Vec<(String, PlacedObjectRecord)> {
        self.placed_blocks
            .iter()
            .map(|(key, row)| (key.clone(), row.clone().into_record()))
            .collect()
    }

    pub(crate) fn replace_placed_objects(&mut self, entries: &[(String, PlacedObjectRecord)]) {
        self.placed_blocks = entries
            .iter()
            .map(|(key, record)| (key.clone(), PlacedRow::from(record)))
            .collect();
    }

    /// Decodes the spawn point table, skipping rows that cannot be used.
    pub(crate) fn spawn_points(&self) -> Vec<SpawnPointDefinition> {
        let mut definitions = Vec::with_capacity(self.spawn_points.len());
        for (raw_key, row) in &self.spawn_points {
            let key = match raw_key.parse::<SpawnPointKey>() {
                Ok(key) => key,
                Err(err) => {
                    log::warn!("Skipping spawn point: {err}");
                    continue;
                }
            };
            if row.interval == 0 {
                log::warn!("Skipping spawn point {key}: interval must be positive");
                continue;
            }
            definitions.push(SpawnPointDefinition {
                key,
                entity: row.entity.clone(),
                location: Vector3::new(row.x, row.y, row.z),
                interval_ticks: row.interval,
            });
        }
        definitions
    }

    pub(crate) fn put_spawn_point(&mut self, definition: &SpawnPointDefinition) {
        self.spawn_points.insert(
            definition.key.to_string(),
            SpawnPointRow::from(definition),
        );
    }

    pub(crate) fn delete_spawn_point(&mut self, key: &SpawnPointKey) -> bool {
        self.spawn_points.remove(&key.to_string()).is_some()
    }
}
