//! Registry of blocks and fluids placed by actors.
//!
//! Entries are keyed by the encoded cell (`world:x:y:z`). Keys loaded from
//! persisted state are kept as-is, so a malformed key survives until the
//! despawn sweep notices it and drops it.
use std::sync::Arc;

use bastion_utils::BlockCell;
use scc::HashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;

/// What kind of object was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacedKind {
    /// A solid block.
    #[default]
    Block,
    /// A water or lava source, or a cell it spread into.
    Fluid,
}

/// A tracked placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedObjectRecord {
    /// When the object was placed, in epoch millis.
    pub placed_at: i64,
    /// Who placed it. `None` for unattributed legacy entries.
    pub owner: Option<Uuid>,
    /// The owner's despawn bypass at placement time.
    pub bypass_despawn: bool,
    /// Block or fluid.
    pub kind: PlacedKind,
}

/// Thread-safe registry of placed objects.
pub struct PlacedObjectRegistry {
    entries: HashMap<String, PlacedObjectRecord>,
    clock: Arc<dyn Clock>,
}

impl PlacedObjectRegistry {
    /// Creates an empty registry stamping entries with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Records a placement at `cell`, replacing whatever was recorded there.
    pub fn record(
        &self,
        cell: &BlockCell,
        owner: Option<Uuid>,
        bypass_despawn: bool,
        kind: PlacedKind,
    ) -> PlacedObjectRecord {
        let record = PlacedObjectRecord {
            placed_at: self.clock.now_millis(),
            owner,
            bypass_despawn,
            kind,
        };
        let _ = self.entries.upsert_sync(cell.key(), record);
        record
    }

    /// Inserts a record under a raw key, as read from persisted state.
    pub fn insert_raw(&self, key: String, record: PlacedObjectRecord) {
        let _ = self.entries.upsert_sync(key, record);
    }

    /// Stamps `destination` with the owner and despawn bypass of `source`.
    ///
    /// Returns the new record, or `None` if `source` is not tracked.
    pub fn spread(&self, source: &BlockCell, destination: &BlockCell) -> Option<PlacedObjectRecord> {
        let origin = self.lookup(source)?;
        Some(self.record(
            destination,
            origin.owner,
            origin.bypass_despawn,
            PlacedKind::Fluid,
        ))
    }

    /// Removes the record for `cell`, if any.
    pub fn forget(&self, cell: &BlockCell) -> Option<PlacedObjectRecord> {
        self.forget_key(&cell.key())
    }

    /// Removes the record stored under a raw key, if any.
    pub fn forget_key(&self, key: &str) -> Option<PlacedObjectRecord> {
        self.entries.remove_sync(key).map(|(_, record)| record)
    }

    /// Returns the record for `cell`.
    #[must_use]
    pub fn lookup(&self, cell: &BlockCell) -> Option<PlacedObjectRecord> {
        self.entries.read_sync(&cell.key(), |_, record| *record)
    }

    /// Returns whether `cell` is tracked.
    #[must_use]
    pub fn contains(&self, cell: &BlockCell) -> bool {
        self.lookup(cell).is_some()
    }

    /// Copies every entry out, so callers can iterate while the live map
    /// keeps changing.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, PlacedObjectRecord)> {
        let mut entries = Vec::with_capacity(self.entries.len());
        self.entries.iter_sync(|key, record| {
            entries.push((key.clone(), *record));
            true
        });
        entries
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear_sync();
    }

    /// Number of tracked objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
