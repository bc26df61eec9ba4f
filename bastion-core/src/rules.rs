//! Per-world rule settings.
use std::collections::BTreeMap;

use bastion_utils::{duration, time_of_day};
use chrono::NaiveTime;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Lifetime used for worlds that never configured one.
pub const DEFAULT_DESPAWN_TIME: &str = "1d0h0m0s";

/// Timed removal of placed blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DespawnRule {
    /// Whether placed blocks despawn in this world.
    pub enabled: bool,
    /// How long a placed block lives, as duration text.
    pub time: String,
}

impl Default for DespawnRule {
    fn default() -> Self {
        Self {
            enabled: false,
            time: DEFAULT_DESPAWN_TIME.to_string(),
        }
    }
}

impl DespawnRule {
    /// The lifetime in millis, or `None` when disabled or unparsable.
    #[must_use]
    pub fn lifetime_millis(&self) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        duration::parse(&self.time).ok()
    }
}

/// Clock times an entity may spawn between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnWindow {
    /// Start, `HH:mm`.
    pub from: String,
    /// End, `HH:mm`. Earlier than `from` means the window wraps midnight.
    pub to: String,
}

impl SpawnWindow {
    /// Returns whether `now` is inside the window. Unparsable bounds allow.
    #[must_use]
    pub fn allows(&self, now: NaiveTime) -> bool {
        time_of_day::is_in_window(now, &self.from, &self.to)
    }
}

/// Every rule configured for one world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldRules {
    /// Timed removal of placed blocks.
    pub block_despawn: DespawnRule,
    /// Whether water spreads.
    pub water_flow: bool,
    /// Whether lava spreads.
    pub lava_flow: bool,
    /// Whether redstone signal changes are frozen.
    pub block_redstone_mechanism: bool,
    /// Whether blocks nobody placed may be broken.
    pub block_destruction: bool,
    /// Maximum population per entity kind.
    pub entity_limits: BTreeMap<String, u32>,
    /// Allowed spawn time per entity kind.
    pub entity_spawn_times: BTreeMap<String, SpawnWindow>,
    /// Entity kinds that may not spawn.
    pub disallowed_entities: Vec<String>,
    /// Block kinds that may not be placed.
    pub disallowed_blocks: Vec<String>,
}

impl Default for WorldRules {
    fn default() -> Self {
        Self {
            block_despawn: DespawnRule::default(),
            water_flow: true,
            lava_flow: true,
            block_redstone_mechanism: false,
            block_destruction: true,
            entity_limits: BTreeMap::new(),
            entity_spawn_times: BTreeMap::new(),
            disallowed_entities: Vec::new(),
            disallowed_blocks: Vec::new(),
        }
    }
}

impl WorldRules {
    /// Returns whether the entity kind is on the disallow-list.
    #[must_use]
    pub fn is_entity_disallowed(&self, entity: &str) -> bool {
        self.disallowed_entities.iter().any(|e| e == entity)
    }

    /// Returns whether the block kind is on the disallow-list.
    #[must_use]
    pub fn is_block_disallowed(&self, block: &str) -> bool {
        self.disallowed_blocks.iter().any(|b| b == block)
    }
}

/// In-memory cache of every world's rules.
///
/// Worlds without an entry behave as [`WorldRules::default`].
#[derive(Default)]
pub struct RuleBook {
    worlds: RwLock<FxHashMap<String, WorldRules>>,
}

impl RuleBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of one world's rules.
    #[must_use]
    pub fn get(&self, world: &str) -> WorldRules {
        self.worlds.read().get(world).cloned().unwrap_or_default()
    }

    /// Reads one world's rules without copying them.
    pub fn read<R>(&self, world: &str, f: impl FnOnce(&WorldRules) -> R) -> R {
        let worlds = self.worlds.read();
        match worlds.get(world) {
            Some(rules) => f(rules),
            None => f(&WorldRules::default()),
        }
    }

    /// Edits one world's rules, creating them from defaults first if needed.
    ///
    /// Returns the rules after the edit.
    pub fn update(&self, world: &str, f: impl FnOnce(&mut WorldRules)) -> WorldRules {
        self.edit(world, f).1
    }

    /// Like [`RuleBook::update`], also handing back what `f` returned.
    pub fn edit<R>(&self, world: &str, f: impl FnOnce(&mut WorldRules) -> R) -> (R, WorldRules) {
        let mut worlds = self.worlds.write();
        let rules = worlds.entry(world.to_string()).or_default();
        let result = f(rules);
        (result, rules.clone())
    }

    /// Replaces the whole book.
    pub fn replace(&self, worlds: FxHashMap<String, WorldRules>) {
        *self.worlds.write() = worlds;
    }

    /// Names of every world with explicit rules.
    #[must_use]
    pub fn worlds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.worlds.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_unknown_world() {
        let book = RuleBook::new();
        let rules = book.get("nowhere");
        assert!(!rules.block_despawn.enabled);
        assert_eq!(rules.block_despawn.time, DEFAULT_DESPAWN_TIME);
        assert!(rules.water_flow && rules.lava_flow && rules.block_destruction);
        assert!(!rules.block_redstone_mechanism);
        assert!(book.worlds().is_empty());
    }

    #[test]
    fn test_despawn_lifetime() {
        let mut rule = DespawnRule {
            enabled: true,
            time: "10s".to_string(),
        };
        assert_eq!(rule.lifetime_millis(), Some(10_000));

        rule.time = "soon".to_string();
        assert_eq!(rule.lifetime_millis(), None);

        rule.time = "10s".to_string();
        rule.enabled = false;
        assert_eq!(rule.lifetime_millis(), None);
    }

    #[test]
    fn test_update_creates_world() {
        let book = RuleBook::new();
        let rules = book.update("arena", |rules| {
            rules.disallowed_blocks.push("TNT".to_string());
        });
        assert!(rules.is_block_disallowed("TNT"));
        assert!(book.read("arena", |rules| rules.is_block_disallowed("TNT")));
        assert_eq!(book.worlds(), vec!["arena".to_string()]);
    }

    #[test]
    fn test_deserialize_partial_world() {
        let rules: WorldRules = serde_json::from_str(
            r#"{"blockDespawn": {"enabled": true}, "entityLimits": {"ZOMBIE": 5}}"#,
        )
        .expect("valid rules");
        assert!(rules.block_despawn.enabled);
        assert_eq!(rules.block_despawn.time, DEFAULT_DESPAWN_TIME);
        assert_eq!(rules.entity_limits.get("ZOMBIE"), Some(&5));
        assert!(rules.water_flow);
    }
}
