//! Per-actor rule bypasses.
//!
//! Bypasses live for the lifetime of the process only. An actor's flags are
//! dropped when it disconnects and every flag is dropped on shutdown.
use std::fmt::{self, Display};
use std::str::FromStr;

use bitflags::bitflags;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// A rule an actor can bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BypassRule {
    /// Placing blocks on the world's disallow-list.
    DisallowedPlacement,
    /// Timed removal of the blocks the actor places.
    Despawn,
    /// The world's protection against breaking blocks nobody placed.
    DestructionProtection,
    /// Disabled water flow, for water the actor placed.
    WaterFlow,
    /// Disabled lava flow, for lava the actor placed.
    LavaFlow,
}

impl BypassRule {
    /// Every rule, in display order.
    pub const ALL: [Self; 5] = [
        Self::DisallowedPlacement,
        Self::Despawn,
        Self::DestructionProtection,
        Self::WaterFlow,
        Self::LavaFlow,
    ];

    /// The rule's name as used by the command surface.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DisallowedPlacement => "disallowedblocks",
            Self::Despawn => "blockdespawn",
            Self::DestructionProtection => "blockdestruction",
            Self::WaterFlow => "waterflow",
            Self::LavaFlow => "lavaflow",
        }
    }

    const fn flag(self) -> BypassFlags {
        match self {
            Self::DisallowedPlacement => BypassFlags::DISALLOWED_PLACEMENT,
            Self::Despawn => BypassFlags::DESPAWN,
            Self::DestructionProtection => BypassFlags::DESTRUCTION_PROTECTION,
            Self::WaterFlow => BypassFlags::WATER_FLOW,
            Self::LavaFlow => BypassFlags::LAVA_FLOW,
        }
    }
}

impl Display for BypassRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BypassRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown bypass rule: {s}"))
    }
}

bitflags! {
    /// The set of rules one actor bypasses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BypassFlags: u8 {
        /// See [`BypassRule::DisallowedPlacement`].
        const DISALLOWED_PLACEMENT = 1 << 0;
        /// See [`BypassRule::Despawn`].
        const DESPAWN = 1 << 1;
        /// See [`BypassRule::DestructionProtection`].
        const DESTRUCTION_PROTECTION = 1 << 2;
        /// See [`BypassRule::WaterFlow`].
        const WATER_FLOW = 1 << 3;
        /// See [`BypassRule::LavaFlow`].
        const LAVA_FLOW = 1 << 4;
    }
}

/// Sparse map of actor bypasses. Actors without any bypass have no entry.
#[derive(Default)]
pub struct BypassRegistry {
    actors: RwLock<FxHashMap<Uuid, BypassFlags>>,
}

impl BypassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the actor bypasses the rule.
    #[must_use]
    pub fn get(&self, actor: Uuid, rule: BypassRule) -> bool {
        self.actors
            .read()
            .get(&actor)
            .is_some_and(|flags| flags.contains(rule.flag()))
    }

    /// Returns every rule the actor bypasses.
    #[must_use]
    pub fn flags(&self, actor: Uuid) -> BypassFlags {
        self.actors.read().get(&actor).copied().unwrap_or_default()
    }

    /// Sets or clears a bypass.
    pub fn set(&self, actor: Uuid, rule: BypassRule, value: bool) {
        let mut actors = self.actors.write();
        Self::apply(&mut actors, actor, rule, value);
    }

    /// Flips a bypass and returns its new value.
    pub fn toggle(&self, actor: Uuid, rule: BypassRule) -> bool {
        let mut actors = self.actors.write();
        let value = !actors
            .get(&actor)
            .is_some_and(|flags| flags.contains(rule.flag()));
        Self::apply(&mut actors, actor, rule, value);
        value
    }

    fn apply(actors: &mut FxHashMap<Uuid, BypassFlags>, actor: Uuid, rule: BypassRule, value: bool) {
        if value {
            actors.entry(actor).or_default().insert(rule.flag());
        } else if let Some(flags) = actors.get_mut(&actor) {
            flags.remove(rule.flag());
            if flags.is_empty() {
                actors.remove(&actor);
            }
        }
    }

    /// Drops every bypass of one actor.
    pub fn clear(&self, actor: Uuid) {
        self.actors.write().remove(&actor);
    }

    /// Drops every bypass of every actor.
    pub fn clear_all(&self) {
        let mut actors = self.actors.write();
        let count = actors.len();
        actors.clear();
        log::info!("Cleared bypasses of {count} actor(s)");
    }

    /// Number of actors with at least one bypass.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.read().len()
    }

    /// Returns true if no actor has a bypass.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.read().is_empty()
    }
}
