//! Decisions for game events, taken at the moment they happen.
//!
//! Every handler returns `Ok(())` to let the event through, or the reason it
//! must be cancelled. Handlers that let an event through also keep the placed
//! registry in step with the world.
use std::fmt::{self, Display};
use std::sync::Arc;

use bastion_utils::BlockCell;
use uuid::Uuid;

use crate::admission::{Rejection, SpawnAdmission};
use crate::bypass::{BypassRegistry, BypassRule};
use crate::placed::{PlacedKind, PlacedObjectRegistry};
use crate::rules::RuleBook;

/// A flowing fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fluid {
    /// Water.
    Water,
    /// Lava.
    Lava,
}

impl Fluid {
    /// The bypass rule that lets this fluid flow.
    #[must_use]
    pub const fn bypass_rule(self) -> BypassRule {
        match self {
            Self::Water => BypassRule::WaterFlow,
            Self::Lava => BypassRule::LavaFlow,
        }
    }
}

/// Why a creature is spawning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnReason {
    /// World generation, mob spawning cycles and the like.
    Natural,
    /// A spawn egg used by a player.
    SpawnEgg,
    /// A server command.
    Command,
    /// Another plugin.
    Plugin,
}

/// Why an event was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The block is on the world's disallow-list.
    DisallowedBlock,
    /// The block was not placed by a player and the world protects it.
    ProtectedBlock,
    /// The fluid may not flow in this world.
    FlowDisabled,
    /// Redstone is frozen in this world.
    RedstoneFrozen,
    /// The spawn failed admission.
    Spawn(Rejection),
}

impl Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisallowedBlock => f.write_str("block is disallowed in this world"),
            Self::ProtectedBlock => f.write_str("block is protected from destruction"),
            Self::FlowDisabled => f.write_str("fluid flow is disabled"),
            Self::RedstoneFrozen => f.write_str("redstone is blocked"),
            Self::Spawn(rejection) => rejection.fmt(f),
        }
    }
}

/// Event handlers.
pub struct Enforcer {
    rules: Arc<RuleBook>,
    bypass: Arc<BypassRegistry>,
    placed: Arc<PlacedObjectRegistry>,
    admission: Arc<SpawnAdmission>,
}

impl Enforcer {
    /// Creates the handlers over shared state.
    #[must_use]
    pub fn new(
        rules: Arc<RuleBook>,
        bypass: Arc<BypassRegistry>,
        placed: Arc<PlacedObjectRegistry>,
        admission: Arc<SpawnAdmission>,
    ) -> Self {
        Self {
            rules,
            bypass,
            placed,
            admission,
        }
    }

    /// An actor places a block, or empties a bucket when `kind` is a fluid.
    pub fn on_block_place(
        &self,
        actor: Uuid,
        cell: &BlockCell,
        block: &str,
        kind: PlacedKind,
    ) -> Result<(), Denial> {
        let disallowed = self
            .rules
            .read(&cell.world, |rules| rules.is_block_disallowed(block));
        if disallowed && !self.bypass.get(actor, BypassRule::DisallowedPlacement) {
            return Err(Denial::DisallowedBlock);
        }

        let bypass_despawn = self.bypass.get(actor, BypassRule::Despawn);
        self.placed.record(cell, Some(actor), bypass_despawn, kind);
        Ok(())
    }

    /// An actor breaks a block.
    pub fn on_block_break(&self, actor: Uuid, cell: &BlockCell, is_admin: bool) -> Result<(), Denial> {
        let protected = !self
            .rules
            .read(&cell.world, |rules| rules.block_destruction);
        if protected
            && !is_admin
            && !self.bypass.get(actor, BypassRule::DestructionProtection)
            && !self.placed.contains(cell)
        {
            return Err(Denial::ProtectedBlock);
        }

        self.placed.forget(cell);
        Ok(())
    }

    /// A fluid spreads from `source` into `destination`.
    pub fn on_fluid_flow(
        &self,
        source: &BlockCell,
        destination: &BlockCell,
        fluid: Fluid,
    ) -> Result<(), Denial> {
        let enabled = self.rules.read(&source.world, |rules| match fluid {
            Fluid::Water => rules.water_flow,
            Fluid::Lava => rules.lava_flow,
        });

        if !enabled {
            let bypassed = self
                .placed
                .lookup(source)
                .and_then(|record| record.owner)
                .is_some_and(|owner| self.bypass.get(owner, fluid.bypass_rule()));
            if !bypassed {
                return Err(Denial::FlowDisabled);
            }
        }

        self.placed.spread(source, destination);
        Ok(())
    }

    /// A creature is about to spawn.
    pub fn on_creature_spawn(
        &self,
        world: &str,
        entity: &str,
        reason: SpawnReason,
    ) -> Result<(), Denial> {
        let result = match reason {
            SpawnReason::Command | SpawnReason::Plugin => Ok(()),
            SpawnReason::SpawnEgg => self.admission.check_population(world, entity),
            SpawnReason::Natural => self.admission.check(world, entity),
        };
        result.map_err(Denial::Spawn)
    }

    /// A redstone component changes its signal.
    pub fn on_redstone_change(&self, world: &str) -> Result<(), Denial> {
        if self.rules.read(world, |rules| rules.block_redstone_mechanism) {
            return Err(Denial::RedstoneFrozen);
        }
        Ok(())
    }

    /// An actor left the server.
    pub fn on_actor_disconnect(&self, actor: Uuid) {
        self.bypass.clear(actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::world::MemoryWorld;
    use bastion_utils::BlockPos;

    struct Fixture {
        rules: Arc<RuleBook>,
        bypass: Arc<BypassRegistry>,
        placed: Arc<PlacedObjectRegistry>,
        world: Arc<MemoryWorld>,
        enforcer: Enforcer,
    }

    fn setup() -> Fixture {
        let rules = Arc::new(RuleBook::new());
        let bypass = Arc::new(BypassRegistry::new());
        let clock = Arc::new(ManualClock::new(0));
        let placed = Arc::new(PlacedObjectRegistry::new(clock.clone()));
        let world = Arc::new(MemoryWorld::with_worlds(["arena"]));
        let admission = Arc::new(SpawnAdmission::new(rules.clone(), world.clone(), clock));
        let enforcer = Enforcer::new(rules.clone(), bypass.clone(), placed.clone(), admission);
        Fixture {
            rules,
            bypass,
            placed,
            world,
            enforcer,
        }
    }

    fn cell(x: i32) -> BlockCell {
        BlockCell::new("arena", BlockPos::new(x, 64, 0))
    }

    #[test]
    fn test_place_records_with_bypass_snapshot() {
        let f = setup();
        let actor = Uuid::new_v4();
        f.bypass.set(actor, BypassRule::Despawn, true);

        assert_eq!(f.enforcer.on_block_place(actor, &cell(0), "STONE", PlacedKind::Block), Ok(()));
        f.bypass.set(actor, BypassRule::Despawn, false);

        let record = f.placed.lookup(&cell(0)).expect("recorded");
        assert_eq!(record.owner, Some(actor));
        assert!(record.bypass_despawn);
    }

    #[test]
    fn test_disallowed_block() {
        let f = setup();
        let actor = Uuid::new_v4();
        f.rules.update("arena", |rules| rules.disallowed_blocks.push("TNT".to_string()));

        assert_eq!(
            f.enforcer.on_block_place(actor, &cell(0), "TNT", PlacedKind::Block),
            Err(Denial::DisallowedBlock)
        );
        assert!(f.placed.is_empty());

        f.bypass.set(actor, BypassRule::DisallowedPlacement, true);
        assert_eq!(f.enforcer.on_block_place(actor, &cell(0), "TNT", PlacedKind::Block), Ok(()));
    }

    #[test]
    fn test_destruction_protection() {
        let f = setup();
        let actor = Uuid::new_v4();
        f.rules.update("arena", |rules| rules.block_destruction = false);
        f.enforcer
            .on_block_place(actor, &cell(1), "STONE", PlacedKind::Block)
            .expect("placement allowed");

        assert_eq!(f.enforcer.on_block_break(actor, &cell(0), false), Err(Denial::ProtectedBlock));
        assert_eq!(f.enforcer.on_block_break(actor, &cell(0), true), Ok(()));
        assert_eq!(f.enforcer.on_block_break(actor, &cell(1), false), Ok(()));
        assert!(!f.placed.contains(&cell(1)));

        f.bypass.set(actor, BypassRule::DestructionProtection, true);
        assert_eq!(f.enforcer.on_block_break(actor, &cell(2), false), Ok(()));
    }

    #[test]
    fn test_fluid_flow_needs_owner_bypass() {
        let f = setup();
        let actor = Uuid::new_v4();
        f.rules.update("arena", |rules| rules.water_flow = false);
        f.enforcer
            .on_block_place(actor, &cell(0), "WATER", PlacedKind::Fluid)
            .expect("placement allowed");

        assert_eq!(
            f.enforcer.on_fluid_flow(&cell(0), &cell(1), Fluid::Water),
            Err(Denial::FlowDisabled)
        );
        // Lava is a separate rule
        assert_eq!(f.enforcer.on_fluid_flow(&cell(0), &cell(1), Fluid::Lava), Ok(()));

        f.bypass.set(actor, BypassRule::WaterFlow, true);
        assert_eq!(f.enforcer.on_fluid_flow(&cell(0), &cell(1), Fluid::Water), Ok(()));
        assert_eq!(f.enforcer.on_fluid_flow(&cell(1), &cell(2), Fluid::Water), Ok(()));

        let spread = f.placed.lookup(&cell(2)).expect("spread tracked");
        assert_eq!(spread.owner, Some(actor));
        assert_eq!(spread.kind, PlacedKind::Fluid);
    }

    #[test]
    fn test_untracked_fluid_cannot_bypass() {
        let f = setup();
        f.rules.update("arena", |rules| rules.lava_flow = false);
        assert_eq!(
            f.enforcer.on_fluid_flow(&cell(0), &cell(1), Fluid::Lava),
            Err(Denial::FlowDisabled)
        );
    }

    #[test]
    fn test_creature_spawn_reasons() {
        let f = setup();
        f.rules.update("arena", |rules| {
            rules.entity_limits.insert("COW".to_string(), 1);
            rules.entity_spawn_times.insert(
                "COW".to_string(),
                crate::rules::SpawnWindow {
                    from: "00:00".to_string(),
                    to: "00:00".to_string(),
                },
            );
        });

        // Clock sits at midnight, so the window is open
        assert_eq!(f.enforcer.on_creature_spawn("arena", "COW", SpawnReason::Natural), Ok(()));
        f.world.add_entities("arena", "COW", 1);
        assert!(matches!(
            f.enforcer.on_creature_spawn("arena", "COW", SpawnReason::Natural),
            Err(Denial::Spawn(Rejection::LimitReached { .. }))
        ));
        assert!(f.enforcer.on_creature_spawn("arena", "COW", SpawnReason::SpawnEgg).is_err());
        assert_eq!(f.enforcer.on_creature_spawn("arena", "COW", SpawnReason::Command), Ok(()));
        assert_eq!(f.enforcer.on_creature_spawn("arena", "COW", SpawnReason::Plugin), Ok(()));
    }

    #[test]
    fn test_redstone_and_disconnect() {
        let f = setup();
        let actor = Uuid::new_v4();
        assert_eq!(f.enforcer.on_redstone_change("arena"), Ok(()));
        f.rules.update("arena", |rules| rules.block_redstone_mechanism = true);
        assert_eq!(f.enforcer.on_redstone_change("arena"), Err(Denial::RedstoneFrozen));

        f.bypass.set(actor, BypassRule::LavaFlow, true);
        f.enforcer.on_actor_disconnect(actor);
        assert!(!f.bypass.get(actor, BypassRule::LavaFlow));
    }
}
