//! The admission chain every non-forced spawn must pass.
use std::fmt::{self, Display};
use std::sync::Arc;

use crate::clock::Clock;
use crate::rules::RuleBook;
use crate::world::WorldAccess;

/// Why a spawn was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The entity kind is on the world's disallow-list.
    Disallowed,
    /// The world already holds `limit` or more of this kind.
    LimitReached {
        /// The configured limit.
        limit: u32,
        /// The population counted.
        count: usize,
    },
    /// The current time is outside the entity's spawn window.
    OutsideWindow,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disallowed => f.write_str("entity is disallowed"),
            Self::LimitReached { limit, count } => {
                write!(f, "entity limit reached ({count}/{limit})")
            }
            Self::OutsideWindow => f.write_str("outside of spawn time window"),
        }
    }
}

/// Runs disallow-list, population limit and time window checks, in that order.
pub struct SpawnAdmission {
    rules: Arc<RuleBook>,
    world: Arc<dyn WorldAccess>,
    clock: Arc<dyn Clock>,
}

impl SpawnAdmission {
    /// Creates a new admission chain.
    #[must_use]
    pub fn new(rules: Arc<RuleBook>, world: Arc<dyn WorldAccess>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules,
            world,
            clock,
        }
    }

    /// Runs the full chain.
    pub fn check(&self, world: &str, entity: &str) -> Result<(), Rejection> {
        self.check_population(world, entity)?;
        self.check_window(world, entity)
    }

    /// Runs the disallow-list and population limit checks only.
    pub fn check_population(&self, world: &str, entity: &str) -> Result<(), Rejection> {
        let (disallowed, limit) = self.rules.read(world, |rules| {
            (
                rules.is_entity_disallowed(entity),
                rules.entity_limits.get(entity).copied(),
            )
        });
        if disallowed {
            return Err(Rejection::Disallowed);
        }

        if let Some(limit) = limit {
            let count = self.world.entity_count(world, entity);
            if count >= limit as usize {
                return Err(Rejection::LimitReached { limit, count });
            }
        }
        Ok(())
    }

    /// Runs the time window check only. No window means always allowed.
    pub fn check_window(&self, world: &str, entity: &str) -> Result<(), Rejection> {
        let window = self
            .rules
            .read(world, |rules| rules.entity_spawn_times.get(entity).cloned());
        match window {
            Some(window) if !window.allows(self.clock.time_of_day()) => {
                Err(Rejection::OutsideWindow)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rules::SpawnWindow;
    use crate::world::MemoryWorld;
    use bastion_utils::time_of_day;

    fn setup() -> (Arc<RuleBook>, Arc<MemoryWorld>, Arc<ManualClock>, SpawnAdmission) {
        let rules = Arc::new(RuleBook::new());
        let world = Arc::new(MemoryWorld::with_worlds(["arena"]));
        let clock = Arc::new(ManualClock::new(0));
        let admission = SpawnAdmission::new(rules.clone(), world.clone(), clock.clone());
        (rules, world, clock, admission)
    }

    #[test]
    fn test_no_rules_admits() {
        let (_, _, _, admission) = setup();
        assert_eq!(admission.check("arena", "ZOMBIE"), Ok(()));
    }

    #[test]
    fn test_disallowed_wins_over_everything() {
        let (rules, _, _, admission) = setup();
        rules.update("arena", |rules| {
            rules.disallowed_entities.push("ZOMBIE".to_string());
            rules.entity_limits.insert("ZOMBIE".to_string(), 0);
        });
        assert_eq!(admission.check("arena", "ZOMBIE"), Err(Rejection::Disallowed));
        assert_eq!(admission.check("arena", "COW"), Ok(()));
    }

    #[test]
    fn test_population_limit() {
        let (rules, world, _, admission) = setup();
        rules.update("arena", |rules| {
            rules.entity_limits.insert("COW".to_string(), 3);
        });

        world.add_entities("arena", "COW", 2);
        assert_eq!(admission.check("arena", "COW"), Ok(()));
        world.add_entities("arena", "COW", 1);
        assert_eq!(
            admission.check("arena", "COW"),
            Err(Rejection::LimitReached { limit: 3, count: 3 })
        );
    }

    #[test]
    fn test_window() {
        let (rules, _, clock, admission) = setup();
        rules.update("arena", |rules| {
            rules.entity_spawn_times.insert(
                "BAT".to_string(),
                SpawnWindow {
                    from: "22:00".to_string(),
                    to: "06:00".to_string(),
                },
            );
        });

        clock.set_time_of_day(time_of_day::parse("12:00").expect("valid time"));
        assert_eq!(admission.check("arena", "BAT"), Err(Rejection::OutsideWindow));
        assert_eq!(admission.check_population("arena", "BAT"), Ok(()));

        clock.set_time_of_day(time_of_day::parse("02:00").expect("valid time"));
        assert_eq!(admission.check("arena", "BAT"), Ok(()));
    }
}
