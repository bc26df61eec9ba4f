//! Timed removal of placed blocks.
//!
//! A repeating sweep task walks a snapshot of the placed registry and queues
//! every expired record, oldest first, onto a removal worklist. The worklist
//! is drained by one recurring task that performs at most the removals due on
//! the current tick, so a large batch is spread over
//! `removal_delay_ticks`-sized steps instead of landing on a single tick.
//!
//! Stopping the sweep leaves the worklist alone: removals already queued still
//! run to completion.
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use bastion_utils::BlockCell;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::clock::Clock;
use crate::placed::{PlacedObjectRecord, PlacedObjectRegistry};
use crate::rules::RuleBook;
use crate::ticks::{TaskControl, TaskId, TaskScheduler};
use crate::world::WorldAccess;

/// Tick timings of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DespawnSettings {
    /// Ticks between sweeps.
    pub check_interval_ticks: u64,
    /// Ticks between two consecutive removals of one sweep.
    pub removal_delay_ticks: u64,
}

impl Default for DespawnSettings {
    fn default() -> Self {
        Self {
            check_interval_ticks: 20,
            removal_delay_ticks: 5,
        }
    }
}

/// Lifecycle of the sweep task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// No sweep is scheduled.
    Stopped,
    /// The sweep runs on the given task.
    Running(TaskId),
}

struct PendingRemoval {
    key: String,
    cell: BlockCell,
    /// `placed_at` of the record when it was queued. A re-placement at the
    /// same cell changes it, which voids the removal.
    placed_at: i64,
}

#[derive(Default)]
struct RemovalQueue {
    /// Ordered by due tick, then by queue order.
    entries: BTreeMap<(u64, u64), PendingRemoval>,
    /// Keys currently queued, so overlapping sweeps do not queue twice.
    queued: FxHashSet<String>,
    drain_task: Option<TaskId>,
    next_sequence: u64,
}

/// Runs the despawn sweep and its removal worklist.
pub struct DespawnScheduler {
    this: Weak<Self>,
    placed: Arc<PlacedObjectRegistry>,
    rules: Arc<RuleBook>,
    world: Arc<dyn WorldAccess>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<TaskScheduler>,
    settings: Mutex<DespawnSettings>,
    state: Mutex<SweepState>,
    queue: Mutex<RemovalQueue>,
}

impl DespawnScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(
        placed: Arc<PlacedObjectRegistry>,
        rules: Arc<RuleBook>,
        world: Arc<dyn WorldAccess>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<TaskScheduler>,
        settings: DespawnSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            placed,
            rules,
            world,
            clock,
            scheduler,
            settings: Mutex::new(settings),
            state: Mutex::new(SweepState::Stopped),
            queue: Mutex::new(RemovalQueue::default()),
        })
    }

    /// Starts the periodic sweep. Does nothing if it is already running.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if let SweepState::Running(_) = *state {
            return;
        }

        let interval = self.settings.lock().check_interval_ticks.max(1);
        let this = self.this.clone();
        let id = self
            .scheduler
            .schedule_repeating(interval, interval, move |tick| match this.upgrade() {
                Some(despawn) => {
                    despawn.sweep(tick);
                    TaskControl::Continue
                }
                None => TaskControl::Cancel,
            });
        *state = SweepState::Running(id);
        log::info!("Block despawn sweep started, every {interval} tick(s)");
    }

    /// Stops the periodic sweep. Queued removals still complete.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let SweepState::Running(id) = *state {
            self.scheduler.cancel(id);
            *state = SweepState::Stopped;
            log::info!("Block despawn sweep stopped");
        }
    }

    /// Stops the sweep and starts it again with new timings.
    pub fn restart(&self, settings: DespawnSettings) {
        self.stop();
        *self.settings.lock() = settings;
        self.start();
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SweepState {
        *self.state.lock()
    }

    /// Returns whether the periodic sweep is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state(), SweepState::Running(_))
    }

    /// Number of removals waiting on the worklist.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().entries.len()
    }

    /// Runs one sweep right away, outside the periodic schedule.
    ///
    /// Returns the number of records queued for removal.
    pub fn sweep_now(&self) -> usize {
        self.sweep(self.scheduler.current_tick())
    }

    /// One pass over the registry. `tick` is the tick being processed.
    fn sweep(&self, tick: u64) -> usize {
        let now = self.clock.now_millis();
        let mut lifetimes: FxHashMap<String, Option<u64>> = FxHashMap::default();
        let mut expired: Vec<(String, BlockCell, PlacedObjectRecord)> = Vec::new();

        // Keys already on the worklist are skipped below
        let queued = self.queue.lock().queued.clone();

        for (key, record) in self.placed.snapshot() {
            if record.bypass_despawn || queued.contains(&key) {
                continue;
            }

            let cell = match key.parse::<BlockCell>() {
                Ok(cell) => cell,
                Err(err) => {
                    log::warn!("Dropping corrupt placed block entry '{key}': {err}");
                    self.placed.forget_key(&key);
                    continue;
                }
            };

            if !self.world.world_exists(&cell.world) {
                continue;
            }

            let lifetime = *lifetimes.entry(cell.world.clone()).or_insert_with(|| {
                self.rules
                    .read(&cell.world, |rules| rules.block_despawn.lifetime_millis())
            });
            let Some(lifetime) = lifetime else {
                continue;
            };

            let elapsed = now.saturating_sub(record.placed_at);
            if elapsed < i64::try_from(lifetime).unwrap_or(i64::MAX) {
                continue;
            }
            expired.push((key, cell, record));
        }

        if expired.is_empty() {
            return 0;
        }

        expired.sort_by_key(|(_, _, record)| record.placed_at);
        let count = expired.len();
        log::debug!("Queued {count} expired placed block(s) for removal");

        let delay = self.settings.lock().removal_delay_ticks;
        {
            let mut queue = self.queue.lock();
            for (step, (key, cell, record)) in (0u64..).zip(expired) {
                let sequence = queue.next_sequence;
                queue.next_sequence += 1;
                queue.queued.insert(key.clone());
                queue.entries.insert(
                    (tick + step * delay, sequence),
                    PendingRemoval {
                        key,
                        cell,
                        placed_at: record.placed_at,
                    },
                );
            }
        }

        // The first removal happens on the sweep's own tick
        self.drain_due(tick);
        self.ensure_drain_task();
        count
    }

    /// Performs every removal due on or before `tick`.
    ///
    /// Returns true once the worklist is empty.
    fn drain_due(&self, tick: u64) -> bool {
        loop {
            let removal = {
                let mut queue = self.queue.lock();
                match queue.entries.first_key_value() {
                    Some((&(due, _), _)) if due <= tick => {}
                    _ => return queue.entries.is_empty(),
                }
                let Some((_, removal)) = queue.entries.pop_first() else {
                    return true;
                };
                queue.queued.remove(&removal.key);
                removal
            };
            self.remove(&removal);
        }
    }

    fn remove(&self, removal: &PendingRemoval) {
        // Broken or re-placed since it was queued
        if self
            .placed
            .lookup(&removal.cell)
            .is_none_or(|record| record.placed_at != removal.placed_at)
        {
            return;
        }
        if !self.world.world_exists(&removal.cell.world) {
            return;
        }

        if !self.world.clear_block(&removal.cell) {
            log::trace!("Placed block {} was already gone", removal.cell);
        }
        self.placed.forget_key(&removal.key);
    }

    fn ensure_drain_task(&self) {
        let mut queue = self.queue.lock();
        if queue.entries.is_empty() || queue.drain_task.is_some() {
            return;
        }

        let this = self.this.clone();
        let id = self.scheduler.schedule_repeating(1, 1, move |tick| {
            let Some(despawn) = this.upgrade() else {
                return TaskControl::Cancel;
            };
            if despawn.drain_due(tick) {
                let mut queue = despawn.queue.lock();
                // A sweep may have refilled the list in between
                if queue.entries.is_empty() {
                    queue.drain_task = None;
                    return TaskControl::Cancel;
                }
            }
            TaskControl::Continue
        });
        queue.drain_task = Some(id);
    }
}
