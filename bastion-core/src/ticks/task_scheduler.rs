//! Tick task scheduler implementation.

use std::collections::BinaryHeap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::scheduled_task::{ScheduledFiring, TaskControl, TaskFn, TaskId};

struct TaskEntry {
    task: TaskFn,
    /// `None` for one-shot tasks.
    period: Option<u64>,
}

#[derive(Default)]
struct SchedulerState {
    /// Priority queue of pending firings.
    pending: BinaryHeap<ScheduledFiring>,
    /// Registered tasks. A firing whose id is missing here was cancelled.
    tasks: FxHashMap<TaskId, TaskEntry>,
    current_tick: u64,
    next_id: u64,
    next_sequence: u64,
}

impl SchedulerState {
    fn push_firing(&mut self, id: TaskId, trigger_tick: u64) {
        let sub_tick_order = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.pending.push(ScheduledFiring {
            id,
            trigger_tick,
            sub_tick_order,
        });
    }
}

/// Runs registered tasks against the host tick clock.
///
/// Uses a priority queue (binary heap) for retrieval of due firings and a
/// task map as the source of truth for which tasks are still alive. Task
/// bodies run without the internal lock held, so they may schedule or cancel
/// tasks (including themselves) while running.
///
/// Delays are measured from the current tick and are at least one tick: a
/// task scheduled while tick `n` is being processed fires on tick `n + 1` at
/// the earliest.
pub struct TaskScheduler {
    state: Mutex<SchedulerState>,
}

impl TaskScheduler {
    /// Creates a new scheduler at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Registers a task that fires once after `delay` ticks.
    pub fn schedule_once<F>(&self, delay: u64, task: F) -> TaskId
    where
        F: Fn(u64) -> TaskControl + Send + Sync + 'static,
    {
        self.register(delay, None, Arc::new(task))
    }

    /// Registers a task that first fires after `delay` ticks and then every
    /// `period` ticks until cancelled.
    pub fn schedule_repeating<F>(&self, delay: u64, period: u64, task: F) -> TaskId
    where
        F: Fn(u64) -> TaskControl + Send + Sync + 'static,
    {
        self.register(delay, Some(period.max(1)), Arc::new(task))
    }

    fn register(&self, delay: u64, period: Option<u64>, task: TaskFn) -> TaskId {
        let mut state = self.state.lock();
        let id = TaskId(state.next_id);
        state.next_id += 1;

        let trigger_tick = state.current_tick + delay.max(1);
        state.tasks.insert(id, TaskEntry { task, period });
        state.push_firing(id, trigger_tick);

        log::trace!("Scheduled {id} for tick {trigger_tick} (period={period:?})");
        id
    }

    /// Cancels a task. Returns false if it was not registered.
    ///
    /// Once this returns the task will not be started again. A firing that
    /// another thread already started is allowed to finish.
    pub fn cancel(&self, id: TaskId) -> bool {
        // The heap entry stays behind and is skipped when it comes due.
        self.state.lock().tasks.remove(&id).is_some()
    }

    /// Returns whether the task is still registered.
    #[must_use]
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.state.lock().tasks.contains_key(&id)
    }

    /// The last tick processed.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.state.lock().current_tick
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Advances the clock by one tick and runs every task that is due.
    ///
    /// Returns the tick that was processed.
    pub fn tick(&self) -> u64 {
        let (tick, due) = {
            let mut state = self.state.lock();
            state.current_tick += 1;
            let tick = state.current_tick;

            let mut due = Vec::new();
            while let Some(firing) = state.pending.peek() {
                if firing.trigger_tick > tick {
                    break;
                }
                if let Some(firing) = state.pending.pop() {
                    due.push(firing);
                }
            }
            (tick, due)
        };

        for firing in due {
            let Some(task) = self
                .state
                .lock()
                .tasks
                .get(&firing.id)
                .map(|entry| entry.task.clone())
            else {
                continue;
            };

            let control = task(tick);

            let mut state = self.state.lock();
            let period = state.tasks.get(&firing.id).map(|entry| entry.period);
            match (control, period) {
                // Cancelled from inside the task body, nothing left to do
                (_, None) => {}
                (TaskControl::Continue, Some(Some(period))) => {
                    state.push_firing(firing.id, tick + period);
                }
                (TaskControl::Cancel, Some(_)) | (TaskControl::Continue, Some(None)) => {
                    state.tasks.remove(&firing.id);
                }
            }
        }

        tick
    }

    /// Runs `ticks` ticks back to back.
    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
