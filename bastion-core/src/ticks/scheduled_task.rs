//! Scheduled task types.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Handle of a registered task. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// What a task wants after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    /// Keep the task registered. One-shot tasks are removed regardless.
    Continue,
    /// Remove the task; it never fires again.
    Cancel,
}

/// A task body. Receives the tick it fires on.
pub(crate) type TaskFn = Arc<dyn Fn(u64) -> TaskControl + Send + Sync>;

/// A pending firing of a task.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScheduledFiring {
    /// The task to run.
    pub id: TaskId,
    /// The absolute tick when this should fire.
    pub trigger_tick: u64,
    /// Insertion order for firings sharing a `trigger_tick`. Lower runs first.
    pub sub_tick_order: u64,
}

impl PartialEq for ScheduledFiring {
    fn eq(&self, other: &Self) -> bool {
        self.trigger_tick == other.trigger_tick && self.sub_tick_order == other.sub_tick_order
    }
}

impl Eq for ScheduledFiring {}

impl PartialOrd for ScheduledFiring {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledFiring {
    /// `BinaryHeap` is a max-heap, so the comparison is reversed to pop the
    /// earliest firing first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .trigger_tick
            .cmp(&self.trigger_tick)
            .then_with(|| other.sub_tick_order.cmp(&self.sub_tick_order))
    }
}
