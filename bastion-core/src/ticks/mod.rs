//! Host tick task scheduling.
//!
//! Everything periodic in bastion (despawn sweeps, the throttled removal
//! queue, spawn point timers) is a task registered against one host tick
//! clock.
//!
//! # Architecture
//!
//! - [`TaskId`] - Handle used to cancel a registered task
//! - [`TaskControl`] - Returned by a task to keep running or cancel itself
//! - [`TaskScheduler`] - Owns pending firings and runs the due ones each tick

mod scheduled_task;
mod task_scheduler;

pub use scheduled_task::{TaskControl, TaskId};
pub use task_scheduler::TaskScheduler;
