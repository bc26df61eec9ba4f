//! # Bastion Utils
//!
//! Leaf types shared by every bastion crate: positions, cell keys and the
//! duration / time-of-day codecs.
pub mod duration;
pub mod math;
pub mod time_of_day;
pub mod types;

pub use duration::{DurationError, MILLIS_PER_TICK};
pub use math::Vector3;
pub use types::{BlockCell, BlockPos, CellKeyError};
