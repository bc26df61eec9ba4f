//! # Bastion Core
//!
//! The rule engine: placed block tracking and timed despawn, periodic spawn
//! points, per-actor bypasses, and the event checks built on top of them.
//!
//! Everything is wired explicitly through [`guard::Guard`]; the host supplies
//! a [`world::WorldAccess`], a [`store::GuardStore`], a [`clock::Clock`] and
//! drives a shared [`ticks::TaskScheduler`].
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    clippy::unwrap_used
)]
#![allow(
    clippy::single_call_fn,
    clippy::missing_errors_doc,
    clippy::struct_excessive_bools,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions
)]

pub mod admission;
pub mod bypass;
pub mod clock;
pub mod despawn;
pub mod enforce;
pub mod error;
pub mod guard;
pub mod placed;
pub mod rules;
pub mod spawn_point;
pub mod store;
pub mod ticks;
pub mod world;

pub use error::{GuardError, StoreError};
pub use guard::{Guard, GuardSettings};
