//! # Bastion
//!
//! Headless host for the bastion rule engine: loads the configuration, opens
//! the data file, and drives the engine's tick clock until told to stop.
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    missing_docs,
    clippy::unwrap_used
)]
#![allow(
    clippy::single_call_fn,
    clippy::multiple_inherent_impl,
    clippy::shadow_unrelated,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata
)]
use std::sync::Arc;
use std::time::Duration;

use bastion_core::clock::SystemClock;
use bastion_core::store::JsonStore;
use bastion_core::ticks::TaskScheduler;
use bastion_core::world::MemoryWorld;
use bastion_core::{Guard, GuardError, StoreError};
use thiserror::Error;
use tokio::select;
use tokio::task::{JoinHandle, spawn_blocking};
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;

use crate::config::BastionConfig;

/// Configuration loading.
pub mod config;
/// Log output.
pub mod logger;

/// Errors raised while running the host.
#[derive(Debug, Error)]
pub enum BastionError {
    /// The data file could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The engine refused to start or stop cleanly.
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// A host task panicked.
    #[error("host task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The host process.
pub struct BastionServer {
    /// The cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    /// The engine.
    pub guard: Arc<Guard>,
    /// The worlds the engine acts on.
    pub world: Arc<MemoryWorld>,
    /// The tick clock shared by every timer.
    pub scheduler: Arc<TaskScheduler>,
    config: BastionConfig,
    tick_loop: Option<JoinHandle<()>>,
    autosave: Option<JoinHandle<()>>,
}

impl BastionServer {
    /// Opens the data file and wires the engine.
    pub fn new(config: BastionConfig) -> Result<Self, BastionError> {
        log::info!("Starting Bastion");

        let store = Arc::new(JsonStore::open(&config.data_file)?);
        let world = Arc::new(MemoryWorld::with_worlds(config.worlds.iter().cloned()));
        let scheduler = Arc::new(TaskScheduler::new());
        let guard = Guard::new(
            store,
            world.clone(),
            Arc::new(SystemClock),
            scheduler.clone(),
            config.guard_settings(),
        );

        Ok(Self {
            cancel_token: CancellationToken::new(),
            guard,
            world,
            scheduler,
            config,
            tick_loop: None,
            autosave: None,
        })
    }

    /// Loads persisted state and starts ticking.
    pub fn start(&mut self) -> Result<(), BastionError> {
        self.guard.start()?;

        let scheduler = self.scheduler.clone();
        let cancel_token = self.cancel_token.clone();
        let period = self.config.tick_duration();

        self.tick_loop = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                select! {
                    () = cancel_token.cancelled() => {
                        break;
                    }
                    _ = ticker.tick() => {
                        scheduler.tick();
                    }
                }
            }
        }));

        if let Some(period) = self.config.save_interval() {
            self.autosave = Some(tokio::spawn(autosave(
                self.guard.clone(),
                self.cancel_token.clone(),
                period,
            )));
        }

        log::info!(
            "Started Bastion at {} ticks per second over {} world(s)",
            self.config.tick_rate,
            self.config.worlds.len()
        );
        Ok(())
    }

    /// Stops ticking, then shuts the engine down and saves.
    pub async fn stop(&mut self) -> Result<(), BastionError> {
        self.cancel_token.cancel();
        if let Some(tick_loop) = self.tick_loop.take() {
            tick_loop.await?;
        }
        if let Some(autosave) = self.autosave.take() {
            autosave.await?;
        }
        let guard = self.guard.clone();
        spawn_blocking(move || guard.shutdown()).await??;
        log::info!("Stopped Bastion");
        Ok(())
    }
}

/// Saves placed blocks every `period` on the blocking pool until cancelled.
async fn autosave(guard: Arc<Guard>, cancel_token: CancellationToken, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        select! {
            () = cancel_token.cancelled() => {
                break;
            }
            _ = ticker.tick() => {
                let guard = guard.clone();
                match spawn_blocking(move || guard.save()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => log::error!("Autosave failed: {err}"),
                    Err(err) => log::error!("Autosave task failed: {err}"),
                }
            }
        }
    }
}
