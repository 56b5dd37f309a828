//! Time-control driver.
//!
//! The engine only ever moves when `advance` is called with a delta. The
//! driver owns a [`Simulation`] on a background task and decides when and by
//! how much to advance it, according to the selected [`TickMode`]:
//!
//! - `RealTime`: every wall-clock tick advances by the elapsed time
//!   (times `speed`)
//! - `RealTimeAutoPause`: like `RealTime`, but time stops as soon as the
//!   player could act and resumes with the next accepted request
//! - `Manual`: wall-clock ticks are ignored; only [`DriverHandle::step`]
//!   moves time

mod worker;

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use combat_core::{CombatEvent, SkillRequest, UseOutcome};

use crate::api::{RequestSource, Result, RuntimeError};
use crate::simulation::{Simulation, SimulationSummary};

pub(crate) use worker::{Command, DriverWorker};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TickMode {
    RealTime,
    #[default]
    RealTimeAutoPause,
    Manual,
}

/// Driver configuration.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub mode: TickMode,
    /// Wall-clock period between ticks.
    pub tick_interval: Duration,
    /// Simulated seconds per wall-clock second.
    pub speed: f64,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mode: TickMode::default(),
            tick_interval: Duration::from_millis(50),
            speed: 1.0,
            event_buffer_size: 256,
            command_buffer_size: 32,
        }
    }
}

/// Point-in-time view of the driven simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverStatus {
    pub now: f64,
    pub mode: TickMode,
    pub paused: bool,
    /// No lock prevents a new request.
    pub ready: bool,
    pub settled: bool,
    pub total_potency: f64,
}

/// Owns the driver task.
pub struct Driver {
    handle: DriverHandle,
    worker: JoinHandle<Simulation>,
}

impl Driver {
    /// Moves `simulation` onto a background task.
    pub fn spawn(simulation: Simulation, config: DriverConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
        let (event_tx, _) = broadcast::channel(config.event_buffer_size);
        let worker = DriverWorker::new(simulation, config, command_rx, event_tx.clone());
        let worker = tokio::spawn(worker.run());
        Self {
            handle: DriverHandle { command_tx, event_tx },
            worker,
        }
    }

    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    /// Stops the task and hands the simulation back.
    pub async fn shutdown(self) -> Result<Simulation> {
        let (reply_tx, reply_rx) = oneshot::channel();
        // A closed channel means the worker already exited; join it either way.
        let _ = self
            .handle
            .command_tx
            .send(Command::Shutdown { reply: reply_tx })
            .await;
        let _ = reply_rx.await;
        drop(self.handle);
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Cloneable façade for issuing commands to the driver task.
#[derive(Clone)]
pub struct DriverHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<CombatEvent>,
}

impl DriverHandle {
    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Submits a request at the driver's current simulated time.
    pub async fn request(&self, request: SkillRequest) -> Result<UseOutcome> {
        self.call(|reply| Command::Request { request, reply })
            .await?
            .map_err(RuntimeError::from)
    }

    /// Advances by `delta` regardless of the mode. Returns the time advanced.
    pub async fn step(&self, delta: f64) -> Result<f64> {
        self.call(|reply| Command::Step { delta, reply }).await
    }

    pub async fn start_movement(&self, duration: f64) -> Result<()> {
        self.call(|reply| Command::Move { duration, reply }).await
    }

    pub async fn set_mode(&self, mode: TickMode) -> Result<()> {
        self.call(|reply| Command::SetMode { mode, reply }).await
    }

    pub async fn status(&self) -> Result<DriverStatus> {
        self.call(|reply| Command::Status { reply }).await
    }

    pub async fn summary(&self) -> Result<SimulationSummary> {
        self.call(|reply| Command::Summary { reply }).await
    }

    /// Subscribes to combat events as they are emitted.
    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.event_tx.subscribe()
    }

    /// Feeds `source` until it runs dry.
    ///
    /// While the driver is in `Manual` mode or auto-paused, time is stepped
    /// straight to the next due request; otherwise the driver's own ticks
    /// move time and this polls every `poll_interval` of wall-clock time.
    pub async fn play(
        &self,
        source: &mut dyn RequestSource,
        poll_interval: Duration,
    ) -> Result<usize> {
        let mut played = 0;
        while !source.is_exhausted() {
            let status = self.status().await?;
            if let Some(request) = source.poll(status.now).await? {
                self.request(request).await?;
                played += 1;
                continue;
            }
            match source.next_due() {
                Some(due) if status.mode == TickMode::Manual || status.paused => {
                    self.step((due - status.now).max(0.0)).await?;
                }
                _ => tokio::time::sleep(poll_interval).await,
            }
        }
        Ok(played)
    }
}
