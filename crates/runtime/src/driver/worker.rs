//! Background task that owns the driven [`Simulation`].

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use combat_core::{CombatEvent, SkillRequest, UseOutcome, ValidationError};

use super::{DriverConfig, DriverStatus, TickMode};
use crate::simulation::{Simulation, SimulationSummary};

/// Commands accepted by the driver task.
pub(crate) enum Command {
    Request {
        request: SkillRequest,
        reply: oneshot::Sender<Result<UseOutcome, ValidationError>>,
    },
    Step {
        delta: f64,
        reply: oneshot::Sender<f64>,
    },
    Move {
        duration: f64,
        reply: oneshot::Sender<()>,
    },
    SetMode {
        mode: TickMode,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<DriverStatus>,
    },
    Summary {
        reply: oneshot::Sender<SimulationSummary>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub(crate) struct DriverWorker {
    simulation: Simulation,
    config: DriverConfig,
    command_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<CombatEvent>,
    paused: bool,
    last_tick: Instant,
}

impl DriverWorker {
    pub(crate) fn new(
        simulation: Simulation,
        config: DriverConfig,
        command_rx: mpsc::Receiver<Command>,
        event_tx: broadcast::Sender<CombatEvent>,
    ) -> Self {
        tracing::info!(mode = ?config.mode, speed = config.speed, "driver started");
        Self {
            paused: config.mode == TickMode::RealTimeAutoPause && simulation.is_ready(),
            simulation,
            config,
            command_rx,
            event_tx,
            last_tick: Instant::now(),
        }
    }

    /// Main loop. Returns the simulation once shut down or orphaned.
    pub(crate) async fn run(mut self) -> Simulation {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                _ = ticker.tick() => self.on_tick(),
            }
            self.publish();
        }

        debug!(time = self.simulation.now(), "driver stopped");
        self.simulation
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        let delta = elapsed * self.config.speed;
        match self.config.mode {
            TickMode::Manual => {}
            TickMode::RealTime => {
                self.simulation.advance(delta);
            }
            TickMode::RealTimeAutoPause => {
                if self.paused {
                    return;
                }
                self.simulation.advance_until_ready(delta);
                if self.simulation.is_ready() {
                    self.paused = true;
                    debug!(time = self.simulation.now(), "auto-paused");
                }
            }
        }
    }

    /// Returns false when the loop should stop.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Request { request, reply } => {
                let result = self.simulation.request(&request);
                if result.is_ok() {
                    self.paused = false;
                }
                if reply.send(result).is_err() {
                    debug!("Request reply channel closed (caller dropped)");
                }
            }
            Command::Step { delta, reply } => {
                let advanced = self.simulation.advance(delta);
                if reply.send(advanced).is_err() {
                    debug!("Step reply channel closed (caller dropped)");
                }
            }
            Command::Move { duration, reply } => {
                self.simulation.start_movement(duration);
                if reply.send(()).is_err() {
                    debug!("Move reply channel closed (caller dropped)");
                }
            }
            Command::SetMode { mode, reply } => {
                self.config.mode = mode;
                self.paused = mode == TickMode::RealTimeAutoPause && self.simulation.is_ready();
                self.last_tick = Instant::now();
                if reply.send(()).is_err() {
                    debug!("SetMode reply channel closed (caller dropped)");
                }
            }
            Command::Status { reply } => {
                if reply.send(self.status()).is_err() {
                    debug!("Status reply channel closed (caller dropped)");
                }
            }
            Command::Summary { reply } => {
                if reply.send(self.simulation.summary()).is_err() {
                    debug!("Summary reply channel closed (caller dropped)");
                }
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn status(&self) -> DriverStatus {
        let state = self.simulation.state();
        DriverStatus {
            now: self.simulation.now(),
            mode: self.config.mode,
            paused: self.paused,
            ready: self.simulation.is_ready(),
            settled: state.is_settled(),
            total_potency: self.simulation.stats().total_potency(),
        }
    }

    fn publish(&mut self) {
        for event in self.simulation.stats_mut().drain_log() {
            // No subscribers is fine.
            let _ = self.event_tx.send(event);
        }
    }
}
