//! Runtime orchestration for the combat simulator.
//!
//! This crate wraps [`combat_core::SimState`] into runnable sessions: a
//! single-run [`Simulation`] with statistics and a request record, a
//! time-control [`Driver`] that advances it from a background task, and
//! repositories for saving and replaying action records.
//!
//! Modules are organized by responsibility:
//! - [`simulation`] hosts the run façade and its builder
//! - [`driver`] owns time control (real-time, auto-pause, manual)
//! - [`api`] exposes errors and request sources downstream clients use
//! - [`stats`] folds combat events into per-skill totals
//! - [`repository`] persists action records for replay
pub mod api;
pub mod driver;
pub mod repository;
pub mod simulation;
pub mod stats;

pub use api::{RequestSource, Result, RuntimeError, ScriptedSource};
pub use driver::{Driver, DriverConfig, DriverHandle, DriverStatus, TickMode};
pub use repository::{
    ActionRecord, FileRecordRepository, InMemoryRecordRepository, RecordEntry, RecordRepository,
    RepositoryError,
};
pub use simulation::{
    Diagnostic, SharedPartyBuffs, Simulation, SimulationBuilder, SimulationSummary,
};
pub use stats::{SkillTotals, StatsCollector};
