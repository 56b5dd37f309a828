//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the driver task, repositories and the engine's
//! request validation so clients can bubble them up with consistent context.

use thiserror::Error;
use tokio::sync::oneshot;

use combat_core::{ConfigErrors, ValidationError};

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),

    #[error("request rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("replay entry {index} ({skill}) rejected at t={time:.3}")]
    Replay {
        index: usize,
        skill: String,
        time: f64,
        #[source]
        source: ValidationError,
    },

    #[error("record was made for job {expected}, simulation runs {actual}")]
    JobMismatch { expected: String, actual: String },

    #[error("driver command channel closed")]
    CommandChannelClosed,

    #[error("driver reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("driver task join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
