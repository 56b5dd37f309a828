//! Skill request errors.
//!
//! [`ValidationError`] rejects a request before anything is mutated.
//! [`CaptureError`] interrupts a cast that was already accepted.

use crate::error::{ErrorSeverity, SimError};
use crate::state::ResourceKey;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    #[error("unknown skill {skill}")]
    UnknownSkill { skill: String },

    #[error("target count must be at least 1")]
    NoTargets,

    #[error("still locked for {remaining:.3}s")]
    Locked { remaining: f64 },

    #[error("requirements of {skill} are not met")]
    RequirementsNotMet { skill: String },

    #[error("{skill} is on cooldown for {remaining:.3}s")]
    OnCooldown { skill: String, remaining: f64 },

    #[error("{skill} needs {required} {resource}, {available} available")]
    InsufficientResource {
        skill: String,
        resource: ResourceKey,
        required: f64,
        available: f64,
    },
}

impl SimError for ValidationError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Locked { .. }
            | Self::OnCooldown { .. }
            | Self::RequirementsNotMet { .. }
            | Self::InsufficientResource { .. } => ErrorSeverity::Recoverable,
            Self::UnknownSkill { .. } | Self::NoTargets => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSkill { .. } => "VALIDATION_UNKNOWN_SKILL",
            Self::NoTargets => "VALIDATION_NO_TARGETS",
            Self::Locked { .. } => "VALIDATION_LOCKED",
            Self::RequirementsNotMet { .. } => "VALIDATION_REQUIREMENTS_NOT_MET",
            Self::OnCooldown { .. } => "VALIDATION_ON_COOLDOWN",
            Self::InsufficientResource { .. } => "VALIDATION_INSUFFICIENT_RESOURCE",
        }
    }
}

// ============================================================================
// Capture Errors
// ============================================================================

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaptureError {
    #[error("requirements of {skill} no longer hold")]
    RequirementsLost { skill: String },

    #[error("{skill} needs {required} {resource} at capture, {available} available")]
    InsufficientResource {
        skill: String,
        resource: ResourceKey,
        required: f64,
        available: f64,
    },

    #[error("cast of {skill} was interrupted")]
    Interrupted { skill: String },
}

impl SimError for CaptureError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::RequirementsLost { .. } => "CAPTURE_REQUIREMENTS_LOST",
            Self::InsufficientResource { .. } => "CAPTURE_INSUFFICIENT_RESOURCE",
            Self::Interrupted { .. } => "CAPTURE_INTERRUPTED",
        }
    }
}
