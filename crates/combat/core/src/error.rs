//! Common error infrastructure for combat-core.
//!
//! Domain-specific errors (e.g. `ValidationError`, `CaptureError`) live next to
//! the protocol they describe. This module holds the shared severity
//! classification and the soft [`InvariantViolation`] type.
//!
//! # Design Principles
//!
//! - **Type Safety**: Each stage has its own error type with specific variants
//! - **Severity Classification**: Errors are categorized for recovery strategies
//! - **Soft invariants**: A misconfigured skill never aborts the timeline; the
//!   violation is logged and recorded on the state instead

use crate::state::ResourceKey;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: The same request may succeed later on the timeline
/// - **Validation**: Invalid input that should be rejected without retry
/// - **Internal**: Skill-definition bugs surfaced as invariant violations
/// - **Fatal**: The simulation cannot start (e.g. invalid configuration)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - retry later on the timeline.
    ///
    /// Examples: skill on cooldown, animation lock still running
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: unknown skill, zero targets
    Validation,

    /// Internal error - a skill or job definition misused the engine.
    Internal,

    /// Fatal error - nothing can be simulated.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all combat-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait SimError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Misuse of the engine by a skill or job definition.
///
/// These never abort the simulation. [`crate::SimState`] logs them with
/// `tracing::warn!` and keeps them in its diagnostics list.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvariantViolation {
    #[error("consumed {requested} of {key} but only {available} was available")]
    OverConsume {
        key: ResourceKey,
        requested: f64,
        available: f64,
    },

    #[error("potency of {skill} resolved twice")]
    PotencyResolvedTwice { skill: String },

    #[error("timer override on {key} without a pending change")]
    NoPendingTimer { key: ResourceKey },

    #[error("resource {key} is not declared by the job")]
    UnknownResource { key: ResourceKey },

    #[error("modifier list of {skill} is full, dropped modifier from {source_name}")]
    ModifierOverflow { skill: String, source_name: String },

    #[error("event referenced unknown action #{action}")]
    UnknownAction { action: u32 },

    #[error("skill {skill} disappeared from the job definition")]
    UnknownSkill { skill: String },
}

impl SimError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        use InvariantViolation::*;
        match self {
            OverConsume { .. } => "INVARIANT_OVER_CONSUME",
            PotencyResolvedTwice { .. } => "INVARIANT_POTENCY_RESOLVED_TWICE",
            NoPendingTimer { .. } => "INVARIANT_NO_PENDING_TIMER",
            UnknownResource { .. } => "INVARIANT_UNKNOWN_RESOURCE",
            ModifierOverflow { .. } => "INVARIANT_MODIFIER_OVERFLOW",
            UnknownAction { .. } => "INVARIANT_UNKNOWN_ACTION",
            UnknownSkill { .. } => "INVARIANT_UNKNOWN_SKILL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ValidationError;

    #[test]
    fn waiting_fixes_only_recoverable_errors() {
        let cooldown = ValidationError::OnCooldown {
            skill: "manafont".into(),
            remaining: 12.0,
        };
        assert!(cooldown.severity().is_recoverable());
        assert_eq!(cooldown.error_code(), "VALIDATION_ON_COOLDOWN");

        let unknown = ValidationError::UnknownSkill {
            skill: "meteor".into(),
        };
        assert_eq!(unknown.severity().as_str(), "validation");
        assert!(!unknown.severity().is_recoverable());
    }

    #[test]
    fn violations_are_internal() {
        let violation = InvariantViolation::NoPendingTimer {
            key: ResourceKey::new("enochian"),
        };
        assert_eq!(violation.severity(), ErrorSeverity::Internal);
        assert_eq!(violation.severity().as_str(), "internal");
        assert_eq!(violation.error_code(), "INVARIANT_NO_PENDING_TIMER");
    }
}
