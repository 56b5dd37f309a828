//! Skill resolution protocol.
//!
//! One [`ActionNode`] per accepted request. It walks
//! `Requested -> Validated -> (CastPending | InstantlyCaptured) -> Captured
//! -> ApplicationPending -> Applied | Interrupted` and owns every potency the
//! action produces, including recurring ticks.

mod error;
mod protocol;

pub use error::{CaptureError, ValidationError};
pub use protocol::{SkillRequest, UseOutcome};

use std::fmt;

use crate::combat::{Potency, PotencyModifier};
use crate::engine::EventId;
use crate::state::ResourceKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionId(pub u32);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastState {
    Requested,
    Validated,
    CastPending,
    InstantlyCaptured,
    Captured,
    ApplicationPending,
    Applied,
    Interrupted,
}

impl CastState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Interrupted)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionNode {
    pub id: ActionId,
    pub skill: String,
    pub target_count: u32,
    pub request_time: f64,
    pub state: CastState,
    /// Speed-adjusted cast time; zero for instant executions.
    pub cast_time: f64,
    pub capture_time: Option<f64>,
    pub application_time: Option<f64>,
    /// Cost actually deducted at capture.
    pub cost_paid: f64,
    /// Modifiers active at capture, reused by recurring ticks.
    pub buff_snapshot: Vec<PotencyModifier>,
    pub potencies: Vec<Potency>,
    pub failure: Option<CaptureError>,
    pub(crate) capture_event: Option<EventId>,
    /// Cooldown group a stack was taken from at request.
    pub(crate) cooldown_stack: Option<ResourceKey>,
    pub(crate) instant_proc: Option<ResourceKey>,
    pub(crate) free_proc: Option<ResourceKey>,
}

impl ActionNode {
    pub(crate) fn new(id: ActionId, skill: String, target_count: u32, request_time: f64) -> Self {
        Self {
            id,
            skill,
            target_count,
            request_time,
            state: CastState::Requested,
            cast_time: 0.0,
            capture_time: None,
            application_time: None,
            cost_paid: 0.0,
            buff_snapshot: Vec::new(),
            potencies: Vec::new(),
            failure: None,
            capture_event: None,
            cooldown_stack: None,
            instant_proc: None,
            free_proc: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }

    pub(crate) fn transition(&mut self, next: CastState) {
        tracing::trace!(action = %self.id, skill = %self.skill, from = %self.state, to = %next, "cast state");
        self.state = next;
    }
}
