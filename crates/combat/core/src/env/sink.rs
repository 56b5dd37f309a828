use crate::action::{ActionId, CaptureError};
use crate::combat::Aspect;
use crate::recurring::{ChannelEndReason, RecurringKey};
use crate::state::ResourceKey;

/// Where a resolved potency came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum PotencySource {
    Initial,
    RecurringTick,
    ChannelTick,
}

/// Observable outcome of the simulation, reported to an [`EventSink`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatEvent {
    SkillRequested {
        action: ActionId,
        skill: String,
        time: f64,
        cast_time: f64,
    },
    SkillCaptured {
        action: ActionId,
        skill: String,
        time: f64,
        cost: f64,
        /// Expected amount of the potencies captured and not yet applied.
        pending_potency: f64,
    },
    PotencyResolved {
        action: ActionId,
        skill: String,
        aspect: Aspect,
        source: PotencySource,
        amount: f64,
        snapshot_time: f64,
        application_time: f64,
    },
    ActionInterrupted {
        action: ActionId,
        skill: String,
        time: f64,
        reason: CaptureError,
    },
    ProcTriggered {
        resource: ResourceKey,
        time: f64,
    },
    RecurringApplied {
        key: RecurringKey,
        time: f64,
        /// Remaining duration discarded from the previous instance.
        overridden: f64,
    },
    RecurringExpired {
        key: RecurringKey,
        time: f64,
    },
    ChannelEnded {
        skill: String,
        time: f64,
        reason: ChannelEndReason,
    },
}

/// Statistics collaborator fed by the engine.
pub trait EventSink {
    fn emit(&mut self, event: CombatEvent);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: CombatEvent) {}
}

impl EventSink for Vec<CombatEvent> {
    fn emit(&mut self, event: CombatEvent) {
        self.push(event);
    }
}
