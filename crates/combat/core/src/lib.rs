//! Deterministic discrete-event combat simulation.
//!
//! `combat-core` owns the rules: the event scheduler, resources and cooldowns,
//! the skill resolution protocol (snapshot at capture, numbers at
//! application), the potency-modifier algebra and recurring effects. All
//! state mutation flows through [`SimState`]; collaborators (RNG, outcome
//! sink, party buffs) are injected per call through [`SimContext`].
pub mod action;
pub mod combat;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod recurring;
pub mod skill;
pub mod state;

pub use action::{
    ActionId, ActionNode, CaptureError, CastState, SkillRequest, UseOutcome, ValidationError,
};
pub use combat::{
    Aspect, CritDhStats, ModifierKind, NoPartyBuffs, PartyBuff, PartyBuffTimeline,
    PartyBuffWindow, PartyBuffWindows, Potency, PotencyModifier,
};
pub use config::{ConfigErrors, ConfigIssue, ResourceOverride, SimConfig};
pub use engine::{Event, EventId, EventKind, Scheduler};
pub use env::{CombatEvent, EventSink, NullSink, PotencySource, SimContext, SimRng};
pub use error::{ErrorSeverity, InvariantViolation, SimError};
pub use recurring::{
    ChannelEndReason, ChannelState, RecurringAccounting, RecurringInstance, RecurringKey,
    RecurringManager,
};
pub use skill::{
    EffectTiming, JobDefinition, Requirement, Skill, SkillCost, SkillEffect, SkillFlags,
    SkillKind, SkillProc, TimedEffect,
};
pub use state::{Cooldown, CooldownDef, Resource, ResourceDef, ResourceKey, SimState};
