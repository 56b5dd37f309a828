//! Request, capture and application of skills.
//!
//! - **Request**: validate without mutating, then consume the cooldown stack,
//!   take locks and either schedule the capture (cast) or capture now (instant)
//! - **Capture**: re-check, pay, snapshot buffs, build potencies, run
//!   capture-timed effects, schedule the application
//! - **Application**: resolve potencies and run application-timed effects

use std::sync::Arc;

use crate::combat::{Potency, PotencyModifier, slidecast_window, speed_adjusted, speed_scale};
use crate::config::SimConfig;
use crate::engine::EventKind;
use crate::env::{CombatEvent, PotencySource, SimContext};
use crate::error::InvariantViolation;
use crate::recurring::ChannelEndReason;
use crate::skill::{EffectTiming, Skill, SkillEffect, SkillFlags};
use crate::state::{ResourceKey, SimState};

use super::{ActionId, ActionNode, CaptureError, CastState, ValidationError};

/// User request to use a skill.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillRequest {
    pub skill: String,
    pub target_count: u32,
}

impl SkillRequest {
    pub fn new(skill: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            target_count: 1,
        }
    }

    pub fn with_targets(mut self, target_count: u32) -> Self {
        self.target_count = target_count;
        self
    }
}

/// Result of an accepted request.
#[derive(Clone, Debug, PartialEq)]
pub struct UseOutcome {
    pub action: ActionId,
    pub state: CastState,
    pub cast_time: f64,
    /// Potency already resolved by the time the request returned.
    pub applied_potency: f64,
    /// Expected potency captured but not yet applied.
    pub pending_potency: f64,
}

/// Procs that change how a request is executed.
#[derive(Clone, Debug, Default, PartialEq)]
struct ActiveProcs {
    instant: Option<ResourceKey>,
    free: Option<ResourceKey>,
}

impl SimState {
    /// Validates and starts a skill.
    ///
    /// Nothing is mutated when validation fails. An accepted request cancels
    /// any active channel.
    pub fn request_skill(
        &mut self,
        request: &SkillRequest,
        ctx: &mut SimContext<'_>,
    ) -> Result<UseOutcome, ValidationError> {
        let job = Arc::clone(&self.job);
        let Some(skill) = job.skill(&request.skill) else {
            return Err(ValidationError::UnknownSkill {
                skill: request.skill.clone(),
            });
        };

        let procs = match self.validate_request(skill, request) {
            Ok(procs) => procs,
            Err(err) => {
                tracing::debug!(skill = %skill.name, time = self.now(), "request rejected: {err}");
                return Err(err);
            }
        };

        self.cancel_channel(ChannelEndReason::NewSkill, ctx);

        let now = self.now();
        let id = ActionId(self.actions.len() as u32);
        let mut node = ActionNode::new(id, skill.name.clone(), request.target_count, now);
        node.transition(CastState::Validated);

        if let Some(group) = &skill.cooldown_group
            && self.use_cooldown_stack(skill, group)
        {
            node.cooldown_stack = Some(group.clone());
        }

        let instant_proc = if skill.is_cast() { procs.instant } else { None };
        if let Some(proc_key) = &instant_proc {
            self.consume_resource(proc_key, 1.0);
        }
        let cast_time = match (&instant_proc, skill.is_cast()) {
            (None, true) => skill
                .speed_stat(&self.config)
                .map_or(skill.base_cast_time, |speed| speed_adjusted(skill.base_cast_time, speed)),
            _ => 0.0,
        };
        node.cast_time = cast_time;
        node.instant_proc = instant_proc;
        node.free_proc = procs.free;

        self.take_resource_lock(&ResourceKey::ANIMATION_LOCK, self.config.animation_lock);
        ctx.emit(CombatEvent::SkillRequested {
            action: id,
            skill: skill.name.clone(),
            time: now,
            cast_time,
        });

        if cast_time > 0.0 {
            self.take_resource_lock(&ResourceKey::CASTER_TAX, cast_time + self.config.caster_tax);
            node.transition(CastState::CastPending);
            let capture_in = cast_time - slidecast_window(cast_time);
            node.capture_event = Some(
                self.scheduler
                    .schedule(capture_in, EventKind::CaptureCast { action: id }),
            );
            self.actions.push(node);
            tracing::debug!(%id, skill = %skill.name, time = now, cast_time, "cast started");
        } else {
            node.transition(CastState::InstantlyCaptured);
            self.actions.push(node);
            self.capture(id, ctx);
        }

        Ok(self.outcome(id))
    }

    fn validate_request(
        &self,
        skill: &Skill,
        request: &SkillRequest,
    ) -> Result<ActiveProcs, ValidationError> {
        if request.target_count == 0 {
            return Err(ValidationError::NoTargets);
        }

        let remaining = self.time_till_next_action();
        if remaining > SimConfig::EPSILON {
            return Err(ValidationError::Locked { remaining });
        }

        if !skill.is_available(self) {
            if !skill.requirements_hold(self) {
                return Err(ValidationError::RequirementsNotMet {
                    skill: skill.name.clone(),
                });
            }
            let remaining = skill
                .cooldown_group
                .as_ref()
                .and_then(|group| self.cooldown(group))
                .map_or(0.0, |cooldown| cooldown.time_till_any_stack());
            return Err(ValidationError::OnCooldown {
                skill: skill.name.clone(),
                remaining,
            });
        }

        let procs = self.active_procs(skill);
        if let Some(cost) = &skill.base_cost
            && procs.free.is_none()
        {
            let available = self.resource_amount(&cost.resource);
            if available + SimConfig::EPSILON < cost.amount {
                return Err(ValidationError::InsufficientResource {
                    skill: skill.name.clone(),
                    resource: cost.resource.clone(),
                    required: cost.amount,
                    available,
                });
            }
        }

        Ok(procs)
    }

    fn active_procs(&self, skill: &Skill) -> ActiveProcs {
        let mut procs = ActiveProcs::default();
        for held in skill.procs.iter().filter(|p| self.is_active(&p.resource)) {
            if held.makes_instant && procs.instant.is_none() {
                procs.instant = Some(held.resource.clone());
            }
            if held.makes_free && procs.free.is_none() {
                procs.free = Some(held.resource.clone());
            }
        }
        procs
    }

    /// Takes one stack from `group`. Returns false if the use was reported as
    /// a violation.
    fn use_cooldown_stack(&mut self, skill: &Skill, group: &ResourceKey) -> bool {
        let speed = skill.speed_stat(&self.config);
        let result = match self.cooldowns.get_mut(group) {
            Some(cooldown) => {
                let scale = match speed {
                    Some(speed) if skill.is_gcd() => speed_scale(cooldown.cd_per_stack(), speed),
                    _ => 1.0,
                };
                cooldown.use_stack(scale)
            }
            None => Err(InvariantViolation::UnknownResource { key: group.clone() }),
        };
        match result {
            Ok(()) => true,
            Err(violation) => {
                self.report(violation);
                false
            }
        }
    }

    fn outcome(&self, id: ActionId) -> UseOutcome {
        let stats = self.stats;
        let node = &self.actions[id.0 as usize];
        let (applied, pending) = node.potencies.iter().fold((0.0, 0.0), |(a, p), potency| {
            if potency.is_resolved() {
                (a + potency.amount(&stats), p)
            } else {
                (a, p + potency.amount(&stats))
            }
        });
        UseOutcome {
            action: id,
            state: node.state,
            cast_time: node.cast_time,
            applied_potency: applied,
            pending_potency: pending,
        }
    }

    // ========================================================================
    // Capture
    // ========================================================================

    pub(crate) fn capture(&mut self, id: ActionId, ctx: &mut SimContext<'_>) {
        let job = Arc::clone(&self.job);
        let Some(node) = self.actions.get_mut(id.0 as usize) else {
            self.report(InvariantViolation::UnknownAction { action: id.0 });
            return;
        };
        if !matches!(node.state, CastState::CastPending | CastState::InstantlyCaptured) {
            return;
        }
        node.capture_event = None;
        let target_count = node.target_count;
        let instant_proc = node.instant_proc.clone();
        let free_proc = node.free_proc.clone();
        let skill_name = node.skill.clone();

        let Some(skill) = job.skill(&skill_name) else {
            self.report(InvariantViolation::UnknownSkill { skill: skill_name });
            return;
        };

        // A proc that already instantized this cast also covers its cost.
        let free = match &free_proc {
            Some(key) if instant_proc.as_ref() == Some(key) => true,
            Some(key) => self.is_active(key),
            None => false,
        };

        if !skill.requirements_hold(self) {
            self.interrupt_action(
                id,
                CaptureError::RequirementsLost {
                    skill: skill.name.clone(),
                },
                ctx,
            );
            return;
        }
        if let Some(cost) = &skill.base_cost
            && !free
        {
            let available = self.resource_amount(&cost.resource);
            if available + SimConfig::EPSILON < cost.amount {
                self.interrupt_action(
                    id,
                    CaptureError::InsufficientResource {
                        skill: skill.name.clone(),
                        resource: cost.resource.clone(),
                        required: cost.amount,
                        available,
                    },
                    ctx,
                );
                return;
            }
        }

        let now = self.now();
        let mut cost_paid = 0.0;
        if free {
            if let Some(key) = &free_proc
                && instant_proc.as_ref() != Some(key)
            {
                self.consume_resource(key, 1.0);
            }
        } else if let Some(cost) = &skill.base_cost {
            self.consume_resource(&cost.resource, cost.amount);
            cost_paid = cost.amount;
        }

        let mut modifiers = self.own_buff_modifiers();
        modifiers.extend(
            ctx.party_buffs
                .buffs_active_at(now)
                .into_iter()
                .map(|buff| buff.modifier),
        );

        let mut potencies = Vec::new();
        if skill.base_potency > 0.0 {
            let targets = if skill.flags.contains(SkillFlags::AOE) {
                target_count
            } else {
                1
            };
            let mut potency = Potency::new(skill.name.clone(), skill.aspect, skill.base_potency)
                .with_targets(targets, skill.falloff);
            if let Err(violation) = potency.snapshot(now, &modifiers) {
                self.report(violation);
            }
            potencies.push(potency);
        }

        let node = &mut self.actions[id.0 as usize];
        node.capture_time = Some(now);
        node.cost_paid = cost_paid;
        node.buff_snapshot = modifiers;
        node.potencies = potencies;
        node.transition(CastState::Captured);

        for effect in skill.effects_at(EffectTiming::OnCapture) {
            self.run_effect(id, skill, effect, ctx);
        }

        let stats = self.stats;
        let node = &mut self.actions[id.0 as usize];
        node.transition(CastState::ApplicationPending);
        let pending_potency: f64 = node.potencies.iter().map(|p| p.amount(&stats)).sum();
        self.scheduler
            .schedule(skill.application_delay, EventKind::ApplyAction { action: id });

        tracing::debug!(%id, skill = %skill.name, time = now, cost_paid, pending_potency, "captured");
        ctx.emit(CombatEvent::SkillCaptured {
            action: id,
            skill: skill.name.clone(),
            time: now,
            cost: cost_paid,
            pending_potency,
        });
    }

    /// Ends an uncaptured action without paying its cost.
    ///
    /// The cooldown stack and instant proc taken at request are given back.
    pub(crate) fn interrupt_action(
        &mut self,
        id: ActionId,
        reason: CaptureError,
        ctx: &mut SimContext<'_>,
    ) {
        let Some(node) = self.actions.get_mut(id.0 as usize) else {
            return;
        };
        node.failure = Some(reason.clone());
        node.transition(CastState::Interrupted);
        let skill = node.skill.clone();
        let cooldown_stack = node.cooldown_stack.take();
        let instant_proc = node.instant_proc.take();
        if let Some(event) = node.capture_event.take() {
            self.scheduler.cancel(event);
        }
        self.release_resource_lock(&ResourceKey::CASTER_TAX);

        if let Some(group) = &cooldown_stack {
            match self.cooldowns.get_mut(group) {
                Some(cooldown) => cooldown.refund_stack(),
                None => self.report(InvariantViolation::UnknownResource { key: group.clone() }),
            }
        }
        if let Some(proc_key) = &instant_proc {
            self.gain_resource(proc_key, 1.0);
        }

        let now = self.now();
        tracing::info!(%id, skill = %skill, time = now, "interrupted: {reason}");
        ctx.emit(CombatEvent::ActionInterrupted {
            action: id,
            skill,
            time: now,
            reason,
        });
    }

    /// Interrupts the cast in progress, if any.
    pub fn interrupt_cast(&mut self, ctx: &mut SimContext<'_>) -> bool {
        let casting = self
            .actions
            .iter()
            .rev()
            .find(|node| node.state == CastState::CastPending)
            .map(|node| (node.id, node.skill.clone()));
        match casting {
            Some((id, skill)) => {
                self.interrupt_action(id, CaptureError::Interrupted { skill }, ctx);
                true
            }
            None => false,
        }
    }

    /// External interruption: stops the cast in progress and any channel.
    pub fn interrupt(&mut self, ctx: &mut SimContext<'_>) {
        self.interrupt_cast(ctx);
        self.cancel_channel(ChannelEndReason::Interrupted, ctx);
    }

    /// Starts moving for `duration` seconds. Movement breaks casts and channels.
    pub fn start_movement(&mut self, duration: f64, ctx: &mut SimContext<'_>) {
        self.take_resource_lock(&ResourceKey::MOVEMENT, duration);
        self.interrupt_cast(ctx);
        self.cancel_channel(ChannelEndReason::Movement, ctx);
    }

    // ========================================================================
    // Application
    // ========================================================================

    pub(crate) fn apply_action(&mut self, id: ActionId, ctx: &mut SimContext<'_>) {
        let job = Arc::clone(&self.job);
        let now = self.now();
        let stats = self.stats;
        let Some(node) = self.actions.get_mut(id.0 as usize) else {
            self.report(InvariantViolation::UnknownAction { action: id.0 });
            return;
        };
        if node.state != CastState::ApplicationPending {
            return;
        }
        node.application_time = Some(now);
        let skill_name = node.skill.clone();

        let mut resolved = Vec::new();
        let mut violations = Vec::new();
        for potency in node.potencies.iter_mut().filter(|p| !p.is_resolved()) {
            match potency.resolve(now, &stats) {
                Ok(amount) => resolved.push((
                    potency.aspect,
                    amount,
                    potency.snapshot_time().unwrap_or(now),
                )),
                Err(violation) => violations.push(violation),
            }
        }
        for violation in violations {
            self.report(violation);
        }
        for (aspect, amount, snapshot_time) in resolved {
            tracing::debug!(%id, skill = %skill_name, time = now, amount, "potency applied");
            ctx.emit(CombatEvent::PotencyResolved {
                action: id,
                skill: skill_name.clone(),
                aspect,
                source: PotencySource::Initial,
                amount,
                snapshot_time,
                application_time: now,
            });
        }

        match job.skill(&skill_name) {
            Some(skill) => {
                for effect in skill.effects_at(EffectTiming::OnApplication) {
                    self.run_effect(id, skill, effect, ctx);
                }
            }
            None => self.report(InvariantViolation::UnknownSkill { skill: skill_name }),
        }

        self.actions[id.0 as usize].transition(CastState::Applied);
    }

    // ========================================================================
    // Effect interpreter
    // ========================================================================

    fn run_effect(
        &mut self,
        id: ActionId,
        skill: &Skill,
        effect: &SkillEffect,
        ctx: &mut SimContext<'_>,
    ) {
        match effect {
            SkillEffect::Gain {
                resource,
                amount,
                duration,
            } => match duration {
                Some(duration) => self.gain_with_timeout(resource, *amount, *duration),
                None => self.gain_resource(resource, *amount),
            },
            SkillEffect::Consume { resource, amount } => self.consume_resource(resource, *amount),
            SkillEffect::Clear { resource } => self.clear_resource(resource),
            SkillEffect::SetEnabled { resource, enabled } => {
                self.set_resource_enabled(resource, *enabled)
            }
            SkillEffect::RefreshTimer {
                resource,
                remaining,
            } => {
                self.override_timer(resource, *remaining);
            }
            SkillEffect::Recurring {
                key,
                tick_potency,
                ticks,
                period,
            } => {
                let template = self.tick_template(id, skill, *tick_potency);
                self.apply_recurring(key.clone(), id, template, *period, *ticks, ctx);
            }
            SkillEffect::Channel {
                tick_potency,
                ticks,
            } => {
                let template = self.tick_template(id, skill, *tick_potency);
                self.start_channel(id, skill.name.clone(), template, *ticks, ctx);
            }
            SkillEffect::Proc {
                resource,
                chance,
                duration,
            } => {
                let fired = if self.config.rng_procs_enabled {
                    ctx.rng.chance(*chance)
                } else {
                    *chance >= 1.0
                };
                if !fired {
                    return;
                }
                match duration {
                    Some(duration) => self.gain_with_timeout(resource, 1.0, *duration),
                    None => self.gain_resource(resource, 1.0),
                }
                tracing::debug!(%id, resource = %resource, time = self.now(), "proc");
                ctx.emit(CombatEvent::ProcTriggered {
                    resource: resource.clone(),
                    time: self.now(),
                });
            }
        }
    }

    /// Tick potency sharing the action's capture snapshot.
    fn tick_template(&mut self, id: ActionId, skill: &Skill, tick_potency: f64) -> Potency {
        let node = &self.actions[id.0 as usize];
        let snapshot_time = node.capture_time.unwrap_or(node.request_time);
        let modifiers: Vec<PotencyModifier> = node.buff_snapshot.clone();
        let mut template = Potency::new(skill.name.clone(), skill.aspect, tick_potency);
        if let Err(violation) = template.snapshot(snapshot_time, &modifiers) {
            self.report(violation);
        }
        template
    }
}
