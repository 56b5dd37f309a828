//! Authoritative simulation state.
//!
//! [`SimState`] owns the clock, every resource and cooldown, the action
//! history and the recurring-effect bookkeeping. It is mutated only through
//! [`SimState::advance`] and [`SimState::request_skill`] (plus the explicit
//! resource primitives below, which the skill interpreter also uses).

mod cooldown;
mod resources;

pub use cooldown::{Cooldown, CooldownDef};
pub use resources::{Resource, ResourceDef, ResourceKey};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::{ActionId, ActionNode};
use crate::combat::{CritDhStats, PotencyModifier};
use crate::config::{ConfigErrors, SimConfig};
use crate::engine::{EventId, EventKind, Scheduler};
use crate::error::{InvariantViolation, SimError};
use crate::recurring::{ChannelState, RecurringManager};
use crate::skill::JobDefinition;

pub struct SimState {
    pub(crate) scheduler: Scheduler,
    pub(crate) job: Arc<JobDefinition>,
    pub(crate) config: SimConfig,
    pub(crate) stats: CritDhStats,
    pub(crate) resources: BTreeMap<ResourceKey, Resource>,
    pub(crate) cooldowns: BTreeMap<ResourceKey, Cooldown>,
    pub(crate) actions: Vec<ActionNode>,
    pub(crate) recurring: RecurringManager,
    pub(crate) channel: Option<ChannelState>,
    diagnostics: Vec<InvariantViolation>,
}

impl SimState {
    /// Validates `config` against `job` and builds the state at `-countdown`.
    pub fn new(job: Arc<JobDefinition>, config: SimConfig) -> Result<Self, ConfigErrors> {
        config.validate(&job)?;

        let mut resources: BTreeMap<ResourceKey, Resource> = ResourceKey::locks()
            .into_iter()
            .map(|key| (key.clone(), Resource::lock(key)))
            .collect();
        for def in &job.resources {
            resources.insert(def.key.clone(), Resource::from_def(def));
        }

        let mut cooldowns: BTreeMap<ResourceKey, Cooldown> = job
            .cooldowns
            .iter()
            .map(|def| (def.key.clone(), Cooldown::from_def(def)))
            .collect();
        cooldowns
            .entry(ResourceKey::GCD)
            .or_insert_with(|| Cooldown::new(ResourceKey::GCD, SimConfig::BASE_GCD, 1));

        let start = -config.countdown;
        let mut state = Self {
            scheduler: Scheduler::new(start),
            stats: CritDhStats::from_config(&config),
            recurring: RecurringManager::new(start),
            job,
            config,
            resources,
            cooldowns,
            actions: Vec::new(),
            channel: None,
            diagnostics: Vec::new(),
        };

        state.apply_overrides();
        if state.resources.contains_key(&ResourceKey::MANA) {
            state
                .scheduler
                .schedule(state.config.time_till_first_tick, EventKind::ManaTick);
        }
        Ok(state)
    }

    fn apply_overrides(&mut self) {
        let overrides = self.config.initial_resource_overrides.clone();
        for entry in overrides {
            let Some(resource) = self.resources.get_mut(&entry.resource_key) else {
                continue;
            };
            resource.overwrite(entry.amount);
            resource.set_enabled(entry.enabled);
            if entry.time_remaining > 0.0 {
                let id = self.scheduler.schedule(
                    entry.time_remaining,
                    EventKind::ExpireResource {
                        key: entry.resource_key.clone(),
                    },
                );
                resource.replace_pending(id);
            }
            tracing::debug!(resource = %entry.resource_key, amount = entry.amount, "applied initial override");
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn job(&self) -> &Arc<JobDefinition> {
        &self.job
    }

    pub fn crit_dh_stats(&self) -> &CritDhStats {
        &self.stats
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn resource(&self, key: &ResourceKey) -> Option<&Resource> {
        self.resources.get(key)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn cooldown(&self, key: &ResourceKey) -> Option<&Cooldown> {
        self.cooldowns.get(key)
    }

    pub fn cooldowns(&self) -> impl Iterator<Item = &Cooldown> {
        self.cooldowns.values()
    }

    /// Available amount of a resource; zero when unknown or disabled.
    pub fn resource_amount(&self, key: &ResourceKey) -> f64 {
        self.resources
            .get(key)
            .map_or(0.0, Resource::available_amount)
    }

    pub fn is_active(&self, key: &ResourceKey) -> bool {
        self.resources.get(key).is_some_and(Resource::is_active)
    }

    /// Remaining time of the resource's pending change, if any.
    pub fn resource_timer(&self, key: &ResourceKey) -> Option<f64> {
        let id = self.resources.get(key)?.pending()?;
        self.scheduler.time_till(id)
    }

    /// Remaining time of a binary lock; zero when free.
    pub fn lock_remaining(&self, key: &ResourceKey) -> f64 {
        if self.resource_amount(key) >= 1.0 - SimConfig::EPSILON {
            return 0.0;
        }
        self.resource_timer(key).unwrap_or(0.0).max(0.0)
    }

    /// Time until both the animation lock and the caster tax are released.
    pub fn time_till_next_action(&self) -> f64 {
        self.lock_remaining(&ResourceKey::ANIMATION_LOCK)
            .max(self.lock_remaining(&ResourceKey::CASTER_TAX))
    }

    pub fn action(&self, id: ActionId) -> Option<&ActionNode> {
        self.actions.get(id.0 as usize)
    }

    pub fn actions(&self) -> &[ActionNode] {
        &self.actions
    }

    pub fn recurring(&self) -> &RecurringManager {
        &self.recurring
    }

    pub fn channel(&self) -> Option<&ChannelState> {
        self.channel.as_ref()
    }

    /// Invariant violations recorded so far.
    pub fn diagnostics(&self) -> &[InvariantViolation] {
        &self.diagnostics
    }

    /// Every action resolved and nothing recurring or channeled is running.
    pub fn is_settled(&self) -> bool {
        self.actions.iter().all(ActionNode::is_resolved)
            && self.recurring.active_count() == 0
            && self.channel.is_none()
    }

    /// Modifiers contributed by the job's own resources that are currently held.
    pub fn own_buff_modifiers(&self) -> Vec<PotencyModifier> {
        self.job
            .resources
            .iter()
            .filter(|def| self.is_active(&def.key))
            .filter_map(|def| def.modifier.clone())
            .collect()
    }

    // ========================================================================
    // Resource primitives
    // ========================================================================

    pub fn gain_resource(&mut self, key: &ResourceKey, amount: f64) {
        match self.resources.get_mut(key) {
            Some(resource) => resource.gain(amount),
            None => self.report(InvariantViolation::UnknownResource { key: key.clone() }),
        }
    }

    pub fn consume_resource(&mut self, key: &ResourceKey, amount: f64) {
        let result = match self.resources.get_mut(key) {
            Some(resource) => resource.consume(amount),
            None => Err(InvariantViolation::UnknownResource { key: key.clone() }),
        };
        if let Err(violation) = result {
            self.report(violation);
        }
    }

    /// Drains a resource and drops its pending change.
    pub fn clear_resource(&mut self, key: &ResourceKey) {
        let Some(resource) = self.resources.get_mut(key) else {
            self.report(InvariantViolation::UnknownResource { key: key.clone() });
            return;
        };
        resource.overwrite(0.0);
        if let Some(id) = resource.take_pending() {
            self.scheduler.cancel(id);
        }
    }

    pub fn set_resource_enabled(&mut self, key: &ResourceKey, enabled: bool) {
        match self.resources.get_mut(key) {
            Some(resource) => resource.set_enabled(enabled),
            None => self.report(InvariantViolation::UnknownResource { key: key.clone() }),
        }
    }

    /// Gains `amount` and replaces the resource's pending expiry with one
    /// `duration` seconds from now (capped by the declared `max_timeout`).
    pub fn gain_with_timeout(&mut self, key: &ResourceKey, amount: f64, duration: f64) {
        let duration = match self.job.resource_def(key).and_then(|def| def.max_timeout) {
            Some(max_timeout) => duration.min(max_timeout),
            None => duration,
        };
        let Some(resource) = self.resources.get_mut(key) else {
            self.report(InvariantViolation::UnknownResource { key: key.clone() });
            return;
        };
        resource.gain(amount);
        let id = self
            .scheduler
            .schedule(duration, EventKind::ExpireResource { key: key.clone() });
        if let Some(previous) = resource.replace_pending(id) {
            self.scheduler.cancel(previous);
        }
    }

    /// Schedules a rewrite of the resource's pending change.
    ///
    /// Runs as a zero-delay event so it lands after everything else due now.
    pub fn override_timer(&mut self, key: &ResourceKey, new_delay: f64) -> EventId {
        self.scheduler.schedule(
            0.0,
            EventKind::OverrideTimer {
                key: key.clone(),
                new_delay,
            },
        )
    }

    pub(crate) fn apply_timer_override(&mut self, key: &ResourceKey, new_delay: f64) {
        let pending = self.resources.get(key).and_then(Resource::pending);
        match pending {
            Some(id) if self.scheduler.reschedule(id, new_delay) => {}
            _ => self.report(InvariantViolation::NoPendingTimer { key: key.clone() }),
        }
    }

    /// Takes a binary lock and schedules its release after `delay`.
    ///
    /// Taking a lock that is already held replaces the pending release.
    pub fn take_resource_lock(&mut self, key: &ResourceKey, delay: f64) {
        let Some(resource) = self.resources.get_mut(key) else {
            self.report(InvariantViolation::UnknownResource { key: key.clone() });
            return;
        };
        resource.overwrite(0.0);
        let id = self.scheduler.schedule(
            delay,
            EventKind::RestoreResource {
                key: key.clone(),
                amount: 1.0,
            },
        );
        if let Some(previous) = resource.replace_pending(id) {
            self.scheduler.cancel(previous);
        }
    }

    /// Releases a binary lock immediately.
    pub fn release_resource_lock(&mut self, key: &ResourceKey) {
        let Some(resource) = self.resources.get_mut(key) else {
            return;
        };
        resource.overwrite(1.0);
        if let Some(id) = resource.take_pending() {
            self.scheduler.cancel(id);
        }
    }

    /// Schedules a delayed gain, optionally timed.
    pub fn schedule_resource_gain(
        &mut self,
        delay: f64,
        key: &ResourceKey,
        amount: f64,
        duration: Option<f64>,
    ) -> EventId {
        self.scheduler.schedule(
            delay,
            EventKind::GainResource {
                key: key.clone(),
                amount,
                duration,
            },
        )
    }

    pub(crate) fn report(&mut self, violation: InvariantViolation) {
        tracing::warn!(
            code = violation.error_code(),
            severity = violation.severity().as_str(),
            time = self.now(),
            "{violation}"
        );
        self.diagnostics.push(violation);
    }
}
