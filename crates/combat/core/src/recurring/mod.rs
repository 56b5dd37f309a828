//! Recurring effects (DoT/HoT) and channels.
//!
//! At most one instance per [`RecurringKey`] is active. Reapplying replaces
//! the running instance with no gap: its remaining ticks and expiry are
//! canceled and the discarded duration is booked as override time.
//!
//! An uninterrupted stretch of coverage fires at most the applied tick count.
//! The replacement restarts the tick cadence at the reapplication instant and
//! fires only the ticks the stretch has left; partial tick progress is lost.

mod channel;

pub use channel::{ChannelEndReason, ChannelState};

use std::collections::BTreeMap;
use std::fmt;

use crate::action::ActionId;
use crate::combat::Potency;
use crate::config::SimConfig;
use crate::engine::{EventId, EventKind};
use crate::env::{CombatEvent, PotencySource, SimContext};
use crate::state::SimState;

/// Default tick period of DoTs and HoTs.
pub const DEFAULT_PERIOD: f64 = 3.0;
/// Tick period of channeled skills.
pub const CHANNEL_PERIOD: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecurringKey(String);

impl RecurringKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecurringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Running instance of a recurring effect.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurringInstance {
    pub instance: u64,
    pub action: ActionId,
    pub period: f64,
    /// Ticks this instance fires, after ticks spent earlier in the same
    /// coverage stretch are deducted.
    pub total_ticks: u32,
    pub ticks_fired: u32,
    /// Ticks fired by the instances this one replaced.
    pub carried_ticks: u32,
    pub applied_at: f64,
    pub expires_at: f64,
    template: Potency,
    next_tick: Option<EventId>,
    expiry: EventId,
}

/// Coverage bookkeeping for one key.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecurringAccounting {
    pub applications: u32,
    pub ticks: u32,
    pub total_potency: f64,
    /// Time without an active instance, from combat start.
    pub cumulative_gap: f64,
    /// Remaining duration thrown away by reapplications.
    pub cumulative_override: f64,
    /// Start of the current inactive stretch; `None` while active.
    inactive_since: Option<f64>,
}

impl RecurringAccounting {
    fn new() -> Self {
        Self {
            inactive_since: Some(0.0),
            ..Self::default()
        }
    }

    /// Gap accrued up to `now` without mutating. Time before 0 is not counted.
    pub fn gap_until(&self, now: f64) -> f64 {
        let trailing = self
            .inactive_since
            .map_or(0.0, |since| (now.max(0.0) - since.max(0.0)).max(0.0));
        self.cumulative_gap + trailing
    }

    fn close_gap(&mut self, now: f64) {
        self.cumulative_gap = self.gap_until(now);
        self.inactive_since = None;
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecurringManager {
    start: f64,
    next_instance: u64,
    active: BTreeMap<RecurringKey, RecurringInstance>,
    accounting: BTreeMap<RecurringKey, RecurringAccounting>,
}

impl RecurringManager {
    pub fn new(start: f64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn active(&self, key: &RecurringKey) -> Option<&RecurringInstance> {
        self.active.get(key)
    }

    pub fn is_active(&self, key: &RecurringKey) -> bool {
        self.active.contains_key(key)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn accounting(&self, key: &RecurringKey) -> Option<&RecurringAccounting> {
        self.accounting.get(key)
    }

    pub fn accounting_entries(&self) -> impl Iterator<Item = (&RecurringKey, &RecurringAccounting)> {
        self.accounting.iter()
    }

    pub(crate) fn allocate_instance(&mut self) -> u64 {
        let instance = self.next_instance;
        self.next_instance += 1;
        instance
    }
}

impl SimState {
    /// Installs a recurring effect, replacing any active instance of `key`.
    pub fn apply_recurring(
        &mut self,
        key: RecurringKey,
        action: ActionId,
        template: Potency,
        period: f64,
        total_ticks: u32,
        ctx: &mut SimContext<'_>,
    ) {
        let now = self.now();
        let mut overridden = 0.0;
        let mut carried_ticks = 0;

        if let Some(previous) = self.recurring.active.remove(&key) {
            if let Some(tick) = previous.next_tick {
                self.scheduler.cancel(tick);
            }
            self.scheduler.cancel(previous.expiry);
            overridden = (previous.expires_at - now).max(0.0);
            carried_ticks = previous.carried_ticks + previous.ticks_fired;
        }
        let total_ticks = total_ticks.saturating_sub(carried_ticks);

        let accounting = self
            .recurring
            .accounting
            .entry(key.clone())
            .or_insert_with(RecurringAccounting::new);
        accounting.close_gap(now);
        accounting.cumulative_override += overridden;
        accounting.applications += 1;

        let duration = period * f64::from(total_ticks);
        let instance = self.recurring.allocate_instance();
        let expiry = self.scheduler.schedule(
            duration,
            EventKind::RecurringExpire {
                key: key.clone(),
                instance,
            },
        );
        let next_tick = (total_ticks > 0).then(|| {
            self.scheduler.schedule(
                period,
                EventKind::RecurringTick {
                    key: key.clone(),
                    instance,
                },
            )
        });

        tracing::debug!(
            key = %key,
            instance,
            time = now,
            overridden,
            total_ticks,
            "recurring applied"
        );
        self.recurring.active.insert(
            key.clone(),
            RecurringInstance {
                instance,
                action,
                period,
                total_ticks,
                ticks_fired: 0,
                carried_ticks,
                applied_at: now,
                expires_at: now + duration,
                template,
                next_tick,
                expiry,
            },
        );
        ctx.emit(CombatEvent::RecurringApplied {
            key,
            time: now,
            overridden,
        });
    }

    pub(crate) fn on_recurring_tick(
        &mut self,
        key: &RecurringKey,
        instance: u64,
        ctx: &mut SimContext<'_>,
    ) {
        let now = self.now();
        let stats = self.stats;
        let Some(running) = self.recurring.active.get_mut(key) else {
            return;
        };
        if running.instance != instance {
            return;
        }

        running.next_tick = None;
        running.ticks_fired += 1;
        let mut tick = running.template.tick_copy();
        let action = running.action;
        if running.ticks_fired < running.total_ticks {
            running.next_tick = Some(self.scheduler.schedule(
                running.period,
                EventKind::RecurringTick {
                    key: key.clone(),
                    instance,
                },
            ));
        }

        let amount = match tick.resolve(now, &stats) {
            Ok(amount) => amount,
            Err(violation) => {
                self.report(violation);
                return;
            }
        };
        if let Some(accounting) = self.recurring.accounting.get_mut(key) {
            accounting.ticks += 1;
            accounting.total_potency += amount;
        }

        tracing::trace!(key = %key, instance, time = now, amount, "recurring tick");
        ctx.emit(CombatEvent::PotencyResolved {
            action,
            skill: tick.source_skill.clone(),
            aspect: tick.aspect,
            source: PotencySource::RecurringTick,
            amount,
            snapshot_time: tick.snapshot_time().unwrap_or(now),
            application_time: now,
        });
        if let Some(node) = self.actions.get_mut(action.0 as usize) {
            node.potencies.push(tick);
        }
    }

    pub(crate) fn on_recurring_expire(
        &mut self,
        key: &RecurringKey,
        instance: u64,
        ctx: &mut SimContext<'_>,
    ) {
        let Some(running) = self.recurring.active.get(key) else {
            return;
        };
        if running.instance != instance {
            return;
        }

        // The last tick lands on the expiry instant; it must not be lost.
        if let Some(tick) = running.next_tick
            && self
                .scheduler
                .time_till(tick)
                .is_some_and(|due| due <= SimConfig::EPSILON)
        {
            self.scheduler.cancel(tick);
            self.on_recurring_tick(key, instance, ctx);
        }

        let now = self.now();
        if let Some(running) = self.recurring.active.remove(key)
            && let Some(tick) = running.next_tick
        {
            self.scheduler.cancel(tick);
        }
        if let Some(accounting) = self.recurring.accounting.get_mut(key) {
            accounting.inactive_since = Some(now);
        }

        tracing::debug!(key = %key, instance, time = now, "recurring expired");
        ctx.emit(CombatEvent::RecurringExpired {
            key: key.clone(),
            time: now,
        });
    }

    /// Books the trailing gap of every key up to now and returns the totals.
    pub fn finalize_recurring(&mut self) -> BTreeMap<RecurringKey, RecurringAccounting> {
        let now = self.now();
        for accounting in self.recurring.accounting.values_mut() {
            if accounting.inactive_since.is_some() {
                accounting.cumulative_gap = accounting.gap_until(now);
                accounting.inactive_since = Some(now);
            }
        }
        self.recurring.accounting.clone()
    }
}
