//! Event scheduling and time advance.
//!
//! The [`Scheduler`] owns the clock and the pending-event arena. Advancing
//! time and interpreting fired events are methods on [`SimState`], since every
//! event mutates the state it was scheduled for.

mod event;
mod scheduler;

pub use event::{Event, EventId, EventKind};
pub use scheduler::Scheduler;

use crate::config::SimConfig;
use crate::env::SimContext;
use crate::state::{ResourceKey, SimState};

/// Time advance and event dispatch for SimState.
impl SimState {
    /// Advances simulated time by at most `delta`, firing due events in order.
    ///
    /// Each step moves to the earliest pending event (or the end of `delta`),
    /// counts every event down, restores cooldowns over the step and fires
    /// everything now due in insertion order. Events scheduled while firing
    /// become eligible in the next pass. After `delta` is used up, zero-delay
    /// chains keep firing until none remain.
    ///
    /// `early_stop` is checked before each step and after each firing pass.
    /// Returns the time actually advanced.
    pub fn advance<F>(&mut self, delta: f64, ctx: &mut SimContext<'_>, mut early_stop: F) -> f64
    where
        F: FnMut(&SimState) -> bool,
    {
        let delta = delta.max(0.0);
        let mut remaining = delta;

        loop {
            if early_stop(self) {
                break;
            }
            if self.scheduler.has_due() {
                self.fire_due(ctx);
                continue;
            }
            if remaining <= 0.0 {
                break;
            }
            let step = self
                .scheduler
                .next_due_in()
                .map_or(remaining, |due| due.clamp(0.0, remaining));
            self.elapse(step);
            remaining -= step;
        }

        delta - remaining
    }

    /// [`SimState::advance`] without an early stop.
    pub fn advance_by(&mut self, delta: f64, ctx: &mut SimContext<'_>) -> f64 {
        self.advance(delta, ctx, |_| false)
    }

    /// Advances until the state settles or `limit` seconds pass.
    pub fn run_until_settled(&mut self, limit: f64, ctx: &mut SimContext<'_>) -> f64 {
        self.advance(limit, ctx, SimState::is_settled)
    }

    fn elapse(&mut self, step: f64) {
        self.scheduler.elapse(step);
        for cooldown in self.cooldowns.values_mut() {
            cooldown.restore(step);
        }
    }

    fn fire_due(&mut self, ctx: &mut SimContext<'_>) {
        for id in self.scheduler.due_ids() {
            let Some(event) = self.scheduler.pop(id) else {
                continue;
            };
            if event.logged {
                tracing::debug!(%id, event = event.name, time = self.now(), "fire");
            } else {
                tracing::trace!(%id, event = event.name, time = self.now(), "fire");
            }
            self.fire(id, event.kind, ctx);
        }
    }

    fn fire(&mut self, id: EventId, kind: EventKind, ctx: &mut SimContext<'_>) {
        match kind {
            EventKind::RestoreResource { key, amount } => {
                self.settle_pending(&key, id);
                self.gain_resource(&key, amount);
            }
            EventKind::ExpireResource { key } => {
                self.settle_pending(&key, id);
                if let Some(resource) = self.resources.get_mut(&key) {
                    resource.overwrite(0.0);
                }
            }
            EventKind::OverrideTimer { key, new_delay } => {
                self.apply_timer_override(&key, new_delay);
            }
            EventKind::GainResource {
                key,
                amount,
                duration,
            } => match duration {
                Some(duration) => self.gain_with_timeout(&key, amount, duration),
                None => self.gain_resource(&key, amount),
            },
            EventKind::CaptureCast { action } => self.capture(action, ctx),
            EventKind::ApplyAction { action } => self.apply_action(action, ctx),
            EventKind::RecurringTick { key, instance } => self.on_recurring_tick(&key, instance, ctx),
            EventKind::RecurringExpire { key, instance } => {
                self.on_recurring_expire(&key, instance, ctx)
            }
            EventKind::ChannelTick { instance } => self.on_channel_tick(instance, ctx),
            EventKind::ManaTick => {
                self.gain_resource(&ResourceKey::MANA, SimConfig::MANA_TICK_AMOUNT);
                self.scheduler
                    .schedule(SimConfig::MANA_TICK_INTERVAL, EventKind::ManaTick);
            }
        }
    }

    fn settle_pending(&mut self, key: &ResourceKey, id: EventId) {
        if let Some(resource) = self.resources.get_mut(key) {
            resource.settle_pending(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::combat::NoPartyBuffs;
    use crate::env::{NullSink, SimRng};
    use crate::skill::JobDefinition;
    use crate::state::{CooldownDef, ResourceDef};

    fn state() -> SimState {
        let job = JobDefinition::new("tester")
            .with_resource(ResourceDef::new(ResourceKey::new("gauge"), 100.0))
            .with_cooldown(CooldownDef::new(ResourceKey::new("charges"), 10.0).with_stacks(2));
        SimState::new(Arc::new(job), SimConfig::new()).unwrap()
    }

    #[test]
    fn advance_never_overshoots() {
        let mut state = state();
        let mut rng = SimRng::from_seed_str("advance");
        let mut sink = NullSink;
        let mut ctx = SimContext::new(&mut rng, &mut sink, &NoPartyBuffs);

        let key = ResourceKey::new("gauge");
        state.schedule_resource_gain(0.7, &key, 10.0, None);
        state.schedule_resource_gain(2.2, &key, 10.0, None);

        let mut total = 0.0;
        for delta in [0.25, 0.5, 1.0, 0.0, 3.3] {
            let advanced = state.advance_by(delta, &mut ctx);
            assert!(advanced <= delta);
            assert!((advanced - delta).abs() < 1e-12);
            total += advanced;
        }
        assert!((state.now() - total).abs() < 1e-9);
        assert_eq!(state.resource_amount(&key), 20.0);
    }

    #[test]
    fn empty_schedule_advances_full_delta() {
        let mut state = state();
        let mut rng = SimRng::from_seed_str("advance");
        let mut sink = NullSink;
        let mut ctx = SimContext::new(&mut rng, &mut sink, &NoPartyBuffs);
        assert_eq!(state.advance_by(42.0, &mut ctx), 42.0);
        assert_eq!(state.now(), 42.0);
    }

    #[test]
    fn early_stop_halts_at_event() {
        let mut state = state();
        let mut rng = SimRng::from_seed_str("advance");
        let mut sink = NullSink;
        let mut ctx = SimContext::new(&mut rng, &mut sink, &NoPartyBuffs);

        let key = ResourceKey::new("gauge");
        state.schedule_resource_gain(1.5, &key, 50.0, None);
        let advanced = state.advance(10.0, &mut ctx, |s| s.resource_amount(&key) >= 50.0);
        assert_eq!(advanced, 1.5);
        assert_eq!(state.now(), 1.5);
    }

    #[test]
    fn same_instant_events_fire_in_insertion_order() {
        let mut state = state();
        let mut rng = SimRng::from_seed_str("advance");
        let mut sink = NullSink;
        let mut ctx = SimContext::new(&mut rng, &mut sink, &NoPartyBuffs);

        let key = ResourceKey::new("gauge");
        // Consume-first would clamp at zero; gain-first keeps 40 - 30 = 10.
        state.schedule_resource_gain(1.0, &key, 40.0, None);
        state.schedule_resource_gain(1.0, &key, -30.0, None);
        state.advance_by(1.0, &mut ctx);
        assert_eq!(state.resource_amount(&key), 10.0);
    }

    #[test]
    fn cooldowns_restore_continuously() {
        let mut state = state();
        let mut rng = SimRng::from_seed_str("advance");
        let mut sink = NullSink;
        let mut ctx = SimContext::new(&mut rng, &mut sink, &NoPartyBuffs);

        let key = ResourceKey::new("charges");
        state.cooldowns.get_mut(&key).unwrap().use_stack(1.0).unwrap();
        state.cooldowns.get_mut(&key).unwrap().use_stack(1.0).unwrap();
        state.advance_by(4.0, &mut ctx);
        assert!((state.cooldown(&key).unwrap().time_till_next_stack() - 6.0).abs() < 1e-9);
        state.advance_by(16.0, &mut ctx);
        assert_eq!(state.cooldown(&key).unwrap().stacks_available(), 2);
    }
}
