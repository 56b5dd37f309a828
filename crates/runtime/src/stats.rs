//! Outcome aggregation.
//!
//! [`StatsCollector`] is the runtime's [`EventSink`]. It keeps running totals
//! per skill and per potency source, the expected potency that has been
//! captured but not applied yet, and an optional copy of every event for
//! subscribers.

use std::collections::BTreeMap;

use serde::Serialize;

use combat_core::{ActionId, CombatEvent, EventSink, PotencySource};

/// Totals for one skill.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SkillTotals {
    pub requests: u32,
    pub captures: u32,
    pub interrupts: u32,
    /// Resolved initial hits.
    pub hits: u32,
    pub ticks: u32,
    pub applied_potency: f64,
    pub cost_paid: f64,
}

#[derive(Default)]
pub struct StatsCollector {
    skills: BTreeMap<String, SkillTotals>,
    by_source: BTreeMap<String, f64>,
    pending: BTreeMap<ActionId, f64>,
    total_potency: f64,
    procs: u32,
    interrupts: u32,
    channel_breaks: u32,
    log: Option<Vec<CombatEvent>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keeps every event until [`StatsCollector::drain_log`] is called.
    pub fn with_log() -> Self {
        Self {
            log: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn total_potency(&self) -> f64 {
        self.total_potency
    }

    /// Expected potency captured but not yet applied.
    pub fn pending_potency(&self) -> f64 {
        self.pending.values().sum()
    }

    pub fn skill(&self, name: &str) -> Option<&SkillTotals> {
        self.skills.get(name)
    }

    pub fn skills(&self) -> &BTreeMap<String, SkillTotals> {
        &self.skills
    }

    /// Applied potency keyed by [`PotencySource`] name.
    pub fn by_source(&self) -> &BTreeMap<String, f64> {
        &self.by_source
    }

    pub fn procs(&self) -> u32 {
        self.procs
    }

    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }

    pub fn channel_breaks(&self) -> u32 {
        self.channel_breaks
    }

    pub fn drain_log(&mut self) -> Vec<CombatEvent> {
        self.log.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn totals(&mut self, skill: &str) -> &mut SkillTotals {
        self.skills.entry(skill.to_owned()).or_default()
    }
}

impl EventSink for StatsCollector {
    fn emit(&mut self, event: CombatEvent) {
        match &event {
            CombatEvent::SkillRequested { skill, .. } => self.totals(skill).requests += 1,
            CombatEvent::SkillCaptured {
                action,
                skill,
                cost,
                pending_potency,
                ..
            } => {
                let totals = self.totals(skill);
                totals.captures += 1;
                totals.cost_paid += cost;
                if *pending_potency > 0.0 {
                    self.pending.insert(*action, *pending_potency);
                }
            }
            CombatEvent::PotencyResolved {
                action,
                skill,
                source,
                amount,
                ..
            } => {
                let totals = self.totals(skill);
                totals.applied_potency += amount;
                match source {
                    PotencySource::Initial => totals.hits += 1,
                    PotencySource::RecurringTick | PotencySource::ChannelTick => totals.ticks += 1,
                }
                if *source == PotencySource::Initial {
                    self.pending.remove(action);
                }
                *self.by_source.entry(source.to_string()).or_default() += amount;
                self.total_potency += amount;
            }
            CombatEvent::ActionInterrupted { skill, .. } => {
                self.totals(skill).interrupts += 1;
                self.interrupts += 1;
            }
            CombatEvent::ProcTriggered { .. } => self.procs += 1,
            CombatEvent::ChannelEnded { reason, .. } => {
                if *reason != combat_core::ChannelEndReason::Completed {
                    self.channel_breaks += 1;
                }
            }
            CombatEvent::RecurringApplied { .. } | CombatEvent::RecurringExpired { .. } => {}
        }
        if let Some(log) = self.log.as_mut() {
            log.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use combat_core::Aspect;

    use super::*;

    fn resolved(action: u32, source: PotencySource, amount: f64) -> CombatEvent {
        CombatEvent::PotencyResolved {
            action: ActionId(action),
            skill: "fire".into(),
            aspect: Aspect::Fire,
            source,
            amount,
            snapshot_time: 0.0,
            application_time: 0.5,
        }
    }

    #[test]
    fn pending_clears_on_initial_resolution() {
        let mut stats = StatsCollector::new();
        stats.emit(CombatEvent::SkillCaptured {
            action: ActionId(0),
            skill: "fire".into(),
            time: 0.0,
            cost: 800.0,
            pending_potency: 180.0,
        });
        assert_eq!(stats.pending_potency(), 180.0);

        stats.emit(resolved(0, PotencySource::Initial, 180.0));
        stats.emit(resolved(0, PotencySource::RecurringTick, 35.0));

        assert_eq!(stats.pending_potency(), 0.0);
        assert_eq!(stats.total_potency(), 215.0);
        let fire = stats.skill("fire").unwrap();
        assert_eq!(fire.hits, 1);
        assert_eq!(fire.ticks, 1);
        assert_eq!(fire.cost_paid, 800.0);
        assert_eq!(stats.by_source()["recurring_tick"], 35.0);
    }

    #[test]
    fn log_is_opt_in() {
        let mut quiet = StatsCollector::new();
        quiet.emit(resolved(0, PotencySource::Initial, 1.0));
        assert!(quiet.drain_log().is_empty());

        let mut logged = StatsCollector::with_log();
        logged.emit(resolved(0, PotencySource::Initial, 1.0));
        assert_eq!(logged.drain_log().len(), 1);
        assert!(logged.drain_log().is_empty());
    }
}
