//! Single-run façade over [`SimState`].
//!
//! [`Simulation`] owns everything a run needs besides the job data: the
//! state, its RNG stream, the party-buff timeline, the statistics sink and
//! the record of accepted requests. It is the unit the driver and the replay
//! path both operate on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use combat_core::{
    InvariantViolation, JobDefinition, NoPartyBuffs, PartyBuffTimeline, RecurringAccounting,
    SimConfig, SimContext, SimError, SimRng, SimState, SkillRequest, UseOutcome, ValidationError,
};

use crate::api::{Result, RuntimeError};
use crate::repository::{ActionRecord, RecordEntry};
use crate::stats::{SkillTotals, StatsCollector};

/// Party buffs must be shareable with the driver task.
pub type SharedPartyBuffs = Box<dyn PartyBuffTimeline + Send + Sync>;

pub struct Simulation {
    state: SimState,
    rng: SimRng,
    party: SharedPartyBuffs,
    stats: StatsCollector,
    record: ActionRecord,
}

impl Simulation {
    pub fn builder(job: Arc<JobDefinition>) -> SimulationBuilder {
        SimulationBuilder::new(job)
    }

    pub fn now(&self) -> f64 {
        self.state.now()
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatsCollector {
        &mut self.stats
    }

    pub fn record(&self) -> &ActionRecord {
        &self.record
    }

    pub fn rng(&self) -> &SimRng {
        &self.rng
    }

    /// Submits a request at the current time. Accepted requests are recorded.
    pub fn request(
        &mut self,
        request: &SkillRequest,
    ) -> std::result::Result<UseOutcome, ValidationError> {
        let now = self.state.now();
        let mut ctx = SimContext::new(&mut self.rng, &mut self.stats, self.party.as_ref());
        let outcome = self.state.request_skill(request, &mut ctx)?;
        self.record.push(
            RecordEntry::new(request.skill.clone(), now).with_targets(request.target_count),
        );
        Ok(outcome)
    }

    pub fn advance(&mut self, delta: f64) -> f64 {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.stats, self.party.as_ref());
        self.state.advance_by(delta, &mut ctx)
    }

    /// Advances at most `limit` seconds, stopping as soon as a new request
    /// would pass the lock check.
    pub fn advance_until_ready(&mut self, limit: f64) -> f64 {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.stats, self.party.as_ref());
        self.state.advance(limit, &mut ctx, is_ready)
    }

    /// Advances to absolute time `time`; does nothing if it already passed.
    pub fn advance_to(&mut self, time: f64) -> f64 {
        let delta = time - self.now();
        if delta <= 0.0 {
            return 0.0;
        }
        self.advance(delta)
    }

    pub fn run_until_settled(&mut self, limit: f64) -> f64 {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.stats, self.party.as_ref());
        self.state.run_until_settled(limit, &mut ctx)
    }

    pub fn start_movement(&mut self, duration: f64) {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.stats, self.party.as_ref());
        self.state.start_movement(duration, &mut ctx);
    }

    pub fn interrupt(&mut self) {
        let mut ctx = SimContext::new(&mut self.rng, &mut self.stats, self.party.as_ref());
        self.state.interrupt(&mut ctx);
    }

    pub fn is_ready(&self) -> bool {
        is_ready(&self.state)
    }

    /// Plays every entry of `record` at its recorded time.
    ///
    /// Stops at the first rejected entry. The run is left where it stopped so
    /// the caller can still inspect it.
    pub fn replay(&mut self, record: &ActionRecord) -> Result<()> {
        if record.job != self.state.job().name {
            return Err(RuntimeError::JobMismatch {
                expected: record.job.clone(),
                actual: self.state.job().name.clone(),
            });
        }
        for (index, entry) in record.entries.iter().enumerate() {
            self.advance_to(entry.request_time);
            self.request(&entry.to_request())
                .map_err(|source| RuntimeError::Replay {
                    index,
                    skill: entry.skill_name.clone(),
                    time: self.state.now(),
                    source,
                })?;
        }
        tracing::info!(entries = record.entries.len(), time = self.now(), "replay finished");
        Ok(())
    }

    /// Books trailing recurring gaps and summarizes the run.
    pub fn summary(&mut self) -> SimulationSummary {
        let recurring = self
            .state
            .finalize_recurring()
            .into_iter()
            .map(|(key, accounting)| (key.to_string(), accounting))
            .collect();
        let resources = self
            .state
            .resources()
            .map(|resource| (resource.key().to_string(), resource.current_value()))
            .collect();
        let elapsed = self.now().max(0.0);
        let total_potency = self.stats.total_potency();

        SimulationSummary {
            job: self.state.job().name.clone(),
            seed: self.rng.seed().to_owned(),
            end_time: self.now(),
            total_potency,
            potency_per_second: if elapsed > 0.0 {
                total_potency / elapsed
            } else {
                0.0
            },
            pending_potency: self.stats.pending_potency(),
            skills: self.stats.skills().clone(),
            by_source: self.stats.by_source().clone(),
            recurring,
            resources,
            procs: self.stats.procs(),
            interrupts: self.stats.interrupts(),
            rng_draws: self.rng.draws(),
            diagnostics: self.state.diagnostics().iter().map(Diagnostic::from).collect(),
        }
    }
}

fn is_ready(state: &SimState) -> bool {
    state.time_till_next_action() <= SimConfig::EPSILON
}

/// End-of-run report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub job: String,
    pub seed: String,
    pub end_time: f64,
    pub total_potency: f64,
    /// Applied potency over time since combat start (countdown excluded).
    pub potency_per_second: f64,
    pub pending_potency: f64,
    pub skills: BTreeMap<String, SkillTotals>,
    pub by_source: BTreeMap<String, f64>,
    pub recurring: BTreeMap<String, RecurringAccounting>,
    pub resources: BTreeMap<String, f64>,
    pub procs: u32,
    pub interrupts: u32,
    pub rng_draws: u64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Invariant violation recorded during the run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: &'static str,
    pub message: String,
}

impl From<&InvariantViolation> for Diagnostic {
    fn from(violation: &InvariantViolation) -> Self {
        Self {
            code: violation.error_code(),
            severity: violation.severity().as_str(),
            message: violation.to_string(),
        }
    }
}

/// Builder for [`Simulation`].
pub struct SimulationBuilder {
    job: Arc<JobDefinition>,
    config: SimConfig,
    party: Option<SharedPartyBuffs>,
    keep_log: bool,
}

impl SimulationBuilder {
    fn new(job: Arc<JobDefinition>) -> Self {
        Self {
            job,
            config: SimConfig::new(),
            party: None,
            keep_log: false,
        }
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn party_buffs(mut self, party: impl PartyBuffTimeline + Send + Sync + 'static) -> Self {
        self.party = Some(Box::new(party));
        self
    }

    /// Keep every emitted event for [`StatsCollector::drain_log`].
    pub fn keep_log(mut self, keep: bool) -> Self {
        self.keep_log = keep;
        self
    }

    /// Validates the configuration against the job and builds the run.
    pub fn build(self) -> Result<Simulation> {
        let rng = SimRng::from_seed_str(&self.config.random_seed);
        let record = ActionRecord::new(self.job.name.clone(), self.config.clone());
        let state = SimState::new(self.job, self.config)?;
        tracing::debug!(job = %record.job, seed = rng.seed(), start = state.now(), "simulation built");

        Ok(Simulation {
            state,
            rng,
            party: self.party.unwrap_or_else(|| Box::new(NoPartyBuffs)),
            stats: if self.keep_log {
                StatsCollector::with_log()
            } else {
                StatsCollector::new()
            },
            record,
        })
    }
}
