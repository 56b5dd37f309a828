//! Resolves job, config and party inputs, falling back to bundled samples.

use std::sync::Arc;

use anyhow::{Context, Result};
use combat_content::{ConfigLoader, JobLoader, PartyBuffLoader};
use combat_core::{JobDefinition, PartyBuffWindows, SimConfig};
use runtime::{Simulation, SimulationBuilder};

use crate::cli::ContentArgs;

pub struct Content {
    pub job: Arc<JobDefinition>,
    pub config: SimConfig,
    pub party: Option<PartyBuffWindows>,
}

impl Content {
    pub fn load(args: &ContentArgs) -> Result<Self> {
        let job = match &args.job {
            Some(path) => JobLoader::load(path)?,
            None => JobLoader::sample_caster().context("bundled sample job")?,
        };
        let config = match &args.config {
            Some(path) => ConfigLoader::load(path)?,
            None => ConfigLoader::sample().context("bundled sample config")?,
        };
        let party = match &args.party {
            Some(path) => Some(PartyBuffLoader::load(path)?),
            None if args.sample_party => {
                Some(PartyBuffLoader::sample().context("bundled party windows")?)
            }
            None => None,
        };

        tracing::info!(
            job = %job.name,
            skills = job.skills.len(),
            seed = %config.random_seed,
            party_windows = party.as_ref().map_or(0, |p| p.windows().len()),
            "content loaded"
        );
        Ok(Self {
            job: Arc::new(job),
            config,
            party,
        })
    }

    /// Simulation builder for `config`, with the party windows attached.
    pub fn builder(&self, config: SimConfig) -> SimulationBuilder {
        let builder = Simulation::builder(self.job.clone()).config(config);
        match &self.party {
            Some(party) => builder.party_buffs(party.clone()),
            None => builder,
        }
    }
}
