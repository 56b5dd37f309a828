use anyhow::{Context, Result, bail};
use combat_core::{SimError, SkillRequest, ValidationError};
use runtime::{FileRecordRepository, RecordRepository, Simulation};

use crate::cli::PlayArgs;
use crate::content::Content;
use crate::report;

/// Longest wait for a lock or cooldown before giving up on a skill.
const MAX_WAIT: f64 = 300.0;

/// Overshoot past a recharge so the restored stack is visible.
const COOLDOWN_SLACK: f64 = 1e-3;

pub fn execute(args: PlayArgs) -> Result<()> {
    let content = Content::load(&args.content)?;
    let mut sim = content.builder(content.config.clone()).build()?;

    for spec in &args.skills {
        let request = parse_request(spec)?;
        play(&mut sim, &request).with_context(|| format!("playing {spec}"))?;
    }
    sim.run_until_settled(args.output.settle);

    if let Some(name) = &args.save {
        let repo = FileRecordRepository::new(&args.records.records_dir)?;
        repo.save(name, sim.record())?;
        tracing::info!(
            "Saved {} requests as '{}' in {}",
            sim.record().len(),
            name,
            repo.base_dir().display()
        );
    }

    report::print(&sim.summary(), args.output.json)
}

/// `fire` or `flare@3`.
pub fn parse_request(spec: &str) -> Result<SkillRequest> {
    match spec.split_once('@') {
        None => Ok(SkillRequest::new(spec)),
        Some((skill, targets)) => {
            let targets: u32 = targets
                .parse()
                .with_context(|| format!("bad target count in {spec:?}"))?;
            Ok(SkillRequest::new(skill).with_targets(targets))
        }
    }
}

/// Waits out locks and cooldowns, then submits `request`.
fn play(sim: &mut Simulation, request: &SkillRequest) -> Result<()> {
    let start = sim.now();
    loop {
        sim.advance_until_ready(MAX_WAIT);
        match sim.request(request) {
            Ok(outcome) => {
                tracing::debug!(
                    skill = %request.skill,
                    time = sim.now(),
                    cast_time = outcome.cast_time,
                    "requested"
                );
                return Ok(());
            }
            Err(ValidationError::OnCooldown { remaining, .. })
                if sim.now() + remaining - start <= MAX_WAIT =>
            {
                sim.advance(remaining + COOLDOWN_SLACK);
            }
            Err(err) if err.severity().is_recoverable() => {
                bail!("{} not usable within {MAX_WAIT}s: {err}", request.skill)
            }
            Err(err) => bail!("{err} [{}]", err.error_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_target_counts() {
        let plain = parse_request("fire").unwrap();
        assert_eq!(plain, SkillRequest::new("fire"));

        let aoe = parse_request("flare@3").unwrap();
        assert_eq!(aoe.skill, "flare");
        assert_eq!(aoe.target_count, 3);

        assert!(parse_request("flare@many").is_err());
    }
}
