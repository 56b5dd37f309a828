//! Job definition loader.
//!
//! Loads a [`JobDefinition`] from RON and rejects definitions whose skills
//! reference resources or cooldown groups the job never declares, or whose
//! cooldowns cannot recharge.

use std::path::Path;

use combat_core::JobDefinition;

use crate::loaders::{LoadResult, read_file};

/// Loader for job definitions from RON files.
///
/// File format:
/// ```ron
/// (
///     name: "caster",
///     resources: [(key: "mana", max_value: 10000.0, initial: 10000.0)],
///     cooldowns: [(key: "manafont", recast: 100.0)],
///     skills: [
///         (
///             name: "fire",
///             kind: Spell,
///             cooldown_group: Some("gcd"),
///             aspect: Fire,
///             flags: "GCD",
///             base_cast_time: 2.5,
///             base_cost: Some((resource: "mana", amount: 800.0)),
///             base_potency: 180.0,
///         ),
///     ],
/// )
/// ```
pub struct JobLoader;

impl JobLoader {
    pub fn load(path: &Path) -> LoadResult<JobDefinition> {
        let content = read_file(path)?;
        let job = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))?;
        tracing::debug!(
            path = %path.display(),
            job = %job.name,
            skills = job.skills.len(),
            "loaded job definition"
        );
        Ok(job)
    }

    pub fn parse(content: &str) -> LoadResult<JobDefinition> {
        let job: JobDefinition = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse job RON: {}", e))?;

        let problems = job.dangling_references();
        if !problems.is_empty() {
            anyhow::bail!(
                "Job {} has dangling references: {}",
                job.name,
                problems.join("; ")
            );
        }

        for cooldown in &job.cooldowns {
            if !cooldown.recast.is_finite() || cooldown.recast <= 0.0 {
                anyhow::bail!(
                    "Job {} cooldown {} has recast {}, expected a positive number of seconds",
                    job.name,
                    cooldown.key,
                    cooldown.recast
                );
            }
            if cooldown.max_stacks == 0 {
                anyhow::bail!("Job {} cooldown {} has no stacks", job.name, cooldown.key);
            }
        }

        let mut names: Vec<&str> = job.skills.iter().map(|skill| skill.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            anyhow::bail!("Job {} defines skill {} twice", job.name, pair[0]);
        }

        Ok(job)
    }

    /// Caster job bundled with the crate.
    pub fn sample_caster() -> LoadResult<JobDefinition> {
        Self::parse(include_str!("../../data/jobs/sample_caster.ron"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use combat_core::{Aspect, ResourceKey, SkillEffect, SkillFlags, SkillKind};

    use super::*;

    #[test]
    fn bundled_sample_is_consistent() {
        let job = JobLoader::sample_caster().expect("Failed to load sample job");

        assert_eq!(job.name, "sample_caster");
        let fire = job.skill("fire").unwrap();
        assert_eq!(fire.kind, SkillKind::Spell);
        assert_eq!(fire.aspect, Aspect::Fire);
        assert!(fire.is_gcd());
        assert_eq!(fire.base_cast_time, 2.5);
        assert_eq!(fire.base_cost.as_ref().unwrap().amount, 800.0);

        let flare = job.skill("flare").unwrap();
        assert!(flare.flags.contains(SkillFlags::AOE));
        assert_eq!(flare.falloff, Some(0.3));

        let thunder = job.skill("thunder_iii").unwrap();
        assert!(thunder.effects.iter().any(|timed| matches!(
            timed.effect,
            SkillEffect::Recurring { ticks: 10, period, .. } if period == 3.0
        )));

        let mana = job.resource_def(&ResourceKey::MANA).unwrap();
        assert_eq!(mana.initial, 10_000.0);
        assert_eq!(job.cooldown_def(&ResourceKey::new("triplecast")).unwrap().max_stacks, 2);
    }

    #[test]
    fn period_and_stacks_default() {
        let job = JobLoader::parse(
            r#"(
                name: "healer",
                resources: [(key: "regen_ready", max_value: 1.0)],
                cooldowns: [(key: "benediction", recast: 180.0)],
                skills: [
                    (
                        name: "regen",
                        kind: Ability,
                        cooldown_group: Some("benediction"),
                        aspect: Healing,
                        effects: [
                            (timing: OnApplication, effect: Recurring(key: "regen", tick_potency: 250.0, ticks: 6)),
                        ],
                    ),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(job.cooldowns[0].max_stacks, 1);
        match &job.skill("regen").unwrap().effects[0].effect {
            SkillEffect::Recurring { period, .. } => assert_eq!(*period, 3.0),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let err = JobLoader::parse(
            r#"(
                name: "broken",
                skills: [
                    (
                        name: "fire",
                        kind: Spell,
                        cooldown_group: Some("gcd"),
                        aspect: Fire,
                        base_cost: Some((resource: "mana", amount: 400.0)),
                    ),
                ],
            )"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("dangling references"));
    }

    #[test]
    fn duplicate_skill_is_rejected() {
        let err = JobLoader::parse(
            r#"(
                name: "dup",
                skills: [
                    (name: "jolt", kind: Spell, aspect: Unaspected),
                    (name: "jolt", kind: Spell, aspect: Unaspected),
                ],
            )"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("defines skill jolt twice"));
    }

    #[test]
    fn cooldown_that_cannot_recharge_is_rejected() {
        for (cooldown, message) in [
            ("(key: \"swiftcast\", recast: 0.0)", "has recast 0"),
            ("(key: \"swiftcast\", recast: -60.0)", "has recast -60"),
            ("(key: \"swiftcast\", recast: 60.0, max_stacks: 0)", "has no stacks"),
        ] {
            let content = format!(r#"(name: "broken", cooldowns: [{cooldown}])"#);
            let err = JobLoader::parse(&content).unwrap_err();
            assert!(err.to_string().contains(message), "{cooldown}: {err}");
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(name: "empty", resources: [(key: "mana", max_value: 10000.0)])"#
        )
        .unwrap();

        let job = JobLoader::load(file.path()).unwrap();
        assert_eq!(job.name, "empty");
        assert!(job.skills.is_empty());
    }
}
