//! Simulation configuration loader.

use std::path::Path;

use combat_core::SimConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for simulation configuration from TOML files.
///
/// Missing fields fall back to [`SimConfig::new`] defaults. Type mismatches
/// (a string where a number is expected) fail here; range checks against a
/// job happen in [`SimConfig::validate`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<SimConfig> {
        let content = read_file(path)?;
        let config = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))?;
        tracing::debug!(path = %path.display(), seed = %config.random_seed, "loaded sim config");
        Ok(config)
    }

    pub fn parse(content: &str) -> LoadResult<SimConfig> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))
    }

    /// Configuration bundled with the crate.
    pub fn sample() -> LoadResult<SimConfig> {
        Self::parse(include_str!("../../data/config/sample.toml"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use combat_core::ResourceKey;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config, SimConfig::new());
    }

    #[test]
    fn overrides_parse_with_defaults() {
        let config = ConfigLoader::parse(
            r#"
            spell_speed = 1420
            random_seed = "pull-3"
            countdown = 5.0

            [[initial_resource_overrides]]
            resource_key = "mana"
            amount = 5000.0

            [[initial_resource_overrides]]
            resource_key = "firestarter"
            amount = 1.0
            time_remaining = 12.5
            "#,
        )
        .unwrap();

        assert_eq!(config.spell_speed, 1420);
        assert_eq!(config.skill_speed, SimConfig::DEFAULT_SPEED);
        assert_eq!(config.random_seed, "pull-3");
        assert_eq!(config.initial_resource_overrides.len(), 2);
        let mana = &config.initial_resource_overrides[0];
        assert_eq!(mana.resource_key, ResourceKey::MANA);
        assert_eq!(mana.time_remaining, 0.0);
        assert!(mana.enabled);
        assert_eq!(config.initial_resource_overrides[1].time_remaining, 12.5);
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let err = ConfigLoader::parse("critical_hit = \"lots\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config TOML"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "caster_tax = 0.2\nrng_procs_enabled = false").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.caster_tax, 0.2);
        assert!(!config.rng_procs_enabled);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = ConfigLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn bundled_sample_parses() {
        let config = ConfigLoader::sample().unwrap();
        assert!(!config.random_seed.is_empty());
    }
}
