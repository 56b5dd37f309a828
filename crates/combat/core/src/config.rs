use core::fmt;

use crate::error::{ErrorSeverity, SimError};
use crate::skill::JobDefinition;
use crate::state::ResourceKey;

/// Starting value of a job resource, applied once before the timeline begins.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceOverride {
    pub resource_key: ResourceKey,
    pub amount: f64,
    /// Remaining duration of a timed resource. Zero means no expiry.
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_remaining: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_enabled"))]
    pub enabled: bool,
}

#[cfg(feature = "serde")]
fn default_enabled() -> bool {
    true
}

impl ResourceOverride {
    pub fn new(resource_key: ResourceKey, amount: f64) -> Self {
        Self {
            resource_key,
            amount,
            time_remaining: 0.0,
            enabled: true,
        }
    }

    pub fn with_time_remaining(mut self, time_remaining: f64) -> Self {
        self.time_remaining = time_remaining;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Simulation configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    pub spell_speed: u32,
    pub skill_speed: u32,
    pub critical_hit: u32,
    pub direct_hit: u32,
    /// Lock taken by every skill, in seconds.
    pub animation_lock: f64,
    /// Extra lock added on top of a cast time, in seconds.
    pub caster_tax: f64,
    /// Delay before the first server mana tick.
    pub time_till_first_tick: f64,
    /// Pre-pull countdown; the timeline starts at `-countdown`.
    pub countdown: f64,
    pub random_seed: String,
    /// When disabled, procs with chance >= 1 always fire and every other proc never does.
    pub rng_procs_enabled: bool,
    pub initial_resource_overrides: Vec<ResourceOverride>,
}

impl SimConfig {
    // ===== engine constants =====
    /// Events within this distance of "now" are due.
    pub const EPSILON: f64 = 1e-6;
    /// Upper bound of the slidecast window; the window is `min(SLIDECAST_WINDOW, cast_time)`.
    pub const SLIDECAST_WINDOW: f64 = 0.5;
    pub const MANA_TICK_INTERVAL: f64 = 3.0;
    pub const MANA_TICK_AMOUNT: f64 = 200.0;
    /// Capacity of a potency's modifier list.
    pub const MAX_MODIFIERS: usize = 16;
    /// Substat value that yields base rates at level 100.
    pub const BASE_SUBSTAT: u32 = 420;
    /// Recast of the global cooldown before speed scaling.
    pub const BASE_GCD: f64 = 2.5;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ANIMATION_LOCK: f64 = 0.6;
    pub const DEFAULT_CASTER_TAX: f64 = 0.1;
    pub const DEFAULT_TIME_TILL_FIRST_TICK: f64 = 1.5;
    pub const DEFAULT_SPEED: u32 = 420;
    pub const DEFAULT_CRITICAL_HIT: u32 = 420;
    pub const DEFAULT_DIRECT_HIT: u32 = 420;
    pub const DEFAULT_SEED: &'static str = "default";

    pub fn new() -> Self {
        Self {
            spell_speed: Self::DEFAULT_SPEED,
            skill_speed: Self::DEFAULT_SPEED,
            critical_hit: Self::DEFAULT_CRITICAL_HIT,
            direct_hit: Self::DEFAULT_DIRECT_HIT,
            animation_lock: Self::DEFAULT_ANIMATION_LOCK,
            caster_tax: Self::DEFAULT_CASTER_TAX,
            time_till_first_tick: Self::DEFAULT_TIME_TILL_FIRST_TICK,
            countdown: 0.0,
            random_seed: Self::DEFAULT_SEED.to_owned(),
            rng_procs_enabled: true,
            initial_resource_overrides: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.random_seed = seed.into();
        self
    }

    pub fn with_substats(mut self, critical_hit: u32, direct_hit: u32) -> Self {
        self.critical_hit = critical_hit;
        self.direct_hit = direct_hit;
        self
    }

    pub fn with_speeds(mut self, spell_speed: u32, skill_speed: u32) -> Self {
        self.spell_speed = spell_speed;
        self.skill_speed = skill_speed;
        self
    }

    pub fn with_countdown(mut self, countdown: f64) -> Self {
        self.countdown = countdown;
        self
    }

    pub fn with_override(mut self, resource_override: ResourceOverride) -> Self {
        self.initial_resource_overrides.push(resource_override);
        self
    }

    pub fn with_rng_procs(mut self, enabled: bool) -> Self {
        self.rng_procs_enabled = enabled;
        self
    }

    /// Checks every field against the job the config will be applied to.
    ///
    /// All problems are collected so a loader can report them in one pass.
    pub fn validate(&self, job: &JobDefinition) -> Result<(), ConfigErrors> {
        let mut issues = Vec::new();

        check_timing(&mut issues, "animation_lock", self.animation_lock);
        check_timing(&mut issues, "caster_tax", self.caster_tax);
        check_timing(&mut issues, "countdown", self.countdown);
        check_timing(&mut issues, "time_till_first_tick", self.time_till_first_tick);
        if self.time_till_first_tick > Self::MANA_TICK_INTERVAL {
            issues.push(ConfigIssue::new(
                "time_till_first_tick",
                format!("must not exceed the {}s tick interval", Self::MANA_TICK_INTERVAL),
            ));
        }

        for (field, value) in [("spell_speed", self.spell_speed), ("skill_speed", self.skill_speed)] {
            if value == 0 {
                issues.push(ConfigIssue::new(field, "must be positive"));
            }
        }
        for (field, value) in [
            ("critical_hit", self.critical_hit),
            ("direct_hit", self.direct_hit),
        ] {
            if value < Self::BASE_SUBSTAT {
                issues.push(ConfigIssue::new(
                    field,
                    format!("must be at least {}", Self::BASE_SUBSTAT),
                ));
            }
        }

        let mut seen = Vec::new();
        for (index, entry) in self.initial_resource_overrides.iter().enumerate() {
            let prefix = format!("initial_resource_overrides[{index}]");
            if seen.contains(&&entry.resource_key) {
                issues.push(ConfigIssue::new(
                    prefix.clone(),
                    format!("duplicate override for {}", entry.resource_key),
                ));
            }
            seen.push(&entry.resource_key);

            let Some(def) = job.resource_def(&entry.resource_key) else {
                issues.push(ConfigIssue::new(
                    format!("{prefix}.resource_key"),
                    format!("{} is not a resource of {}", entry.resource_key, job.name),
                ));
                continue;
            };

            if !entry.amount.is_finite() || entry.amount < 0.0 || entry.amount > def.max_value {
                issues.push(ConfigIssue::new(
                    format!("{prefix}.amount"),
                    format!("{} is outside [0, {}]", entry.amount, def.max_value),
                ));
            }

            let max_timeout = def.max_timeout.unwrap_or(0.0);
            if !entry.time_remaining.is_finite()
                || entry.time_remaining < 0.0
                || entry.time_remaining > max_timeout
            {
                issues.push(ConfigIssue::new(
                    format!("{prefix}.time_remaining"),
                    format!("{} is outside [0, {}]", entry.time_remaining, max_timeout),
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigErrors { issues })
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn check_timing(issues: &mut Vec<ConfigIssue>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        issues.push(ConfigIssue::new(field, format!("{value} must be a non-negative number")));
    }
}

/// One field-level configuration problem.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every issue found by [`SimConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigErrors {
    pub issues: Vec<ConfigIssue>,
}

impl ConfigErrors {
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration ({} issue(s))", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

impl SimError for ConfigErrors {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        "CONFIG_INVALID"
    }
}
