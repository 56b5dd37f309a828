//! Substat formulas (level 100).
//!
//! # Formulas
//!
//! ```text
//! crit_points    = floor(200 * (critical_hit - SUB) / DIV)
//! crit_rate      = (crit_points + 50) / 1000
//! crit_multiplier= (1400 + crit_points) / 1000
//! dh_rate        = floor(550 * (direct_hit - SUB) / DIV) / 1000
//! speed_mod      = ceil(130 * (SUB - speed) / DIV)
//! adjusted(base) = floor(floor((1000 + speed_mod) * base_ms / 1000) / 10) / 100
//! ```

use crate::config::SimConfig;

/// Level-100 substat base.
pub const LEVEL_SUB: f64 = SimConfig::BASE_SUBSTAT as f64;
/// Level-100 substat divisor.
pub const LEVEL_DIV: f64 = 2780.0;
/// Damage bonus of a direct hit.
pub const DIRECT_HIT_BONUS: f64 = 0.25;

/// Base critical-hit and direct-hit rates derived from substats.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CritDhStats {
    pub crit_rate: f64,
    pub crit_multiplier: f64,
    pub dh_rate: f64,
}

impl CritDhStats {
    pub fn from_substats(critical_hit: u32, direct_hit: u32) -> Self {
        let crit_points = (200.0 * (f64::from(critical_hit) - LEVEL_SUB) / LEVEL_DIV).floor();
        let dh_points = (550.0 * (f64::from(direct_hit) - LEVEL_SUB) / LEVEL_DIV).floor();
        Self {
            crit_rate: (crit_points + 50.0) / 1000.0,
            crit_multiplier: (1400.0 + crit_points) / 1000.0,
            dh_rate: dh_points.max(0.0) / 1000.0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::from_substats(config.critical_hit, config.direct_hit)
    }

    /// Expected damage multiplier for the given rates.
    pub fn expected_multiplier(&self, crit_rate: f64, dh_rate: f64) -> f64 {
        (1.0 + crit_rate * (self.crit_multiplier - 1.0)) * (1.0 + dh_rate * DIRECT_HIT_BONUS)
    }

    /// Expected multiplier with no buffs.
    pub fn base_multiplier(&self) -> f64 {
        self.expected_multiplier(self.crit_rate, self.dh_rate)
    }
}

/// Applies spell or skill speed to a base duration in seconds.
pub fn speed_adjusted(base: f64, speed: u32) -> f64 {
    let base_ms = (base * 1000.0).round();
    let speed_mod = (130.0 * (LEVEL_SUB - f64::from(speed)) / LEVEL_DIV).ceil();
    let scaled = ((1000.0 + speed_mod) * base_ms / 1000.0).floor();
    (scaled / 10.0).floor() / 100.0
}

/// Ratio between the speed-adjusted and base duration, used as a recast scale.
pub fn speed_scale(base: f64, speed: u32) -> f64 {
    if base <= 0.0 {
        return 1.0;
    }
    speed_adjusted(base, speed) / base
}

/// Portion of a cast during which the caster may already act.
pub fn slidecast_window(cast_time: f64) -> f64 {
    cast_time.min(SimConfig::SLIDECAST_WINDOW).max(0.0)
}
