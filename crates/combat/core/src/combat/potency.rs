//! Potency capture and resolution.
//!
//! A [`Potency`] is built when its skill is captured: the modifiers active at
//! that instant (own buffs and party buffs) are copied in and the snapshot time
//! is recorded. The number itself is computed later, once, at application.
//!
//! # Formula
//!
//! ```text
//! amount = base * target_multiplier * prod(damage_factor)
//!        * expected(crit_rate, dh_rate) / expected(base rates)
//!
//! expected(c, d)     = (1 + c * (crit_multiplier - 1)) * (1 + d * 0.25)
//! target_multiplier  = 1 + (targets - 1) * (1 - falloff)
//! ```
//!
//! Crit and direct-hit bonuses of all multiplicative modifiers are summed.
//! Auto-crit and auto-direct-hit are applied last: they replace the respective
//! rate with `1 + summed_bonus` and contribute no damage factor themselves.

use arrayvec::ArrayVec;

use crate::config::SimConfig;
use crate::error::InvariantViolation;

use super::CritDhStats;

// ============================================================================
// Aspect
// ============================================================================

/// Element or damage class of a skill, used by aspect-filtered modifiers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Aspect {
    Physical,
    Fire,
    Ice,
    Lightning,
    Earth,
    Wind,
    Water,
    Unaspected,
    Healing,
}

// ============================================================================
// Modifiers
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierKind {
    Multiplier,
    AutoCrit,
    AutoDirectHit,
    AutoCritDirectHit,
}

impl ModifierKind {
    pub fn forces_crit(self) -> bool {
        matches!(self, Self::AutoCrit | Self::AutoCritDirectHit)
    }

    pub fn forces_direct_hit(self) -> bool {
        matches!(self, Self::AutoDirectHit | Self::AutoCritDirectHit)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PotencyModifier {
    pub source: String,
    pub kind: ModifierKind,
    #[cfg_attr(feature = "serde", serde(default = "unit_factor"))]
    pub damage_factor: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub crit_bonus: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dh_bonus: f64,
    /// Only potencies of this aspect are affected. `None` affects every aspect.
    #[cfg_attr(feature = "serde", serde(default))]
    pub aspect: Option<Aspect>,
}

#[cfg(feature = "serde")]
fn unit_factor() -> f64 {
    1.0
}

impl PotencyModifier {
    pub fn multiplier(source: impl Into<String>, damage_factor: f64) -> Self {
        Self {
            source: source.into(),
            kind: ModifierKind::Multiplier,
            damage_factor,
            crit_bonus: 0.0,
            dh_bonus: 0.0,
            aspect: None,
        }
    }

    /// Rate-only modifier (e.g. a party crit buff).
    pub fn rates(source: impl Into<String>, crit_bonus: f64, dh_bonus: f64) -> Self {
        Self {
            crit_bonus,
            dh_bonus,
            ..Self::multiplier(source, 1.0)
        }
    }

    pub fn auto(source: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            kind,
            ..Self::multiplier(source, 1.0)
        }
    }

    /// Main-stat potion, modeled as one more multiplicative factor.
    pub fn tincture(damage_factor: f64) -> Self {
        Self::multiplier("tincture", damage_factor)
    }

    pub fn for_aspect(mut self, aspect: Aspect) -> Self {
        self.aspect = Some(aspect);
        self
    }

    pub fn applies_to(&self, aspect: Aspect) -> bool {
        self.aspect.is_none_or(|filter| filter == aspect)
    }
}

// ============================================================================
// Potency
// ============================================================================

/// Captured potency of one hit or one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Potency {
    pub source_skill: String,
    pub aspect: Aspect,
    pub base: f64,
    pub target_count: u32,
    /// Fraction lost per extra target. `None` means no falloff.
    pub falloff: Option<f64>,
    snapshot_time: Option<f64>,
    application_time: Option<f64>,
    modifiers: ArrayVec<PotencyModifier, { SimConfig::MAX_MODIFIERS }>,
}

impl Potency {
    pub fn new(source_skill: impl Into<String>, aspect: Aspect, base: f64) -> Self {
        Self {
            source_skill: source_skill.into(),
            aspect,
            base,
            target_count: 1,
            falloff: None,
            snapshot_time: None,
            application_time: None,
            modifiers: ArrayVec::new(),
        }
    }

    pub fn with_targets(mut self, target_count: u32, falloff: Option<f64>) -> Self {
        self.target_count = target_count.max(1);
        self.falloff = falloff;
        self
    }

    pub fn snapshot_time(&self) -> Option<f64> {
        self.snapshot_time
    }

    pub fn application_time(&self) -> Option<f64> {
        self.application_time
    }

    pub fn is_resolved(&self) -> bool {
        self.application_time.is_some()
    }

    pub fn modifiers(&self) -> &[PotencyModifier] {
        &self.modifiers
    }

    pub fn add_modifier(&mut self, modifier: PotencyModifier) -> Result<(), InvariantViolation> {
        if !modifier.applies_to(self.aspect) {
            return Ok(());
        }
        self.modifiers
            .try_push(modifier)
            .map_err(|err| InvariantViolation::ModifierOverflow {
                skill: self.source_skill.clone(),
                source_name: err.element().source,
            })
    }

    /// Records the snapshot time and copies in every modifier that applies.
    ///
    /// Modifiers past capacity are dropped; the first overflow is returned.
    pub fn snapshot<'m>(
        &mut self,
        time: f64,
        modifiers: impl IntoIterator<Item = &'m PotencyModifier>,
    ) -> Result<(), InvariantViolation> {
        self.snapshot_time = Some(time);
        let mut overflow = None;
        for modifier in modifiers {
            if let Err(violation) = self.add_modifier(modifier.clone()) {
                overflow.get_or_insert(violation);
            }
        }
        overflow.map_or(Ok(()), Err)
    }

    pub fn target_multiplier(&self) -> f64 {
        let extra = f64::from(self.target_count.saturating_sub(1));
        match self.falloff {
            Some(falloff) => 1.0 + extra * (1.0 - falloff),
            None => 1.0 + extra,
        }
    }

    /// Expected amount given the captured modifiers. Pure.
    pub fn amount(&self, stats: &CritDhStats) -> f64 {
        let mut factor = 1.0;
        let mut crit_bonus = 0.0;
        let mut dh_bonus = 0.0;
        let mut auto_crit = false;
        let mut auto_dh = false;

        for modifier in &self.modifiers {
            match modifier.kind {
                ModifierKind::Multiplier => {
                    factor *= modifier.damage_factor;
                    crit_bonus += modifier.crit_bonus;
                    dh_bonus += modifier.dh_bonus;
                }
                kind => {
                    auto_crit |= kind.forces_crit();
                    auto_dh |= kind.forces_direct_hit();
                }
            }
        }

        let crit_rate = if auto_crit {
            1.0 + crit_bonus
        } else {
            (stats.crit_rate + crit_bonus).min(1.0)
        };
        let dh_rate = if auto_dh {
            1.0 + dh_bonus
        } else {
            (stats.dh_rate + dh_bonus).min(1.0)
        };

        self.base * self.target_multiplier() * factor * stats.expected_multiplier(crit_rate, dh_rate)
            / stats.base_multiplier()
    }

    /// Finalizes the number at `time`. May only happen once.
    pub fn resolve(&mut self, time: f64, stats: &CritDhStats) -> Result<f64, InvariantViolation> {
        if self.application_time.is_some() {
            return Err(InvariantViolation::PotencyResolvedTwice {
                skill: self.source_skill.clone(),
            });
        }
        self.application_time = Some(time);
        Ok(self.amount(stats))
    }

    /// Fresh copy for one tick of a recurring effect: same snapshot, unresolved.
    pub fn tick_copy(&self) -> Self {
        Self {
            application_time: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn base_stats() -> CritDhStats {
        CritDhStats::from_substats(420, 420)
    }

    #[test]
    fn unmodified_potency_is_base() {
        let mut p = Potency::new("fire", Aspect::Fire, 180.0);
        assert!(approx(p.resolve(1.0, &base_stats()).unwrap(), 180.0));
    }

    #[test]
    fn multipliers_compose() {
        let mut p = Potency::new("fire", Aspect::Fire, 100.0);
        let mods = [
            PotencyModifier::multiplier("enochian", 1.2),
            PotencyModifier::tincture(1.05),
        ];
        p.snapshot(0.0, &mods).unwrap();
        assert!(approx(p.amount(&base_stats()), 126.0));
    }

    #[test]
    fn aspect_filter_skips_other_aspects() {
        let mut p = Potency::new("blizzard", Aspect::Ice, 100.0);
        let mods = [PotencyModifier::multiplier("astral_fire", 1.8).for_aspect(Aspect::Fire)];
        p.snapshot(0.0, &mods).unwrap();
        assert!(p.modifiers().is_empty());
        assert!(approx(p.amount(&base_stats()), 100.0));
    }

    #[test]
    fn crit_bonus_raises_expected_value() {
        let stats = base_stats();
        let mut p = Potency::new("fire", Aspect::Fire, 100.0);
        p.add_modifier(PotencyModifier::rates("battle_litany", 0.1, 0.0)).unwrap();
        // (1 + 0.15 * 0.4) / (1 + 0.05 * 0.4)
        assert!(approx(p.amount(&stats), 100.0 * 1.06 / 1.02));
    }

    #[test]
    fn auto_crit_direct_hit_is_applied_last() {
        let stats = base_stats();
        let mut p = Potency::new("fire", Aspect::Fire, 100.0);
        p.add_modifier(PotencyModifier::auto("inner_release", ModifierKind::AutoCritDirectHit))
            .unwrap();
        p.add_modifier(PotencyModifier::rates("battle_voice", 0.0, 0.2)).unwrap();
        p.add_modifier(PotencyModifier::rates("litany", 0.1, 0.0)).unwrap();
        // crit rate 1.1, dh rate 1.2
        let expected = 100.0 * (1.0 + 1.1 * 0.4) * (1.0 + 1.2 * 0.25) / 1.02;
        assert!(approx(p.amount(&stats), expected));
    }

    #[test]
    fn aoe_falloff() {
        let p = Potency::new("flare", Aspect::Fire, 240.0).with_targets(3, Some(0.7));
        assert!(approx(p.target_multiplier(), 1.6));
        let q = Potency::new("freeze", Aspect::Ice, 120.0).with_targets(3, None);
        assert!(approx(q.target_multiplier(), 3.0));
    }

    #[test]
    fn second_resolve_is_reported() {
        let stats = base_stats();
        let mut p = Potency::new("fire", Aspect::Fire, 100.0);
        p.resolve(1.0, &stats).unwrap();
        assert!(matches!(
            p.resolve(2.0, &stats),
            Err(InvariantViolation::PotencyResolvedTwice { .. })
        ));
        assert_eq!(p.application_time(), Some(1.0));
    }

    #[test]
    fn modifier_overflow_keeps_first_entries() {
        let mut p = Potency::new("fire", Aspect::Fire, 100.0);
        let mods: Vec<_> = (0..SimConfig::MAX_MODIFIERS + 2)
            .map(|i| PotencyModifier::multiplier(format!("m{i}"), 1.0))
            .collect();
        let err = p.snapshot(0.0, &mods).unwrap_err();
        assert_eq!(p.modifiers().len(), SimConfig::MAX_MODIFIERS);
        assert!(matches!(err, InvariantViolation::ModifierOverflow { source_name, .. }
            if source_name == format!("m{}", SimConfig::MAX_MODIFIERS)));
    }

    #[test]
    fn adding_past_capacity_is_an_error() {
        let mut p = Potency::new("fire", Aspect::Fire, 100.0);
        for i in 0..SimConfig::MAX_MODIFIERS {
            p.add_modifier(PotencyModifier::multiplier(format!("m{i}"), 1.01))
                .unwrap();
        }
        let err = p
            .add_modifier(PotencyModifier::multiplier("extra", 2.0))
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::ModifierOverflow { ref source_name, .. }
            if source_name == "extra"));
        assert_eq!(p.modifiers().len(), SimConfig::MAX_MODIFIERS);
        assert!(approx(p.amount(&base_stats()), 100.0 * 1.01f64.powi(16)));

        // A modifier for another aspect is skipped, not counted.
        let ice = PotencyModifier::multiplier("umbral", 2.0).for_aspect(Aspect::Ice);
        assert!(p.add_modifier(ice).is_ok());
    }
}
