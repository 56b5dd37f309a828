//! Static skill descriptors.
//!
//! Skills are plain data. Availability is a list of [`Requirement`]s and the
//! side effects are a list of [`SkillEffect`]s tagged with when they run; both
//! are interpreted by [`crate::SimState`].

mod job;

pub use job::JobDefinition;

use bitflags::bitflags;

use crate::combat::Aspect;
use crate::recurring::RecurringKey;
use crate::state::{ResourceKey, SimState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkillKind {
    Spell,
    Weaponskill,
    Ability,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SkillFlags: u8 {
        /// Shares the global cooldown; recast scales with speed.
        const GCD = 1 << 0;
        /// Hits every requested target.
        const AOE = 1 << 1;
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillCost {
    pub resource: ResourceKey,
    pub amount: f64,
}

/// Condition that must hold for a skill to be usable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Requirement {
    AtLeast { resource: ResourceKey, amount: f64 },
    Below { resource: ResourceKey, amount: f64 },
    Active { resource: ResourceKey },
    Inactive { resource: ResourceKey },
}

impl Requirement {
    pub fn resource(&self) -> &ResourceKey {
        match self {
            Requirement::AtLeast { resource, .. }
            | Requirement::Below { resource, .. }
            | Requirement::Active { resource }
            | Requirement::Inactive { resource } => resource,
        }
    }

    pub fn holds(&self, state: &SimState) -> bool {
        match self {
            Requirement::AtLeast { resource, amount } => {
                state.resource_amount(resource) + crate::SimConfig::EPSILON >= *amount
            }
            Requirement::Below { resource, amount } => state.resource_amount(resource) < *amount,
            Requirement::Active { resource } => state.is_active(resource),
            Requirement::Inactive { resource } => !state.is_active(resource),
        }
    }
}

/// Proc resource that changes how this skill is cast while it is held.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillProc {
    pub resource: ResourceKey,
    #[cfg_attr(feature = "serde", serde(default))]
    pub makes_instant: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub makes_free: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectTiming {
    OnCapture,
    OnApplication,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkillEffect {
    /// Adds to a resource; with a duration the gain replaces its expiry.
    Gain {
        resource: ResourceKey,
        amount: f64,
        #[cfg_attr(feature = "serde", serde(default))]
        duration: Option<f64>,
    },
    Consume {
        resource: ResourceKey,
        amount: f64,
    },
    /// Drains a resource and drops its pending change.
    Clear { resource: ResourceKey },
    SetEnabled {
        resource: ResourceKey,
        enabled: bool,
    },
    /// Sets the remaining time of the resource's pending change.
    RefreshTimer {
        resource: ResourceKey,
        remaining: f64,
    },
    /// Installs a recurring effect, replacing any active instance of `key`.
    Recurring {
        key: RecurringKey,
        tick_potency: f64,
        ticks: u32,
        #[cfg_attr(feature = "serde", serde(default = "default_period"))]
        period: f64,
    },
    Channel { tick_potency: f64, ticks: u32 },
    /// Rolls a proc; on success grants one stack of `resource`.
    Proc {
        resource: ResourceKey,
        chance: f64,
        #[cfg_attr(feature = "serde", serde(default))]
        duration: Option<f64>,
    },
}

impl SkillEffect {
    /// Resource touched by this effect, if any.
    pub fn resource(&self) -> Option<&ResourceKey> {
        match self {
            SkillEffect::Gain { resource, .. }
            | SkillEffect::Consume { resource, .. }
            | SkillEffect::Clear { resource }
            | SkillEffect::SetEnabled { resource, .. }
            | SkillEffect::RefreshTimer { resource, .. }
            | SkillEffect::Proc { resource, .. } => Some(resource),
            SkillEffect::Recurring { .. } | SkillEffect::Channel { .. } => None,
        }
    }
}

#[cfg(feature = "serde")]
fn default_period() -> f64 {
    crate::recurring::DEFAULT_PERIOD
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimedEffect {
    pub timing: EffectTiming,
    pub effect: SkillEffect,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    pub name: String,
    pub kind: SkillKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cooldown_group: Option<ResourceKey>,
    pub aspect: Aspect,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: SkillFlags,
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_cast_time: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_cost: Option<SkillCost>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_potency: f64,
    /// Fraction lost per extra target for AoE skills.
    #[cfg_attr(feature = "serde", serde(default))]
    pub falloff: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub application_delay: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub requirements: Vec<Requirement>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub procs: Vec<SkillProc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub effects: Vec<TimedEffect>,
}

impl Skill {
    fn base(name: impl Into<String>, kind: SkillKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cooldown_group: None,
            aspect: Aspect::Unaspected,
            flags: SkillFlags::empty(),
            base_cast_time: 0.0,
            base_cost: None,
            base_potency: 0.0,
            falloff: None,
            application_delay: 0.0,
            requirements: Vec::new(),
            procs: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// GCD spell; a zero cast time makes it instant.
    pub fn spell(name: impl Into<String>, base_cast_time: f64, base_potency: f64) -> Self {
        Self {
            cooldown_group: Some(ResourceKey::GCD),
            flags: SkillFlags::GCD,
            base_cast_time,
            base_potency,
            ..Self::base(name, SkillKind::Spell)
        }
    }

    pub fn weaponskill(name: impl Into<String>, base_potency: f64) -> Self {
        Self {
            cooldown_group: Some(ResourceKey::GCD),
            flags: SkillFlags::GCD,
            base_potency,
            ..Self::base(name, SkillKind::Weaponskill)
        }
    }

    /// Off-GCD ability on its own cooldown group.
    pub fn ability(name: impl Into<String>, cooldown_group: ResourceKey) -> Self {
        Self {
            cooldown_group: Some(cooldown_group),
            ..Self::base(name, SkillKind::Ability)
        }
    }

    pub fn with_aspect(mut self, aspect: Aspect) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_potency(mut self, base_potency: f64) -> Self {
        self.base_potency = base_potency;
        self
    }

    pub fn with_cost(mut self, resource: ResourceKey, amount: f64) -> Self {
        self.base_cost = Some(SkillCost { resource, amount });
        self
    }

    pub fn with_application_delay(mut self, delay: f64) -> Self {
        self.application_delay = delay;
        self
    }

    pub fn with_aoe(mut self, falloff: Option<f64>) -> Self {
        self.flags |= SkillFlags::AOE;
        self.falloff = falloff;
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_proc(mut self, proc_: SkillProc) -> Self {
        self.procs.push(proc_);
        self
    }

    pub fn on_capture(mut self, effect: SkillEffect) -> Self {
        self.effects.push(TimedEffect {
            timing: EffectTiming::OnCapture,
            effect,
        });
        self
    }

    pub fn on_application(mut self, effect: SkillEffect) -> Self {
        self.effects.push(TimedEffect {
            timing: EffectTiming::OnApplication,
            effect,
        });
        self
    }

    pub fn is_gcd(&self) -> bool {
        self.flags.contains(SkillFlags::GCD)
    }

    pub fn is_cast(&self) -> bool {
        self.base_cast_time > 0.0
    }

    /// Speed stat that adjusts this skill's cast and recast times.
    pub fn speed_stat(&self, config: &crate::SimConfig) -> Option<u32> {
        match self.kind {
            SkillKind::Spell => Some(config.spell_speed),
            SkillKind::Weaponskill => Some(config.skill_speed),
            SkillKind::Ability => None,
        }
    }

    pub fn requirements_hold(&self, state: &SimState) -> bool {
        self.requirements.iter().all(|requirement| requirement.holds(state))
    }

    /// Requirements hold and a cooldown stack is ready.
    pub fn is_available(&self, state: &SimState) -> bool {
        self.requirements_hold(state)
            && self
                .cooldown_group
                .as_ref()
                .and_then(|group| state.cooldown(group))
                .is_none_or(|cooldown| cooldown.stacks_available() > 0)
    }

    pub fn effects_at(&self, timing: EffectTiming) -> impl Iterator<Item = &SkillEffect> {
        self.effects
            .iter()
            .filter(move |timed| timed.timing == timing)
            .map(|timed| &timed.effect)
    }
}
