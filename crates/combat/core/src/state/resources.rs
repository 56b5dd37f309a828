//! Generic bounded counters: mana, gauges, binary buff flags and action locks.
//!
//! A resource carries at most one pending timed change (an expiry or a
//! restoration). The change itself lives in the scheduler arena; the resource
//! only stores its [`EventId`].

use std::borrow::Cow;
use std::fmt;

use crate::combat::PotencyModifier;
use crate::config::SimConfig;
use crate::engine::EventId;
use crate::error::InvariantViolation;

// ============================================================================
// Resource Key
// ============================================================================

/// Name of a resource or cooldown group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ResourceKey(Cow<'static, str>);

impl ResourceKey {
    pub const MANA: Self = Self(Cow::Borrowed("mana"));
    /// Binary lock taken by every skill.
    pub const ANIMATION_LOCK: Self = Self(Cow::Borrowed("animation_lock"));
    /// Binary lock taken by cast skills for `cast_time + caster_tax`.
    pub const CASTER_TAX: Self = Self(Cow::Borrowed("caster_tax"));
    /// Binary lock held while the character is moving.
    pub const MOVEMENT: Self = Self(Cow::Borrowed("movement"));
    /// Recast group shared by every GCD skill.
    pub const GCD: Self = Self(Cow::Borrowed("gcd"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lock resources the engine creates for every job.
    pub fn locks() -> [Self; 3] {
        [Self::ANIMATION_LOCK, Self::CASTER_TAX, Self::MOVEMENT]
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ResourceKey {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

// ============================================================================
// Resource Definition
// ============================================================================

/// Static description of a job resource.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceDef {
    pub key: ResourceKey,
    pub max_value: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial: f64,
    /// Longest timer a timed gain may attach. `None` for untimed resources.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_timeout: Option<f64>,
    /// Modifier contributed to every snapshot taken while the resource is held.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifier: Option<PotencyModifier>,
}

impl ResourceDef {
    pub fn new(key: ResourceKey, max_value: f64) -> Self {
        Self {
            key,
            max_value,
            initial: 0.0,
            max_timeout: None,
            modifier: None,
        }
    }

    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_max_timeout(mut self, max_timeout: f64) -> Self {
        self.max_timeout = Some(max_timeout);
        self
    }

    pub fn with_modifier(mut self, modifier: PotencyModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }
}

// ============================================================================
// Resource
// ============================================================================

/// Live counter with `0 <= current_value <= max_value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    key: ResourceKey,
    max_value: f64,
    current_value: f64,
    enabled: bool,
    pending: Option<EventId>,
}

impl Resource {
    pub fn new(key: ResourceKey, max_value: f64, initial: f64) -> Self {
        Self {
            key,
            max_value,
            current_value: initial.clamp(0.0, max_value),
            enabled: true,
            pending: None,
        }
    }

    pub fn from_def(def: &ResourceDef) -> Self {
        Self::new(def.key.clone(), def.max_value, def.initial)
    }

    /// Binary lock, free (value 1) when created.
    pub fn lock(key: ResourceKey) -> Self {
        Self::new(key, 1.0, 1.0)
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Amount usable by skills; zero while disabled.
    pub fn available_amount(&self) -> f64 {
        if self.enabled { self.current_value } else { 0.0 }
    }

    pub fn is_active(&self) -> bool {
        self.available_amount() > SimConfig::EPSILON
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn gain(&mut self, amount: f64) {
        self.current_value = (self.current_value + amount).clamp(0.0, self.max_value);
    }

    /// Removes `amount`, clamping at zero.
    ///
    /// Consuming more than is held still empties the resource but reports the
    /// overdraw.
    pub fn consume(&mut self, amount: f64) -> Result<(), InvariantViolation> {
        let available = self.current_value;
        self.current_value = (self.current_value - amount).max(0.0);
        if amount > available + SimConfig::EPSILON {
            return Err(InvariantViolation::OverConsume {
                key: self.key.clone(),
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    pub fn overwrite(&mut self, value: f64) {
        self.current_value = value.clamp(0.0, self.max_value);
    }

    pub fn pending(&self) -> Option<EventId> {
        self.pending
    }

    /// Attaches a new pending change, returning the one it replaces.
    pub(crate) fn replace_pending(&mut self, id: EventId) -> Option<EventId> {
        self.pending.replace(id)
    }

    pub(crate) fn take_pending(&mut self) -> Option<EventId> {
        self.pending.take()
    }

    /// Clears the pending change if it is `id`.
    pub(crate) fn settle_pending(&mut self, id: EventId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }
}
