//! Stacked recharge for skills and the GCD.

use crate::config::SimConfig;
use crate::error::InvariantViolation;

use super::ResourceKey;

/// Static description of a cooldown group.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CooldownDef {
    pub key: ResourceKey,
    /// Recast time of a single stack, in seconds, before speed scaling.
    pub recast: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_stacks"))]
    pub max_stacks: u32,
}

#[cfg(feature = "serde")]
fn default_stacks() -> u32 {
    1
}

impl CooldownDef {
    pub fn new(key: ResourceKey, recast: f64) -> Self {
        Self {
            key,
            recast,
            max_stacks: 1,
        }
    }

    pub fn with_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }
}

/// Recharge counter measured in unscaled seconds.
///
/// `current_value` runs from 0 to `cd_per_stack * max_stacks`; every full
/// `cd_per_stack` is one usable stack. Regeneration speed is
/// `1 / recast_time_scale`, captured at use time and applied to future
/// regeneration only.
#[derive(Clone, Debug, PartialEq)]
pub struct Cooldown {
    key: ResourceKey,
    cd_per_stack: f64,
    max_stacks: u32,
    current_value: f64,
    recast_time_scale: f64,
    next_recast_time_scale: Option<f64>,
}

impl Cooldown {
    /// Creates a cooldown with every stack ready.
    pub fn new(key: ResourceKey, cd_per_stack: f64, max_stacks: u32) -> Self {
        let max_stacks = max_stacks.max(1);
        Self {
            key,
            cd_per_stack,
            max_stacks,
            current_value: cd_per_stack * f64::from(max_stacks),
            recast_time_scale: 1.0,
            next_recast_time_scale: None,
        }
    }

    pub fn from_def(def: &CooldownDef) -> Self {
        Self::new(def.key.clone(), def.recast, def.max_stacks)
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn cd_per_stack(&self) -> f64 {
        self.cd_per_stack
    }

    pub fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn max_value(&self) -> f64 {
        self.cd_per_stack * f64::from(self.max_stacks)
    }

    pub fn recast_time_scale(&self) -> f64 {
        self.recast_time_scale
    }

    pub fn is_full(&self) -> bool {
        self.current_value + SimConfig::EPSILON >= self.max_value()
    }

    /// Whole stacks ready to use. A value within `EPSILON` below a stack
    /// boundary counts as reaching it, so recasts such as 1.4s that are not
    /// exact in binary keep their stack count after a use.
    pub fn stacks_available(&self) -> u32 {
        if self.cd_per_stack <= 0.0 {
            return self.max_stacks;
        }
        (((self.current_value + SimConfig::EPSILON) / self.cd_per_stack).floor() as u32)
            .min(self.max_stacks)
    }

    /// Scaled time until the stack currently regenerating completes.
    pub fn time_till_next_stack(&self) -> f64 {
        if self.is_full() {
            return 0.0;
        }
        let boundary = f64::from(self.stacks_available() + 1) * self.cd_per_stack;
        (boundary - self.current_value) * self.recast_time_scale
    }

    /// Scaled time until at least one stack can be used.
    pub fn time_till_any_stack(&self) -> f64 {
        if self.stacks_available() > 0 {
            0.0
        } else {
            self.time_till_next_stack()
        }
    }

    /// Consumes one stack.
    ///
    /// `scale` drives the stack that starts regenerating because of this use.
    /// If a stack is already regenerating, it keeps its own scale and `scale`
    /// takes over at the next boundary.
    pub fn use_stack(&mut self, scale: f64) -> Result<(), InvariantViolation> {
        let available = self.stacks_available();
        if self.is_full() {
            self.recast_time_scale = scale;
            self.next_recast_time_scale = None;
        } else {
            self.next_recast_time_scale = Some(scale);
        }
        self.current_value = (self.current_value - self.cd_per_stack).max(0.0);
        if available == 0 {
            return Err(InvariantViolation::OverConsume {
                key: self.key.clone(),
                requested: 1.0,
                available: 0.0,
            });
        }
        Ok(())
    }

    /// Gives back one stack taken by [`use_stack`](Self::use_stack) for an
    /// action that never took effect.
    pub fn refund_stack(&mut self) {
        self.current_value = (self.current_value + self.cd_per_stack).min(self.max_value());
        if self.is_full() {
            self.current_value = self.max_value();
            self.next_recast_time_scale = None;
        }
    }

    /// Regenerates for `dt` seconds of simulated time.
    ///
    /// The step is split at stack boundaries; the scale is re-captured at each
    /// boundary and the remainder accrues at the new scale.
    pub fn restore(&mut self, dt: f64) {
        let mut remaining = dt;
        while remaining > 0.0 && !self.is_full() {
            let boundary = f64::from(self.stacks_available() + 1) * self.cd_per_stack;
            let scaled_till_boundary =
                ((boundary - self.current_value) * self.recast_time_scale).max(0.0);
            if remaining + SimConfig::EPSILON >= scaled_till_boundary {
                self.current_value = boundary;
                remaining = (remaining - scaled_till_boundary).max(0.0);
                if let Some(next) = self.next_recast_time_scale.take() {
                    self.recast_time_scale = next;
                }
            } else {
                self.current_value += remaining / self.recast_time_scale;
                remaining = 0.0;
            }
        }
        if self.is_full() {
            self.current_value = self.max_value();
            self.next_recast_time_scale = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn starts_full() {
        let cd = Cooldown::new(ResourceKey::new("triplecast"), 60.0, 2);
        assert_eq!(cd.stacks_available(), 2);
        assert_eq!(cd.time_till_next_stack(), 0.0);
    }

    #[test]
    fn use_and_restore_single_stack() {
        let mut cd = Cooldown::new(ResourceKey::GCD, 2.5, 1);
        cd.use_stack(1.0).unwrap();
        assert_eq!(cd.stacks_available(), 0);
        cd.restore(1.0);
        assert!(approx(cd.time_till_next_stack(), 1.5));
        cd.restore(1.5);
        assert_eq!(cd.stacks_available(), 1);
        assert!(cd.is_full());
    }

    #[test]
    fn scale_applies_to_regeneration() {
        let mut cd = Cooldown::new(ResourceKey::GCD, 2.5, 1);
        cd.use_stack(0.8).unwrap();
        assert!(approx(cd.time_till_next_stack(), 2.0));
        cd.restore(2.0);
        assert_eq!(cd.stacks_available(), 1);
    }

    #[test]
    fn restore_splits_at_stack_boundary() {
        let mut cd = Cooldown::new(ResourceKey::new("charges"), 10.0, 2);
        cd.use_stack(1.0).unwrap();
        cd.use_stack(0.5).unwrap();
        assert_eq!(cd.stacks_available(), 0);
        // First stack regenerates at scale 1.0 for 10s, the second at 0.5.
        cd.restore(12.0);
        assert_eq!(cd.stacks_available(), 1);
        assert!(approx(cd.current_value(), 14.0));
        assert!(approx(cd.time_till_next_stack(), 3.0));
        cd.restore(3.0);
        assert_eq!(cd.stacks_available(), 2);
    }

    #[test]
    fn stack_math_holds_after_every_operation() {
        let mut cd = Cooldown::new(ResourceKey::new("charges"), 30.0, 3);
        let check = |cd: &Cooldown| {
            assert_eq!(
                cd.stacks_available(),
                (((cd.current_value() + SimConfig::EPSILON) / cd.cd_per_stack()).floor() as u32)
                    .min(cd.max_stacks())
            );
            assert!(cd.current_value() >= 0.0 && cd.current_value() <= cd.max_value());
        };
        for step in [0.0, 7.5, 30.0, 0.3, 45.0, 100.0] {
            if cd.stacks_available() > 0 {
                cd.use_stack(1.0).unwrap();
            }
            check(&cd);
            cd.restore(step);
            check(&cd);
        }
    }

    #[test]
    fn inexact_recasts_keep_their_stack_count() {
        for recast in [1.4, 2.8, 13.2] {
            let mut cd = Cooldown::new(ResourceKey::new("charges"), recast, 4);
            cd.use_stack(1.0).unwrap();
            assert_eq!(cd.stacks_available(), 3, "recast {recast}");
            cd.use_stack(1.0).unwrap();
            assert_eq!(cd.stacks_available(), 2, "recast {recast}");
            cd.restore(recast);
            assert_eq!(cd.stacks_available(), 3, "recast {recast}");
        }
    }

    #[test]
    fn restoring_an_emptied_inexact_cooldown_terminates_full() {
        for recast in [1.4, 2.8, 13.2] {
            let mut cd = Cooldown::new(ResourceKey::new("charges"), recast, 4);
            for _ in 0..4 {
                cd.use_stack(1.0).unwrap();
            }
            assert_eq!(cd.stacks_available(), 0, "recast {recast}");
            cd.restore(recast * 4.0 + 10.0);
            assert!(cd.is_full(), "recast {recast}");
            assert_eq!(cd.stacks_available(), 4, "recast {recast}");
            assert_eq!(cd.current_value(), cd.max_value());
        }
    }

    #[test]
    fn restoring_in_small_steps_reaches_each_boundary() {
        let mut cd = Cooldown::new(ResourceKey::new("charges"), 1.4, 4);
        for _ in 0..4 {
            cd.use_stack(1.0).unwrap();
        }
        for _ in 0..56 {
            cd.restore(0.1);
        }
        assert_eq!(cd.stacks_available(), 4);
        assert!(cd.is_full());
    }

    #[test]
    fn refunding_a_stack_returns_it() {
        let mut cd = Cooldown::new(ResourceKey::new("charges"), 1.4, 4);
        cd.use_stack(1.0).unwrap();
        cd.refund_stack();
        assert_eq!(cd.stacks_available(), 4);
        assert!(cd.is_full());
        assert_eq!(cd.time_till_next_stack(), 0.0);
    }

    #[test]
    fn using_an_empty_cooldown_is_reported() {
        let mut cd = Cooldown::new(ResourceKey::new("manafont"), 100.0, 1);
        cd.use_stack(1.0).unwrap();
        assert!(cd.use_stack(1.0).is_err());
        assert_eq!(cd.current_value(), 0.0);
    }
}
