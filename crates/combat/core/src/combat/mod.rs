//! Potency and modifier engine.
//!
//! Pure functions and value types: substat formulas, captured potencies with
//! their modifier lists, and the party-buff lookup consulted at snapshot time.

pub mod formula;
pub mod party;
pub mod potency;

pub use formula::{CritDhStats, slidecast_window, speed_adjusted, speed_scale};
pub use party::{NoPartyBuffs, PartyBuff, PartyBuffTimeline, PartyBuffWindow, PartyBuffWindows};
pub use potency::{Aspect, ModifierKind, Potency, PotencyModifier};
