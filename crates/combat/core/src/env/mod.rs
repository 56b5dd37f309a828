//! Collaborators injected into every state mutation.
//!
//! The engine has no global controller. Each call to
//! [`crate::SimState::advance`] or [`crate::SimState::request_skill`] receives a
//! [`SimContext`] bundling the RNG stream, the outcome sink and the party-buff
//! lookup.
mod rng;
mod sink;

pub use rng::SimRng;
pub use sink::{CombatEvent, EventSink, NullSink, PotencySource};

use crate::combat::PartyBuffTimeline;

pub struct SimContext<'a> {
    pub rng: &'a mut SimRng,
    pub sink: &'a mut dyn EventSink,
    pub party_buffs: &'a dyn PartyBuffTimeline,
}

impl<'a> SimContext<'a> {
    pub fn new(
        rng: &'a mut SimRng,
        sink: &'a mut dyn EventSink,
        party_buffs: &'a dyn PartyBuffTimeline,
    ) -> Self {
        Self {
            rng,
            sink,
            party_buffs,
        }
    }

    pub fn emit(&mut self, event: CombatEvent) {
        self.sink.emit(event);
    }
}
