//! Pending-event arena and simulated clock.

use std::collections::BTreeMap;

use crate::config::SimConfig;

use super::{Event, EventId, EventKind};

/// Owns simulated time and every event that has not fired yet.
///
/// The arena is a `BTreeMap` keyed by [`EventId`], so iteration order is
/// insertion order. Events due in the same pass fire by
/// [`EventKind::fire_order`], then by insertion. Canceled events stay in the arena, flagged, until the next
/// firing pass sweeps them.
#[derive(Clone, Debug)]
pub struct Scheduler {
    now: f64,
    next_id: u64,
    pending: BTreeMap<EventId, Event>,
}

impl Scheduler {
    pub fn new(start_time: f64) -> Self {
        Self {
            now: start_time,
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn schedule(&mut self, delay: f64, kind: EventKind) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, Event::new(delay, kind));
        id
    }

    /// Flags an event as canceled. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        match self.pending.get_mut(&id) {
            Some(event) if !event.canceled => {
                event.canceled = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_live(&self, id: EventId) -> bool {
        self.pending.get(&id).is_some_and(|event| !event.canceled)
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.pending.get(&id).filter(|event| !event.canceled)
    }

    pub fn time_till(&self, id: EventId) -> Option<f64> {
        self.event(id).map(|event| event.time_till_event)
    }

    /// Moves a live event to fire `time_till_event` seconds from now.
    pub fn reschedule(&mut self, id: EventId, time_till_event: f64) -> bool {
        match self.pending.get_mut(&id) {
            Some(event) if !event.canceled => {
                event.time_till_event = time_till_event.max(0.0);
                true
            }
            _ => false,
        }
    }

    /// Smallest remaining time among live events.
    pub fn next_due_in(&self) -> Option<f64> {
        self.pending
            .values()
            .filter(|event| !event.canceled)
            .map(|event| event.time_till_event)
            .min_by(f64::total_cmp)
    }

    pub fn has_due(&self) -> bool {
        self.next_due_in()
            .is_some_and(|due| due <= SimConfig::EPSILON)
    }

    /// Advances the clock and counts every pending event down.
    pub fn elapse(&mut self, step: f64) {
        self.now += step;
        for event in self.pending.values_mut() {
            event.time_till_event -= step;
        }
    }

    /// Sweeps canceled events and returns the ids of every due event, ordered
    /// by [`EventKind::fire_order`] and then by insertion.
    ///
    /// The events stay in the arena until [`Scheduler::pop`], so an event
    /// canceled by an earlier one in the same pass never fires.
    pub fn due_ids(&mut self) -> Vec<EventId> {
        self.pending.retain(|_, event| !event.canceled);
        let mut due: Vec<(u8, EventId)> = self
            .pending
            .iter()
            .filter(|(_, event)| event.time_till_event <= SimConfig::EPSILON)
            .map(|(id, event)| (event.kind.fire_order(), *id))
            .collect();
        due.sort_unstable();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Removes a live event from the arena for firing.
    pub fn pop(&mut self, id: EventId) -> Option<Event> {
        match self.pending.remove(&id) {
            Some(event) if !event.canceled => Some(event),
            _ => None,
        }
    }

    /// Number of live events.
    pub fn pending_len(&self) -> usize {
        self.pending.values().filter(|event| !event.canceled).count()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventId, &Event)> {
        self.pending
            .iter()
            .filter(|(_, event)| !event.canceled)
            .map(|(id, event)| (*id, event))
    }
}
