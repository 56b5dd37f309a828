use std::fmt;

use crate::action::ActionId;
use crate::recurring::RecurringKey;
use crate::state::ResourceKey;

/// Handle into the scheduler's event arena.
///
/// Ids are allocated monotonically, so ordering by id is insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// What happens when an event fires. Interpreted by [`crate::SimState`].
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// Gives back `amount` of a resource, e.g. releasing a lock.
    RestoreResource { key: ResourceKey, amount: f64 },
    /// Drains a timed resource whose duration ran out.
    ExpireResource { key: ResourceKey },
    /// Rewrites the remaining time of the resource's pending change.
    OverrideTimer { key: ResourceKey, new_delay: f64 },
    /// Delayed gain, optionally with its own expiry.
    GainResource {
        key: ResourceKey,
        amount: f64,
        duration: Option<f64>,
    },
    /// End of the hard-cast portion of a cast skill.
    CaptureCast { action: ActionId },
    ApplyAction { action: ActionId },
    RecurringTick { key: RecurringKey, instance: u64 },
    RecurringExpire { key: RecurringKey, instance: u64 },
    ChannelTick { instance: u64 },
    ManaTick,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Rank among events due in the same firing pass; lower fires first.
    ///
    /// A cast captures before anything else lands on its capture instant.
    pub fn fire_order(&self) -> u8 {
        match self {
            EventKind::CaptureCast { .. } => 0,
            _ => 1,
        }
    }

    /// Whether firing this event is worth a debug log line.
    pub fn is_logged(&self) -> bool {
        !matches!(
            self,
            EventKind::RestoreResource { .. } | EventKind::ManaTick | EventKind::OverrideTimer { .. }
        )
    }
}

/// One pending entry in the scheduler arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: &'static str,
    /// Delay the event was scheduled with.
    pub delay: f64,
    /// Remaining simulated time before the event is due.
    pub time_till_event: f64,
    pub kind: EventKind,
    pub canceled: bool,
    pub logged: bool,
}

impl Event {
    pub fn new(delay: f64, kind: EventKind) -> Self {
        let delay = delay.max(0.0);
        Self {
            name: kind.name(),
            delay,
            time_till_event: delay,
            logged: kind.is_logged(),
            kind,
            canceled: false,
        }
    }
}
