use super::PotencyModifier;

/// Buff granted by another party member.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartyBuff {
    pub name: String,
    pub modifier: PotencyModifier,
}

/// Lookup of party buffs, queried at snapshot time only.
pub trait PartyBuffTimeline {
    fn buffs_active_at(&self, time: f64) -> Vec<PartyBuff>;
}

/// Solo timeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPartyBuffs;

impl PartyBuffTimeline for NoPartyBuffs {
    fn buffs_active_at(&self, _time: f64) -> Vec<PartyBuff> {
        Vec::new()
    }
}

/// Buff active during `(start, start + duration)`.
///
/// A snapshot taken exactly at `start` happens before the buff lands.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartyBuffWindow {
    pub start: f64,
    pub duration: f64,
    pub buff: PartyBuff,
}

impl PartyBuffWindow {
    pub fn contains(&self, time: f64) -> bool {
        time > self.start && time < self.start + self.duration
    }
}

/// Fixed list of buff windows, e.g. loaded alongside a record.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PartyBuffWindows {
    windows: Vec<PartyBuffWindow>,
}

impl PartyBuffWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, start: f64, duration: f64, buff: PartyBuff) -> Self {
        self.windows.push(PartyBuffWindow {
            start,
            duration,
            buff,
        });
        self
    }

    pub fn windows(&self) -> &[PartyBuffWindow] {
        &self.windows
    }
}

impl PartyBuffTimeline for PartyBuffWindows {
    fn buffs_active_at(&self, time: f64) -> Vec<PartyBuff> {
        self.windows
            .iter()
            .filter(|window| window.contains(time))
            .map(|window| window.buff.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_exclude_both_ends() {
        let buff = PartyBuff {
            name: "divination".into(),
            modifier: PotencyModifier::multiplier("divination", 1.06),
        };
        let timeline = PartyBuffWindows::new().with_window(7.0, 20.0, buff);
        assert!(timeline.buffs_active_at(6.9).is_empty());
        assert!(timeline.buffs_active_at(7.0).is_empty());
        assert_eq!(timeline.buffs_active_at(7.1).len(), 1);
        assert_eq!(timeline.buffs_active_at(26.9).len(), 1);
        assert!(timeline.buffs_active_at(27.0).is_empty());
    }
}
