//! Party buff window loader.

use std::path::Path;

use combat_core::PartyBuffWindows;

use crate::loaders::{LoadResult, read_file};

/// Loads static party-buff windows from RON.
///
/// File format: a list of windows.
/// ```ron
/// [
///     (
///         start: 6.5,
///         duration: 20.0,
///         buff: (
///             name: "battle_litany",
///             modifier: (source: "battle_litany", kind: Multiplier, crit_bonus: 0.1),
///         ),
///     ),
/// ]
/// ```
pub struct PartyBuffLoader;

impl PartyBuffLoader {
    pub fn load(path: &Path) -> LoadResult<PartyBuffWindows> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<PartyBuffWindows> {
        let windows: PartyBuffWindows = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse party buff RON: {}", e))?;
        if let Some(window) = windows
            .windows()
            .iter()
            .find(|window| window.duration <= 0.0 || !window.start.is_finite())
        {
            anyhow::bail!(
                "Party buff {} has an invalid window ({} + {})",
                window.buff.name,
                window.start,
                window.duration
            );
        }
        Ok(windows)
    }

    /// Two-minute raid buffs bundled with the crate.
    pub fn sample() -> LoadResult<PartyBuffWindows> {
        Self::parse(include_str!("../../data/party/two_minute.ron"))
    }
}

#[cfg(test)]
mod tests {
    use combat_core::{ModifierKind, PartyBuffTimeline};

    use super::*;

    #[test]
    fn sample_windows_exclude_their_bounds() {
        let windows = PartyBuffLoader::sample().unwrap();
        assert!(!windows.windows().is_empty());

        let first = &windows.windows()[0];
        let start = first.start;
        let end = first.start + first.duration;
        assert!(!windows.buffs_active_at(start).iter().any(|b| b.name == first.buff.name));
        assert!(windows
            .buffs_active_at(start + first.duration / 2.0)
            .iter()
            .any(|b| b.name == first.buff.name));
        assert!(!windows.buffs_active_at(end).iter().any(|b| b.name == first.buff.name));
    }

    #[test]
    fn rates_modifier_parses() {
        let windows = PartyBuffLoader::parse(
            r#"[(start: 0.0, duration: 15.0, buff: (name: "litany", modifier: (source: "litany", kind: Multiplier, crit_bonus: 0.1)))]"#,
        )
        .unwrap();
        let modifier = &windows.windows()[0].buff.modifier;
        assert_eq!(modifier.kind, ModifierKind::Multiplier);
        assert_eq!(modifier.damage_factor, 1.0);
        assert_eq!(modifier.crit_bonus, 0.1);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = PartyBuffLoader::parse(
            r#"[(start: 0.0, duration: 0.0, buff: (name: "nothing", modifier: (source: "nothing", kind: Multiplier)))]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nothing"));
    }
}
