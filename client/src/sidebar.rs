//! Roster view shown next to the canvas.
//!
//! Rebuilt only when the roster changes (snapshot, join, leave, disconnect);
//! position updates never touch it.

use crate::registry::PlayerRegistry;
use shared::PlayerId;

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub label: String,
    pub color: String,
    pub is_self: bool,
}

#[derive(Debug, Default)]
pub struct Sidebar {
    entries: Vec<RosterEntry>,
    rebuilds: u64,
}

impl Sidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, registry: &PlayerRegistry) {
        let mut players: Vec<_> = registry.players().collect();
        players.sort_by(|a, b| {
            let (a_name, b_name) = (a.display_name(), b.display_name());
            a_name
                .to_lowercase()
                .cmp(&b_name.to_lowercase())
                .then_with(|| a_name.cmp(b_name))
                .then_with(|| a.id.cmp(&b.id))
        });

        self.entries = players
            .into_iter()
            .map(|player| {
                let is_self = registry.is_self(&player.id);
                let label = if is_self {
                    format!("{} (you)", player.display_name())
                } else {
                    player.display_name().to_string()
                };
                RosterEntry {
                    id: player.id.clone(),
                    label,
                    color: player.color.clone(),
                    is_self,
                }
            })
            .collect();
        self.rebuilds += 1;
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// How many times the roster has been rebuilt this session.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Player;

    #[test]
    fn test_sorted_by_name_with_self_marker() {
        let mut registry = PlayerRegistry::new();
        registry.initialize(
            "p2".into(),
            vec![
                Player::new("p1", "zed", 0.0, 0.0, "#f00"),
                Player::new("p2", "Amy", 0.0, 0.0, "#0f0"),
                Player::new("p3", "bob", 0.0, 0.0, "#00f"),
            ],
        );

        let mut sidebar = Sidebar::new();
        sidebar.rebuild(&registry);

        let labels: Vec<_> = sidebar.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Amy (you)", "bob", "zed"]);
        assert!(sidebar.entries()[0].is_self);
        assert_eq!(sidebar.entries()[2].color, "#f00");
        assert_eq!(sidebar.rebuilds(), 1);
    }

    #[test]
    fn test_empty_registry_gives_empty_roster() {
        let mut sidebar = Sidebar::new();
        sidebar.rebuild(&PlayerRegistry::new());
        assert!(sidebar.entries().is_empty());
    }
}
