//! Client-side mirror of every player the server has told us about.
//!
//! Positions are never predicted: `x`/`y` are exactly what the last
//! `player_moved` (or the snapshot/join that introduced the player) said.

use log::debug;
use shared::{Player, PlayerId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    self_id: Option<PlayerId>,
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole registry with a session snapshot.
    ///
    /// Prior contents are dropped first, so a snapshot received after a
    /// reconnect rebuilds the roster from scratch.
    pub fn initialize(&mut self, self_id: PlayerId, snapshot: Vec<Player>) {
        self.players.clear();
        for player in snapshot {
            self.players.insert(player.id.clone(), player);
        }
        self.self_id = Some(self_id);
    }

    /// Inserts a joined player. A duplicate join overwrites the existing entry
    /// and returns it.
    pub fn upsert_joined(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id.clone(), player)
    }

    /// Removes a player, returning it if it was present.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.remove(id)
    }

    /// Overwrites the position of a known player. Returns false, without
    /// creating anything, when the id is unknown.
    pub fn apply_move(&mut self, id: &PlayerId, x: f32, y: f32) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.x = x;
                player.y = y;
                true
            }
            None => {
                debug!("Dropping move for unknown player {}", id);
                false
            }
        }
    }

    /// Forgets everything, including our own identity.
    pub fn clear(&mut self) {
        self.players.clear();
        self.self_id = None;
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn self_id(&self) -> Option<&PlayerId> {
        self.self_id.as_ref()
    }

    pub fn is_self(&self, id: &PlayerId) -> bool {
        self.self_id.as_ref() == Some(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
