//! Authoritative lobby state: who is present and where they stand.

use log::info;
use rand::Rng;
use shared::{Player, PlayerId, MAX_CHAT_LEN, MAX_NAME_LEN, MOVE_STEP, WORLD_HEIGHT, WORLD_WIDTH};
use std::collections::HashMap;

const PALETTE: [&str; 8] = [
    "#ef4444", "#3b82f6", "#22c55e", "#a855f7", "#f97316", "#06b6d4", "#ec4899", "#eab308",
];

/// Keeps spawned players away from the board edges.
const SPAWN_MARGIN: f32 = 40.0;

/// Why a connection was refused. The message is sent as `server_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    RoomFull,
    NameRequired,
}

impl Rejection {
    pub fn message(self) -> &'static str {
        match self {
            Rejection::RoomFull => "Room full",
            Rejection::NameRequired => "Name is required",
        }
    }
}

pub fn player_color(seq: u32) -> &'static str {
    PALETTE[(seq as usize).saturating_sub(1) % PALETTE.len()]
}

/// Trims a display name and caps its length. Returns `None` when blank.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let name: String = raw.trim().chars().take(MAX_NAME_LEN).collect();
    (!name.is_empty()).then_some(name)
}

/// Trims a chat line and caps its length. Returns `None` when blank.
pub fn sanitize_chat(raw: &str) -> Option<String> {
    let text: String = raw.trim().chars().take(MAX_CHAT_LEN).collect();
    (!text.is_empty()).then_some(text)
}

fn clamp_step(step: f32) -> Option<f32> {
    step.is_finite().then(|| step.clamp(-MOVE_STEP, MOVE_STEP))
}

pub struct Lobby {
    players: HashMap<PlayerId, Player>,
    next_seq: u32,
    max_players: usize,
}

impl Lobby {
    pub fn new(max_players: usize) -> Self {
        Self {
            players: HashMap::new(),
            next_seq: 1,
            max_players,
        }
    }

    /// Admits a new player at a random spot on the board.
    pub fn join(&mut self, name: &str, sprite: Option<&str>) -> Result<Player, Rejection> {
        let name = sanitize_name(name).ok_or(Rejection::NameRequired)?;
        if self.players.len() >= self.max_players {
            return Err(Rejection::RoomFull);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let mut rng = rand::thread_rng();
        let x = rng.gen_range(SPAWN_MARGIN..WORLD_WIDTH - SPAWN_MARGIN).round();
        let y = rng.gen_range(SPAWN_MARGIN..WORLD_HEIGHT - SPAWN_MARGIN).round();

        let mut player = Player::new(format!("p{}", seq).as_str(), &name, x, y, player_color(seq));
        if let Some(sprite) = sprite.filter(|s| !s.trim().is_empty()) {
            player = player.with_sprite(sprite.trim());
        }

        info!("Added player {} ({}) at ({}, {})", player.id, player.name, x, y);
        self.players.insert(player.id.clone(), player.clone());
        Ok(player)
    }

    pub fn leave(&mut self, id: &PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        info!("Removed player {} ({})", player.id, player.name);
        Some(player)
    }

    /// Applies a move intent. Each axis is capped at one step and the result
    /// is kept on the board. Returns the new position, or `None` if the
    /// player is unknown or the intent is not a number.
    pub fn apply_move(&mut self, id: &PlayerId, dx: f32, dy: f32) -> Option<(f32, f32)> {
        let (dx, dy) = (clamp_step(dx)?, clamp_step(dy)?);
        let player = self.players.get_mut(id)?;

        player.x = (player.x + dx).clamp(0.0, WORLD_WIDTH);
        player.y = (player.y + dy).clamp(0.0, WORLD_HEIGHT);
        Some((player.x, player.y))
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn snapshot(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
