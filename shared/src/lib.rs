//! Wire protocol and data model shared by the lobby client and server.
//!
//! Every frame on the real-time channel is a JSON text message of the form
//! `{"event": <name>, "data": <payload>}`. Event names follow the short
//! snake_case names the browser client used (`init_state`, `player_moved`,
//! `move`, ...) and payload keys are camelCase.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Displacement requested per sampling tick for each held direction.
pub const MOVE_STEP: f32 = 6.0;
/// Interval between input samples, which also caps the move-intent rate.
pub const SAMPLE_INTERVAL_MS: u64 = 60;
pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 500.0;
pub const DEFAULT_COLOR: &str = "#6b7280";
pub const MAX_NAME_LEN: usize = 24;
pub const MAX_CHAT_LEN: usize = 280;

/// Opaque, server-assigned identity of a connected player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Hex colour; blank or malformed values render with [`DEFAULT_COLOR`].
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_url: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: &str, x: f32, y: f32, color: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            x,
            y,
            color: color.to_string(),
            sprite_url: None,
        }
    }

    pub fn with_sprite(mut self, url: &str) -> Self {
        self.sprite_url = Some(url.to_string());
        self
    }

    /// Name to show for this player. Falls back to the id when blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    /// Sprite URL if one was given and it is not blank.
    pub fn sprite(&self) -> Option<&str> {
        self.sprite_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Full roster sent once when a session starts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub self_id: PlayerId,
    #[serde(default)]
    pub players: Vec<Player>,
}

/// Events pushed from the server to a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    InitState(SessionSnapshot),
    PlayerJoined(Player),
    PlayerLeft {
        id: PlayerId,
    },
    PlayerMoved {
        id: PlayerId,
        x: f32,
        y: f32,
    },
    Chat {
        from: String,
        text: String,
    },
    ServerError {
        #[serde(default)]
        message: String,
    },
}

/// Events sent from a client to the server. Neither kind is acknowledged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Move { dx: f32, dy: f32 },
    Chat { text: String },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Move { .. } => "move",
            ClientEvent::Chat { .. } => "chat",
        }
    }
}

pub fn encode_frame<T: Serialize>(event: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

pub fn decode_frame<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(text)
}
