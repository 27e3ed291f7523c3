//! Outbound routing for connected players
//!
//! Every accepted connection owns a writer task fed by an unbounded queue.
//! The client manager keeps one sender per player so the lobby loop can
//! address a single player or the whole room without touching sockets:
//! - Registering and unregistering outboxes as players join and leave
//! - Encoding an event once and fanning it out to every recipient
//! - Dropping outboxes whose writer task has already gone away

use log::{debug, warn};
use serde::Serialize;
use shared::{encode_frame, PlayerId};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;

/// Queue feeding one connection's writer task.
pub type Outbox = UnboundedSender<Message>;

/// Maps players to the outbound queue of their connection
///
/// The manager never blocks: sends go into unbounded queues and the
/// per-connection writer tasks drain them at socket speed. A failed send
/// means the connection is already closing and its leave will follow.
#[derive(Default)]
pub struct ClientManager {
    /// Outbound queues indexed by player identity
    outboxes: HashMap<PlayerId, Outbox>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outbox for a newly admitted player
    ///
    /// Replaces any previous outbox under the same identity. Identities are
    /// never reused by the lobby, so a replacement indicates a bug upstream
    /// and is logged.
    pub fn add_client(&mut self, id: PlayerId, outbox: Outbox) {
        if self.outboxes.insert(id.clone(), outbox).is_some() {
            warn!("Replaced existing outbox for {}", id);
        }
    }

    /// Forgets a player's outbox. Returns true if one was registered.
    pub fn remove_client(&mut self, id: &PlayerId) -> bool {
        self.outboxes.remove(id).is_some()
    }

    /// Sends one event to a single player
    ///
    /// Returns false if the player is unknown, the event could not be
    /// encoded, or the writer task has stopped.
    pub fn send_to<T: Serialize>(&self, id: &PlayerId, event: &T) -> bool {
        let Some(outbox) = self.outboxes.get(id) else {
            return false;
        };
        match encode_frame(event) {
            Ok(text) => outbox.send(Message::Text(text)).is_ok(),
            Err(e) => {
                warn!("Failed to encode event for {}: {}", id, e);
                false
            }
        }
    }

    /// Sends one event to every player, optionally skipping one
    ///
    /// The event is encoded once and the same frame is queued for every
    /// recipient. Returns the number of players it was queued for.
    pub fn broadcast<T: Serialize>(&self, event: &T, exclude: Option<&PlayerId>) -> usize {
        let text = match encode_frame(event) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode broadcast: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for (id, outbox) in &self.outboxes {
            if Some(id) == exclude {
                continue;
            }
            if outbox.send(Message::Text(text.clone())).is_ok() {
                delivered += 1;
            } else {
                debug!("Outbox for {} is closed", id);
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}
