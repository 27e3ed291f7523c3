//! # Lobby Server Library
//!
//! Authoritative relay for the lobby. It owns the canonical roster and every
//! player position, turns client intents into position updates, and fans
//! events out to all connected clients over WebSocket.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Clients only ever send intents (`move`, `chat`). The server decides
//! where a player actually ends up: each axis is capped at one step per
//! intent and positions are kept inside the board.
//!
//! ### Connection Lifecycle
//! - The upgrade request carries `?name=` and an optional `&sprite=`
//! - Accepted players receive a full `init_state` and everyone else a
//!   `player_joined`
//! - Refused players receive a `server_error` followed by a close frame
//! - Dropped connections produce a `player_left` for the rest of the room
//!
//! ## Architecture Design
//!
//! ### Single Lobby Loop
//! Each connection runs a reader task and a writer task. Readers forward
//! decoded intents to one lobby loop over an unbounded channel; the loop
//! applies them strictly in arrival order and queues outgoing frames on
//! the per-connection outboxes. No lock guards lobby state because only
//! that loop touches it.
//!
//! ## Module Organization
//!
//! ### Lobby Module (`lobby`)
//! Roster, identity and colour assignment, spawn points, move clamping and
//! input sanitising.
//!
//! ### Client Manager Module (`client_manager`)
//! One outbound queue per player, with targeted send and broadcast.
//!
//! ### Network Module (`network`)
//! Accept loop, handshake parsing, per-connection tasks and the relay
//! rules that map intents to broadcasts.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! # async fn start() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let server = Server::bind("127.0.0.1:8080", 16).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod client_manager;
pub mod lobby;
pub mod network;
