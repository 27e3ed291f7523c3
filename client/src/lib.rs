//! # Lobby Client Library
//!
//! Client side of a small real-time lobby: players see each other move
//! around a shared board and talk in a chat panel. The server is
//! authoritative for every position; the client never predicts or
//! interpolates and simply draws the coordinates it was last sent.
//!
//! ## Architecture Overview
//!
//! All state for one connection lives in a [`session::Session`], which is
//! only ever touched from the render thread. Three activities are
//! interleaved on that thread at frame boundaries:
//!
//! - **Inbound events** are decoded by the network tasks, queued, and applied
//!   to the session strictly in delivery order at the start of each frame.
//! - **Input sampling** reads held movement keys and emits at most one move
//!   intent per sampling interval, and only when the intent is non-zero.
//! - **Rendering** redraws the board and every known player each frame,
//!   independent of how often the network delivers updates.
//!
//! ## Module Organization
//!
//! ### Registry (`registry`)
//! Mirror of every known player keyed by identity, plus our own identity.
//!
//! ### Sprites (`sprites`)
//! Append-only cache of sprite images keyed by URL. Each URL is fetched at
//! most once and failures are remembered.
//!
//! ### Input (`input`)
//! Held-key tracking, the fixed-rate motion sampler and the chat entry line.
//!
//! ### Chat and Sidebar (`chat`, `sidebar`)
//! The chat log and the sorted roster view derived from the registry.
//!
//! ### Network (`network`)
//! WebSocket channel with fixed-delay reconnect and the HTTP sprite fetcher.
//! Outbound events go through the fire-and-forget [`network::EventSink`].
//!
//! ### Rendering (`rendering`)
//! Board, sprites, procedural stick figures and the side panel.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::app::Client;
//! use client::config::ClientConfig;
//!
//! # async fn start() -> Result<(), Box<dyn std::error::Error>> {
//! // Must run inside a macroquad window.
//! let config = ClientConfig::default();
//! Client::new(&config)?.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod chat;
pub mod config;
pub mod input;
pub mod network;
pub mod registry;
pub mod rendering;
pub mod session;
pub mod sidebar;
pub mod sprites;
