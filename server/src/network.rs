//! Server network layer: WebSocket accept loop and event relay

use crate::client_manager::{ClientManager, Outbox};
use crate::lobby::{sanitize_chat, Lobby, Rejection};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_frame, encode_frame, ClientEvent, PlayerId, ServerEvent, SessionSnapshot};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from connection tasks to the lobby loop
#[derive(Debug)]
pub enum ServerMessage {
    Join {
        name: String,
        sprite: Option<String>,
        outbox: Outbox,
        reply: oneshot::Sender<Result<PlayerId, Rejection>>,
    },
    Event {
        id: PlayerId,
        event: ClientEvent,
    },
    Left {
        id: PlayerId,
    },
}

/// Query parameters carried by the upgrade request.
#[derive(Debug, Default, PartialEq)]
pub struct Handshake {
    pub name: String,
    pub sprite: Option<String>,
}

impl Handshake {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut handshake = Handshake::default();
        let query = query.unwrap_or_default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "name" => handshake.name = value.into_owned(),
                "sprite" if !value.trim().is_empty() => {
                    handshake.sprite = Some(value.into_owned())
                }
                _ => {}
            }
        }
        handshake
    }
}

/// Lobby state plus the outboxes needed to tell everyone about changes.
/// Only the lobby loop touches it.
pub struct Room {
    lobby: Lobby,
    clients: ClientManager,
}

impl Room {
    pub fn new(max_players: usize) -> Self {
        Self {
            lobby: Lobby::new(max_players),
            clients: ClientManager::new(),
        }
    }

    pub fn handle(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Join {
                name,
                sprite,
                outbox,
                reply,
            } => {
                let result = self.admit(&name, sprite.as_deref(), outbox);
                // The connection may already be gone; its leave is handled
                // when the reader notices.
                let _ = reply.send(result);
            }
            ServerMessage::Event { id, event } => self.dispatch(&id, event),
            ServerMessage::Left { id } => self.depart(&id),
        }
    }

    fn admit(
        &mut self,
        name: &str,
        sprite: Option<&str>,
        outbox: Outbox,
    ) -> Result<PlayerId, Rejection> {
        let player = match self.lobby.join(name, sprite) {
            Ok(player) => player,
            Err(rejection) => {
                info!("Rejected {:?}: {}", name, rejection.message());
                let event = ServerEvent::ServerError {
                    message: rejection.message().to_string(),
                };
                if let Ok(text) = encode_frame(&event) {
                    let _ = outbox.send(Message::Text(text));
                }
                let _ = outbox.send(Message::Close(None));
                return Err(rejection);
            }
        };

        let id = player.id.clone();
        self.clients.add_client(id.clone(), outbox);

        let snapshot = ServerEvent::InitState(SessionSnapshot {
            self_id: id.clone(),
            players: self.lobby.snapshot(),
        });
        self.clients.send_to(&id, &snapshot);
        self.clients
            .broadcast(&ServerEvent::PlayerJoined(player), Some(&id));

        Ok(id)
    }

    fn dispatch(&mut self, id: &PlayerId, event: ClientEvent) {
        match event {
            ClientEvent::Move { dx, dy } => {
                let before = self.lobby.get(id).map(|p| (p.x, p.y));
                match self.lobby.apply_move(id, dx, dy) {
                    Some((x, y)) if before != Some((x, y)) => {
                        self.clients.broadcast(
                            &ServerEvent::PlayerMoved {
                                id: id.clone(),
                                x,
                                y,
                            },
                            None,
                        );
                    }
                    Some(_) => {}
                    None => debug!("Ignored move from {}: ({}, {})", id, dx, dy),
                }
            }
            ClientEvent::Chat { text } => {
                let Some(from) = self.lobby.get(id).map(|p| p.name.clone()) else {
                    return;
                };
                match sanitize_chat(&text) {
                    Some(text) => {
                        self.clients.broadcast(&ServerEvent::Chat { from, text }, None);
                    }
                    None => debug!("Ignored empty chat from {}", id),
                }
            }
        }
    }

    fn depart(&mut self, id: &PlayerId) {
        self.clients.remove_client(id);
        if self.lobby.leave(id).is_some() {
            self.clients
                .broadcast(&ServerEvent::PlayerLeft { id: id.clone() }, None);
        }
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }
}

/// Main server coordinating connections and the lobby
pub struct Server {
    listener: TcpListener,
    room: Room,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(addr: &str, max_players: usize) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            room: Room::new(max_players),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop. All lobby mutations happen here, one message at a time.
    pub async fn run(mut self) -> Result<(), ServerError> {
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tokio::spawn(handle_connection(stream, addr, self.server_tx.clone()));
                        }
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => self.room.handle(message),
                        None => break,
                    }
                },
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let mut query = None;
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        query = request.uri().query().map(str::to_owned);
        Ok(response)
    };

    let ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let handshake = Handshake::from_query(query.as_deref());
    debug!("Connection from {} as {:?}", addr, handshake.name);

    let (mut write, mut read) = ws.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = write.send(message).await {
                debug!("Write to {} failed: {}", addr, e);
                break;
            }
            if closing {
                break;
            }
        }
    });

    let (reply_tx, reply_rx) = oneshot::channel();
    let join = ServerMessage::Join {
        name: handshake.name,
        sprite: handshake.sprite,
        outbox,
        reply: reply_tx,
    };
    if server_tx.send(join).is_err() {
        return;
    }

    let id = match reply_rx.await {
        Ok(Ok(id)) => id,
        _ => {
            let _ = writer.await;
            return;
        }
    };

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_frame::<ClientEvent>(&text) {
                Ok(event) => {
                    if server_tx.send(ServerMessage::Event { id: id.clone(), event }).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Dropped undecodable frame from {}: {}", id, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read from {} failed: {}", id, e);
                break;
            }
        }
    }

    info!("Player {} disconnected", id);
    let _ = server_tx.send(ServerMessage::Left { id });
    let _ = writer.await;
}
