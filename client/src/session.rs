//! Per-connection session context.
//!
//! A `Session` owns everything that lives for one real-time session: the
//! player registry, the roster view, the chat log and the sprite cache,
//! together with the outbound sink and the sprite fetcher it talks through.
//! Inbound events are applied strictly in the order they are handed in.

use crate::chat::ChatLog;
use crate::input::MotionIntent;
use crate::network::EventSink;
use crate::registry::PlayerRegistry;
use crate::sidebar::Sidebar;
use crate::sprites::{SpriteCache, SpriteFetcher};
use log::{debug, info, warn};
use shared::{ClientEvent, Player, ServerEvent};

/// Outcome of applying one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Applied,
    /// The event had no effect (unknown id, or the session already ended).
    Ignored,
    /// The server ended the session; the message must be shown to the user
    /// and the game view left.
    Abort(String),
}

/// Client state for one login. It outlives individual connections:
/// reconnects reuse it, keeping the sprite cache and chat log, while the
/// roster is rebuilt from each fresh `init_state`.
pub struct Session<I> {
    name: String,
    registry: PlayerRegistry,
    sidebar: Sidebar,
    chat: ChatLog,
    sprites: SpriteCache<I>,
    fetcher: Box<dyn SpriteFetcher>,
    sink: Box<dyn EventSink>,
    connected: bool,
    fatal: Option<String>,
}

impl<I> Session<I> {
    pub fn new(
        name: &str,
        chat_history: usize,
        sink: Box<dyn EventSink>,
        fetcher: Box<dyn SpriteFetcher>,
    ) -> Self {
        Self {
            name: name.to_string(),
            registry: PlayerRegistry::new(),
            sidebar: Sidebar::new(),
            chat: ChatLog::new(chat_history),
            sprites: SpriteCache::new(),
            fetcher,
            sink,
            connected: false,
            fatal: None,
        }
    }

    pub fn on_connected(&mut self) {
        if self.fatal.is_some() {
            return;
        }
        self.connected = true;
        self.chat.push_system(format!("Connected as {}", self.name));
    }

    /// Transport loss. The registry is discarded; the next `init_state`
    /// rebuilds it.
    pub fn on_disconnected(&mut self, reason: &str) {
        if !self.connected {
            return;
        }
        warn!("Connection lost: {}", reason);
        self.connected = false;
        self.registry.clear();
        self.sidebar.rebuild(&self.registry);
        if self.fatal.is_none() {
            self.chat.push_system("Disconnected");
        }
    }

    pub fn handle(&mut self, event: ServerEvent) -> Dispatch {
        if self.fatal.is_some() {
            debug!("Session ended, ignoring {:?}", event);
            return Dispatch::Ignored;
        }

        match event {
            ServerEvent::InitState(snapshot) => {
                info!(
                    "Session started as {} with {} players",
                    snapshot.self_id,
                    snapshot.players.len()
                );
                for player in &snapshot.players {
                    self.load_sprite(player);
                }
                self.registry.initialize(snapshot.self_id, snapshot.players);
                self.sidebar.rebuild(&self.registry);
                Dispatch::Applied
            }

            ServerEvent::PlayerJoined(player) => {
                info!("{} joined as {}", player.display_name(), player.id);
                self.load_sprite(&player);
                self.chat.push_system(format!("{} joined", player.display_name()));
                self.registry.upsert_joined(player);
                self.sidebar.rebuild(&self.registry);
                Dispatch::Applied
            }

            ServerEvent::PlayerLeft { id } => match self.registry.remove(&id) {
                Some(player) => {
                    info!("{} left", player.display_name());
                    self.chat.push_system(format!("{} left", player.display_name()));
                    self.sidebar.rebuild(&self.registry);
                    Dispatch::Applied
                }
                None => {
                    debug!("Leave for unknown player {}", id);
                    Dispatch::Ignored
                }
            },

            ServerEvent::PlayerMoved { id, x, y } => {
                if self.registry.apply_move(&id, x, y) {
                    Dispatch::Applied
                } else {
                    Dispatch::Ignored
                }
            }

            ServerEvent::Chat { from, text } => {
                self.chat.push_message(from, text);
                Dispatch::Applied
            }

            ServerEvent::ServerError { message } => {
                let message = if message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    message
                };
                warn!("Server ended the session: {}", message);
                self.fatal = Some(message.clone());
                Dispatch::Abort(message)
            }
        }
    }

    fn load_sprite(&mut self, player: &Player) {
        if let Some(url) = player.sprite() {
            self.sprites.ensure_loaded(url, self.fetcher.as_ref());
        }
    }

    /// Emits a move intent. Idle intents are never sent.
    pub fn send_move(&self, intent: MotionIntent) -> bool {
        if intent.is_idle() || !self.can_send() {
            return false;
        }
        self.sink.emit(intent.to_event());
        true
    }

    /// Emits a chat line if it has content after trimming.
    pub fn send_chat(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || !self.can_send() {
            return false;
        }
        self.sink.emit(ClientEvent::Chat {
            text: text.to_string(),
        });
        true
    }

    fn can_send(&self) -> bool {
        self.connected && self.fatal.is_none()
    }

    pub fn resolve_sprite(&mut self, url: &str, image: Option<I>) {
        self.sprites.resolve(url, image);
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn sprites(&self) -> &SpriteCache<I> {
        &self.sprites
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn fatal(&self) -> Option<&str> {
        self.fatal.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatLine;
    use shared::{decode_frame, PlayerId, SessionSnapshot};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Rc<RefCell<Vec<ClientEvent>>>,
        fetched: Rc<RefCell<Vec<String>>>,
    }

    impl EventSink for Recorder {
        fn emit(&self, event: ClientEvent) {
            self.sent.borrow_mut().push(event);
        }
    }

    impl SpriteFetcher for Recorder {
        fn fetch(&self, url: &str) {
            self.fetched.borrow_mut().push(url.to_string());
        }
    }

    fn session() -> (Session<u32>, Recorder) {
        let recorder = Recorder::default();
        let mut session = Session::new(
            "alice",
            0,
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        );
        session.on_connected();
        (session, recorder)
    }

    fn init(session: &mut Session<u32>) {
        let dispatch = session.handle(ServerEvent::InitState(SessionSnapshot {
            self_id: PlayerId::new("p1"),
            players: vec![
                Player::new("p1", "alice", 0.0, 0.0, "#f00"),
                Player::new("p2", "bob", 10.0, 10.0, "#00f"),
            ],
        }));
        assert_eq!(dispatch, Dispatch::Applied);
    }

    fn system_notices(session: &Session<u32>) -> usize {
        session
            .chat()
            .lines()
            .filter(|line| matches!(line, ChatLine::System(_)))
            .count()
    }

    #[test]
    fn test_connect_notice() {
        let (session, _) = session();
        assert_eq!(
            session.chat().lines().next(),
            Some(&ChatLine::System("Connected as alice".to_string()))
        );
    }

    #[test]
    fn test_init_state_builds_registry_and_roster() {
        let (mut session, _) = session();
        init(&mut session);

        assert_eq!(session.registry().len(), 2);
        let labels: Vec<_> = session
            .sidebar()
            .entries()
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, vec!["alice (you)", "bob"]);
    }

    #[test]
    fn test_leave_then_move_is_noop() {
        let (mut session, _) = session();
        init(&mut session);
        let notices = system_notices(&session);

        let left = session.handle(ServerEvent::PlayerLeft { id: "p2".into() });
        assert_eq!(left, Dispatch::Applied);
        assert_eq!(session.registry().len(), 1);
        assert_eq!(system_notices(&session), notices + 1);

        let moved = session.handle(ServerEvent::PlayerMoved {
            id: "p2".into(),
            x: 50.0,
            y: 50.0,
        });
        assert_eq!(moved, Dispatch::Ignored);
        assert_eq!(session.registry().len(), 1);
        assert!(session.registry().get(&"p2".into()).is_none());
    }

    #[test]
    fn test_leave_of_unknown_adds_no_notice() {
        let (mut session, _) = session();
        init(&mut session);
        let notices = system_notices(&session);

        assert_eq!(
            session.handle(ServerEvent::PlayerLeft { id: "p9".into() }),
            Dispatch::Ignored
        );
        assert_eq!(system_notices(&session), notices);
    }

    #[test]
    fn test_join_rebuilds_roster_but_move_does_not() {
        let (mut session, recorder) = session();
        init(&mut session);
        let rebuilds = session.sidebar().rebuilds();

        session.handle(ServerEvent::PlayerJoined(
            Player::new("p3", "cy", 5.0, 5.0, "#0f0").with_sprite("/static/cy.png"),
        ));
        assert_eq!(session.sidebar().rebuilds(), rebuilds + 1);
        assert_eq!(recorder.fetched.borrow().as_slice(), ["/static/cy.png"]);
        assert_eq!(
            session.chat().lines().last(),
            Some(&ChatLine::System("cy joined".to_string()))
        );

        session.handle(ServerEvent::PlayerMoved {
            id: "p3".into(),
            x: 11.0,
            y: 12.0,
        });
        assert_eq!(session.sidebar().rebuilds(), rebuilds + 1);
        let p3 = session.registry().get(&"p3".into()).unwrap();
        assert_eq!((p3.x, p3.y), (11.0, 12.0));
    }

    #[test]
    fn test_shared_sprite_fetched_once() {
        let (mut session, recorder) = session();
        session.handle(ServerEvent::InitState(SessionSnapshot {
            self_id: "p1".into(),
            players: vec![
                Player::new("p1", "a", 0.0, 0.0, "#f00").with_sprite("/knight.png"),
                Player::new("p2", "b", 0.0, 0.0, "#f00").with_sprite("/knight.png"),
            ],
        }));
        session.handle(ServerEvent::PlayerJoined(
            Player::new("p3", "c", 0.0, 0.0, "#f00").with_sprite("/knight.png"),
        ));
        assert_eq!(recorder.fetched.borrow().len(), 1);
    }

    #[test]
    fn test_chat_message_appended() {
        let (mut session, _) = session();
        session.handle(ServerEvent::Chat {
            from: "bob".to_string(),
            text: "hey".to_string(),
        });
        assert_eq!(
            session.chat().lines().last(),
            Some(&ChatLine::Message {
                from: "bob".to_string(),
                text: "hey".to_string()
            })
        );
    }

    #[test]
    fn test_server_error_aborts_once() {
        let (mut session, recorder) = session();
        init(&mut session);

        let dispatch = session.handle(ServerEvent::ServerError {
            message: "Room full".to_string(),
        });
        assert_eq!(dispatch, Dispatch::Abort("Room full".to_string()));
        assert_eq!(session.fatal(), Some("Room full"));

        let after = session.handle(ServerEvent::PlayerJoined(Player::new(
            "p4", "late", 0.0, 0.0, "#000",
        )));
        assert_eq!(after, Dispatch::Ignored);
        assert_eq!(
            session.handle(ServerEvent::ServerError {
                message: "again".to_string()
            }),
            Dispatch::Ignored
        );
        assert_eq!(session.registry().len(), 2);

        assert!(!session.send_chat("hello?"));
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn test_server_error_default_message() {
        let (mut session, _) = session();
        assert_eq!(
            session.handle(ServerEvent::ServerError {
                message: String::new()
            }),
            Dispatch::Abort("Unknown error".to_string())
        );
    }

    #[test]
    fn test_send_move_skips_idle() {
        let (session, recorder) = session();
        assert!(!session.send_move(MotionIntent { dx: 0.0, dy: 0.0 }));
        assert!(session.send_move(MotionIntent { dx: 6.0, dy: 0.0 }));
        assert_eq!(
            recorder.sent.borrow().as_slice(),
            [ClientEvent::Move { dx: 6.0, dy: 0.0 }]
        );
    }

    #[test]
    fn test_send_chat_trims_and_skips_blank() {
        let (session, recorder) = session();
        assert!(!session.send_chat("   "));
        assert!(session.send_chat("  hi  "));
        assert_eq!(
            recorder.sent.borrow().as_slice(),
            [ClientEvent::Chat {
                text: "hi".to_string()
            }]
        );
    }

    #[test]
    fn test_nothing_sent_while_disconnected() {
        let recorder = Recorder::default();
        let session: Session<u32> = Session::new(
            "alice",
            0,
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        );
        assert!(!session.send_move(MotionIntent { dx: 6.0, dy: 6.0 }));
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn test_disconnect_discards_registry() {
        let (mut session, _) = session();
        init(&mut session);

        session.on_disconnected("reset by peer");
        assert!(session.registry().is_empty());
        assert!(session.sidebar().entries().is_empty());
        assert!(!session.is_connected());
        assert_eq!(
            session.chat().lines().last(),
            Some(&ChatLine::System("Disconnected".to_string()))
        );

        // Repeated failures while offline do not spam the log.
        let lines = session.chat().len();
        session.on_disconnected("refused");
        assert_eq!(session.chat().len(), lines);

        session.on_connected();
        init(&mut session);
        assert_eq!(session.registry().len(), 2);
    }

    #[test]
    fn test_sprite_resolution_reaches_cache() {
        let (mut session, _) = session();
        session.handle(ServerEvent::PlayerJoined(
            Player::new("p2", "b", 0.0, 0.0, "#f00").with_sprite("/b.png"),
        ));
        session.resolve_sprite("/b.png", Some(9));
        assert_eq!(session.sprites().image("/b.png"), Some(&9));
    }

    #[test]
    fn test_roster_without_names_or_colors() {
        let (mut session, _) = session();
        let event = decode_frame(
            r##"{"event":"init_state","data":{"selfId":"p1","players":[{"id":"p1","x":0,"y":0,"color":"#f00"},{"id":"p2","x":10,"y":10}]}}"##,
        )
        .unwrap();

        assert_eq!(session.handle(event), Dispatch::Applied);
        assert_eq!(session.registry().len(), 2);

        let labels: Vec<&str> = session
            .sidebar()
            .entries()
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(labels, vec!["p1 (you)", "p2"]);
    }
}
