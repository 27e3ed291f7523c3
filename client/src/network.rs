//! Real-time channel to the lobby server and the HTTP sprite fetcher.
//!
//! Socket I/O runs on a private tokio runtime. Nothing here touches session
//! state: inbound frames are decoded and queued, and the render thread drains
//! the queue in delivery order at the start of each frame.

use crate::sprites::SpriteFetcher;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_frame, encode_frame, ClientEvent, ServerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use url::Url;

/// Fire-and-forget outbound path. Implementations must not block and give
/// no delivery guarantee; a lost message is simply superseded by the next.
pub trait EventSink {
    fn emit(&self, event: ClientEvent);
}

/// What the channel reports to the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Event(ServerEvent),
    Disconnected { reason: String },
}

/// Raw bytes of a finished sprite fetch, or `None` on failure.
#[derive(Debug)]
pub struct SpriteFetched {
    pub url: String,
    pub bytes: Option<Vec<u8>>,
}

/// Builds the channel URL, carrying the display name (and optional sprite)
/// as query parameters. A bare `host:port` gets the `ws://` scheme.
pub fn channel_url(server: &str, name: &str, sprite: Option<&str>) -> Result<Url, url::ParseError> {
    let base = if server.contains("://") {
        server.to_string()
    } else {
        format!("ws://{}", server)
    };

    let mut url = Url::parse(&base)?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/ws");
    }
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("name", name);
        if let Some(sprite) = sprite.filter(|s| !s.is_empty()) {
            query.append_pair("sprite", sprite);
        }
    }
    Ok(url)
}

/// HTTP origin of the channel URL, used to resolve relative sprite paths.
pub fn asset_origin(channel: &Url) -> Url {
    let mut origin = channel.clone();
    let scheme = if channel.scheme() == "wss" {
        "https"
    } else {
        "http"
    };
    // ws -> http and wss -> https are both special schemes, so this cannot fail.
    let _ = origin.set_scheme(scheme);
    origin.set_path("/");
    origin.set_query(None);
    origin
}

pub fn resolve_sprite_url(origin: &Url, raw: &str) -> Option<Url> {
    origin.join(raw).ok()
}

#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            debug!("Channel closed, dropping outbound event");
        }
    }
}

/// Fetches sprite bytes over HTTP on the channel's runtime.
pub struct HttpSpriteFetcher {
    handle: Handle,
    http: reqwest::Client,
    origin: Url,
    tx: mpsc::UnboundedSender<SpriteFetched>,
}

impl SpriteFetcher for HttpSpriteFetcher {
    fn fetch(&self, url: &str) {
        let key = url.to_string();
        let tx = self.tx.clone();

        let Some(target) = resolve_sprite_url(&self.origin, url) else {
            warn!("Invalid sprite URL {}", url);
            let _ = tx.send(SpriteFetched {
                url: key,
                bytes: None,
            });
            return;
        };

        let http = self.http.clone();
        self.handle.spawn(async move {
            let bytes = match download(&http, target).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Sprite fetch for {} failed: {}", key, e);
                    None
                }
            };
            let _ = tx.send(SpriteFetched { url: key, bytes });
        });
    }
}

async fn download(http: &reqwest::Client, url: Url) -> Result<Vec<u8>, reqwest::Error> {
    let response = http.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

pub struct NetworkChannel {
    runtime: Runtime,
    url: Url,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    sprites_tx: mpsc::UnboundedSender<SpriteFetched>,
    sprites_rx: mpsc::UnboundedReceiver<SpriteFetched>,
    reconnect: Arc<AtomicBool>,
}

impl NetworkChannel {
    /// Starts the connection task. Returns immediately; the outcome of the
    /// first connection attempt arrives as a [`ChannelEvent`].
    pub fn open(
        url: Url,
        reconnect_delay: Option<Duration>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("lobby-net")
            .enable_all()
            .build()?;

        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (sprites_tx, sprites_rx) = mpsc::unbounded_channel();
        let reconnect = Arc::new(AtomicBool::new(reconnect_delay.is_some()));

        runtime.spawn(run_connection(
            url.clone(),
            reconnect_delay.unwrap_or_default(),
            Arc::clone(&reconnect),
            inbound_tx,
            outbound_rx,
        ));

        Ok(NetworkChannel {
            runtime,
            url,
            inbound,
            outbound,
            sprites_tx,
            sprites_rx,
            reconnect,
        })
    }

    pub fn sink(&self) -> ChannelSink {
        ChannelSink {
            tx: self.outbound.clone(),
        }
    }

    pub fn sprite_fetcher(&self) -> HttpSpriteFetcher {
        HttpSpriteFetcher {
            handle: self.runtime.handle().clone(),
            http: reqwest::Client::new(),
            origin: asset_origin(&self.url),
            tx: self.sprites_tx.clone(),
        }
    }

    pub fn try_next(&mut self) -> Option<ChannelEvent> {
        self.inbound.try_recv().ok()
    }

    pub fn try_next_sprite(&mut self) -> Option<SpriteFetched> {
        self.sprites_rx.try_recv().ok()
    }

    /// Stops reconnecting after the current connection ends.
    pub fn disable_reconnect(&self) {
        self.reconnect.store(false, Ordering::SeqCst);
    }

    pub fn shutdown(self) {
        self.runtime.shutdown_background();
    }
}

/// Connects, pumps frames until the connection ends, then waits and retries
/// while reconnecting is enabled.
pub async fn run_connection(
    url: Url,
    delay: Duration,
    reconnect: Arc<AtomicBool>,
    inbound_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
) {
    loop {
        let reason = match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("Connected to {}", url);

                // Intents queued while offline are stale.
                while outbound_rx.try_recv().is_ok() {}

                if inbound_tx.send(ChannelEvent::Connected).is_err() {
                    return;
                }
                pump(stream, &inbound_tx, &mut outbound_rx).await
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", url, e);
                e.to_string()
            }
        };

        if inbound_tx.send(ChannelEvent::Disconnected { reason }).is_err() {
            return;
        }
        if !reconnect.load(Ordering::SeqCst) {
            return;
        }

        sleep(delay).await;

        if !reconnect.load(Ordering::SeqCst) || inbound_tx.is_closed() {
            return;
        }
        info!("Reconnecting to {}", url);
    }
}

/// Moves frames both ways until the connection ends. Returns why it ended.
pub async fn pump<S>(
    stream: WebSocketStream<S>,
    inbound_tx: &mpsc::UnboundedSender<ChannelEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut ws_sender, mut ws_receiver) = stream.split();

    loop {
        tokio::select! {
            message = ws_receiver.next() => match message {
                Some(Ok(Message::Text(text))) => match decode_frame::<ServerEvent>(&text) {
                    Ok(event) => {
                        if inbound_tx.send(ChannelEvent::Event(event)).is_err() {
                            return "client closed".to_string();
                        }
                    }
                    Err(e) => warn!("Dropping undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) if !frame.reason.is_empty() => frame.reason.to_string(),
                        _ => "closed by server".to_string(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return e.to_string(),
                None => return "connection closed".to_string(),
            },

            outgoing = outbound_rx.recv() => match outgoing {
                Some(event) => match encode_frame(&event) {
                    Ok(json) => {
                        if let Err(e) = ws_sender.send(Message::Text(json)).await {
                            return e.to_string();
                        }
                    }
                    Err(e) => error!("Error encoding {} event: {}", event.name(), e),
                },
                None => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    return "client closed".to_string();
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::Role;

    #[test]
    fn test_channel_url_from_host_port() {
        let url = channel_url("127.0.0.1:8080", "alice", None).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8080/ws?name=alice");
    }

    #[test]
    fn test_channel_url_encodes_name_and_sprite() {
        let url = channel_url(
            "wss://lobby.example/game",
            "Dr Who & co",
            Some("/static/tardis.png"),
        )
        .unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/game");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "Dr Who & co".to_string()),
                ("sprite".to_string(), "/static/tardis.png".to_string()),
            ]
        );
    }

    #[test]
    fn test_channel_url_rejects_garbage() {
        assert!(channel_url("ws://", "alice", None).is_err());
    }

    #[test]
    fn test_asset_origin() {
        let channel = channel_url("127.0.0.1:8080", "a", None).unwrap();
        assert_eq!(asset_origin(&channel).as_str(), "http://127.0.0.1:8080/");

        let secure = Url::parse("wss://lobby.example/ws?name=a").unwrap();
        assert_eq!(asset_origin(&secure).as_str(), "https://lobby.example/");
    }

    #[test]
    fn test_resolve_sprite_url() {
        let origin = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            resolve_sprite_url(&origin, "/static/a.png").unwrap().as_str(),
            "http://127.0.0.1:8080/static/a.png"
        );
        assert_eq!(
            resolve_sprite_url(&origin, "https://cdn.example/b.png")
                .unwrap()
                .as_str(),
            "https://cdn.example/b.png"
        );
    }

    #[test]
    fn test_sink_is_fire_and_forget() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ChannelSink { tx };
        drop(rx);
        // Sending into a closed channel is silently dropped.
        sink.emit(ClientEvent::Move { dx: 6.0, dy: 0.0 });
    }

    #[tokio::test]
    async fn test_connection_failure_reported_without_reconnect() {
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let (_outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        // Port 9 on localhost is not expected to run a websocket server.
        let url = Url::parse("ws://127.0.0.1:9/ws?name=a").unwrap();
        run_connection(
            url,
            Duration::from_millis(1),
            Arc::new(AtomicBool::new(false)),
            inbound_tx,
            outbound_rx,
        )
        .await;

        match inbound_rx.recv().await {
            Some(ChannelEvent::Disconnected { .. }) => {}
            other => panic!("Unexpected channel event: {:?}", other),
        }
        assert!(inbound_rx.recv().await.is_none());
    }

    /// Unmasked server-to-client frame with a short payload.
    fn server_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() < 126);
        let mut frame = vec![0x80 | opcode, payload.len() as u8];
        frame.extend_from_slice(payload);
        frame
    }

    #[tokio::test]
    async fn test_pump_forwards_frames_until_close() {
        let chat = br#"{"event":"chat","data":{"from":"ann","text":"hi"}}"#;
        let mut script = server_frame(0x1, b"not json");
        script.extend(server_frame(0x1, chat));

        let mock = tokio_test::io::Builder::new()
            .read(&script)
            .read(&server_frame(0x8, b""))
            .build();
        let stream = WebSocketStream::from_raw_socket(mock, Role::Client, None).await;

        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let (_outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        let reason = pump(stream, &inbound_tx, &mut outbound_rx).await;
        assert_eq!(reason, "closed by server");

        assert_eq!(
            inbound_rx.try_recv().ok(),
            Some(ChannelEvent::Event(ServerEvent::Chat {
                from: "ann".to_string(),
                text: "hi".to_string(),
            }))
        );
        assert!(inbound_rx.try_recv().is_err());
    }
}
