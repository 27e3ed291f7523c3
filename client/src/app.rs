//! Frame loop tying the channel, session, keyboard and renderer together.

use crate::config::ClientConfig;
use crate::input::InputManager;
use crate::network::{channel_url, ChannelEvent, NetworkChannel, SpriteFetched};
use crate::rendering::Renderer;
use crate::session::{Dispatch, Session};
use log::{info, warn};
use macroquad::prelude::*;

pub struct Client {
    channel: NetworkChannel,
    session: Session<Texture2D>,
    input: InputManager,
    renderer: Renderer,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let name = config.display_name();
        let url = channel_url(&config.server, &name, config.sprite.as_deref())?;
        info!("Connecting to {}", url);

        let channel = NetworkChannel::open(url, config.reconnect_delay)?;
        let session = Session::new(
            &name,
            config.chat_history,
            Box::new(channel.sink()),
            Box::new(channel.sprite_fetcher()),
        );

        Ok(Client {
            channel,
            session,
            input: InputManager::new(),
            renderer: Renderer::new(),
        })
    }

    /// Applies every queued channel event in arrival order. Returns the
    /// message of a fatal server error, after which nothing else is applied.
    fn drain_network(&mut self) -> Option<String> {
        while let Some(event) = self.channel.try_next() {
            match event {
                ChannelEvent::Connected => self.session.on_connected(),
                ChannelEvent::Disconnected { reason } => self.session.on_disconnected(&reason),
                ChannelEvent::Event(event) => {
                    if let Dispatch::Abort(message) = self.session.handle(event) {
                        self.channel.disable_reconnect();
                        return Some(message);
                    }
                }
            }
        }
        None
    }

    fn drain_sprites(&mut self) {
        while let Some(SpriteFetched { url, bytes }) = self.channel.try_next_sprite() {
            let texture = bytes.and_then(|bytes| decode_texture(&url, &bytes));
            self.session.resolve_sprite(&url, texture);
        }
    }

    /// Runs until the server ends the session and the user dismisses the
    /// notice. Closing the window ends the process.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let message = loop {
            if let Some(message) = self.drain_network() {
                break message;
            }
            self.drain_sprites();

            let frame = self.input.update();
            if let Some(intent) = frame.intent {
                self.session.send_move(intent);
            }
            if let Some(text) = frame.chat_text {
                self.session.send_chat(&text);
            }

            self.renderer.render(&self.session, self.input.chat());
            next_frame().await;
        };

        self.show_fatal(&message).await;
        info!("Leaving game view");
        self.channel.shutdown();
        Ok(())
    }

    async fn show_fatal(&self, message: &str) {
        loop {
            self.renderer.render_fatal(message);
            next_frame().await;
            if !get_keys_pressed().is_empty() {
                break;
            }
        }
    }
}

fn decode_texture(url: &str, bytes: &[u8]) -> Option<Texture2D> {
    match Image::from_file_with_format(bytes, None) {
        Ok(image) => Some(Texture2D::from_image(&image)),
        Err(e) => {
            warn!("Sprite {} could not be decoded: {:?}", url, e);
            None
        }
    }
}
