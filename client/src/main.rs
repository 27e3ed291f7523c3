use clap::Parser;
use client::app::Client;
use client::config::ClientConfig;
use log::{error, info};
use macroquad::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to (host:port or ws:// URL)
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name shown to other players
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Sprite image URL, absolute or relative to the server
    #[arg(long)]
    sprite: Option<String>,

    /// Delay before reconnecting after the connection drops, 0 disables
    #[arg(long, default_value = "2000")]
    reconnect_delay_ms: u64,

    /// Chat lines kept in memory, 0 keeps everything
    #[arg(long, default_value = "500")]
    chat_history: usize,

    /// Window width
    #[arg(short = 'w', long, default_value = "1080")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "520")]
    height: i32,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        ClientConfig {
            server: args.server,
            name: args.name,
            sprite: args.sprite,
            reconnect_delay: None,
            chat_history: args.chat_history,
            width: args.width,
            height: args.height,
        }
        .reconnect_after_ms(args.reconnect_delay_ms)
    }
}

fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::from(Args::parse());

    info!("Starting client as {}", config.display_name());
    info!("Controls: arrows/WASD to move, Enter to chat");

    let window = Conf {
        window_title: "Lobby".to_string(),
        window_width: config.width,
        window_height: config.height,
        ..Default::default()
    };

    macroquad::Window::from_config(window, async move {
        let client = match Client::new(&config) {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to start client: {}", e);
                return;
            }
        };

        if let Err(e) = client.run().await {
            error!("Client error: {}", e);
        }
    });
}
