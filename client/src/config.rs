use std::time::Duration;

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server: String,
    pub name: String,
    pub sprite: Option<String>,
    /// `None` disables reconnecting.
    pub reconnect_delay: Option<Duration>,
    /// Chat lines kept in memory; zero keeps everything.
    pub chat_history: usize,
    pub width: i32,
    pub height: i32,
}

impl ClientConfig {
    pub fn reconnect_after_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay = (delay_ms > 0).then(|| Duration::from_millis(delay_ms));
        self
    }

    /// Trims the display name, falling back to `Player` when blank.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            "Player".to_string()
        } else {
            name.to_string()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8080".to_string(),
            name: "Player".to_string(),
            sprite: None,
            reconnect_delay: Some(Duration::from_secs(2)),
            chat_history: 500,
            width: 1080,
            height: 520,
        }
    }
}
