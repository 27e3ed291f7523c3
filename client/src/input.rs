//! Keyboard handling: held movement keys, fixed-rate motion sampling and the
//! chat entry line.

use macroquad::prelude::*;
use shared::{ClientEvent, MAX_CHAT_LEN, MOVE_STEP, SAMPLE_INTERVAL_MS};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// A tracked movement key. Arrows and WASD are aliases for the same four
/// directions but are tracked separately, so releasing one alias leaves the
/// other still held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKey {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    A,
    D,
    W,
    S,
}

impl MoveKey {
    /// Maps a DOM-style key name (`"ArrowLeft"`, `"a"`, `"A"`, ...).
    #[cfg(test)]
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "ArrowLeft" => Some(MoveKey::ArrowLeft),
            "ArrowRight" => Some(MoveKey::ArrowRight),
            "ArrowUp" => Some(MoveKey::ArrowUp),
            "ArrowDown" => Some(MoveKey::ArrowDown),
            "a" | "A" => Some(MoveKey::A),
            "d" | "D" => Some(MoveKey::D),
            "w" | "W" => Some(MoveKey::W),
            "s" | "S" => Some(MoveKey::S),
            _ => None,
        }
    }

    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Left => Some(MoveKey::ArrowLeft),
            KeyCode::Right => Some(MoveKey::ArrowRight),
            KeyCode::Up => Some(MoveKey::ArrowUp),
            KeyCode::Down => Some(MoveKey::ArrowDown),
            KeyCode::A => Some(MoveKey::A),
            KeyCode::D => Some(MoveKey::D),
            KeyCode::W => Some(MoveKey::W),
            KeyCode::S => Some(MoveKey::S),
            _ => None,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            MoveKey::ArrowLeft | MoveKey::A => Direction::Left,
            MoveKey::ArrowRight | MoveKey::D => Direction::Right,
            MoveKey::ArrowUp | MoveKey::W => Direction::Up,
            MoveKey::ArrowDown | MoveKey::S => Direction::Down,
        }
    }
}

/// Displacement requested for one sampling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionIntent {
    pub dx: f32,
    pub dy: f32,
}

impl MotionIntent {
    pub fn is_idle(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    pub fn to_event(self) -> ClientEvent {
        ClientEvent::Move {
            dx: self.dx,
            dy: self.dy,
        }
    }
}

/// Tracks held movement keys and turns them into at most one motion intent
/// per sampling interval.
#[derive(Debug)]
pub struct InputSampler {
    pressed: HashSet<MoveKey>,
    interval: Duration,
    step: f32,
    last_sample: Instant,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::with_clock(
            Duration::from_millis(SAMPLE_INTERVAL_MS),
            MOVE_STEP,
            Instant::now(),
        )
    }

    pub fn with_clock(interval: Duration, step: f32, start: Instant) -> Self {
        Self {
            pressed: HashSet::new(),
            interval,
            step,
            last_sample: start,
        }
    }

    /// Records a key press. Returns true when the key was taken by the
    /// sampler; while the chat line has focus nothing is taken.
    pub fn key_down(&mut self, key: MoveKey, chat_focused: bool) -> bool {
        if chat_focused {
            return false;
        }
        self.pressed.insert(key);
        true
    }

    pub fn key_up(&mut self, key: MoveKey) {
        self.pressed.remove(&key);
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.pressed.iter().any(|key| key.direction() == direction)
    }

    /// Current motion vector. Opposing directions cancel on their axis.
    pub fn motion(&self) -> MotionIntent {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.is_held(Direction::Left) {
            dx -= self.step;
        }
        if self.is_held(Direction::Right) {
            dx += self.step;
        }
        if self.is_held(Direction::Up) {
            dy -= self.step;
        }
        if self.is_held(Direction::Down) {
            dy += self.step;
        }
        MotionIntent { dx, dy }
    }

    /// Runs the sampling timer. Returns an intent only on a tick whose
    /// motion is non-zero; idle ticks and calls between ticks yield `None`.
    pub fn sample(&mut self, now: Instant) -> Option<MotionIntent> {
        let elapsed = now.saturating_duration_since(self.last_sample);
        if elapsed < self.interval {
            return None;
        }
        // Ticks stay on the fixed grid unless we fell a whole interval behind.
        if elapsed >= self.interval * 2 {
            self.last_sample = now;
        } else {
            self.last_sample += self.interval;
        }

        let intent = self.motion();
        (!intent.is_idle()).then_some(intent)
    }
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-line chat entry. While focused it receives every key.
#[derive(Debug, Default)]
pub struct ChatInput {
    focused: bool,
    buffer: String,
}

impl ChatInput {
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn push_char(&mut self, c: char) {
        if c.is_control() || self.buffer.chars().count() >= MAX_CHAT_LEN {
            return;
        }
        self.buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    /// Takes the trimmed line if it has any content. Whitespace-only input
    /// is left in place and nothing is returned.
    pub fn submit(&mut self) -> Option<String> {
        let text = self.buffer.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.buffer.clear();
        Some(text)
    }
}

/// What the keyboard produced during one frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub intent: Option<MotionIntent>,
    pub chat_text: Option<String>,
    pub any_key: bool,
}

/// Reads macroquad's keyboard state each frame and routes it to the chat
/// line or the movement sampler.
pub struct InputManager {
    sampler: InputSampler,
    chat: ChatInput,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            sampler: InputSampler::new(),
            chat: ChatInput::default(),
        }
    }

    pub fn update(&mut self) -> InputFrame {
        let pressed = get_keys_pressed();

        // Releases always reach the sampler so a key let go while typing
        // does not stay stuck.
        for code in get_keys_released() {
            if let Some(key) = MoveKey::from_key_code(code) {
                self.sampler.key_up(key);
            }
        }

        let enter = pressed.contains(&KeyCode::Enter) || pressed.contains(&KeyCode::KpEnter);
        let mut chat_text = None;

        if self.chat.is_focused() {
            while let Some(c) = get_char_pressed() {
                self.chat.push_char(c);
            }
            if pressed.contains(&KeyCode::Backspace) {
                self.chat.backspace();
            }
            if pressed.contains(&KeyCode::Escape) {
                self.chat.blur();
            } else if enter {
                chat_text = self.chat.submit();
                self.chat.blur();
            }
        } else {
            while get_char_pressed().is_some() {}
            if enter {
                self.chat.focus();
            }
            for code in &pressed {
                if let Some(key) = MoveKey::from_key_code(*code) {
                    self.sampler.key_down(key, false);
                }
            }
        }

        InputFrame {
            intent: self.sampler.sample(Instant::now()),
            chat_text,
            any_key: !pressed.is_empty(),
        }
    }

    pub fn chat(&self) -> &ChatInput {
        &self.chat
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
