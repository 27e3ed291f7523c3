//! Append-only chat log with optional history cap.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatLine {
    /// Synthetic notice generated by the client (join, leave, connect).
    System(String),
    Message { from: String, text: String },
}

#[derive(Debug)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    max_lines: Option<usize>,
}

impl ChatLog {
    /// `max_lines` of zero keeps every line.
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: (max_lines > 0).then_some(max_lines),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push(ChatLine::System(text.into()));
    }

    pub fn push_message(&mut self, from: impl Into<String>, text: impl Into<String>) {
        self.push(ChatLine::Message {
            from: from.into(),
            text: text.into(),
        });
    }

    fn push(&mut self, line: ChatLine) {
        self.lines.push_back(line);
        if let Some(max) = self.max_lines {
            while self.lines.len() > max {
                self.lines.pop_front();
            }
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    /// The newest `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter().skip(self.lines.len().saturating_sub(count))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::unbounded()
    }
}
