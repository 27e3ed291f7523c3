use crate::chat::ChatLine;
use crate::input::ChatInput;
use crate::session::Session;
use crate::sprites::SpriteCache;
use macroquad::prelude::*;
use shared::{Player, DEFAULT_COLOR, WORLD_HEIGHT, WORLD_WIDTH};

/// Base radius every stick-figure proportion is derived from.
pub const FIGURE_RADIUS: f32 = 14.0;
pub const SPRITE_SIZE: f32 = 36.0;
pub const PANEL_WIDTH: f32 = 260.0;

const NAME_FONT_SIZE: u16 = 16;
const PANEL_FONT_SIZE: u16 = 18;
const CHAT_LINES: usize = 12;

/// How a single player is drawn this frame.
#[derive(Debug, PartialEq)]
pub enum RenderStrategy<'a, I> {
    Sprite(&'a I),
    Figure,
}

impl<'a, I> RenderStrategy<'a, I> {
    /// Sprite only when the player has one and it finished loading;
    /// pending or failed sprites fall back to the procedural figure.
    pub fn resolve(player: &Player, sprites: &'a SpriteCache<I>) -> Self {
        match player.sprite().and_then(|url| sprites.image(url)) {
            Some(image) => RenderStrategy::Sprite(image),
            None => RenderStrategy::Figure,
        }
    }
}

/// Stick-figure layout for a player standing at `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureGeometry {
    pub head: (f32, f32),
    pub head_radius: f32,
    pub neck_y: f32,
    pub shoulder_y: f32,
    pub hip_y: f32,
    pub hands: [(f32, f32); 2],
    pub hand_radius: f32,
    pub feet: [(f32, f32); 2],
    pub foot_len: f32,
    /// Baseline for the name label.
    pub name_y: f32,
}

impl FigureGeometry {
    pub fn new(x: f32, y: f32, r: f32) -> Self {
        let head_radius = (r * 0.8).round();
        let neck_y = y - (r * 0.3).round();
        let head_y = neck_y - head_radius;
        let hip_y = y + (r * 0.9).round();
        let shoulder_y = neck_y + (r * 0.15).round();

        let arm_len = (r * 1.4).round();
        let leg_len = (r * 1.8).round();
        let stance = (r * 0.8).round();
        let foot_y = hip_y + leg_len;

        Self {
            head: (x, head_y),
            head_radius,
            neck_y,
            shoulder_y,
            hip_y,
            hands: [(x - arm_len, shoulder_y), (x + arm_len, shoulder_y)],
            hand_radius: (r * 0.25).round().max(2.0),
            feet: [(x - stance, foot_y), (x + stance, foot_y)],
            foot_len: (r * 0.6).round().max(4.0),
            name_y: head_y - head_radius - 2.0,
        }
    }
}

/// Parses `#rgb` or `#rrggbb`.
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let (r, g, b) = match hex.len() {
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            (expand(0)?, expand(1)?, expand(2)?)
        }
        6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?),
        _ => return None,
    };
    Some(Color::from_rgba(r, g, b, 255))
}

fn player_color(player: &Player) -> Color {
    color_or_default(&player.color)
}

fn color_or_default(value: &str) -> Color {
    parse_hex_color(value)
        .or_else(|| parse_hex_color(DEFAULT_COLOR))
        .unwrap_or(GRAY)
}

fn hex(value: &str) -> Color {
    parse_hex_color(value).unwrap_or(BLACK)
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }

    /// Draws one frame: board, every player, then the side panel.
    pub fn render(&self, session: &Session<Texture2D>, chat_input: &ChatInput) {
        clear_background(hex("#f3f4f6"));
        self.draw_board();

        let registry = session.registry();
        for player in registry.players() {
            let is_self = registry.is_self(&player.id);
            match RenderStrategy::resolve(player, session.sprites()) {
                RenderStrategy::Sprite(texture) => self.draw_sprite(player, texture),
                RenderStrategy::Figure => self.draw_figure(player, is_self),
            }
        }

        self.draw_panel(session, chat_input);
    }

    fn draw_board(&self) {
        draw_rectangle(0.0, 0.0, self.width, self.height, WHITE);
        draw_rectangle_lines(0.5, 0.5, self.width - 1.0, self.height - 1.0, 1.0, hex("#ddd"));
    }

    fn draw_sprite(&self, player: &Player, texture: &Texture2D) {
        draw_texture_ex(
            texture,
            player.x - SPRITE_SIZE / 2.0,
            player.y - SPRITE_SIZE / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(SPRITE_SIZE, SPRITE_SIZE)),
                ..Default::default()
            },
        );
        draw_centered_text(player.display_name(), player.x, player.y - FIGURE_RADIUS - 4.0);
    }

    fn draw_figure(&self, player: &Player, is_self: bool) {
        let outline = if is_self { hex("#222") } else { hex("#555") };
        let body = player_color(player);
        let figure = FigureGeometry::new(player.x, player.y, FIGURE_RADIUS);
        let (x, head_y) = figure.head;

        draw_circle(x, head_y, figure.head_radius, body);
        draw_circle_lines(x, head_y, figure.head_radius, 2.0, outline);

        draw_line(x, figure.neck_y, x, figure.hip_y, 3.0, outline);

        for (hand_x, hand_y) in figure.hands {
            draw_line(x, figure.shoulder_y, hand_x, hand_y, 3.0, outline);
            draw_circle(hand_x, hand_y, figure.hand_radius, body);
            draw_circle_lines(hand_x, hand_y, figure.hand_radius, 2.0, outline);
        }

        let half_foot = figure.foot_len / 2.0;
        for (foot_x, foot_y) in figure.feet {
            draw_line(x, figure.hip_y, foot_x, foot_y, 3.0, outline);
            draw_line(foot_x - half_foot, foot_y, foot_x + half_foot, foot_y, 3.0, outline);
        }

        draw_centered_text(player.display_name(), x, figure.name_y);
    }

    fn draw_panel(&self, session: &Session<Texture2D>, chat_input: &ChatInput) {
        let left = self.width + 16.0;
        let line_height = PANEL_FONT_SIZE as f32 + 4.0;
        let mut y = 24.0;

        let status = if session.is_connected() {
            ("Online", hex("#16a34a"))
        } else {
            ("Offline", hex("#dc2626"))
        };
        draw_circle(left + 5.0, y - 5.0, 5.0, status.1);
        draw_text(status.0, left + 16.0, y, PANEL_FONT_SIZE as f32, hex("#111"));
        y += line_height * 1.5;

        let roster = session.sidebar().entries();
        draw_text(
            &format!("Players ({})", roster.len()),
            left,
            y,
            PANEL_FONT_SIZE as f32,
            hex("#111"),
        );
        y += line_height;

        for entry in roster {
            let dot = color_or_default(&entry.color);
            draw_circle(left + 5.0, y - 5.0, 5.0, dot);
            draw_text(&entry.label, left + 16.0, y, PANEL_FONT_SIZE as f32, hex("#111"));
            y += line_height;
        }

        let chat_top = (y + line_height).max(self.height * 0.45);
        let right = self.width + PANEL_WIDTH - 16.0;
        draw_line(
            left,
            chat_top - line_height,
            right,
            chat_top - line_height,
            1.0,
            hex("#ddd"),
        );

        let mut chat_y = chat_top;
        for line in session.chat().tail(CHAT_LINES) {
            let (text, color) = match line {
                ChatLine::System(text) => (text.clone(), hex("#6b7280")),
                ChatLine::Message { from, text } => (format!("{}: {}", from, text), hex("#111")),
            };
            draw_text(&text, left, chat_y, PANEL_FONT_SIZE as f32, color);
            chat_y += line_height;
        }

        let input_y = self.height - 12.0;
        let (prompt, color) = if chat_input.is_focused() {
            (format!("> {}_", chat_input.text()), hex("#111"))
        } else {
            ("Press Enter to chat".to_string(), hex("#9ca3af"))
        };
        draw_text(&prompt, left, input_y, PANEL_FONT_SIZE as f32, color);
    }

    /// Blocking notice shown after the server ends the session.
    pub fn render_fatal(&self, message: &str) {
        clear_background(hex("#1f2937"));
        let center_x = screen_width() / 2.0;
        let center_y = screen_height() / 2.0;
        draw_centered_text_sized(message, center_x, center_y, 28, WHITE);
        draw_centered_text_sized(
            "Press any key to leave",
            center_x,
            center_y + 36.0,
            18,
            hex("#9ca3af"),
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_centered_text(text: &str, x: f32, y: f32) {
    draw_centered_text_sized(text, x, y, NAME_FONT_SIZE, hex("#111"));
}

fn draw_centered_text_sized(text: &str, x: f32, y: f32, font_size: u16, color: Color) {
    let dims = measure_text(text, None, font_size, 1.0);
    draw_text(text, x - dims.width / 2.0, y, font_size as f32, color);
}
