use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }
}

/// Axis-aligned rectangle in overlay coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn inflate(self, d: f32) -> Self {
        Self::new(self.left - d, self.top - d, self.right + d, self.bottom + d)
    }
}

/// Rectangle in integer device units, used by the magnification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn to_rectf(self) -> RectF {
        RectF::new(
            self.x as f32,
            self.y as f32,
            (self.x + self.width) as f32,
            (self.y + self.height) as f32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Color,
    pub min_width: f32,
    pub max_width: f32,
    pub step_width: f32,
    pub regular_width: f32,
    pub highlight_width: f32,
}

impl Style {
    pub fn clamp_regular(&self, width: f32) -> f32 {
        width.clamp(self.min_width, self.max_width)
    }

    pub fn highlight_bounds(&self, multiplier: f32) -> (f32, f32) {
        let m = multiplier.max(1.0);
        (self.min_width * m, self.max_width * m)
    }

    pub fn clamp_highlight(&self, width: f32, multiplier: f32) -> f32 {
        let (lo, hi) = self.highlight_bounds(multiplier);
        width.clamp(lo, hi)
    }

    /// Fills in an unset highlight width and clamps both widths into range.
    pub fn normalize_widths(&mut self, multiplier: f32) {
        self.regular_width = self.clamp_regular(self.regular_width);
        if self.highlight_width <= 0.0 {
            self.highlight_width = self.regular_width * multiplier.max(1.0);
        }
        self.highlight_width = self.clamp_highlight(self.highlight_width, multiplier);
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Color::rgb(255, 0, 0),
            min_width: 2.0,
            max_width: 50.0,
            step_width: 2.0,
            regular_width: 6.0,
            highlight_width: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeMode {
    Regular,
    Eraser,
    Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Stroke,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandBody {
    Stroke {
        mode: StrokeMode,
        width: f32,
        points: Vec<Point>,
    },
    Text {
        text: String,
        size: f32,
        anchor: Point,
    },
}

/// One persisted annotation. `style` is a copy taken when the command began.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub style: Style,
    pub body: CommandBody,
}

impl Command {
    pub fn stroke(style: Style, mode: StrokeMode, width: f32, start: Point) -> Self {
        Self {
            style,
            body: CommandBody::Stroke {
                mode,
                width,
                points: vec![start],
            },
        }
    }

    pub fn text(style: Style, size: f32, anchor: Point) -> Self {
        Self {
            style,
            body: CommandBody::Text {
                text: String::new(),
                size,
                anchor,
            },
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self.body {
            CommandBody::Stroke { .. } => CommandKind::Stroke,
            CommandBody::Text { .. } => CommandKind::Text,
        }
    }

    pub fn points(&self) -> &[Point] {
        match &self.body {
            CommandBody::Stroke { points, .. } => points,
            CommandBody::Text { .. } => &[],
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.body {
            CommandBody::Text { text, .. } => Some(text),
            CommandBody::Stroke { .. } => None,
        }
    }

    pub fn stroke_mode(&self) -> Option<StrokeMode> {
        match self.body {
            CommandBody::Stroke { mode, .. } => Some(mode),
            CommandBody::Text { .. } => None,
        }
    }

    /// A stroke needs at least one point, a text needs at least one character.
    pub fn is_committable(&self) -> bool {
        match &self.body {
            CommandBody::Stroke { points, .. } => !points.is_empty(),
            CommandBody::Text { text, .. } => !text.is_empty(),
        }
    }
}
