use anyhow::Result;

use crate::draw::composite::RgbaBuffer;
use crate::draw::model::{Color, Point, RectF};
use crate::draw::widen::WidenedOutline;

/// The two render targets the pipeline draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Cached rasterization of committed history.
    Content,
    /// The frame that gets presented.
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    SourceOver,
    /// Overwrites destination pixels, alpha included.
    Copy,
}

/// Round-capped, round-joined pen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub width: f32,
    pub color: Color,
    pub blend: Blend,
}

impl Pen {
    pub fn new(width: f32, color: Color) -> Self {
        Self {
            width,
            color,
            blend: Blend::SourceOver,
        }
    }

    pub fn with_blend(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub line_spacing: f32,
}

/// Measured text ready to draw. `origin` passed to
/// [`Renderer::draw_text`] is the top-left of the block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub text: String,
    pub font: FontSpec,
    pub width: f32,
    pub height: f32,
}

/// Rasterization backend. Every call targets the surface opened by the last
/// [`Renderer::begin`]. Failures are per call; callers may skip a failed call
/// and carry on with the rest of the frame.
pub trait Renderer {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn begin(&mut self, surface: Surface) -> Result<()>;
    fn clear(&mut self, color: Color) -> Result<()>;
    fn end(&mut self) -> Result<()>;

    fn draw_line(&mut self, from: Point, to: Point, pen: &Pen) -> Result<()>;
    fn fill_circle(&mut self, center: Point, radius: f32, color: Color, blend: Blend) -> Result<()>;
    /// Fills the outline once under the non-zero winding rule.
    fn fill_outline(&mut self, outline: &WidenedOutline, color: Color) -> Result<()>;
    fn fill_rect(&mut self, rect: RectF, color: Color) -> Result<()>;
    fn stroke_rect(&mut self, rect: RectF, width: f32, color: Color) -> Result<()>;
    fn stroke_ellipse(&mut self, center: Point, radius: f32, width: f32, color: Color)
        -> Result<()>;

    fn layout_text(&mut self, text: &str, font: &FontSpec) -> Result<TextLayout>;
    fn draw_text(&mut self, layout: &TextLayout, origin: Point, color: Color) -> Result<()>;

    /// Copies the content surface onto the current target.
    fn blit_content(&mut self) -> Result<()>;
    fn present(&mut self) -> Result<()>;

    /// Reads back a surface, used for screenshots.
    fn read_pixels(&self, surface: Surface) -> Result<RgbaBuffer>;
}
