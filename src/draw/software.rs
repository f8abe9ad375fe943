use anyhow::{anyhow, bail, Result};

use crate::draw::composite::{blend_in_place, RgbaBuffer};
use crate::draw::model::{Color, Point, RectF};
use crate::draw::renderer::{Blend, FontSpec, Pen, Renderer, Surface, TextLayout};
use crate::draw::widen::WidenedOutline;

/// Horizontal advance of one glyph cell relative to the font size.
const GLYPH_ADVANCE: f32 = 0.55;

/// Pixel-space bounds of a primitive, clipped to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn from_rect(rect: RectF, pad: f32) -> Self {
        let x0 = device_coord((rect.left - pad).floor());
        let y0 = device_coord((rect.top - pad).floor());
        let x1 = device_coord((rect.right + pad).ceil());
        let y1 = device_coord((rect.bottom + pad).ceil());
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0 + 1).max(1),
            height: (y1 - y0 + 1).max(1),
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = self.x.saturating_add(self.width).clamp(0, max_w);
        let y1 = self.y.saturating_add(self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Keeps far off-screen bounds small enough that rect arithmetic stays in `i32`.
fn device_coord(value: f32) -> i32 {
    const LIMIT: f32 = (1 << 28) as f32;
    value.clamp(-LIMIT, LIMIT) as i32
}

/// CPU renderer over two RGBA buffers. Coverage is sampled at pixel centers
/// without antialiasing, so every output pixel is either untouched or blended
/// exactly once per primitive.
#[derive(Debug)]
pub struct SoftwareRenderer {
    content: RgbaBuffer,
    frame: RgbaBuffer,
    presented: RgbaBuffer,
    target: Option<Surface>,
    present_count: usize,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            content: RgbaBuffer::new(width, height, Color::TRANSPARENT),
            frame: RgbaBuffer::new(width, height, Color::TRANSPARENT),
            presented: RgbaBuffer::new(width, height, Color::TRANSPARENT),
            target: None,
            present_count: 0,
        }
    }

    pub fn content(&self) -> &RgbaBuffer {
        &self.content
    }

    /// The frame as of the last [`Renderer::present`].
    pub fn presented(&self) -> &RgbaBuffer {
        &self.presented
    }

    pub fn present_count(&self) -> usize {
        self.present_count
    }

    fn target_mut(&mut self) -> Result<&mut RgbaBuffer> {
        match self.target {
            Some(Surface::Content) => Ok(&mut self.content),
            Some(Surface::Frame) => Ok(&mut self.frame),
            None => Err(anyhow!("no surface is open for drawing")),
        }
    }

    /// Visits every pixel in `bounds` whose center satisfies `inside`.
    fn cover<F>(&mut self, bounds: RectF, color: Color, blend: Blend, inside: F) -> Result<()>
    where
        F: Fn(f32, f32) -> bool,
    {
        let target = self.target_mut()?;
        let Some(clip) = DirtyRect::from_rect(bounds, 1.0).clamp(target.width, target.height)
        else {
            return Ok(());
        };
        for y in clip.y..(clip.y + clip.height) {
            for x in clip.x..(clip.x + clip.width) {
                if inside(x as f32 + 0.5, y as f32 + 0.5) {
                    put(target, x as u32, y as u32, color, blend);
                }
            }
        }
        Ok(())
    }
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

fn put(target: &mut RgbaBuffer, x: u32, y: u32, color: Color, blend: Blend) {
    match blend {
        Blend::SourceOver => target.blend_pixel(x, y, color),
        Blend::Copy => target.set_pixel(x, y, color),
    }
}

fn point_segment_distance_sq(point: Point, start: Point, end: Point) -> f32 {
    let vx = end.x - start.x;
    let vy = end.y - start.y;
    let wx = point.x - start.x;
    let wy = point.y - start.y;
    let len_sq = vx * vx + vy * vy;
    if len_sq <= f32::EPSILON {
        return wx * wx + wy * wy;
    }
    let t = ((wx * vx + wy * vy) / len_sq).clamp(0.0, 1.0);
    let dx = point.x - (start.x + vx * t);
    let dy = point.y - (start.y + vy * t);
    dx * dx + dy * dy
}

impl Renderer for SoftwareRenderer {
    fn size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            bail!("cannot resize surfaces to {width}x{height}");
        }
        if self.target.is_some() {
            bail!("cannot resize while a surface is open");
        }
        if (width, height) != self.size() {
            self.content = RgbaBuffer::new(width, height, Color::TRANSPARENT);
            self.frame = RgbaBuffer::new(width, height, Color::TRANSPARENT);
            self.presented = RgbaBuffer::new(width, height, Color::TRANSPARENT);
        }
        Ok(())
    }

    fn begin(&mut self, surface: Surface) -> Result<()> {
        if let Some(open) = self.target {
            bail!("{open:?} surface is already open");
        }
        self.target = Some(surface);
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        self.target_mut()?.fill(color);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.target
            .take()
            .map(|_| ())
            .ok_or_else(|| anyhow!("end called without an open surface"))
    }

    fn draw_line(&mut self, from: Point, to: Point, pen: &Pen) -> Result<()> {
        let radius = pen.width.max(1.0) / 2.0;
        let radius_sq = radius * radius;
        let bounds = RectF::from_corners(from, to).inflate(radius);
        self.cover(bounds, pen.color, pen.blend, |x, y| {
            point_segment_distance_sq(Point::new(x, y), from, to) <= radius_sq
        })
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color, blend: Blend) -> Result<()> {
        let radius_sq = radius * radius;
        let bounds = RectF::from_corners(center, center).inflate(radius);
        self.cover(bounds, color, blend, |x, y| {
            let dx = x - center.x;
            let dy = y - center.y;
            dx * dx + dy * dy <= radius_sq
        })
    }

    fn fill_outline(&mut self, outline: &WidenedOutline, color: Color) -> Result<()> {
        let target = self.target_mut()?;
        let (width, height) = (target.width, target.height);
        outline.for_each_span(width, height, |y, x0, x1| {
            for x in x0..x1 {
                target.blend_pixel(x, y, color);
            }
        });
        Ok(())
    }

    fn fill_rect(&mut self, rect: RectF, color: Color) -> Result<()> {
        self.cover(rect, color, Blend::SourceOver, |x, y| {
            x >= rect.left && x < rect.right && y >= rect.top && y < rect.bottom
        })
    }

    fn stroke_rect(&mut self, rect: RectF, width: f32, color: Color) -> Result<()> {
        let half = width.max(1.0) / 2.0;
        let outer = rect.inflate(half);
        let inner = rect.inflate(-half);
        self.cover(outer, color, Blend::SourceOver, |x, y| {
            let in_outer = x >= outer.left && x < outer.right && y >= outer.top && y < outer.bottom;
            let in_inner = x >= inner.left && x < inner.right && y >= inner.top && y < inner.bottom;
            in_outer && !in_inner
        })
    }

    fn stroke_ellipse(
        &mut self,
        center: Point,
        radius: f32,
        width: f32,
        color: Color,
    ) -> Result<()> {
        let half = width.max(1.0) / 2.0;
        let bounds = RectF::from_corners(center, center).inflate(radius + half);
        self.cover(bounds, color, Blend::SourceOver, |x, y| {
            let dx = x - center.x;
            let dy = y - center.y;
            ((dx * dx + dy * dy).sqrt() - radius).abs() <= half
        })
    }

    fn layout_text(&mut self, text: &str, font: &FontSpec) -> Result<TextLayout> {
        if !(font.size > 0.0) {
            bail!("font size must be positive, got {}", font.size);
        }
        let lines: Vec<&str> = text.split('\n').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let line_height = font.size * font.line_spacing.max(0.1);
        Ok(TextLayout {
            text: text.to_owned(),
            font: font.clone(),
            width: longest as f32 * font.size * GLYPH_ADVANCE,
            height: lines.len() as f32 * line_height,
        })
    }

    /// Glyphs are drawn as solid cells; enough for placement and coverage.
    fn draw_text(&mut self, layout: &TextLayout, origin: Point, color: Color) -> Result<()> {
        let size = layout.font.size;
        let advance = size * GLYPH_ADVANCE;
        let line_height = size * layout.font.line_spacing.max(0.1);
        for (row, line) in layout.text.split('\n').enumerate() {
            let top = origin.y + row as f32 * line_height + size * 0.2;
            for (col, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let left = origin.x + col as f32 * advance + advance * 0.1;
                self.fill_rect(
                    RectF::new(left, top, left + advance * 0.8, top + size * 0.7),
                    color,
                )?;
            }
        }
        Ok(())
    }

    fn blit_content(&mut self) -> Result<()> {
        match self.target {
            Some(Surface::Frame) => blend_in_place(&mut self.frame, &self.content),
            Some(Surface::Content) => bail!("cannot blit the content surface onto itself"),
            None => bail!("no surface is open for drawing"),
        }
    }

    fn present(&mut self) -> Result<()> {
        if self.target.is_some() {
            bail!("present called while a surface is open");
        }
        self.presented.pixels.copy_from_slice(&self.frame.pixels);
        self.present_count += 1;
        Ok(())
    }

    fn read_pixels(&self, surface: Surface) -> Result<RgbaBuffer> {
        Ok(match surface {
            Surface::Content => self.content.clone(),
            Surface::Frame => self.frame.clone(),
        })
    }
}
