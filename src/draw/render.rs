use anyhow::Result;

use crate::draw::composite::RgbaBuffer;
use crate::draw::history::DrawHistory;
use crate::draw::model::{Color, Command, CommandBody, Point, RectF, StrokeMode};
use crate::draw::renderer::{Blend, FontSpec, Pen, Renderer, Surface};
use crate::draw::widen::{widen_polyline, FLATTEN_TOLERANCE};

const HALO: Color = Color::rgba(0, 0, 0, 217);
const INDICATOR_MARGIN: f32 = 2.0;
const CARET_OFFSET: f32 = 6.0;
const TOAST_MARGIN: f32 = 24.0;
const TOAST_PAD_X: f32 = 16.0;
const TOAST_PAD_Y: f32 = 8.0;

/// Text settings shared by every text command.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContext {
    pub family: String,
    pub line_spacing: f32,
    /// Used when a command carries no positive size of its own.
    pub fallback_size: f32,
}

impl TextContext {
    fn font(&self, size: f32) -> FontSpec {
        FontSpec {
            family: self.family.clone(),
            size: if size > 0.0 { size } else { self.fallback_size },
            line_spacing: self.line_spacing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Indicator {
    /// Text insertion marker drawn just left of the pointer at `at`.
    Caret { at: Point, height: f32, color: Color },
    /// Eraser footprint.
    Square { center: Point, size: f32, color: Color },
    /// Brush footprint.
    Ring { center: Point, radius: f32, color: Color },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToastOverlay {
    pub text: String,
    pub text_size: f32,
    pub text_color: Color,
    pub background: Color,
}

/// UI drawn above annotations, in this order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlays {
    pub indicator: Option<Indicator>,
    pub selection: Option<(RectF, Color)>,
    pub magnifier_window: Option<RectF>,
    pub toast: Option<ToastOverlay>,
}

/// Keeps the indicator inside the surface with a small margin.
pub fn clamp_indicator_radius(center: Point, radius: f32, size: (u32, u32)) -> f32 {
    let (w, h) = (size.0 as f32, size.1 as f32);
    radius
        .min(center.x - INDICATOR_MARGIN)
        .min(center.y - INDICATOR_MARGIN)
        .min(w - INDICATOR_MARGIN - center.x)
        .min(h - INDICATOR_MARGIN - center.y)
        .max(1.0)
}

/// Two-layer compositor. Committed history is rasterized into the content
/// surface only when its revision or the surface size changes; every frame
/// then blits that cache and draws the live command and overlays on top.
#[derive(Debug, Default)]
pub struct LayeredRenderer {
    content_revision: Option<u64>,
    content_size: (u32, u32),
    rebuild_count: usize,
    compose_count: usize,
}

impl LayeredRenderer {
    /// Drops the cached content so the next frame rebuilds it.
    pub fn invalidate(&mut self) {
        self.content_revision = None;
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    pub fn compose_count(&self) -> usize {
        self.compose_count
    }

    fn ensure_content<R: Renderer>(
        &mut self,
        renderer: &mut R,
        history: &DrawHistory,
        text: &TextContext,
    ) {
        let size = renderer.size();
        if self.content_revision == Some(history.revision()) && self.content_size == size {
            return;
        }
        if let Err(err) = rebuild_content(renderer, history.committed(), text) {
            tracing::warn!(error = %err, "content layer rebuild skipped");
            return;
        }
        self.content_revision = Some(history.revision());
        self.content_size = size;
        self.rebuild_count += 1;
        tracing::trace!(
            revision = history.revision(),
            commands = history.committed().len(),
            "content layer rebuilt"
        );
    }

    pub fn compose<R: Renderer>(
        &mut self,
        renderer: &mut R,
        history: &DrawHistory,
        live: Option<&Command>,
        overlays: &Overlays,
        text: &TextContext,
    ) {
        self.ensure_content(renderer, history, text);
        if let Err(err) = renderer.begin(Surface::Frame) {
            tracing::warn!(error = %err, "frame composition skipped");
            return;
        }
        skip_on_error(renderer.clear(Color::TRANSPARENT), "clear frame");
        skip_on_error(renderer.blit_content(), "blit content layer");
        if let Some(live) = live {
            draw_command(renderer, live, text);
        }
        draw_overlays(renderer, overlays);
        skip_on_error(renderer.end(), "end frame");
        skip_on_error(renderer.present(), "present frame");
        self.compose_count += 1;
    }

    /// Renders committed and live annotations without UI overlays and reads
    /// the result back. The presented frame is left untouched.
    pub fn compose_annotation<R: Renderer>(
        &mut self,
        renderer: &mut R,
        history: &DrawHistory,
        live: Option<&Command>,
        text: &TextContext,
    ) -> Result<RgbaBuffer> {
        self.ensure_content(renderer, history, text);
        renderer.begin(Surface::Frame)?;
        skip_on_error(renderer.clear(Color::TRANSPARENT), "clear frame");
        skip_on_error(renderer.blit_content(), "blit content layer");
        if let Some(live) = live {
            draw_command(renderer, live, text);
        }
        renderer.end()?;
        renderer.read_pixels(Surface::Frame)
    }
}

fn rebuild_content<R: Renderer>(
    renderer: &mut R,
    commands: &[Command],
    text: &TextContext,
) -> Result<()> {
    renderer.begin(Surface::Content)?;
    skip_on_error(renderer.clear(Color::TRANSPARENT), "clear content");
    for command in commands {
        draw_command(renderer, command, text);
    }
    renderer.end()
}

fn skip_on_error(result: Result<()>, what: &str) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "{what} skipped");
    }
}

/// Rasterizes one command onto the open surface. Failed primitives are
/// skipped for this frame.
pub fn draw_command<R: Renderer>(renderer: &mut R, command: &Command, text: &TextContext) {
    match &command.body {
        CommandBody::Stroke {
            mode,
            width,
            points,
        } => draw_stroke(renderer, *mode, *width, command.style.color, points),
        CommandBody::Text {
            text: content,
            size,
            anchor,
        } => {
            if content.is_empty() {
                return;
            }
            let font = text.font(*size);
            match renderer.layout_text(content, &font) {
                Ok(layout) => {
                    let origin = Point::new(anchor.x, anchor.y - layout.height);
                    skip_on_error(
                        renderer.draw_text(&layout, origin, command.style.color),
                        "draw text",
                    );
                }
                Err(err) => tracing::warn!(error = %err, "text layout skipped"),
            }
        }
    }
}

fn draw_stroke<R: Renderer>(
    renderer: &mut R,
    mode: StrokeMode,
    width: f32,
    color: Color,
    points: &[Point],
) {
    let width = width.max(1.0);
    let pen = match mode {
        StrokeMode::Regular => Pen::new(width, color),
        StrokeMode::Eraser => Pen::new(width, Color::TRANSPARENT).with_blend(Blend::Copy),
        StrokeMode::Highlight => {
            if points.len() > 1 {
                let outline = widen_polyline(points, width, FLATTEN_TOLERANCE);
                skip_on_error(renderer.fill_outline(&outline, color), "highlight fill");
                return;
            }
            Pen::new(width, color)
        }
    };

    match points {
        [] => {}
        [single] => skip_on_error(
            renderer.fill_circle(*single, width / 2.0, pen.color, pen.blend),
            "stroke dot",
        ),
        _ => {
            for pair in points.windows(2) {
                skip_on_error(renderer.draw_line(pair[0], pair[1], &pen), "stroke segment");
            }
        }
    }
}

fn draw_overlays<R: Renderer>(renderer: &mut R, overlays: &Overlays) {
    match overlays.indicator {
        Some(Indicator::Caret { at, height, color }) => {
            let top = Point::new(at.x - CARET_OFFSET, at.y - height);
            let bottom = Point::new(at.x - CARET_OFFSET, at.y);
            skip_on_error(renderer.draw_line(top, bottom, &Pen::new(3.0, HALO)), "caret halo");
            skip_on_error(renderer.draw_line(top, bottom, &Pen::new(2.0, color)), "caret");
        }
        Some(Indicator::Square {
            center,
            size,
            color,
        }) => {
            let half = size / 2.0;
            let rect = RectF::new(center.x - half, center.y - half, center.x + half, center.y + half);
            skip_on_error(renderer.stroke_rect(rect, 3.0, HALO), "eraser halo");
            skip_on_error(renderer.stroke_rect(rect, 1.5, color), "eraser indicator");
        }
        Some(Indicator::Ring {
            center,
            radius,
            color,
        }) => {
            skip_on_error(renderer.stroke_ellipse(center, radius, 3.0, HALO), "ring halo");
            skip_on_error(renderer.stroke_ellipse(center, radius, 1.5, color), "ring indicator");
        }
        None => {}
    }

    if let Some((rect, color)) = overlays.selection {
        skip_on_error(renderer.stroke_rect(rect, 3.0, HALO), "selection halo");
        skip_on_error(renderer.stroke_rect(rect, 1.5, color), "selection outline");
    }

    if let Some(rect) = overlays.magnifier_window {
        let outer = rect.inflate(3.0);
        skip_on_error(renderer.stroke_rect(outer, 3.0, Color::BLACK), "magnifier outline");
        skip_on_error(
            renderer.stroke_rect(outer.inflate(-1.0), 2.0, Color::WHITE),
            "magnifier inner outline",
        );
    }

    if let Some(toast) = &overlays.toast {
        draw_toast(renderer, toast);
    }
}

fn draw_toast<R: Renderer>(renderer: &mut R, toast: &ToastOverlay) {
    let font = FontSpec {
        family: String::new(),
        size: toast.text_size,
        line_spacing: 1.0,
    };
    let layout = match renderer.layout_text(&toast.text, &font) {
        Ok(layout) => layout,
        Err(err) => {
            tracing::warn!(error = %err, "toast layout skipped");
            return;
        }
    };
    let (w, h) = renderer.size();
    let left = (w as f32 - layout.width) / 2.0;
    let top = h as f32 - TOAST_MARGIN - layout.height;
    let panel = RectF::new(
        left - TOAST_PAD_X,
        top - TOAST_PAD_Y,
        left + layout.width + TOAST_PAD_X,
        top + layout.height + TOAST_PAD_Y,
    );
    skip_on_error(renderer.fill_rect(panel, toast.background), "toast panel");
    skip_on_error(
        renderer.draw_text(&layout, Point::new(left, top), toast.text_color),
        "toast text",
    );
}
