use anyhow::{bail, Result};

use screen_ink::draw::composite::RgbaBuffer;
use screen_ink::draw::history::DrawHistory;
use screen_ink::draw::model::{Color, Command, Point, StrokeMode, Style};
use screen_ink::draw::render::{LayeredRenderer, Overlays, TextContext};
use screen_ink::draw::renderer::{Blend, FontSpec, Pen, Renderer, Surface, TextLayout};
use screen_ink::draw::software::SoftwareRenderer;
use screen_ink::draw::widen::WidenedOutline;
use screen_ink::draw::model::RectF;

/// Delegates to the software renderer but refuses every line segment.
struct NoLines {
    inner: SoftwareRenderer,
}

impl Renderer for NoLines {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.inner.resize(width, height)
    }
    fn begin(&mut self, surface: Surface) -> Result<()> {
        self.inner.begin(surface)
    }
    fn clear(&mut self, color: Color) -> Result<()> {
        self.inner.clear(color)
    }
    fn end(&mut self) -> Result<()> {
        self.inner.end()
    }
    fn draw_line(&mut self, _from: Point, _to: Point, _pen: &Pen) -> Result<()> {
        bail!("brush allocation failed")
    }
    fn fill_circle(&mut self, center: Point, radius: f32, color: Color, blend: Blend) -> Result<()> {
        self.inner.fill_circle(center, radius, color, blend)
    }
    fn fill_outline(&mut self, outline: &WidenedOutline, color: Color) -> Result<()> {
        self.inner.fill_outline(outline, color)
    }
    fn fill_rect(&mut self, rect: RectF, color: Color) -> Result<()> {
        self.inner.fill_rect(rect, color)
    }
    fn stroke_rect(&mut self, rect: RectF, width: f32, color: Color) -> Result<()> {
        self.inner.stroke_rect(rect, width, color)
    }
    fn stroke_ellipse(&mut self, center: Point, radius: f32, width: f32, color: Color) -> Result<()> {
        self.inner.stroke_ellipse(center, radius, width, color)
    }
    fn layout_text(&mut self, text: &str, font: &FontSpec) -> Result<TextLayout> {
        self.inner.layout_text(text, font)
    }
    fn draw_text(&mut self, layout: &TextLayout, origin: Point, color: Color) -> Result<()> {
        self.inner.draw_text(layout, origin, color)
    }
    fn blit_content(&mut self) -> Result<()> {
        self.inner.blit_content()
    }
    fn present(&mut self) -> Result<()> {
        self.inner.present()
    }
    fn read_pixels(&self, surface: Surface) -> Result<RgbaBuffer> {
        self.inner.read_pixels(surface)
    }
}

fn stroke(mode: StrokeMode, color: Color, points: &[(f32, f32)]) -> Command {
    let mut command = Command::stroke(
        Style {
            color,
            ..Style::default()
        },
        mode,
        8.0,
        Point::new(points[0].0, points[0].1),
    );
    if let screen_ink::draw::model::CommandBody::Stroke { points: pts, .. } = &mut command.body {
        pts.extend(points[1..].iter().map(|&(x, y)| Point::new(x, y)));
    }
    command
}

fn text_context() -> TextContext {
    TextContext {
        family: "Segoe UI".to_owned(),
        line_spacing: 1.2,
        fallback_size: 36.0,
    }
}

#[test]
fn failed_primitives_are_skipped_and_history_survives() {
    let mut renderer = NoLines {
        inner: SoftwareRenderer::new(48, 48),
    };
    let mut history = DrawHistory::default();
    history.commit(stroke(
        StrokeMode::Regular,
        Color::WHITE,
        &[(4.0, 24.0), (44.0, 24.0)],
    ));
    history.commit(stroke(
        StrokeMode::Highlight,
        Color::rgba(255, 255, 0, 50),
        &[(24.0, 4.0), (24.0, 44.0)],
    ));

    let mut layers = LayeredRenderer::default();
    layers.compose(
        &mut renderer,
        &history,
        None,
        &Overlays::default(),
        &text_context(),
    );

    assert_eq!(history.committed().len(), 2);
    assert_eq!(layers.compose_count(), 1);
    let frame = renderer.inner.presented();
    assert_eq!(frame.pixel(10, 24), Color::TRANSPARENT);
    assert_eq!(frame.pixel(24, 10).a, 50);
}

#[test]
fn live_stroke_moves_do_not_rebuild_content() {
    let mut renderer = SoftwareRenderer::new(64, 64);
    let mut history = DrawHistory::default();
    history.commit(stroke(
        StrokeMode::Regular,
        Color::WHITE,
        &[(4.0, 4.0), (60.0, 4.0)],
    ));
    let mut layers = LayeredRenderer::default();
    let mut live = stroke(StrokeMode::Regular, Color::BLACK, &[(4.0, 30.0)]);
    for x in 5..40 {
        if let screen_ink::draw::model::CommandBody::Stroke { points, .. } = &mut live.body {
            points.push(Point::new(x as f32, 30.0));
        }
        layers.compose(
            &mut renderer,
            &history,
            Some(&live),
            &Overlays::default(),
            &text_context(),
        );
    }
    assert_eq!(layers.rebuild_count(), 1);
    assert_eq!(renderer.presented().pixel(20, 30), Color::BLACK);
    assert_eq!(renderer.presented().pixel(20, 4), Color::WHITE);
}
