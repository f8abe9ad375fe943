use std::time::{Duration, Instant};

use crate::draw::commands::CommandModel;
use crate::draw::history::DrawHistory;
use crate::draw::input::{EventDisposition, InputEvent, PointerButton};
use crate::draw::keys::{KeyCode, KeyEvent};
use crate::draw::magnifier::{selection_size, Magnification, MagnifierController};
use crate::draw::messages::EngineEvent;
use crate::draw::model::{Command, CommandKind, Point, RectF, StrokeMode, Style};
use crate::draw::render::{
    clamp_indicator_radius, Indicator, LayeredRenderer, Overlays, TextContext, ToastOverlay,
};
use crate::draw::renderer::Renderer;
use crate::draw::save::ScreenshotService;
use crate::draw::settings::{OverlaySettings, ResolvedKeys};
use crate::draw::styles::{Ink, StyleRegistry};
use crate::draw::toast::Toast;

/// Minimum travel, per axis, that turns a click after text into a stroke.
pub const ARM_THRESHOLD: f32 = 1.0;

/// What the next toggle out of pass-through goes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Draw,
    Erase,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    PassThrough { resume: Resume },
    Idle,
    Drawing,
    TextEditing,
    /// Text was just committed by a primary press at `origin`; a drag from
    /// here becomes a stroke, a plain release does nothing.
    ArmedAfterText { origin: Point },
    MagnifyIdle,
    MagnifySelecting { start: Point, current: Point },
    MagnifyTracking,
}

impl Mode {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Mode::PassThrough { .. })
    }

    pub fn is_magnify(&self) -> bool {
        matches!(
            self,
            Mode::MagnifyIdle | Mode::MagnifySelecting { .. } | Mode::MagnifyTracking
        )
    }
}

/// Owns every piece of overlay state and reacts to one event at a time.
pub struct OverlayEngine<R: Renderer, M: Magnification> {
    settings: OverlaySettings,
    keys: ResolvedKeys,
    styles: StyleRegistry,
    model: CommandModel,
    mode: Mode,
    ink: Ink,
    erasing: bool,
    saved_before_text: Option<(Ink, bool)>,
    eraser_size: i32,
    font_size: i32,
    pointer: Option<Point>,
    swallow_toggle_up: bool,
    text: TextContext,
    layers: LayeredRenderer,
    renderer: R,
    magnifier: MagnifierController,
    magnification: M,
    toast: Toast,
    screenshots: Option<ScreenshotService>,
}

impl<R: Renderer, M: Magnification> OverlayEngine<R, M> {
    /// Starts inert, in pass-through, ready to resume drawing.
    pub fn new(mut settings: OverlaySettings, renderer: R, magnification: M) -> Self {
        if settings.sanitize() {
            tracing::info!("overlay settings adjusted to valid ranges");
        }
        let keys = settings.keys.resolve();
        let styles = StyleRegistry::from_settings(&settings);
        let text = TextContext {
            family: settings.font.family.clone(),
            line_spacing: settings.font.line_spacing,
            fallback_size: settings.font.size.default as f32,
        };
        Self {
            keys,
            styles,
            model: CommandModel::default(),
            mode: Mode::PassThrough {
                resume: Resume::Draw,
            },
            ink: Ink::Pen,
            erasing: false,
            saved_before_text: None,
            eraser_size: settings.eraser.default,
            font_size: settings.font.size.default,
            pointer: None,
            swallow_toggle_up: false,
            text,
            layers: LayeredRenderer::default(),
            renderer,
            magnifier: MagnifierController::new(settings.magnifier.zoom.default),
            magnification,
            toast: Toast::new(Duration::from_millis(settings.toast.duration_ms)),
            screenshots: None,
            settings,
        }
    }

    pub fn with_screenshots(mut self, service: ScreenshotService) -> Self {
        self.screenshots = Some(service);
        self
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ink(&self) -> Ink {
        self.ink
    }

    pub fn is_erasing(&self) -> bool {
        self.erasing
    }

    pub fn model(&self) -> &CommandModel {
        &self.model
    }

    pub fn history(&self) -> &DrawHistory {
        self.model.history()
    }

    pub fn live(&self) -> Option<&Command> {
        self.model.live()
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn eraser_size(&self) -> i32 {
        self.eraser_size
    }

    pub fn font_size(&self) -> i32 {
        self.font_size
    }

    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    pub fn magnifier(&self) -> &MagnifierController {
        &self.magnifier
    }

    pub fn magnification(&self) -> &M {
        &self.magnification
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn layers(&self) -> &LayeredRenderer {
        &self.layers
    }

    pub fn is_toast_visible(&self) -> bool {
        self.toast.is_visible()
    }

    pub fn handle(&mut self, event: EngineEvent) -> EventDisposition {
        match event {
            EngineEvent::Input(input) => self.handle_input(input),
            EngineEvent::ScreenshotSaved { ok } => {
                if ok {
                    self.toast.show(Instant::now());
                    self.render();
                }
                EventDisposition::Consumed
            }
            EngineEvent::Tick(now) => {
                if self.toast.tick(now) {
                    self.render();
                }
                EventDisposition::Consumed
            }
        }
    }

    pub fn handle_input(&mut self, input: InputEvent) -> EventDisposition {
        match input {
            InputEvent::PointerMove { pos, primary_down } => self.on_pointer_move(pos, primary_down),
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Primary,
            } => self.on_primary_down(pos),
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Secondary,
            } => self.on_secondary_down(pos),
            InputEvent::PointerUp {
                pos,
                button: PointerButton::Primary,
            } => self.on_primary_up(pos),
            InputEvent::PointerUp {
                button: PointerButton::Secondary,
                ..
            } => self.pointer_disposition(),
            InputEvent::PointerLeave | InputEvent::CaptureLost => self.on_capture_lost(),
            InputEvent::KeyDown(event) => self.on_key_down(event),
            InputEvent::KeyUp(event) => self.on_key_up(event),
            InputEvent::Char { ch } => self.on_char(ch),
            InputEvent::Wheel { delta } => self.on_wheel(delta),
            InputEvent::Resize { width, height } => self.on_resize(width, height),
        }
    }

    /// Recomposes the frame from history, the live command and overlays.
    pub fn render(&mut self) {
        let overlays = self.overlays();
        self.layers.compose(
            &mut self.renderer,
            self.model.history(),
            self.model.live(),
            &overlays,
            &self.text,
        );
    }

    pub fn overlays(&self) -> Overlays {
        let selection = match self.mode {
            Mode::MagnifySelecting { start, current } => {
                Some((RectF::from_corners(start, current), self.styles.active().color))
            }
            _ => None,
        };
        let magnifier_window = match self.mode {
            Mode::MagnifyTracking => self.magnifier.window_rect().map(|rect| rect.to_rectf()),
            _ => None,
        };
        let toast = self.toast.is_visible().then(|| ToastOverlay {
            text: self.settings.toast.text.clone(),
            text_size: self.settings.toast.text_size,
            text_color: self.settings.toast.text_color,
            background: self.settings.toast.background,
        });
        Overlays {
            indicator: self.indicator(),
            selection,
            magnifier_window,
            toast,
        }
    }

    fn indicator(&self) -> Option<Indicator> {
        let center = self.pointer?;
        if self.mode.is_pass_through() || self.mode.is_magnify() {
            return None;
        }
        let color = self.styles.active().color.with_alpha(255);
        let size = self.renderer.size();
        if self.mode == Mode::TextEditing {
            return Some(Indicator::Caret {
                at: center,
                height: self.font_size as f32,
                color,
            });
        }
        if self.erasing {
            let half = clamp_indicator_radius(center, self.eraser_size as f32 / 2.0, size);
            return Some(Indicator::Square {
                center,
                size: half * 2.0,
                color,
            });
        }
        let width = self.styles.width_for(self.ink);
        if width <= 0.0 {
            return None;
        }
        Some(Indicator::Ring {
            center,
            radius: clamp_indicator_radius(center, width / 2.0, size),
            color,
        })
    }

    fn pointer_disposition(&self) -> EventDisposition {
        if self.mode.is_pass_through() {
            EventDisposition::PassThrough
        } else {
            EventDisposition::Consumed
        }
    }

    fn on_pointer_move(&mut self, pos: Point, primary_down: bool) -> EventDisposition {
        if self.mode.is_pass_through() {
            return EventDisposition::PassThrough;
        }
        self.pointer = Some(pos);

        match self.mode {
            Mode::Drawing if !primary_down => self.finish_stroke(),
            Mode::Drawing => {
                self.model.append_point(pos);
            }
            Mode::MagnifySelecting { start, .. } => {
                self.mode = Mode::MagnifySelecting {
                    start,
                    current: pos,
                };
            }
            Mode::MagnifyTracking => self.update_magnifier(pos),
            Mode::ArmedAfterText { origin } => {
                let (dx, dy) = ((pos.x - origin.x).abs(), (pos.y - origin.y).abs());
                if primary_down && (dx >= ARM_THRESHOLD || dy >= ARM_THRESHOLD) {
                    self.begin_stroke(origin);
                    self.model.append_point(pos);
                }
            }
            _ => {}
        }
        self.render();
        EventDisposition::Consumed
    }

    fn on_primary_down(&mut self, pos: Point) -> EventDisposition {
        if self.mode.is_pass_through() {
            return EventDisposition::PassThrough;
        }
        self.pointer = Some(pos);

        match self.mode {
            mode if mode.is_magnify() => {
                self.magnifier.destroy(&mut self.magnification);
                self.mode = Mode::MagnifySelecting {
                    start: pos,
                    current: pos,
                };
            }
            Mode::TextEditing => {
                self.commit_text();
                self.mode = Mode::ArmedAfterText { origin: pos };
            }
            _ => {
                self.finish_stroke();
                self.begin_stroke(pos);
            }
        }
        self.render();
        EventDisposition::Consumed
    }

    fn on_primary_up(&mut self, pos: Point) -> EventDisposition {
        if self.mode.is_pass_through() {
            return EventDisposition::PassThrough;
        }
        self.pointer = Some(pos);

        match self.mode {
            Mode::MagnifySelecting { start, .. } => {
                let rect = RectF::from_corners(start, pos);
                let (width, height) = selection_size(rect, &self.settings.magnifier);
                self.magnifier.set_size(width, height);
                self.mode = Mode::MagnifyTracking;
                tracing::debug!(width, height, "magnifier selection finalized");
                self.update_magnifier(pos);
            }
            Mode::ArmedAfterText { .. } => self.mode = Mode::Idle,
            Mode::Drawing => self.finish_stroke(),
            _ => {}
        }
        self.render();
        EventDisposition::Consumed
    }

    fn on_secondary_down(&mut self, pos: Point) -> EventDisposition {
        if self.mode.is_pass_through() {
            return EventDisposition::PassThrough;
        }
        if self.mode.is_magnify() {
            return EventDisposition::Consumed;
        }
        self.pointer = Some(pos);

        match self.mode {
            Mode::TextEditing => {
                self.model.commit_live();
                let style = self.styles.active();
                self.model.begin_text(style, self.font_size as f32, pos);
            }
            _ => {
                self.finish_stroke();
                self.saved_before_text = Some((self.ink, self.erasing));
                self.erasing = false;
                let style = self.styles.active();
                self.model.begin_text(style, self.font_size as f32, pos);
                self.mode = Mode::TextEditing;
                tracing::debug!(x = pos.x, y = pos.y, "text editing started");
            }
        }
        self.render();
        EventDisposition::Consumed
    }

    fn on_capture_lost(&mut self) -> EventDisposition {
        match self.mode {
            Mode::Drawing => {
                self.finish_stroke();
                self.render();
            }
            Mode::ArmedAfterText { .. } => self.mode = Mode::Idle,
            _ => {}
        }
        self.pointer_disposition()
    }

    fn on_char(&mut self, ch: char) -> EventDisposition {
        if self.mode.is_pass_through() {
            return EventDisposition::PassThrough;
        }
        if self.mode != Mode::TextEditing {
            return EventDisposition::Consumed;
        }
        let changed = match ch {
            '\u{8}' => self.model.backspace(),
            '\r' | '\n' | '\t' => self.model.append_char(ch),
            c if c.is_control() => false,
            c => self.model.append_char(c),
        };
        if changed {
            self.render();
        }
        EventDisposition::Consumed
    }

    fn on_wheel(&mut self, delta: i32) -> EventDisposition {
        if self.mode.is_pass_through() {
            return EventDisposition::PassThrough;
        }
        if delta == 0 {
            return EventDisposition::Consumed;
        }
        let up = delta > 0;

        if self.mode.is_magnify() && self.magnifier.has_rect() {
            let zoom = self
                .settings
                .magnifier
                .zoom
                .stepped(self.magnifier.zoom(), up);
            if self.magnifier.set_zoom(zoom) {
                tracing::debug!(zoom, "magnifier zoom changed");
                if let Some(pointer) = self.pointer {
                    self.update_magnifier(pointer);
                }
            }
        } else if self.erasing {
            self.eraser_size = self.settings.eraser.stepped(self.eraser_size, up);
            if self.live_stroke_mode() == Some(StrokeMode::Eraser) {
                self.model.set_live_width(self.eraser_size as f32);
            }
        } else if self.mode == Mode::TextEditing {
            self.font_size = self.settings.font.size.stepped(self.font_size, up);
            self.model.set_live_text_size(self.font_size as f32);
        } else if let Some(width) = self.styles.adjust_width(self.ink, up) {
            let follows = match self.ink {
                Ink::Pen => StrokeMode::Regular,
                Ink::Highlighter => StrokeMode::Highlight,
            };
            if self.live_stroke_mode() == Some(follows) {
                self.model.set_live_width(width);
            }
        }
        self.render();
        EventDisposition::Consumed
    }

    fn on_resize(&mut self, width: u32, height: u32) -> EventDisposition {
        if width == 0 || height == 0 || self.renderer.size() == (width, height) {
            return EventDisposition::Consumed;
        }
        if let Err(err) = self.renderer.resize(width, height) {
            tracing::warn!(error = %err, width, height, "surface resize failed");
            return EventDisposition::Consumed;
        }
        self.layers.invalidate();
        self.render();
        EventDisposition::Consumed
    }

    fn on_key_down(&mut self, event: KeyEvent) -> EventDisposition {
        if self.keys.toggle.matches(&event) {
            self.toggle_pass_through();
            self.swallow_toggle_up = true;
            return EventDisposition::Consumed;
        }

        let pass = self.mode.is_pass_through();
        let typing = self.mode == Mode::TextEditing;

        if !pass && !typing {
            if self.keys.screenshot.matches(&event) {
                self.take_screenshot();
                return EventDisposition::Consumed;
            }
            if self.keys.magnify.matches(&event) {
                self.toggle_magnify();
                return EventDisposition::Consumed;
            }
        }

        if typing && event.modifiers.ctrl {
            if self.keys.undo.matches(&event) {
                if self.model.text_undo() {
                    self.render();
                }
                return EventDisposition::Consumed;
            }
            if self.keys.redo.matches(&event) {
                if self.model.text_redo() {
                    self.render();
                }
                return EventDisposition::Consumed;
            }
            if self.styles.contains(event.key) {
                self.commit_text();
                self.select_style(event.key, Ink::Highlighter);
                return EventDisposition::Consumed;
            }
        }

        if pass || typing {
            return EventDisposition::PassThrough;
        }

        if self.keys.undo.matches(&event) {
            if self.model.undo() {
                self.render();
            }
        } else if self.keys.redo.matches(&event) {
            if self.model.redo() {
                self.render();
            }
        } else if self.keys.delete_all.matches(&event) {
            self.model.clear_all();
            self.render();
        } else if self.keys.erase.matches(&event) {
            self.erasing = !self.erasing;
            tracing::debug!(erasing = self.erasing, "eraser toggled");
            self.render();
        } else if self.styles.contains(event.key) {
            let ink = if event.modifiers.ctrl {
                Ink::Highlighter
            } else {
                Ink::Pen
            };
            self.select_style(event.key, ink);
        } else {
            return EventDisposition::PassThrough;
        }
        EventDisposition::Consumed
    }

    fn on_key_up(&mut self, event: KeyEvent) -> EventDisposition {
        if self.swallow_toggle_up && event.key == self.keys.toggle.key {
            self.swallow_toggle_up = false;
            return EventDisposition::Consumed;
        }
        if self.mode.is_pass_through() || self.mode == Mode::TextEditing {
            return EventDisposition::PassThrough;
        }
        if self.is_bound_key(event.key) {
            EventDisposition::Consumed
        } else {
            EventDisposition::PassThrough
        }
    }

    /// Keys whose release is kept from the desktop. The magnify key is not
    /// among them.
    fn is_bound_key(&self, key: KeyCode) -> bool {
        let keys = &self.keys;
        [
            keys.undo,
            keys.redo,
            keys.delete_all,
            keys.erase,
            keys.screenshot,
        ]
        .iter()
        .any(|combo| combo.key == key)
            || self.styles.contains(key)
    }

    fn select_style(&mut self, key: KeyCode, ink: Ink) {
        if !self.styles.select(key, ink) {
            return;
        }
        self.ink = ink;
        self.erasing = false;
        if self.mode == Mode::Drawing && self.live_stroke_mode() != Some(StrokeMode::Eraser) {
            self.model.set_live_width(self.styles.width_for(ink));
        }
        tracing::debug!(key = %key, ?ink, "style selected");
        self.render();
    }

    fn live_stroke_mode(&self) -> Option<StrokeMode> {
        self.model.live().and_then(Command::stroke_mode)
    }

    fn begin_stroke(&mut self, start: Point) {
        let style = self.styles.active();
        let (mode, width, style) = if self.erasing {
            (StrokeMode::Eraser, self.eraser_size as f32, style)
        } else {
            match self.ink {
                Ink::Pen => (StrokeMode::Regular, style.regular_width, style),
                Ink::Highlighter => (
                    StrokeMode::Highlight,
                    style.highlight_width,
                    Style {
                        color: style.color.with_alpha(self.settings.highlight_alpha_u8()),
                        ..style
                    },
                ),
            }
        };
        self.model.begin_stroke(style, mode, width, start);
        self.mode = Mode::Drawing;
    }

    fn finish_stroke(&mut self) {
        if self.mode != Mode::Drawing {
            return;
        }
        self.model.commit_live();
        self.mode = Mode::Idle;
    }

    /// Commits the live text (dropped when empty) and restores the draw
    /// modifiers that were active before typing began.
    fn commit_text(&mut self) {
        if self.mode != Mode::TextEditing {
            return;
        }
        if self.model.live_kind() == Some(CommandKind::Text) {
            self.model.commit_live();
        }
        if let Some((ink, erasing)) = self.saved_before_text.take() {
            self.ink = ink;
            self.erasing = erasing;
        }
        self.mode = Mode::Idle;
    }

    fn toggle_pass_through(&mut self) {
        match self.mode {
            Mode::PassThrough { resume } => {
                self.mode = match resume {
                    Resume::Text if self.model.live_kind() == Some(CommandKind::Text) => {
                        Mode::TextEditing
                    }
                    Resume::Text => {
                        if let Some((ink, erasing)) = self.saved_before_text.take() {
                            self.ink = ink;
                            self.erasing = erasing;
                        }
                        Mode::Idle
                    }
                    Resume::Erase => {
                        self.erasing = true;
                        Mode::Idle
                    }
                    Resume::Draw => {
                        self.erasing = false;
                        Mode::Idle
                    }
                };
            }
            mode => {
                let resume = if mode == Mode::TextEditing {
                    Resume::Text
                } else if self.erasing {
                    Resume::Erase
                } else {
                    Resume::Draw
                };
                self.finish_stroke();
                if mode.is_magnify() {
                    self.magnifier.destroy(&mut self.magnification);
                }
                self.mode = Mode::PassThrough { resume };
            }
        }
        tracing::debug!(mode = ?self.mode, "pass-through toggled");
        self.render();
    }

    fn toggle_magnify(&mut self) {
        if self.mode.is_magnify() {
            self.magnifier.destroy(&mut self.magnification);
            self.mode = Mode::Idle;
            tracing::debug!("magnify mode exited");
        } else {
            self.commit_text();
            self.finish_stroke();
            self.erasing = false;
            self.magnifier.destroy(&mut self.magnification);
            self.mode = Mode::MagnifyIdle;
            tracing::debug!("magnify mode entered");
        }
        self.render();
    }

    fn update_magnifier(&mut self, cursor: Point) {
        if let Err(err) = self.magnifier.update(&mut self.magnification, cursor) {
            tracing::warn!(error = %err, "magnifier update failed, dropping viewport");
            self.magnifier.destroy(&mut self.magnification);
            self.mode = Mode::MagnifyIdle;
        }
    }

    fn take_screenshot(&mut self) {
        let Some(service) = self.screenshots.as_mut() else {
            tracing::debug!("screenshot requested without a screenshot service");
            return;
        };
        if service.worker().is_busy() {
            tracing::debug!("screenshot ignored while previous encode runs");
            return;
        }
        let annotation = match self.layers.compose_annotation(
            &mut self.renderer,
            self.model.history(),
            self.model.live(),
            &self.text,
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                tracing::warn!(error = %err, "screenshot readback failed");
                return;
            }
        };
        match service.submit(&annotation) {
            Ok(true) => tracing::debug!(dir = %service.dir().display(), "screenshot queued"),
            Ok(false) => tracing::debug!("screenshot worker busy"),
            Err(err) => tracing::warn!(error = %err, "screenshot capture failed"),
        }
        self.render();
    }
}
