use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::draw::keys::{parse_combo, KeyCode, KeyCombo};
use crate::draw::model::Color;

/// Integer range with a step and a starting value, used for font, eraser and zoom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeSetting {
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub default: i32,
}

impl RangeSetting {
    pub const fn new(min: i32, max: i32, step: i32, default: i32) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    /// One wheel notch in the given direction, clamped to the range.
    pub fn stepped(&self, value: i32, up: bool) -> i32 {
        let step = self.step.max(1);
        if up {
            value.saturating_add(step).min(self.max)
        } else {
            value.saturating_sub(step).max(self.min)
        }
    }

    pub fn sanitize(&mut self, fallback: RangeSetting) -> bool {
        let before = *self;
        if self.min < 1 {
            self.min = fallback.min;
        }
        if self.max < self.min {
            self.max = fallback.max.max(self.min);
        }
        if self.step < 1 {
            self.step = fallback.step;
        }
        self.default = self.default.clamp(self.min, self.max);
        before != *self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleSetting {
    pub key: String,
    pub color: Color,
    #[serde(default = "default_min_width")]
    pub min_width: f32,
    #[serde(default = "default_max_width")]
    pub max_width: f32,
    #[serde(default = "default_step_width")]
    pub step_width: f32,
    #[serde(default = "default_width")]
    pub width: f32,
    /// Zero derives the highlighter width from `width` and the multiplier.
    #[serde(default)]
    pub highlight_width: f32,
}

impl StyleSetting {
    pub fn new(key: &str, color: Color) -> Self {
        Self {
            key: key.to_owned(),
            color,
            min_width: default_min_width(),
            max_width: default_max_width(),
            step_width: default_step_width(),
            width: default_width(),
            highlight_width: 0.0,
        }
    }

    pub fn key_code(&self) -> Option<KeyCode> {
        KeyCode::parse(&self.key)
    }

    fn sanitize(&mut self) -> bool {
        let before = self.clone();
        if !(self.min_width >= 1.0) {
            self.min_width = default_min_width();
        }
        if !(self.max_width >= self.min_width) {
            self.max_width = default_max_width().max(self.min_width);
        }
        if !(self.step_width > 0.0) {
            self.step_width = default_step_width();
        }
        if !self.width.is_finite() {
            self.width = default_width();
        }
        self.width = self.width.clamp(self.min_width, self.max_width);
        if !self.highlight_width.is_finite() || self.highlight_width < 0.0 {
            self.highlight_width = 0.0;
        }
        before != *self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontSettings {
    #[serde(default = "default_font_family")]
    pub family: String,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "default_font_size")]
    pub size: RangeSetting,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            family: default_font_family(),
            line_spacing: default_line_spacing(),
            size: default_font_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MagnifierSettings {
    #[serde(default = "default_zoom")]
    pub zoom: RangeSetting,
    /// Drags narrower or shorter than this fall back to the default size.
    #[serde(default = "default_min_selection")]
    pub min_selection: f32,
    #[serde(default = "default_fallback_width")]
    pub fallback_width: f32,
    #[serde(default = "default_fallback_height")]
    pub fallback_height: f32,
}

impl Default for MagnifierSettings {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            min_selection: default_min_selection(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyBindings {
    #[serde(default = "default_toggle_key")]
    pub toggle: String,
    #[serde(default = "default_undo_key")]
    pub undo: String,
    #[serde(default = "default_redo_key")]
    pub redo: String,
    #[serde(default = "default_delete_all_key")]
    pub delete_all: String,
    #[serde(default = "default_erase_key")]
    pub erase: String,
    #[serde(default = "default_magnify_key")]
    pub magnify: String,
    #[serde(default = "default_screenshot_key")]
    pub screenshot: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle: default_toggle_key(),
            undo: default_undo_key(),
            redo: default_redo_key(),
            delete_all: default_delete_all_key(),
            erase: default_erase_key(),
            magnify: default_magnify_key(),
            screenshot: default_screenshot_key(),
        }
    }
}

/// Parsed form of [`KeyBindings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub toggle: KeyCombo,
    pub undo: KeyCombo,
    pub redo: KeyCombo,
    pub delete_all: KeyCombo,
    pub erase: KeyCombo,
    pub magnify: KeyCombo,
    pub screenshot: KeyCombo,
}

impl KeyBindings {
    fn fields_mut(&mut self) -> [(&'static str, &mut String, fn() -> String); 7] {
        [
            ("toggle", &mut self.toggle, default_toggle_key),
            ("undo", &mut self.undo, default_undo_key),
            ("redo", &mut self.redo, default_redo_key),
            ("delete_all", &mut self.delete_all, default_delete_all_key),
            ("erase", &mut self.erase, default_erase_key),
            ("magnify", &mut self.magnify, default_magnify_key),
            ("screenshot", &mut self.screenshot, default_screenshot_key),
        ]
    }

    pub fn sanitize_or_default(&mut self) -> bool {
        let mut changed = false;
        for (name, value, fallback) in self.fields_mut() {
            if parse_combo(value).is_none() {
                let replacement = fallback();
                tracing::warn!(binding = name, value = %value, fallback = %replacement, "invalid key binding");
                *value = replacement;
                changed = true;
            }
        }
        changed
    }

    /// Parses every binding, substituting the default for any that fail.
    pub fn resolve(&self) -> ResolvedKeys {
        let combo = |value: &str, fallback: fn() -> String| {
            parse_combo(value)
                .or_else(|| parse_combo(&fallback()))
                .unwrap_or(KeyCombo::plain(KeyCode::Escape))
        };
        ResolvedKeys {
            toggle: combo(&self.toggle, default_toggle_key),
            undo: combo(&self.undo, default_undo_key),
            redo: combo(&self.redo, default_redo_key),
            delete_all: combo(&self.delete_all, default_delete_all_key),
            erase: combo(&self.erase, default_erase_key),
            magnify: combo(&self.magnify, default_magnify_key),
            screenshot: combo(&self.screenshot, default_screenshot_key),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToastSettings {
    #[serde(default = "default_toast_text")]
    pub text: String,
    #[serde(default = "default_toast_text_size")]
    pub text_size: f32,
    #[serde(default = "default_toast_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_toast_text_color")]
    pub text_color: Color,
    #[serde(default = "default_toast_background")]
    pub background: Color,
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            text: default_toast_text(),
            text_size: default_toast_text_size(),
            duration_ms: default_toast_duration_ms(),
            text_color: default_toast_text_color(),
            background: default_toast_background(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    #[serde(default = "default_styles")]
    pub styles: Vec<StyleSetting>,
    #[serde(default)]
    pub font: FontSettings,
    #[serde(default = "default_eraser")]
    pub eraser: RangeSetting,
    #[serde(default)]
    pub magnifier: MagnifierSettings,
    #[serde(default = "default_highlight_alpha")]
    pub highlight_alpha: i32,
    #[serde(default = "default_highlight_width_multiple")]
    pub highlight_width_multiple: i32,
    #[serde(default)]
    pub keys: KeyBindings,
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,
    #[serde(default)]
    pub toast: ToastSettings,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            styles: default_styles(),
            font: FontSettings::default(),
            eraser: default_eraser(),
            magnifier: MagnifierSettings::default(),
            highlight_alpha: default_highlight_alpha(),
            highlight_width_multiple: default_highlight_width_multiple(),
            keys: KeyBindings::default(),
            screenshot_dir: None,
            toast: ToastSettings::default(),
            debug_logging: false,
        }
    }
}

impl OverlaySettings {
    pub fn highlight_multiplier(&self) -> f32 {
        self.highlight_width_multiple.max(1) as f32
    }

    pub fn highlight_alpha_u8(&self) -> u8 {
        self.highlight_alpha.clamp(0, 255) as u8
    }

    /// Clamps every numeric value into a usable range and replaces entries
    /// that cannot be interpreted. Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;

        let before = self.styles.len();
        self.styles.retain(|style| {
            let ok = style.key_code().is_some();
            if !ok {
                tracing::warn!(key = %style.key, "dropping style with unrecognized key");
            }
            ok
        });
        changed |= before != self.styles.len();
        for style in &mut self.styles {
            changed |= style.sanitize();
        }
        if self.styles.is_empty() {
            self.styles.push(StyleSetting::new("R", Color::rgb(255, 0, 0)));
            changed = true;
        }

        if self.font.family.trim().is_empty() {
            self.font.family = default_font_family();
            changed = true;
        }
        if !(self.font.line_spacing > 0.0) {
            self.font.line_spacing = default_line_spacing();
            changed = true;
        }
        changed |= self.font.size.sanitize(default_font_size());
        changed |= self.eraser.sanitize(default_eraser());
        changed |= self.magnifier.zoom.sanitize(default_zoom());

        let mag = &mut self.magnifier;
        if !(mag.min_selection >= 1.0) {
            mag.min_selection = default_min_selection();
            changed = true;
        }
        if !(mag.fallback_width >= mag.min_selection) {
            mag.fallback_width = default_fallback_width().max(mag.min_selection);
            changed = true;
        }
        if !(mag.fallback_height >= mag.min_selection) {
            mag.fallback_height = default_fallback_height().max(mag.min_selection);
            changed = true;
        }

        let alpha = self.highlight_alpha.clamp(0, 255);
        changed |= alpha != self.highlight_alpha;
        self.highlight_alpha = alpha;

        if self.highlight_width_multiple < 1 {
            self.highlight_width_multiple = 1;
            changed = true;
        }

        changed |= self.keys.sanitize_or_default();

        if !(self.toast.text_size > 0.0) {
            self.toast.text_size = default_toast_text_size();
            changed = true;
        }

        changed
    }
}

fn default_min_width() -> f32 {
    2.0
}

fn default_max_width() -> f32 {
    50.0
}

fn default_step_width() -> f32 {
    2.0
}

fn default_width() -> f32 {
    6.0
}

fn default_styles() -> Vec<StyleSetting> {
    vec![
        StyleSetting::new("R", Color::rgb(255, 0, 0)),
        StyleSetting::new("G", Color::rgb(0, 200, 0)),
        StyleSetting::new("B", Color::rgb(0, 120, 255)),
        StyleSetting::new("Y", Color::rgb(255, 255, 0)),
        StyleSetting::new("P", Color::rgb(255, 105, 180)),
        StyleSetting::new("C", Color::rgb(0, 255, 255)),
        StyleSetting::new("V", Color::rgb(148, 0, 211)),
        StyleSetting::new("K", Color::rgb(0, 0, 0)),
        StyleSetting::new("W", Color::rgb(255, 255, 255)),
        StyleSetting::new("O", Color::rgb(255, 128, 0)),
    ]
}

fn default_font_family() -> String {
    "Segoe UI".to_owned()
}

fn default_line_spacing() -> f32 {
    1.2
}

fn default_font_size() -> RangeSetting {
    RangeSetting::new(16, 76, 10, 36)
}

fn default_eraser() -> RangeSetting {
    RangeSetting::new(10, 290, 40, 30)
}

fn default_zoom() -> RangeSetting {
    RangeSetting::new(1, 5, 1, 2)
}

fn default_min_selection() -> f32 {
    10.0
}

fn default_fallback_width() -> f32 {
    120.0
}

fn default_fallback_height() -> f32 {
    80.0
}

fn default_highlight_alpha() -> i32 {
    50
}

fn default_highlight_width_multiple() -> i32 {
    10
}

fn default_toggle_key() -> String {
    "Ctrl+2".to_owned()
}

fn default_undo_key() -> String {
    "Ctrl+Z".to_owned()
}

fn default_redo_key() -> String {
    "Ctrl+Shift+Z".to_owned()
}

fn default_delete_all_key() -> String {
    "D".to_owned()
}

fn default_erase_key() -> String {
    "E".to_owned()
}

fn default_magnify_key() -> String {
    "M".to_owned()
}

fn default_screenshot_key() -> String {
    "S".to_owned()
}

fn default_toast_text() -> String {
    "Screenshot Saved.".to_owned()
}

fn default_toast_text_size() -> f32 {
    28.0
}

fn default_toast_duration_ms() -> u64 {
    2000
}

fn default_toast_text_color() -> Color {
    Color::WHITE
}

fn default_toast_background() -> Color {
    Color::rgba(0, 0, 0, 191)
}
