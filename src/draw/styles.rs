use std::collections::BTreeMap;

use crate::draw::keys::KeyCode;
use crate::draw::model::{Color, Style};
use crate::draw::settings::OverlaySettings;

/// Which width of the active style a stroke draws with when not erasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ink {
    #[default]
    Pen,
    Highlighter,
}

/// Brush styles keyed by the hotkey that selects them.
///
/// Width edits are remembered across style switches: selecting another style
/// restores the last chosen regular or highlight width, clamped to that
/// style's own bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRegistry {
    styles: BTreeMap<KeyCode, Style>,
    active: KeyCode,
    multiplier: f32,
    prev_regular_width: f32,
    prev_highlight_width: f32,
}

impl StyleRegistry {
    pub fn from_settings(settings: &OverlaySettings) -> Self {
        let multiplier = settings.highlight_multiplier();
        let mut styles = BTreeMap::new();
        let mut first = None;
        for entry in &settings.styles {
            let Some(key) = entry.key_code() else {
                continue;
            };
            let mut style = Style {
                color: entry.color,
                min_width: entry.min_width,
                max_width: entry.max_width,
                step_width: entry.step_width,
                regular_width: entry.width,
                highlight_width: entry.highlight_width,
            };
            style.normalize_widths(multiplier);
            first.get_or_insert(key);
            styles.insert(key, style);
        }

        let active = match first {
            Some(key) => key,
            None => {
                let key = KeyCode::Char('R');
                let mut style = Style {
                    color: Color::rgb(255, 0, 0),
                    highlight_width: 0.0,
                    ..Style::default()
                };
                style.normalize_widths(multiplier);
                styles.insert(key, style);
                key
            }
        };

        let current = styles.get(&active).copied().unwrap_or_default();
        Self {
            styles,
            active,
            multiplier,
            prev_regular_width: current.regular_width,
            prev_highlight_width: current.highlight_width,
        }
    }

    pub fn active(&self) -> Style {
        self.styles.get(&self.active).copied().unwrap_or_default()
    }

    pub fn active_key(&self) -> KeyCode {
        self.active
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        self.styles.contains_key(&key)
    }

    pub fn width_for(&self, ink: Ink) -> f32 {
        let style = self.active();
        match ink {
            Ink::Pen => style.regular_width,
            Ink::Highlighter => style.highlight_width,
        }
    }

    /// Makes `key` active and restores the remembered width for `ink`.
    pub fn select(&mut self, key: KeyCode, ink: Ink) -> bool {
        let multiplier = self.multiplier;
        let (prev_regular, prev_highlight) = (self.prev_regular_width, self.prev_highlight_width);
        let Some(style) = self.styles.get_mut(&key) else {
            return false;
        };
        match ink {
            Ink::Pen => style.regular_width = style.clamp_regular(prev_regular),
            Ink::Highlighter => {
                style.highlight_width = style.clamp_highlight(prev_highlight, multiplier)
            }
        }
        self.active = key;
        true
    }

    /// One wheel notch on the active style. Returns the new width if it moved.
    pub fn adjust_width(&mut self, ink: Ink, up: bool) -> Option<f32> {
        let multiplier = self.multiplier;
        let style = self.styles.get_mut(&self.active)?;
        match ink {
            Ink::Pen => {
                let next = if up {
                    (style.regular_width + style.step_width).min(style.max_width)
                } else {
                    (style.regular_width - style.step_width).max(style.min_width)
                };
                if next == style.regular_width {
                    return None;
                }
                style.regular_width = next;
                self.prev_regular_width = next;
                Some(next)
            }
            Ink::Highlighter => {
                let (lo, hi) = style.highlight_bounds(multiplier);
                let step = (style.step_width * multiplier).max(1.0);
                let next = if up {
                    (style.highlight_width + step).min(hi)
                } else {
                    (style.highlight_width - step).max(lo)
                };
                if next == style.highlight_width {
                    return None;
                }
                style.highlight_width = next;
                self.prev_highlight_width = next;
                Some(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StyleRegistry {
        StyleRegistry::from_settings(&OverlaySettings::default())
    }

    #[test]
    fn first_configured_style_is_active() {
        let styles = registry();
        assert_eq!(styles.active_key(), KeyCode::Char('R'));
        assert_eq!(styles.active().color, Color::rgb(255, 0, 0));
        assert_eq!(styles.active().highlight_width, 60.0);
    }

    #[test]
    fn wheel_never_leaves_regular_bounds() {
        let mut styles = registry();
        for _ in 0..100 {
            styles.adjust_width(Ink::Pen, true);
        }
        assert_eq!(styles.width_for(Ink::Pen), 50.0);
        assert_eq!(styles.adjust_width(Ink::Pen, true), None);
        for _ in 0..100 {
            styles.adjust_width(Ink::Pen, false);
        }
        assert_eq!(styles.width_for(Ink::Pen), 2.0);
    }

    #[test]
    fn wheel_never_leaves_highlight_bounds() {
        let mut styles = registry();
        assert_eq!(styles.adjust_width(Ink::Highlighter, true), Some(80.0));
        for _ in 0..100 {
            styles.adjust_width(Ink::Highlighter, true);
        }
        assert_eq!(styles.width_for(Ink::Highlighter), 500.0);
        for _ in 0..100 {
            styles.adjust_width(Ink::Highlighter, false);
        }
        assert_eq!(styles.width_for(Ink::Highlighter), 20.0);
    }

    #[test]
    fn selecting_a_style_carries_the_remembered_width() {
        let mut styles = registry();
        styles.adjust_width(Ink::Pen, true);
        styles.adjust_width(Ink::Pen, true);
        assert_eq!(styles.width_for(Ink::Pen), 10.0);

        assert!(styles.select(KeyCode::Char('G'), Ink::Pen));
        assert_eq!(styles.active_key(), KeyCode::Char('G'));
        assert_eq!(styles.width_for(Ink::Pen), 10.0);
    }

    #[test]
    fn remembered_width_is_clamped_to_the_new_style() {
        let mut settings = OverlaySettings::default();
        settings.styles[1].max_width = 8.0;
        let mut styles = StyleRegistry::from_settings(&settings);
        for _ in 0..10 {
            styles.adjust_width(Ink::Pen, true);
        }
        assert!(styles.select(KeyCode::Char('G'), Ink::Pen));
        assert_eq!(styles.width_for(Ink::Pen), 8.0);
    }

    #[test]
    fn unknown_key_is_not_selected() {
        let mut styles = registry();
        assert!(!styles.select(KeyCode::Char('Q'), Ink::Pen));
        assert_eq!(styles.active_key(), KeyCode::Char('R'));
    }
}
