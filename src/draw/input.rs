use serde::{Deserialize, Serialize};

use crate::draw::keys::KeyEvent;
use crate::draw::model::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

/// Normalized input delivered by the platform layer, already in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown {
        pos: Point,
        #[serde(default)]
        button: PointerButton,
    },
    PointerMove {
        pos: Point,
        #[serde(default)]
        primary_down: bool,
    },
    PointerUp {
        pos: Point,
        #[serde(default)]
        button: PointerButton,
    },
    PointerLeave,
    CaptureLost,
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    Char {
        ch: char,
    },
    /// Positive is away from the user.
    Wheel {
        delta: i32,
    },
    Resize {
        width: u32,
        height: u32,
    },
}

/// Whether the event was swallowed by the overlay or should reach the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Consumed,
    PassThrough,
}

impl EventDisposition {
    pub fn is_consumed(self) -> bool {
        self == EventDisposition::Consumed
    }
}

/// Parses one event per non-empty line. Lines starting with `#` are skipped.
pub fn parse_event_lines(source: &str) -> anyhow::Result<Vec<InputEvent>> {
    use anyhow::Context;

    source
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("parse event on line {}", idx + 1))
        })
        .collect()
}
