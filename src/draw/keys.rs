use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a physical key, independent of the platform hook that saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyCode {
    /// Letter or digit, stored uppercase.
    Char(char),
    Function(u8),
    Space,
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,
}

impl KeyCode {
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "SPACE" => Some(Self::Space),
            "TAB" => Some(Self::Tab),
            "ENTER" | "RETURN" => Some(Self::Enter),
            "ESC" | "ESCAPE" => Some(Self::Escape),
            "BACKSPACE" => Some(Self::Backspace),
            "DELETE" | "DEL" => Some(Self::Delete),
            _ if upper.len() > 1 && upper.starts_with('F') => match upper[1..].parse::<u8>() {
                Ok(n @ 1..=24) => Some(Self::Function(n)),
                _ => None,
            },
            _ => {
                let mut chars = upper.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => Some(Self::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Function(n) => write!(f, "F{n}"),
            Self::Space => f.write_str("Space"),
            Self::Tab => f.write_str("Tab"),
            Self::Enter => f.write_str("Enter"),
            Self::Escape => f.write_str("Esc"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Delete => f.write_str("Delete"),
        }
    }
}

impl TryFrom<String> for KeyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown key `{value}`"))
    }
}

impl From<KeyCode> for String {
    fn from(value: KeyCode) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyModifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: KeyCode,
    #[serde(flatten)]
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub fn plain(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::default(),
        }
    }

    pub fn ctrl(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers {
                ctrl: true,
                shift: false,
            },
        }
    }

    pub fn ctrl_shift(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers {
                ctrl: true,
                shift: true,
            },
        }
    }
}

/// A bound key plus the exact modifier state it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCombo {
    pub key: KeyCode,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyCombo {
    pub const fn plain(key: KeyCode) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key
            && self.ctrl == event.modifiers.ctrl
            && self.shift == event.modifiers.shift
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Parse a combo string like "Ctrl+Shift+Z" into a [`KeyCombo`].
pub fn parse_combo(s: &str) -> Option<KeyCombo> {
    let mut ctrl = false;
    let mut shift = false;
    let mut key: Option<KeyCode> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => ctrl = true,
            "SHIFT" => shift = true,
            "" => return None,
            _ => {
                if key.is_some() {
                    return None;
                }
                key = Some(KeyCode::parse(&upper)?);
            }
        }
    }

    key.map(|key| KeyCombo { key, ctrl, shift })
}
