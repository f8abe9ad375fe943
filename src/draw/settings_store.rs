use crate::draw::settings::OverlaySettings;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "overlay_settings.json";

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

/// Loads the settings next to the executable, falling back to defaults when
/// the file does not exist.
pub fn load() -> Result<OverlaySettings> {
    let path = resolve_settings_path()?;
    Ok(load_from_path(&path)?.unwrap_or_default())
}

/// Reads each top-level section on its own. A section that fails to parse
/// keeps its default and logs a warning; so does a file that is not JSON.
pub fn load_from_path(path: &Path) -> Result<Option<OverlaySettings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read overlay settings file {}", path.display()))?;

    let mut loaded = OverlaySettings::default();
    if content.trim().is_empty() {
        return Ok(Some(loaded));
    }

    let sections = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(sections)) => sections,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "overlay settings file is not an object, using defaults");
            return Ok(Some(loaded));
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "overlay settings file is not valid json, using defaults");
            return Ok(Some(loaded));
        }
    };

    read_section(&sections, "styles", &mut loaded.styles, path);
    read_section(&sections, "font", &mut loaded.font, path);
    read_section(&sections, "eraser", &mut loaded.eraser, path);
    read_section(&sections, "magnifier", &mut loaded.magnifier, path);
    read_section(&sections, "highlight_alpha", &mut loaded.highlight_alpha, path);
    read_section(
        &sections,
        "highlight_width_multiple",
        &mut loaded.highlight_width_multiple,
        path,
    );
    read_section(&sections, "keys", &mut loaded.keys, path);
    read_section(&sections, "screenshot_dir", &mut loaded.screenshot_dir, path);
    read_section(&sections, "toast", &mut loaded.toast, path);
    read_section(&sections, "debug_logging", &mut loaded.debug_logging, path);

    if loaded.sanitize() {
        tracing::info!(path = %path.display(), "overlay settings adjusted during load");
    }
    Ok(Some(loaded))
}

fn read_section<T: DeserializeOwned>(
    sections: &Map<String, Value>,
    key: &str,
    slot: &mut T,
    path: &Path,
) {
    let Some(value) = sections.get(key) else {
        return;
    };
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(err) => tracing::warn!(
            path = %path.display(),
            section = key,
            error = %err,
            "ignoring unparseable overlay settings entry"
        ),
    }
}

pub fn save_to_path(path: &Path, settings: &OverlaySettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create overlay settings folder {}", parent.display()))?;
    }

    let mut sanitized = settings.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize overlay settings")?;
    std::fs::write(path, json)
        .with_context(|| format!("write overlay settings file {}", path.display()))
}
