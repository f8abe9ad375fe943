use screen_ink::draw::keys::KeyCode;
use screen_ink::draw::settings::OverlaySettings;
use screen_ink::draw::settings_store::{load_from_path, save_to_path};
use screen_ink::draw::styles::{Ink, StyleRegistry};

#[test]
fn settings_round_trip_through_json_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cfg").join("overlay_settings.json");
    let mut settings = OverlaySettings::default();
    settings.highlight_alpha = 80;
    settings.keys.magnify = "F2".to_owned();
    save_to_path(&path, &settings).expect("save");

    let loaded = load_from_path(&path).expect("load").expect("present");
    assert_eq!(loaded, settings);
    assert_eq!(loaded.keys.resolve().magnify.key, KeyCode::Function(2));
}

#[test]
fn partial_file_is_filled_and_clamped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("overlay_settings.json");
    std::fs::write(
        &path,
        r#"{"eraser":{"min":10,"max":5,"step":0,"default":999},"keys":{"undo":"Ctrl+???"}}"#,
    )
    .expect("write");

    let loaded = load_from_path(&path).expect("load").expect("present");
    assert!(loaded.eraser.max >= loaded.eraser.min);
    assert!(loaded.eraser.step >= 1);
    assert!(loaded.eraser.default <= loaded.eraser.max);
    assert_eq!(loaded.keys.undo, OverlaySettings::default().keys.undo);
    assert_eq!(loaded.styles.len(), 10);
}

#[test]
fn wheel_widths_never_leave_style_bounds() {
    let settings = OverlaySettings::default();
    let mut styles = StyleRegistry::from_settings(&settings);
    for _ in 0..100 {
        styles.adjust_width(Ink::Pen, true);
        styles.adjust_width(Ink::Highlighter, true);
    }
    assert_eq!(styles.width_for(Ink::Pen), 50.0);
    assert_eq!(styles.width_for(Ink::Highlighter), 500.0);
    for _ in 0..100 {
        styles.adjust_width(Ink::Pen, false);
        styles.adjust_width(Ink::Highlighter, false);
    }
    assert_eq!(styles.width_for(Ink::Pen), 2.0);
    assert_eq!(styles.width_for(Ink::Highlighter), 20.0);
}
