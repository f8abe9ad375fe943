use std::time::Duration;

use screen_ink::draw::controller;
use screen_ink::draw::engine::OverlayEngine;
use screen_ink::draw::input::{InputEvent, PointerButton};
use screen_ink::draw::keys::{KeyCode, KeyEvent};
use screen_ink::draw::magnifier::LoggingMagnifier;
use screen_ink::draw::messages::EngineEvent;
use screen_ink::draw::model::{Color, Point};
use screen_ink::draw::save::{ScreenshotService, ScreenshotWorker, SolidDesktop};
use screen_ink::draw::settings::OverlaySettings;
use screen_ink::draw::software::SoftwareRenderer;

#[test]
fn screenshot_composites_over_desktop_and_shows_toast() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (sender, mut controller) = controller::bounded(8);
    let worker = ScreenshotWorker::new(sender.clone());
    let service = ScreenshotService::new(
        worker.clone(),
        Box::new(SolidDesktop {
            color: Color::rgb(0, 0, 255),
        }),
        dir.path().to_path_buf(),
    );
    let mut engine = OverlayEngine::new(
        OverlaySettings::default(),
        SoftwareRenderer::new(32, 32),
        LoggingMagnifier,
    )
    .with_screenshots(service);

    let inputs = [
        InputEvent::KeyDown(KeyEvent::ctrl(KeyCode::Char('2'))),
        InputEvent::PointerDown {
            pos: Point::new(2.0, 16.0),
            button: PointerButton::Primary,
        },
        InputEvent::PointerMove {
            pos: Point::new(30.0, 16.0),
            primary_down: true,
        },
        InputEvent::PointerUp {
            pos: Point::new(30.0, 16.0),
            button: PointerButton::Primary,
        },
        InputEvent::KeyDown(KeyEvent::plain(KeyCode::Char('S'))),
    ];
    for input in inputs {
        sender.try_post(EngineEvent::Input(input)).expect("post");
    }
    controller.pump(&mut engine);

    let mut waited = 0;
    while !engine.is_toast_visible() && waited < 200 {
        controller.pump_blocking(&mut engine, Duration::from_millis(50));
        waited += 1;
    }
    assert!(engine.is_toast_visible());
    assert!(!worker.is_busy());

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .collect();
    assert_eq!(files.len(), 1);

    let image = image::open(files[0].path()).expect("open").to_rgba8();
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(image.get_pixel(16, 16).0, [255, 0, 0, 255]);
}

#[test]
fn screenshot_key_without_service_is_harmless() {
    let mut engine = OverlayEngine::new(
        OverlaySettings::default(),
        SoftwareRenderer::new(16, 16),
        LoggingMagnifier,
    );
    engine.handle_input(InputEvent::KeyDown(KeyEvent::ctrl(KeyCode::Char('2'))));
    let disposition = engine.handle_input(InputEvent::KeyDown(KeyEvent::plain(KeyCode::Char('S'))));
    assert!(disposition.is_consumed());
    assert!(!engine.is_toast_visible());
}
