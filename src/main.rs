use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use screen_ink::draw::controller;
use screen_ink::draw::engine::OverlayEngine;
use screen_ink::draw::input::parse_event_lines;
use screen_ink::draw::magnifier::LoggingMagnifier;
use screen_ink::draw::messages::EngineEvent;
use screen_ink::draw::save::{self, ScreenshotService, ScreenshotWorker, SolidDesktop};
use screen_ink::draw::settings::OverlaySettings;
use screen_ink::draw::settings_store;
use screen_ink::draw::software::SoftwareRenderer;
use screen_ink::logging;

const QUEUE_CAPACITY: usize = 256;
const SURFACE_SIZE: (u32, u32) = (1280, 720);
const USAGE: &str = "usage: screen_ink <events.jsonl> [--settings <path>] [--out <png>]";

struct Args {
    events: PathBuf,
    settings: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut events = None;
    let mut settings = None;
    let mut out = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                settings = Some(PathBuf::from(
                    args.next().ok_or_else(|| anyhow!("--settings needs a path"))?,
                ))
            }
            "--out" => {
                out = Some(PathBuf::from(
                    args.next().ok_or_else(|| anyhow!("--out needs a path"))?,
                ))
            }
            "-h" | "--help" => bail!(USAGE),
            _ if events.is_none() => events = Some(PathBuf::from(arg)),
            other => bail!("unexpected argument {other}\n{USAGE}"),
        }
    }
    Ok(Args {
        events: events.ok_or_else(|| anyhow!(USAGE))?,
        settings,
        out,
    })
}

fn load_settings(path: Option<&Path>) -> Result<OverlaySettings> {
    match path {
        Some(path) => Ok(settings_store::load_from_path(path)?.unwrap_or_default()),
        None => settings_store::load(),
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let settings = load_settings(args.settings.as_deref())?;
    logging::init(settings.debug_logging);

    let source = std::fs::read_to_string(&args.events)
        .with_context(|| format!("read event script {}", args.events.display()))?;
    let events = parse_event_lines(&source)?;
    tracing::info!(count = events.len(), "replaying events");

    let screenshot_dir = match settings.screenshot_dir.clone() {
        Some(dir) => dir,
        None => save::default_output_folder()?,
    };

    let (sender, mut controller) = controller::bounded(QUEUE_CAPACITY);
    let worker = ScreenshotWorker::new(sender.clone());
    let service = ScreenshotService::new(
        worker.clone(),
        Box::new(SolidDesktop::default()),
        screenshot_dir,
    );
    let renderer = SoftwareRenderer::new(SURFACE_SIZE.0, SURFACE_SIZE.1);
    let mut engine =
        OverlayEngine::new(settings, renderer, LoggingMagnifier).with_screenshots(service);
    engine.render();

    // Half the queue stays free for worker completions.
    for chunk in events.chunks(QUEUE_CAPACITY / 2) {
        for event in chunk {
            sender.try_post(EngineEvent::Input(event.clone()))?;
        }
        controller.pump(&mut engine);
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while worker.is_busy() && Instant::now() < deadline {
        controller.pump_blocking(&mut engine, Duration::from_millis(50));
    }
    controller.pump(&mut engine);
    tracing::info!(
        handled = controller.handled(),
        committed = engine.history().committed().len(),
        "replay finished"
    );

    if let Some(out) = args.out {
        save::write_png(&out, engine.renderer().presented())?;
        tracing::info!(path = %out.display(), "frame written");
    }
    Ok(())
}
