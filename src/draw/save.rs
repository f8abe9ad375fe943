use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::draw::composite::RgbaBuffer;
use crate::draw::controller::EventSender;
use crate::draw::messages::EngineEvent;
use crate::draw::model::Color;

pub const SCREENSHOT_SUBDIR: &str = "screenshots";

/// Grabs the desktop underneath the overlay.
pub trait DesktopCapture: Send {
    fn capture(&mut self, width: u32, height: u32) -> Result<RgbaBuffer>;
}

/// Stand-in desktop of a single color, for headless runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidDesktop {
    pub color: Color,
}

impl Default for SolidDesktop {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
        }
    }
}

impl DesktopCapture for SolidDesktop {
    fn capture(&mut self, width: u32, height: u32) -> Result<RgbaBuffer> {
        Ok(RgbaBuffer::new(width, height, self.color))
    }
}

pub fn exe_relative_output_folder_from_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SCREENSHOT_SUBDIR))
}

pub fn default_output_folder() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    exe_relative_output_folder_from_path(&exe_path)
}

pub fn timestamped_stem(now: chrono::DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// First free `<stem>.png`, `<stem>-1.png`, ... in `dir`.
pub fn unique_png_path(dir: &Path, stem: &str) -> PathBuf {
    let first = dir.join(format!("{stem}.png"));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{stem}-{n}.png")))
        .find(|path| !path.exists())
        .unwrap_or(first)
}

pub fn write_png(path: &Path, buffer: &RgbaBuffer) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create screenshot folder {}", parent.display()))?;
    }
    let image = image::RgbaImage::from_raw(buffer.width, buffer.height, buffer.pixels.clone())
        .ok_or_else(|| anyhow!("pixel buffer does not match {}x{}", buffer.width, buffer.height))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png {}", path.display()))
}

/// Encodes screenshots off the owning thread, one at a time.
#[derive(Debug, Clone)]
pub struct ScreenshotWorker {
    busy: Arc<AtomicBool>,
    events: EventSender,
}

impl ScreenshotWorker {
    pub fn new(events: EventSender) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts an encode unless one is already running. Completion is posted
    /// as [`EngineEvent::ScreenshotSaved`].
    pub fn request(&self, buffer: RgbaBuffer, path: PathBuf) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            tracing::debug!("screenshot already in flight");
            return false;
        }

        let busy = Arc::clone(&self.busy);
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("screenshot-encode".to_owned())
            .spawn(move || {
                let ok = match write_png(&path, &buffer) {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), "screenshot saved");
                        true
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "screenshot encode failed");
                        false
                    }
                };
                busy.store(false, Ordering::Release);
                if let Err(err) = events.post(EngineEvent::ScreenshotSaved { ok }) {
                    tracing::debug!(error = %err, "screenshot completion not delivered");
                }
            });

        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to spawn screenshot worker");
            self.busy.store(false, Ordering::Release);
            return false;
        }
        true
    }
}

/// Everything needed to take a screenshot: the worker, where the desktop
/// pixels come from, and the output folder.
pub struct ScreenshotService {
    worker: ScreenshotWorker,
    capture: Box<dyn DesktopCapture>,
    dir: PathBuf,
}

impl ScreenshotService {
    pub fn new(worker: ScreenshotWorker, capture: Box<dyn DesktopCapture>, dir: PathBuf) -> Self {
        Self {
            worker,
            capture,
            dir,
        }
    }

    pub fn worker(&self) -> &ScreenshotWorker {
        &self.worker
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Composites `annotation` over a fresh desktop capture and hands it to
    /// the worker. Returns whether an encode was started.
    pub fn submit(&mut self, annotation: &RgbaBuffer) -> Result<bool> {
        if self.worker.is_busy() {
            return Ok(false);
        }
        let desktop = self
            .capture
            .capture(annotation.width, annotation.height)
            .context("capture desktop")?;
        let image = crate::draw::composite::composite_annotation_over_desktop(&desktop, annotation)?;
        let path = unique_png_path(&self.dir, &timestamped_stem(Local::now()));
        Ok(self.worker.request(image, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::controller::bounded;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn exe_relative_output_folder_is_sibling_of_exe() {
        let exe = Path::new("/tmp/myapp/bin/screen_ink");
        let output = exe_relative_output_folder_from_path(exe).expect("output path");
        assert_eq!(output, Path::new("/tmp/myapp/bin").join(SCREENSHOT_SUBDIR));
    }

    #[test]
    fn stem_formats_local_timestamp() {
        let dt = Local
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("date time");
        assert_eq!(timestamped_stem(dt), "20260102_030405");
    }

    #[test]
    fn colliding_names_get_a_counter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = unique_png_path(dir.path(), "20260102_030405");
        assert!(first.ends_with("20260102_030405.png"));
        fs::write(&first, b"x").expect("write");
        let second = unique_png_path(dir.path(), "20260102_030405");
        assert!(second.ends_with("20260102_030405-1.png"));
        fs::write(&second, b"x").expect("write");
        assert!(unique_png_path(dir.path(), "20260102_030405").ends_with("20260102_030405-2.png"));
    }

    #[test]
    fn png_round_trips_through_image_crate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("shot.png");
        let mut buffer = RgbaBuffer::new(3, 2, Color::BLACK);
        buffer.set_pixel(1, 1, Color::rgba(10, 20, 30, 255));
        write_png(&path, &buffer).expect("write");

        let decoded = image::open(&path).expect("open").to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn worker_posts_completion_and_releases_busy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, controller) = bounded(4);
        let worker = ScreenshotWorker::new(tx);
        assert!(worker.request(RgbaBuffer::new(2, 2, Color::WHITE), dir.path().join("a.png")));

        let event = controller_recv(&controller);
        assert_eq!(event, EngineEvent::ScreenshotSaved { ok: true });
        assert!(!worker.is_busy());
        assert!(dir.path().join("a.png").exists());
    }

    #[test]
    fn busy_worker_rejects_second_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, controller) = bounded(4);
        let worker = ScreenshotWorker::new(tx);
        worker.busy.store(true, Ordering::SeqCst);
        assert!(!worker.request(RgbaBuffer::new(1, 1, Color::WHITE), dir.path().join("b.png")));

        worker.busy.store(false, Ordering::SeqCst);
        assert!(worker.request(RgbaBuffer::new(1, 1, Color::WHITE), dir.path().join("b.png")));
        assert_eq!(controller_recv(&controller), EngineEvent::ScreenshotSaved { ok: true });
    }

    #[test]
    fn failed_encode_reports_not_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").expect("write");
        let (tx, controller) = bounded(4);
        let worker = ScreenshotWorker::new(tx);
        assert!(worker.request(RgbaBuffer::new(1, 1, Color::WHITE), blocker.join("c.png")));
        assert_eq!(controller_recv(&controller), EngineEvent::ScreenshotSaved { ok: false });
    }

    fn controller_recv(controller: &crate::draw::controller::OverlayController) -> EngineEvent {
        controller
            .recv_timeout(Duration::from_secs(10))
            .expect("worker completion")
    }
}
