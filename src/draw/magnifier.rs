use anyhow::Result;

use crate::draw::model::{IRect, Point, RectF};
use crate::draw::settings::MagnifierSettings;

/// Platform magnification surface. Each call is assumed to be expensive, so
/// the controller only pushes values that changed.
pub trait Magnification {
    fn create_viewport(&mut self, width: i32, height: i32) -> Result<()>;
    fn destroy_viewport(&mut self);
    fn place_window(&mut self, rect: IRect) -> Result<()>;
    fn set_source(&mut self, rect: IRect) -> Result<()>;
    fn set_zoom(&mut self, zoom: f32) -> Result<()>;
}

/// Magnification sink that only logs, for headless runs.
#[derive(Debug, Default)]
pub struct LoggingMagnifier;

impl Magnification for LoggingMagnifier {
    fn create_viewport(&mut self, width: i32, height: i32) -> Result<()> {
        tracing::debug!(width, height, "magnifier viewport created");
        Ok(())
    }

    fn destroy_viewport(&mut self) {
        tracing::debug!("magnifier viewport destroyed");
    }

    fn place_window(&mut self, rect: IRect) -> Result<()> {
        tracing::trace!(?rect, "magnifier window placed");
        Ok(())
    }

    fn set_source(&mut self, rect: IRect) -> Result<()> {
        tracing::trace!(?rect, "magnifier source set");
        Ok(())
    }

    fn set_zoom(&mut self, zoom: f32) -> Result<()> {
        tracing::trace!(zoom, "magnifier zoom set");
        Ok(())
    }
}

/// Source region shown in a window at `window_top_left`, chosen so the point
/// under the cursor stays put as the zoom changes.
pub fn source_rect(cursor: Point, window_top_left: (i32, i32), size: (i32, i32), zoom: f32) -> IRect {
    let z = zoom.max(1.0) as f64;
    let (cx, cy) = (cursor.x as f64, cursor.y as f64);
    let width = ((size.0 as f64 / z).round() as i32).max(1);
    let height = ((size.1 as f64 / z).round() as i32).max(1);
    let x = (cx - (cx - window_top_left.0 as f64) / z).round() as i32;
    let y = (cy - (cy - window_top_left.1 as f64) / z).round() as i32;
    IRect::new(x, y, width, height)
}

/// Floors a dragged selection to something usable, per axis.
pub fn selection_size(rect: RectF, settings: &MagnifierSettings) -> (i32, i32) {
    let mut width = rect.width().abs();
    let mut height = rect.height().abs();
    if width < settings.min_selection {
        width = settings.fallback_width;
    }
    if height < settings.min_selection {
        height = settings.fallback_height;
    }
    (width.round() as i32, height.round() as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MagnifierPush {
    pub placed: bool,
    pub zoomed: bool,
    pub sourced: bool,
}

impl MagnifierPush {
    pub fn any(&self) -> bool {
        self.placed || self.zoomed || self.sourced
    }
}

/// Tracks a fixed-size magnifier window centered on the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct MagnifierController {
    size: Option<(i32, i32)>,
    zoom: i32,
    viewport_live: bool,
    last_window: Option<IRect>,
    last_source: Option<IRect>,
    last_zoom: Option<i32>,
}

impl MagnifierController {
    pub fn new(zoom: i32) -> Self {
        Self {
            size: None,
            zoom,
            viewport_live: false,
            last_window: None,
            last_source: None,
            last_zoom: None,
        }
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: i32) -> bool {
        let changed = zoom != self.zoom;
        self.zoom = zoom;
        changed
    }

    pub fn size(&self) -> Option<(i32, i32)> {
        self.size
    }

    pub fn has_rect(&self) -> bool {
        self.size.is_some()
    }

    pub fn is_live(&self) -> bool {
        self.viewport_live
    }

    pub fn window_rect(&self) -> Option<IRect> {
        self.last_window
    }

    pub fn last_source(&self) -> Option<IRect> {
        self.last_source
    }

    pub fn set_size(&mut self, width: i32, height: i32) {
        self.size = Some((width.max(1), height.max(1)));
    }

    /// Recomputes placement and source for `cursor`, pushing only what changed.
    pub fn update<M: Magnification>(&mut self, sink: &mut M, cursor: Point) -> Result<MagnifierPush> {
        let mut push = MagnifierPush::default();
        let Some((width, height)) = self.size else {
            return Ok(push);
        };

        if !self.viewport_live {
            sink.create_viewport(width, height)?;
            self.viewport_live = true;
        }

        let window = IRect::new(
            (cursor.x - width as f32 / 2.0).round() as i32,
            (cursor.y - height as f32 / 2.0).round() as i32,
            width,
            height,
        );
        if self.last_window != Some(window) {
            sink.place_window(window)?;
            self.last_window = Some(window);
            push.placed = true;
        }

        let source = source_rect(cursor, (window.x, window.y), (width, height), self.zoom as f32);
        if self.last_zoom != Some(self.zoom) {
            sink.set_zoom(self.zoom as f32)?;
            self.last_zoom = Some(self.zoom);
            push.zoomed = true;
        }
        if push.zoomed || self.last_source != Some(source) {
            sink.set_source(source)?;
            self.last_source = Some(source);
            push.sourced = true;
        }
        Ok(push)
    }

    /// Tears down the viewport and forgets the selection.
    pub fn destroy<M: Magnification>(&mut self, sink: &mut M) {
        if self.viewport_live {
            sink.destroy_viewport();
        }
        self.viewport_live = false;
        self.size = None;
        self.last_window = None;
        self.last_source = None;
        self.last_zoom = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Magnification for Recorder {
        fn create_viewport(&mut self, width: i32, height: i32) -> Result<()> {
            self.calls.push(format!("create {width}x{height}"));
            Ok(())
        }

        fn destroy_viewport(&mut self) {
            self.calls.push("destroy".to_owned());
        }

        fn place_window(&mut self, rect: IRect) -> Result<()> {
            self.calls.push(format!("place {},{}", rect.x, rect.y));
            Ok(())
        }

        fn set_source(&mut self, rect: IRect) -> Result<()> {
            self.calls.push(format!(
                "source {},{} {}x{}",
                rect.x, rect.y, rect.width, rect.height
            ));
            Ok(())
        }

        fn set_zoom(&mut self, zoom: f32) -> Result<()> {
            self.calls.push(format!("zoom {zoom}"));
            Ok(())
        }
    }

    #[test]
    fn source_is_window_size_divided_by_zoom() {
        let src = source_rect(Point::new(500.0, 400.0), (425, 350), (150, 100), 2.0);
        assert_eq!((src.width, src.height), (75, 50));
        assert_eq!((src.x, src.y), (463, 375));
    }

    #[test]
    fn source_moves_half_as_far_when_window_is_held() {
        let a = source_rect(Point::new(500.0, 400.0), (425, 350), (150, 100), 2.0);
        let b = source_rect(Point::new(540.0, 420.0), (425, 350), (150, 100), 2.0);
        assert_eq!((b.x - a.x, b.y - a.y), (20, 10));
    }

    #[test]
    fn small_drags_fall_back_per_axis() {
        let settings = MagnifierSettings::default();
        let rect = RectF::new(0.0, 0.0, 4.0, 60.0);
        assert_eq!(selection_size(rect, &settings), (120, 60));
        let rect = RectF::new(0.0, 0.0, 150.0, 100.0);
        assert_eq!(selection_size(rect, &settings), (150, 100));
    }

    #[test]
    fn first_update_creates_places_zooms_and_sources() {
        let mut controller = MagnifierController::new(2);
        let mut sink = Recorder::default();
        controller.set_size(150, 100);
        let push = controller
            .update(&mut sink, Point::new(500.0, 400.0))
            .expect("update");
        assert!(push.placed && push.zoomed && push.sourced);
        assert_eq!(
            sink.calls,
            [
                "create 150x100",
                "place 425,350",
                "zoom 2",
                "source 463,375 75x50"
            ]
        );
        assert_eq!(controller.window_rect(), Some(IRect::new(425, 350, 150, 100)));
    }

    #[test]
    fn unchanged_cursor_pushes_nothing() {
        let mut controller = MagnifierController::new(2);
        let mut sink = Recorder::default();
        controller.set_size(150, 100);
        controller.update(&mut sink, Point::new(10.0, 10.0)).expect("update");
        let before = sink.calls.len();
        let push = controller.update(&mut sink, Point::new(10.0, 10.0)).expect("update");
        assert!(!push.any());
        assert_eq!(sink.calls.len(), before);
    }

    #[test]
    fn zoom_change_pushes_zoom_then_source_only() {
        let mut controller = MagnifierController::new(2);
        let mut sink = Recorder::default();
        controller.set_size(150, 100);
        controller.update(&mut sink, Point::new(500.0, 400.0)).expect("update");
        sink.calls.clear();

        assert!(controller.set_zoom(3));
        controller.update(&mut sink, Point::new(500.0, 400.0)).expect("update");
        assert_eq!(sink.calls, ["zoom 3", "source 475,383 50x33"]);
    }

    #[test]
    fn update_without_selection_is_a_no_op() {
        let mut controller = MagnifierController::new(2);
        let mut sink = Recorder::default();
        let push = controller.update(&mut sink, Point::new(1.0, 1.0)).expect("update");
        assert!(!push.any());
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn destroy_resets_dirty_tracking() {
        let mut controller = MagnifierController::new(2);
        let mut sink = Recorder::default();
        controller.set_size(150, 100);
        controller.update(&mut sink, Point::new(50.0, 50.0)).expect("update");
        controller.destroy(&mut sink);
        assert!(!controller.has_rect());
        assert_eq!(sink.calls.last().map(String::as_str), Some("destroy"));

        controller.destroy(&mut sink);
        assert_eq!(sink.calls.iter().filter(|c| *c == "destroy").count(), 1);
    }
}
