//! Widened outlines for highlighter strokes.
//!
//! A polyline widened to a given width becomes a set of closed contours, one
//! capsule per segment (or one circle for a degenerate polyline). Every contour
//! winds the same way, so filling the set with the non-zero rule covers the
//! union exactly once no matter how often the polyline crosses itself.

use std::f32::consts::PI;

use crate::draw::model::{Point, RectF};

/// Maximum distance between a flattened arc and the true circle.
pub const FLATTEN_TOLERANCE: f32 = 0.25;

const MIN_ARC_STEPS: usize = 4;
const MAX_ARC_STEPS: usize = 256;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidenedOutline {
    contours: Vec<Vec<Point>>,
}

impl WidenedOutline {
    pub fn contours(&self) -> &[Vec<Point>] {
        &self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn bounds(&self) -> Option<RectF> {
        let mut points = self.contours.iter().flatten();
        let first = points.next()?;
        let mut rect = RectF::new(first.x, first.y, first.x, first.y);
        for p in points {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        Some(rect)
    }

    /// Calls `span(y, x_start, x_end)` for every run of pixels whose centers lie
    /// inside the outline under the non-zero rule. Each pixel is reported at
    /// most once. Spans are clipped to `width` x `height`.
    pub fn for_each_span<F>(&self, width: u32, height: u32, mut span: F)
    where
        F: FnMut(u32, u32, u32),
    {
        let Some(bounds) = self.bounds() else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        let y_start = (bounds.top - 0.5).ceil().max(0.0) as i64;
        let y_end = ((bounds.bottom - 0.5).floor() as i64).min(height as i64 - 1);

        let mut crossings: Vec<(f32, i32)> = Vec::new();
        for y in y_start..=y_end {
            let yc = y as f32 + 0.5;
            crossings.clear();
            for contour in &self.contours {
                let n = contour.len();
                for i in 0..n {
                    let p0 = contour[i];
                    let p1 = contour[(i + 1) % n];
                    let upward = p0.y <= yc && p1.y > yc;
                    let downward = p1.y <= yc && p0.y > yc;
                    if !(upward || downward) {
                        continue;
                    }
                    let t = (yc - p0.y) / (p1.y - p0.y);
                    let x = p0.x + t * (p1.x - p0.x);
                    crossings.push((x, if upward { 1 } else { -1 }));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            let mut run_start = 0.0_f32;
            for &(x, dir) in &crossings {
                let was_inside = winding != 0;
                winding += dir;
                let inside = winding != 0;
                if !was_inside && inside {
                    run_start = x;
                } else if was_inside && !inside {
                    let x0 = (run_start - 0.5).ceil().max(0.0) as i64;
                    let x1 = ((x - 0.5).ceil() as i64).min(width as i64);
                    if x1 > x0 {
                        span(y as u32, x0 as u32, x1 as u32);
                    }
                }
            }
        }
    }
}

/// Widens `points` to `width` with round joins and caps.
pub fn widen_polyline(points: &[Point], width: f32, tolerance: f32) -> WidenedOutline {
    let radius = width.max(1.0) / 2.0;
    let steps = arc_steps(radius, tolerance);
    let mut contours = Vec::new();

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f32::EPSILON {
            continue;
        }
        // Angle of the left-hand normal; both caps sweep clockwise from it.
        let normal_angle = (dx / len).atan2(-dy / len);
        let mut contour = Vec::with_capacity(2 * (steps + 1));
        push_arc(&mut contour, b, radius, normal_angle, steps);
        push_arc(&mut contour, a, radius, normal_angle - PI, steps);
        contours.push(contour);
    }

    if contours.is_empty() {
        if let Some(&center) = points.first() {
            contours.push(circle_contour(center, radius, tolerance));
        }
    }

    WidenedOutline { contours }
}

pub fn circle_contour(center: Point, radius: f32, tolerance: f32) -> Vec<Point> {
    let steps = arc_steps(radius, tolerance) * 2;
    (0..steps)
        .map(|k| {
            let theta = -2.0 * PI * k as f32 / steps as f32;
            Point::new(
                center.x + radius * theta.cos(),
                center.y + radius * theta.sin(),
            )
        })
        .collect()
}

fn push_arc(contour: &mut Vec<Point>, center: Point, radius: f32, start: f32, steps: usize) {
    for k in 0..=steps {
        let theta = start - PI * k as f32 / steps as f32;
        contour.push(Point::new(
            center.x + radius * theta.cos(),
            center.y + radius * theta.sin(),
        ));
    }
}

/// Segment count for a half circle so the chord error stays within `tolerance`.
fn arc_steps(radius: f32, tolerance: f32) -> usize {
    let tolerance = tolerance.max(0.01);
    if radius <= tolerance {
        return MIN_ARC_STEPS;
    }
    let half_angle = (1.0 - tolerance / radius).clamp(-1.0, 1.0).acos();
    if half_angle <= f32::EPSILON {
        return MAX_ARC_STEPS;
    }
    ((PI / (2.0 * half_angle)).ceil() as usize).clamp(MIN_ARC_STEPS, MAX_ARC_STEPS)
}
