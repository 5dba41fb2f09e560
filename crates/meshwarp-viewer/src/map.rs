//! Minimal slippy-map state: where the view is and how it moves.

use std::time::{Duration, Instant};

use meshwarp_engine::coords::{HostView, Point2};
use meshwarp_engine::view::MapProjection;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 19.0;

const ZOOM_DURATION: Duration = Duration::from_millis(250);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapView {
    /// Projected (Web Mercator) center.
    pub center: Point2,
    pub zoom: f64,
    projection: MapProjection,
}

impl MapView {
    pub fn new(center: Point2, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            projection: MapProjection::WEB_MERCATOR,
        }
    }

    /// Moves the map content by a pointer drag of `(dx, dy)` screen pixels.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64) {
        let upp = self.projection.units_per_pixel(self.zoom);
        // Screen +Y is down, projected +Y is north.
        self.center.x -= dx * upp;
        self.center.y += dy * upp;

        let half = self.projection.half_extent;
        self.center.y = self.center.y.clamp(-half, half);
    }

    pub fn host_view(&self, size: Point2) -> HostView {
        HostView::new(self.center, self.zoom, size)
    }
}

/// Eased transition between two zoom levels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomAnimation {
    from: f64,
    to: f64,
    start: Instant,
    duration: Duration,
}

impl ZoomAnimation {
    pub fn new(from: f64, to: f64, start: Instant) -> Self {
        Self {
            from,
            to: to.clamp(MIN_ZOOM, MAX_ZOOM),
            start,
            duration: ZOOM_DURATION,
        }
    }

    #[inline]
    pub fn target(&self) -> f64 {
        self.to
    }

    /// Zoom level at `now`, or `None` once the animation is over.
    pub fn sample(&self, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed >= self.duration {
            return None;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - (1.0 - t).powi(3);
        Some(self.from + (self.to - self.from) * eased)
    }
}
