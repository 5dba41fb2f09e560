use super::{PixelBounds, Point2};

/// The host map's view, as reported in viewport notifications.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct HostView {
    /// View center in projected map units.
    pub center: Point2,
    pub zoom: f64,
    /// Map view size in pixels.
    pub size: Point2,
}

impl HostView {
    #[inline]
    pub const fn new(center: Point2, zoom: f64, size: Point2) -> Self {
        Self { center, zoom, size }
    }
}

/// What the layer renders against: center, zoom, and the (padded) pixel
/// bounds of its drawing surface.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ViewportState {
    pub center: Point2,
    pub zoom: f64,
    pub bounds: PixelBounds,
}

impl ViewportState {
    #[inline]
    pub const fn new(center: Point2, zoom: f64, bounds: PixelBounds) -> Self {
        Self { center, zoom, bounds }
    }

    /// Derives the layer viewport from a host view and the layer's padding.
    pub fn from_host(view: HostView, padding: f64) -> Self {
        Self::new(view.center, view.zoom, PixelBounds::padded(view.size, padding))
    }
}
