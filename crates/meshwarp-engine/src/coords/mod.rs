//! Coordinate types shared by the viewport transform and the layer.
//!
//! Two spaces are in play:
//! - projected map units (the display CRS, +Y north)
//! - surface pixels (origin top-left of the map view, +Y down)
//!
//! Both use `f64`; narrowing to `f32` only happens at GPU upload.

mod bounds;
mod point;
mod viewport;

pub use bounds::PixelBounds;
pub use point::Point2;
pub use viewport::{HostView, ViewportState};
