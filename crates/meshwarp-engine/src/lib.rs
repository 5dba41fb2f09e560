//! meshwarp engine crate.
//!
//! Draws a raster reprojected through a triangle mesh (see `meshwarp-mesh`)
//! and keeps it in sync with a host map view. Owns the GPU runtime pieces,
//! the viewport transform, and the layer's render loop.

pub mod core;
pub mod device;
pub mod window;

pub mod coords;
pub mod layer;
pub mod logging;
pub mod render;
pub mod view;
