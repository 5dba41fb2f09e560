//! GPU rendering of reprojected rasters.
//!
//! Convention:
//! - mesh positions are in projected map units
//! - the vertex shader maps them to NDC with the viewport uniform pair
//! - the fragment shader samples the `raster` texture at the `uv` varying
//!
//! [`RasterBackend`] is the seam between the layer's render loop and the
//! graphics API; [`MeshRenderer`] is the wgpu implementation.

mod backend;
mod mesh;
mod raster;
pub mod shader;

pub use backend::{GraphicsError, RasterBackend};
pub use mesh::MeshRenderer;
pub use raster::{decode_raster, load_raster, RasterImage, ResourceLoadError};
