use meshwarp_mesh::MeshOutput;
use thiserror::Error;

use crate::coords::PixelBounds;
use crate::view::UniformPair;

use super::RasterImage;

/// Fatal GPU setup failures, and the few per-draw failures a backend reports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphicsError {
    #[error("fragment shader must reference `{0}`")]
    MissingIdentifier(&'static str),

    #[error("shader failed to compile: {0}")]
    Compile(String),

    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("raster of {width}x{height} exceeds the device limit of {limit} pixels per side")]
    RasterTooLarge { width: u32, height: u32, limit: u32 },

    #[error("GPU resources are not configured")]
    NotConfigured,

    #[error("no render target; pixel bounds have not been established")]
    NoTarget,

    #[error("layer canvas of {width}x{height} exceeds the device limit of {limit} pixels per side")]
    CanvasTooLarge { width: u32, height: u32, limit: u32 },
}

/// Everything the render loop needs from the graphics API.
///
/// Resources are created by [`configure`](Self::configure) and released by
/// [`teardown`](Self::teardown); between those calls the backend owns the
/// mesh buffers, raster texture and pipeline exclusively.
pub trait RasterBackend {
    /// Uploads `mesh` once, builds the pipeline from `fragment_shader`, and
    /// binds `raster`.
    ///
    /// Fails without leaving any allocation behind.
    fn configure(
        &mut self,
        mesh: &MeshOutput,
        fragment_shader: &str,
        raster: &RasterImage,
    ) -> Result<(), GraphicsError>;

    /// Swaps the bound raster (e.g. when the real image finishes loading).
    fn replace_raster(&mut self, raster: &RasterImage) -> Result<(), GraphicsError>;

    /// Sizes the render target to the layer's pixel bounds. Bounds the
    /// device cannot hold leave no target; `draw` then reports why.
    fn resize(&mut self, bounds: PixelBounds);

    fn set_viewport_uniforms(&mut self, uniforms: UniformPair);

    /// One indexed triangle draw with the last uniforms and the bound raster.
    fn draw(&mut self) -> Result<(), GraphicsError>;

    /// Releases every GPU allocation. Idempotent.
    fn teardown(&mut self);
}
