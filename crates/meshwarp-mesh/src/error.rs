use thiserror::Error;

use crate::quad::Point;

/// Failure while building a reprojection mesh.
///
/// Builds never return partial meshes: any error discards all work done so far.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// Inputs that can never produce a mesh (bad tolerance, bad seeds, bad quad).
    #[error("invalid mesh configuration: {0}")]
    InvalidConfiguration(String),

    /// The projector produced a non-finite coordinate.
    #[error(
        "projector returned non-finite output ({}, {}) for source point ({}, {})",
        .output[0], .output[1], .point[0], .point[1]
    )]
    Projection { point: Point, output: Point },
}

impl MeshError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
