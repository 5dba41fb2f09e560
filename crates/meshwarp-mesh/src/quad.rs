//! Control quad, texture coordinates and the seed triangulation.

use crate::error::MeshError;

/// A 2D coordinate pair.
pub type Point = [f64; 2];

/// The two triangles covering a control quad.
///
/// Corners are ordered `[top-left, bottom-left, top-right, bottom-right]`
/// in UV terms (see [`SourceUv::default`]), so the quad is split along the
/// `0 → 3` diagonal.
pub const SEED_TRIANGLES: [[u32; 3]; 2] = [[0, 1, 3], [0, 3, 2]];

/// Four ordered corners of the raster in its own coordinate system.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlQuad([Point; 4]);

impl ControlQuad {
    pub fn new(points: [Point; 4]) -> Result<Self, MeshError> {
        if let Some(p) = points.iter().find(|p| !(p[0].is_finite() && p[1].is_finite())) {
            return Err(MeshError::config(format!(
                "control point ({}, {}) is not finite",
                p[0], p[1]
            )));
        }
        Ok(Self(points))
    }

    /// Accepts any slice, failing unless it holds exactly four points.
    pub fn from_slice(points: &[Point]) -> Result<Self, MeshError> {
        let points: [Point; 4] = points.try_into().map_err(|_| {
            MeshError::config(format!(
                "a control quad needs exactly four points, got {}",
                points.len()
            ))
        })?;
        Self::new(points)
    }

    #[inline]
    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }
}

/// Texture coordinates for each control point, parallel to [`ControlQuad`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SourceUv([Point; 4]);

impl SourceUv {
    pub fn new(uv: [Point; 4]) -> Result<Self, MeshError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if let Some(p) = uv.iter().find(|p| !(in_unit(p[0]) && in_unit(p[1]))) {
            return Err(MeshError::config(format!(
                "texture coordinate ({}, {}) is outside [0, 1]",
                p[0], p[1]
            )));
        }
        Ok(Self(uv))
    }

    #[inline]
    pub fn coords(&self) -> &[Point; 4] {
        &self.0
    }
}

impl Default for SourceUv {
    fn default() -> Self {
        Self([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]])
    }
}
