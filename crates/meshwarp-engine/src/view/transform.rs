use thiserror::Error;

use crate::coords::{Point2, ViewportState};

/// The two per-draw parameters of the vertex stage.
///
/// The shader maps a projected position `p` to clip space as
/// `(p - center) / scale`; see [`UniformPair::to_ndc`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UniformPair {
    pub center: [f64; 2],
    pub scale: [f64; 2],
}

impl UniformPair {
    /// CPU mirror of the vertex shader.
    #[inline]
    pub fn to_ndc(&self, p: Point2) -> [f64; 2] {
        [
            (p.x - self.center[0]) / self.scale[0],
            (p.y - self.center[1]) / self.scale[1],
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewportError {
    #[error("viewport scale ({}, {}) is zero or not finite", .0[0], .0[1])]
    Degenerate([f64; 2]),

    #[error("viewport center ({}, {}) is not finite", .0.x, .0.y)]
    InvalidCenter(Point2),

    #[error("map projection scale {0} is not a positive finite number")]
    InvalidMapScale(f64),
}

/// How the host map turns zoom levels into pixels.
///
/// `scale(zoom)` is the width of the whole world in pixels at `zoom`;
/// `half_extent` is half the world's width in projected units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapProjection {
    pub tile_size: f64,
    pub half_extent: f64,
}

impl MapProjection {
    /// Spherical Web Mercator (EPSG:3857) with 256-pixel tiles.
    pub const WEB_MERCATOR: Self = Self {
        tile_size: 256.0,
        half_extent: 20_037_508.342_789_244,
    };

    #[inline]
    pub fn scale(&self, zoom: f64) -> f64 {
        self.tile_size * zoom.exp2()
    }

    #[inline]
    pub fn units_per_pixel(&self, zoom: f64) -> f64 {
        2.0 * self.half_extent / self.scale(zoom)
    }

    /// Uniforms for `viewport` under this projection.
    pub fn uniforms(&self, viewport: &ViewportState) -> Result<UniformPair, ViewportError> {
        compute_uniforms_with_span(viewport, self.scale(viewport.zoom), self.half_extent)
    }
}

impl Default for MapProjection {
    fn default() -> Self {
        Self::WEB_MERCATOR
    }
}

/// Uniforms for a Web Mercator map whose projection scale at the current
/// zoom is `map_scale` (world width in pixels).
pub fn compute_uniforms(
    viewport: &ViewportState,
    map_scale: f64,
) -> Result<UniformPair, ViewportError> {
    compute_uniforms_with_span(viewport, map_scale, MapProjection::WEB_MERCATOR.half_extent)
}

/// `scale = bounds size / (map_scale / reference_span)`, i.e. half the
/// bounds' extent in projected units, so the bounds edges land on ±1.
///
/// Fails instead of producing zero or NaN components; the values must also
/// survive narrowing to `f32` for the GPU.
pub fn compute_uniforms_with_span(
    viewport: &ViewportState,
    map_scale: f64,
    reference_span: f64,
) -> Result<UniformPair, ViewportError> {
    if !(map_scale.is_finite() && map_scale > 0.0) {
        return Err(ViewportError::InvalidMapScale(map_scale));
    }
    if !viewport.center.is_finite() {
        return Err(ViewportError::InvalidCenter(viewport.center));
    }

    let size = viewport.bounds.size();
    let scale = size / (map_scale / reference_span);
    let usable = |v: f64| v.is_finite() && v > 0.0 && (v as f32) > 0.0 && (v as f32).is_finite();
    if !(usable(scale.x) && usable(scale.y)) {
        return Err(ViewportError::Degenerate(scale.to_array()));
    }

    Ok(UniformPair {
        center: viewport.center.to_array(),
        scale: scale.to_array(),
    })
}
