//! Forward projection from raster space to display space.

use crate::error::MeshError;
use crate::quad::Point;

/// A forward coordinate mapping from the raster's CRS to the display CRS.
///
/// Any `Fn([f64; 2]) -> [f64; 2]` is a projector, so closures wrapping a
/// projection library work directly.
pub trait Projector {
    fn project(&self, point: Point) -> Point;
}

impl<F> Projector for F
where
    F: Fn(Point) -> Point,
{
    #[inline]
    fn project(&self, point: Point) -> Point {
        self(point)
    }
}

/// Wraps a caller-supplied [`Projector`] and rejects non-finite results.
///
/// Stateless: every call is a pure function of its input.
#[derive(Clone, Copy)]
pub struct ProjectorAdapter<'p> {
    inner: &'p dyn Projector,
}

impl<'p> ProjectorAdapter<'p> {
    #[inline]
    pub fn new(inner: &'p dyn Projector) -> Self {
        Self { inner }
    }

    /// Projects `source`, failing with [`MeshError::Projection`] when either
    /// output component is NaN or infinite.
    pub fn project(&self, source: Point) -> Result<Point, MeshError> {
        let output = self.inner.project(source);
        if output[0].is_finite() && output[1].is_finite() {
            Ok(output)
        } else {
            Err(MeshError::Projection { point: source, output })
        }
    }
}
