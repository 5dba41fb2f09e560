use crate::quad::Point;

/// Summary of a finished subdivision.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MeshStats {
    pub vertices: usize,
    pub triangles: usize,
    /// Largest squared midpoint error over all leaf edges.
    pub max_error: f64,
    /// `true` when the depth safeguard stopped a split that the tolerance asked for.
    pub depth_limited: bool,
}

/// Flattened reprojection mesh.
///
/// `unprojected`, `projected` and `uv` are index-aligned: entry `i` of each
/// describes vertex `i`. Triangles index into them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshOutput {
    /// Vertex positions in the raster's own CRS.
    pub unprojected: Vec<Point>,
    /// Vertex positions in the display CRS.
    pub projected: Vec<Point>,
    /// Texture coordinates in `[0, 1]`.
    pub uv: Vec<Point>,
    pub triangles: Vec<[u32; 3]>,
    pub stats: MeshStats,
}

impl MeshOutput {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.projected.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangle indices as one flat list, three per triangle.
    pub fn flat_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Projected-space axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn projected_bounds(&self) -> Option<(Point, Point)> {
        let first = *self.projected.first()?;
        Some(self.projected.iter().fold((first, first), |(lo, hi), p| {
            ([lo[0].min(p[0]), lo[1].min(p[1])], [hi[0].max(p[0]), hi[1].max(p[1])])
        }))
    }
}
