use crate::coords::PixelBounds;

/// Part of a layer canvas that lands inside the surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CopyRegion {
    pub src: (u32, u32),
    pub dst: (u32, u32),
    pub size: (u32, u32),
}

impl CopyRegion {
    /// Clips a canvas of `canvas` pixels placed at `bounds.min` against a
    /// surface of `surface` pixels. `None` when nothing overlaps.
    pub fn clip(bounds: PixelBounds, canvas: (u32, u32), surface: (u32, u32)) -> Option<Self> {
        let axis = |offset: f64, len: u32, limit: u32| -> Option<(u32, u32, u32)> {
            let offset = offset.round() as i64;
            let src = (-offset).max(0);
            let dst = offset.max(0);
            let span = (len as i64 - src).min(limit as i64 - dst);
            (span > 0).then(|| (src as u32, dst as u32, span as u32))
        };

        let (sx, dx, w) = axis(bounds.min.x, canvas.0, surface.0)?;
        let (sy, dy, h) = axis(bounds.min.y, canvas.1, surface.1)?;
        Some(Self {
            src: (sx, sy),
            dst: (dx, dy),
            size: (w, h),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Point2;

    #[test]
    fn padded_canvas_is_cropped_to_the_surface() {
        let bounds = PixelBounds::padded(Point2::new(800.0, 600.0), 0.1);
        let region = CopyRegion::clip(bounds, (960, 720), (800, 600)).unwrap();
        assert_eq!(region.src, (80, 60));
        assert_eq!(region.dst, (0, 0));
        assert_eq!(region.size, (800, 600));
    }

    #[test]
    fn unpadded_canvas_copies_whole() {
        let bounds = PixelBounds::padded(Point2::new(640.0, 480.0), 0.0);
        let region = CopyRegion::clip(bounds, (640, 480), (640, 480)).unwrap();
        assert_eq!(region, CopyRegion { src: (0, 0), dst: (0, 0), size: (640, 480) });
    }

    #[test]
    fn canvas_smaller_than_surface_keeps_its_size() {
        // Canvas lagging behind a resize.
        let bounds = PixelBounds::padded(Point2::new(800.0, 600.0), 0.1);
        let region = CopyRegion::clip(bounds, (500, 400), (800, 600)).unwrap();
        assert_eq!(region.size, (420, 340));
    }

    #[test]
    fn disjoint_canvas_is_skipped() {
        let bounds = PixelBounds::new(Point2::new(900.0, 0.0), Point2::new(1000.0, 100.0));
        assert_eq!(CopyRegion::clip(bounds, (100, 100), (800, 600)), None);
    }
}
