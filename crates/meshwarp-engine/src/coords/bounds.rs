use super::Point2;

/// Axis-aligned pixel rectangle, `min` inclusive, `max` exclusive.
///
/// Relative to the map view's top-left corner; a padded layer extends past
/// the view, so `min` is usually negative.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PixelBounds {
    pub min: Point2,
    pub max: Point2,
}

impl PixelBounds {
    #[inline]
    pub const fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// The map view of `size` extended by `padding × size` on every side.
    ///
    /// Corners are rounded to whole pixels.
    pub fn padded(size: Point2, padding: f64) -> Self {
        let min = Point2::new(-size.x * padding, -size.y * padding);
        let max = min + size * (1.0 + 2.0 * padding);
        Self::new(round(min), round(max))
    }

    #[inline]
    pub fn size(self) -> Point2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(self) -> Point2 {
        (self.min + self.max) * 0.5
    }

    /// Zero-area or inverted bounds (e.g. a minimized window).
    #[inline]
    pub fn is_empty(self) -> bool {
        let s = self.size();
        !(s.x > 0.0 && s.y > 0.0)
    }

    /// Size in whole pixels, or `None` when empty.
    pub fn pixel_size(self) -> Option<(u32, u32)> {
        if self.is_empty() || !self.size().is_finite() {
            return None;
        }
        let s = self.size();
        Some((s.x.round().max(1.0) as u32, s.y.round().max(1.0) as u32))
    }
}

#[inline]
fn round(p: Point2) -> Point2 {
    Point2::new(p.x.round(), p.y.round())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_extends_every_side() {
        let b = PixelBounds::padded(Point2::new(800.0, 600.0), 0.1);
        assert_eq!(b.min, Point2::new(-80.0, -60.0));
        assert_eq!(b.max, Point2::new(880.0, 660.0));
        assert_eq!(b.pixel_size(), Some((960, 720)));
    }

    #[test]
    fn zero_padding_matches_view() {
        let b = PixelBounds::padded(Point2::new(640.0, 480.0), 0.0);
        assert_eq!(b, PixelBounds::new(Point2::zero(), Point2::new(640.0, 480.0)));
    }

    #[test]
    fn center_of_padded_bounds_is_view_center() {
        let b = PixelBounds::padded(Point2::new(800.0, 600.0), 0.25);
        assert_eq!(b.center(), Point2::new(400.0, 300.0));
    }

    #[test]
    fn zero_area_is_empty() {
        let b = PixelBounds::padded(Point2::new(0.0, 600.0), 0.1);
        assert!(b.is_empty());
        assert_eq!(b.pixel_size(), None);
    }
}
