//! The demo raster: a whole-world equirectangular image shown on a Web
//! Mercator map.

use meshwarp_engine::render::RasterImage;
use meshwarp_mesh::{MeshError, Point, SourceUv};

const EARTH_RADIUS: f64 = 6_378_137.0;

/// Web Mercator cannot show the poles; the raster is cropped here.
pub const MAX_LATITUDE: f64 = 85.0;

/// Corners in lon/lat degrees: top-left, bottom-left, top-right, bottom-right.
pub const CONTROL_POINTS: [Point; 4] = [
    [-180.0, MAX_LATITUDE],
    [-180.0, -MAX_LATITUDE],
    [180.0, MAX_LATITUDE],
    [180.0, -MAX_LATITUDE],
];

/// Spherical Web Mercator (EPSG:4326 degrees → EPSG:3857 meters).
pub fn lon_lat_to_mercator(p: Point) -> Point {
    let lon = p[0].to_radians();
    let lat = p[1].to_radians();
    [
        EARTH_RADIUS * lon,
        EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    ]
}

/// Texture coordinates that drop the rows beyond ±[`MAX_LATITUDE`] of a
/// full -90..90 image.
pub fn cropped_uv() -> Result<SourceUv, MeshError> {
    let v0 = (90.0 - MAX_LATITUDE) / 180.0;
    let v1 = 1.0 - v0;
    SourceUv::new([[0.0, v0], [0.0, v1], [1.0, v0], [1.0, v1]])
}

/// Stand-in raster when no image path is given: 10° cells.
pub fn checkerboard(width: u32, height: u32) -> RasterImage {
    let cell_w = (width / 36).max(1);
    let cell_h = (height / 18).max(1);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let light = ((x / cell_w) + (y / cell_h)) % 2 == 0;
            let rgba = if light { [236, 222, 186, 255] } else { [64, 118, 160, 255] };
            pixels.extend_from_slice(&rgba);
        }
    }
    match RasterImage::from_rgba8(width, height, pixels) {
        Ok(raster) => raster,
        // Only reachable for a zero dimension.
        Err(_) => RasterImage::transparent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_origin() {
        let p = lon_lat_to_mercator([0.0, 0.0]);
        assert!(p[0].abs() < 1e-9 && p[1].abs() < 1e-9);
    }

    #[test]
    fn antimeridian_is_the_world_edge() {
        let p = lon_lat_to_mercator([180.0, 0.0]);
        assert!((p[0] - 20_037_508.342_789_244).abs() < 1e-6);
    }

    #[test]
    fn control_points_project_finitely() {
        for c in CONTROL_POINTS {
            let p = lon_lat_to_mercator(c);
            assert!(p[0].is_finite() && p[1].is_finite(), "{c:?}");
        }
    }

    #[test]
    fn crop_is_symmetric() {
        let uv = cropped_uv().unwrap();
        let [a, b, _, _] = *uv.coords();
        assert!((a[1] + b[1] - 1.0).abs() < 1e-12);
        assert!(a[1] > 0.0 && a[1] < 0.05);
    }

    #[test]
    fn checkerboard_alternates() {
        let board = checkerboard(360, 180);
        assert_eq!(board.pixels().len(), 360 * 180 * 4);
        let px = |x: usize, y: usize| &board.pixels()[(y * 360 + x) * 4..(y * 360 + x) * 4 + 4];
        assert_ne!(px(0, 0), px(10, 0));
        assert_eq!(px(0, 0), px(10, 10));
    }
}
