use std::path::{Path, PathBuf};

use thiserror::Error;

use super::GraphicsError;

/// Failure to produce a raster from an image source.
///
/// Never fatal to the layer: the render loop reports it and keeps drawing
/// the placeholder.
#[derive(Debug, Error)]
pub enum ResourceLoadError {
    #[error("failed to read `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image")]
    Decode(#[from] image::ImageError),

    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA8")]
    Size { width: u32, height: u32, len: usize },

    #[error("failed to bind raster")]
    Upload(#[source] GraphicsError),
}

/// Decoded RGBA8 pixels, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ResourceLoadError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(ResourceLoadError::Size {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// 1×1 fully transparent placeholder bound until the real image arrives.
    pub fn transparent() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Reads and decodes an image file (format sniffed from content).
pub fn load_raster(path: impl AsRef<Path>) -> Result<RasterImage, ResourceLoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ResourceLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raster = decode_raster(&bytes)?;
    log::debug!(
        "loaded raster {} ({}x{})",
        path.display(),
        raster.width,
        raster.height
    );
    Ok(raster)
}

pub fn decode_raster(bytes: &[u8]) -> Result<RasterImage, ResourceLoadError> {
    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = rgba.dimensions();
    RasterImage::from_rgba8(width, height, rgba.into_raw())
}
