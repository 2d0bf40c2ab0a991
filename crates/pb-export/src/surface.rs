//! The rendered-surface contract consumed by the raster encoders.
//!
//! The host renders a page however it likes (a browser DOM snapshot, an
//! off-screen canvas) and hands the exporter something that can produce
//! pixels. Rasterizing never changes the surface.

use crate::artifact::ExportFormat;
use crate::error::ExportError;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

pub trait RenderedSurface {
    /// Layout size in CSS pixels.
    fn size(&self) -> (u32, u32);

    /// Pixels at `scale` device pixels per CSS pixel.
    fn rasterize(&self, scale: f32) -> Result<RgbaImage, ExportError>;
}

/// A surface the host has already rendered to RGBA pixels at 1×.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl RasterSurface {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// From a tightly packed RGBA8 buffer (`width * height * 4` bytes).
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, ExportError> {
        let expected = width as usize * height as usize * 4;
        let actual = rgba.len();
        RgbaImage::from_raw(width, height, rgba)
            .map(Self::new)
            .ok_or_else(|| {
                ExportError::failed(
                    ExportFormat::Png,
                    format!("pixel buffer has {actual} bytes, expected {expected} for {width}x{height}"),
                )
            })
    }

    /// Decode an encoded image (PNG, JPEG, ...).
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, ExportError> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgba8()))
    }

    /// A flat colour page, for hosts that only need a placeholder.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl RenderedSurface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn rasterize(&self, scale: f32) -> Result<RgbaImage, ExportError> {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return Err(ExportError::failed(ExportFormat::Png, "the rendered page is empty"));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ExportError::failed(
                ExportFormat::Png,
                format!("invalid scale {scale}"),
            ));
        }
        if (scale - 1.0).abs() < f32::EPSILON {
            return Ok(self.pixels.clone());
        }
        let target_w = ((width as f32 * scale).round() as u32).max(1);
        let target_h = ((height as f32 * scale).round() as u32).max(1);
        Ok(imageops::resize(&self.pixels, target_w, target_h, FilterType::Triangle))
    }
}
