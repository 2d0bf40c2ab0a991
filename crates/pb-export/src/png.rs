//! PNG export of one rendered page, plus page thumbnails.

use crate::artifact::{Artifact, ExportFormat};
use crate::error::{ExportError, logged};
use crate::surface::RenderedSurface;
use image::imageops;
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PngOptions {
    /// Device pixels per CSS pixel.
    pub scale: f32,
    /// Flattened under transparent pixels when set.
    pub background: Option<[u8; 4]>,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: None,
        }
    }
}

/// Rasterize `surface` to `<stem>.png`. Fails with `TargetMissing` when no
/// surface is given.
pub fn export_png(
    surface: Option<&dyn RenderedSurface>,
    options: &PngOptions,
    stem: &str,
) -> Result<Artifact, ExportError> {
    logged(render(surface, options).map(|bytes| Artifact::new(stem, ExportFormat::Png, bytes)))
}

fn render(surface: Option<&dyn RenderedSurface>, options: &PngOptions) -> Result<Vec<u8>, ExportError> {
    let surface = surface.ok_or(ExportError::TargetMissing(ExportFormat::Png))?;
    let mut pixels = surface.rasterize(options.scale)?;
    if let Some(background) = options.background {
        pixels = flatten(&pixels, background);
    }
    let bytes = encode_png(&pixels)?;
    log::debug!(
        "PNG export: {}x{} px, {} bytes",
        pixels.width(),
        pixels.height(),
        bytes.len()
    );
    Ok(bytes)
}

/// A PNG data URL at most `max_width` pixels wide, for the page list.
pub fn render_thumbnail(surface: &dyn RenderedSurface, max_width: u32) -> Result<String, ExportError> {
    let (width, _) = surface.size();
    let scale = if width > max_width && width > 0 {
        max_width as f32 / width as f32
    } else {
        1.0
    };
    let pixels = surface.rasterize(scale)?;
    let bytes = encode_png(&pixels)?;
    Ok(Artifact::new("thumbnail", ExportFormat::Png, bytes).to_data_url())
}

pub(crate) fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Cursor::new(Vec::new());
    pixels.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Composite `pixels` over a solid `background`.
pub(crate) fn flatten(pixels: &RgbaImage, background: [u8; 4]) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(pixels.width(), pixels.height(), Rgba(background));
    imageops::overlay(&mut out, pixels, 0, 0);
    out
}
