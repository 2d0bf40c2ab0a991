//! # PDF export
//!
//! One rasterized page per PDF page, scaled to fit the paper size with the
//! aspect ratio kept and the image centred.
//!
//! The file is written by hand; the subset needed here is small:
//!
//! ```text
//! %PDF-1.7
//! 1 0 obj  Catalog
//! 2 0 obj  Pages (page tree root)
//! n 0 obj  per page: image XObject, content stream, Page
//! xref     byte offsets of each object
//! trailer
//! %%EOF
//! ```
//!
//! Every page is rasterized and compressed before a single byte of the file
//! is assembled, so a failure on page 3 of 5 yields an error and no output.

use crate::artifact::{Artifact, ExportFormat};
use crate::error::{ExportError, logged};
use crate::png::flatten;
use crate::surface::RenderedSurface;
use miniz_oxide::deflate::compress_to_vec_zlib;
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

// ─── Options ─────────────────────────────────────────────────────────────

/// Paper size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// Portrait dimensions.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Blank border on every side, in points.
    pub margin_pt: f32,
    /// Raster oversampling (device pixels per CSS pixel).
    pub scale: f32,
    pub title: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_pt: 0.0,
            scale: 2.0,
            title: None,
        }
    }
}

impl PdfOptions {
    /// Page width and height after orientation.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (w, h) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }
}

// ─── Placement ───────────────────────────────────────────────────────────

/// Where an image lands on the page, in points from the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit `content` (any unit, only the ratio matters) into `page` minus
/// `margin`, keeping the aspect ratio, centred.
pub fn fit_to_page(content: (f32, f32), page: (f32, f32), margin: f32) -> Placement {
    let (cw, ch) = (content.0.max(1.0), content.1.max(1.0));
    let avail_w = (page.0 - 2.0 * margin).max(1.0);
    let avail_h = (page.1 - 2.0 * margin).max(1.0);
    let ratio = (avail_w / cw).min(avail_h / ch);
    let width = cw * ratio;
    let height = ch * ratio;
    Placement {
        x: (page.0 - width) / 2.0,
        y: (page.1 - height) / 2.0,
        width,
        height,
    }
}

// ─── Export ──────────────────────────────────────────────────────────────

/// Export one PDF page per surface, in the order given, as `<stem>.pdf`.
pub fn export_pdf(
    surfaces: &[&dyn RenderedSurface],
    options: &PdfOptions,
    stem: &str,
) -> Result<Artifact, ExportError> {
    logged(render(surfaces, options).map(|bytes| Artifact::new(stem, ExportFormat::Pdf, bytes)))
}

/// A rasterized, compressed page waiting to be written.
struct PreparedPage {
    width_px: u32,
    height_px: u32,
    compressed: Vec<u8>,
    placement: Placement,
}

fn render(surfaces: &[&dyn RenderedSurface], options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
    if surfaces.is_empty() {
        return Err(ExportError::TargetMissing(ExportFormat::Pdf));
    }
    let page_dims = options.page_dimensions();
    let prepared = surfaces
        .iter()
        .enumerate()
        .map(|(index, surface)| prepare_page(*surface, options, page_dims, index))
        .collect::<Result<Vec<_>, _>>()?;
    let bytes = PdfWriter::new(page_dims).write(&prepared, options.title.as_deref());
    log::debug!("PDF export: {} pages, {} bytes", prepared.len(), bytes.len());
    Ok(bytes)
}

fn prepare_page(
    surface: &dyn RenderedSurface,
    options: &PdfOptions,
    page_dims: (f32, f32),
    index: usize,
) -> Result<PreparedPage, ExportError> {
    let pixels = surface.rasterize(options.scale).map_err(|err| {
        ExportError::failed(ExportFormat::Pdf, format!("page {}: {err}", index + 1))
    })?;
    // PDF images here are DeviceRGB; transparency goes onto white paper.
    let flat = flatten(&pixels, [255, 255, 255, 255]);
    let rgb: Vec<u8> = flat.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect();
    let (css_w, css_h) = surface.size();
    Ok(PreparedPage {
        width_px: flat.width(),
        height_px: flat.height(),
        compressed: compress_to_vec_zlib(&rgb, 6),
        placement: fit_to_page((css_w as f32, css_h as f32), page_dims, options.margin_pt),
    })
}

// ─── Writer ──────────────────────────────────────────────────────────────

struct PdfWriter {
    page_dims: (f32, f32),
    /// Object bodies; index = object number, slot 0 unused.
    objects: Vec<Vec<u8>>,
}

impl PdfWriter {
    fn new(page_dims: (f32, f32)) -> Self {
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        Self {
            page_dims,
            objects: vec![Vec::new(), Vec::new(), Vec::new()],
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(data);
        self.objects.len() - 1
    }

    fn write(mut self, pages: &[PreparedPage], title: Option<&str>) -> Vec<u8> {
        let mut page_obj_ids = Vec::with_capacity(pages.len());

        for page in pages {
            let mut image = Vec::new();
            let _ = write!(
                image,
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
                page.width_px,
                page.height_px,
                page.compressed.len()
            );
            image.extend_from_slice(&page.compressed);
            image.extend_from_slice(b"\nendstream");
            let image_id = self.push(image);

            let p = page.placement;
            let content = format!(
                "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im0 Do Q",
                p.width, p.height, p.x, p.y
            );
            let mut stream = Vec::new();
            let _ = write!(stream, "<< /Length {} >>\nstream\n", content.len());
            stream.extend_from_slice(content.as_bytes());
            stream.extend_from_slice(b"\nendstream");
            let content_id = self.push(stream);

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /XObject << /Im0 {} 0 R >> >> >>",
                self.page_dims.0, self.page_dims.1, content_id, image_id
            );
            page_obj_ids.push(self.push(page_dict.into_bytes()));
        }

        self.objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_obj_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        self.objects[2] = format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(title) = title {
            let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
        }
        info.push_str("/Producer (Page Builder) >>");
        let info_id = self.push(info.into_bytes());

        self.serialize(info_id)
    }

    fn serialize(&self, info_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; self.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, data) in self.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{i} 0 obj\n");
            output.extend_from_slice(data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", self.objects.len());
        output.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.objects.len()
        );
        output
    }
}

/// Escape special characters in a PDF literal string. Non-ASCII is
/// replaced, since literal strings here are PDFDocEncoding.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\\' => "\\\\".to_string(),
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            c if c.is_ascii() && !c.is_ascii_control() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RasterSurface;

    #[test]
    fn fit_keeps_ratio_and_centres() {
        let a4 = PageSize::A4.dimensions();
        // Wide content: limited by width.
        let p = fit_to_page((1440.0, 900.0), a4, 0.0);
        assert!((p.width - 595.28).abs() < 0.01);
        assert!((p.height - 595.28 * 900.0 / 1440.0).abs() < 0.01);
        assert!(p.x.abs() < 0.01);
        assert!((p.y - (841.89 - p.height) / 2.0).abs() < 0.01);
        // Tall content: limited by height, centred horizontally.
        let p = fit_to_page((100.0, 1000.0), a4, 20.0);
        assert!((p.height - (841.89 - 40.0)).abs() < 0.01);
        assert!((p.x - (595.28 - p.width) / 2.0).abs() < 0.01);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let options = PdfOptions {
            orientation: Orientation::Landscape,
            ..PdfOptions::default()
        };
        assert_eq!(options.page_dimensions(), (841.89, 595.28));
        let letter = PdfOptions {
            page_size: PageSize::Letter,
            ..PdfOptions::default()
        };
        assert_eq!(letter.page_dimensions(), (612.0, 792.0));
    }

    #[test]
    fn writes_a_well_formed_file() {
        let surface = RasterSurface::solid(8, 8, [200, 0, 0, 255]);
        let options = PdfOptions {
            title: Some("Q1 (draft)".into()),
            scale: 1.0,
            ..PdfOptions::default()
        };
        let surfaces: [&dyn RenderedSurface; 1] = [&surface];
        let artifact = export_pdf(&surfaces, &options, "report").unwrap();
        let bytes = &artifact.bytes;
        assert_eq!(artifact.filename, "report.pdf");
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(bytes);
        assert!(text.contains("/Title (Q1 \\(draft\\))"));
        assert!(text.contains("/Filter /FlateDecode"));
        assert!(text.contains("/Width 8 /Height 8"));
    }

    #[test]
    fn empty_input_is_target_missing() {
        let err = export_pdf(&[], &PdfOptions::default(), "x").unwrap_err();
        assert!(matches!(err, ExportError::TargetMissing(ExportFormat::Pdf)));
    }

    #[test]
    fn escape() {
        assert_eq!(escape_pdf_string("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape_pdf_string("café"), "caf?");
    }
}
