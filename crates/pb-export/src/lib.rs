//! Exporters for page builder sessions.
//!
//! JSON and HTML work from page records alone. PNG and PDF rasterize a
//! [`RenderedSurface`] the host supplies; this crate never lays out or
//! paints a document itself. Every exporter either returns a complete
//! [`Artifact`] or an [`ExportError`], never a partial file.

pub mod artifact;
pub mod error;
pub mod html;
pub mod json;
pub mod pdf;
pub mod png;
pub mod surface;

pub use artifact::{Artifact, ExportFormat};
pub use error::ExportError;
pub use html::{HtmlOptions, export_html};
pub use json::{EXPORT_FORMAT_VERSION, ExportEnvelope, JsonExportOptions, export_json};
pub use pdf::{Orientation, PageSize, PdfOptions, export_pdf};
pub use png::{PngOptions, export_png, render_thumbnail};
pub use surface::{RasterSurface, RenderedSurface};
