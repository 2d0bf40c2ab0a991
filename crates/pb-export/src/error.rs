use crate::artifact::ExportFormat;
use thiserror::Error;

/// An export did not produce a file. Nothing partial is ever returned
/// alongside one of these.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No rendered surface was supplied for a raster export.
    #[error("{0} export needs a rendered page, but none was supplied")]
    TargetMissing(ExportFormat),

    #[error("{format} export failed: {reason}")]
    Failed { format: ExportFormat, reason: String },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    pub(crate) fn failed(format: ExportFormat, reason: impl Into<String>) -> Self {
        ExportError::Failed {
            format,
            reason: reason.into(),
        }
    }
}

/// Log an export failure before handing it back to the caller.
pub(crate) fn logged<T>(result: Result<T, ExportError>) -> Result<T, ExportError> {
    if let Err(err) = &result {
        log::error!("{err}");
    }
    result
}
