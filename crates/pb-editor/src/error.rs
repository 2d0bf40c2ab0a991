use pb_core::DocumentError;
use thiserror::Error;

/// A page-session operation was refused or only partly succeeded.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Deleting the only remaining page. Expected and recoverable.
    #[error("cannot delete the last remaining page")]
    PageDeleteRejected,

    #[error("page `{0}` not found")]
    PageNotFound(String),

    #[error("page index {index} out of range (session has {len} pages)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The switch to `page_id` was committed, but its data could not be
    /// loaded; the canvas shows a blank root instead.
    #[error("page `{page_id}` could not be loaded: {source}")]
    Document {
        page_id: String,
        #[source]
        source: DocumentError,
    },
}

/// The `TemplateInvalid` condition: the payload could not be applied and
/// the session was left untouched.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("template must be a page object or an array of pages, found {0}")]
    UnsupportedShape(&'static str),

    #[error("template page {index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("template page could not be loaded: {0}")]
    Document(#[from] DocumentError),

    #[error("template `{0}` not found")]
    NotFound(String),
}

/// The `ImportInvalid` condition. The whole file is rejected; nothing
/// from it is applied.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The file could not be read at all.
    #[error("could not read file: {0}")]
    Unreadable(#[from] std::io::Error),

    /// The file was read but is not JSON.
    #[error("file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The file is JSON but not the expected shape.
    #[error("invalid import file: {0}")]
    Invalid(String),
}

impl ImportError {
    /// I/O-level failure (as opposed to a readable file with bad content).
    pub fn is_io(&self) -> bool {
        matches!(self, ImportError::Unreadable(_))
    }

    /// Hint for the user, which differs between the two failure levels.
    pub fn guidance(&self) -> &'static str {
        match self {
            ImportError::Unreadable(_) => "The file could not be opened. Check that it still exists and try again.",
            ImportError::Malformed(_) | ImportError::Invalid(_) => {
                "The file was opened but is not a page export. Choose a JSON file exported from the page builder."
            }
        }
    }
}

/// An uploaded asset was rejected.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset `{0}` is empty")]
    Empty(String),

    #[error("asset `{name}` is {size} bytes; the limit is {limit}")]
    TooLarge { name: String, size: usize, limit: usize },

    #[error("asset `{0}` not found")]
    NotFound(String),
}
