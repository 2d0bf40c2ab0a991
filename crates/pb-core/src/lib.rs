pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod page;
pub mod registry;
pub mod validate;
pub mod viewport;

pub use document::{DeserializeReport, parse_document, parse_document_with_report, serialize_document};
pub use error::DocumentError;
pub use id::NodeId;
pub use model::{BlockType, Document, Node, Props, Slot};
pub use page::{EMPTY_PAGE_DATA, Page, PageRecord};
pub use registry::{BlockKind, BlockSpec};
pub use validate::{Diagnostic, Severity, validate_document};
pub use viewport::{DeviceMode, Viewport, ZoomConfig, ZoomState};
