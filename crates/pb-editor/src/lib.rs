pub mod assets;
pub mod canvas;
pub mod commands;
pub mod error;
pub mod import;
pub mod session;
pub mod template;

pub use assets::{Asset, AssetKind, AssetStore, UploadFile};
pub use canvas::{Canvas, CanvasMutation, NodeFlags};
pub use commands::CommandStack;
pub use error::{AssetError, ImportError, SessionError, TemplateError};
pub use session::{AutoSaveConfig, LoadOutcome, PageSession, SessionConfig, SessionEvent};
pub use template::{
    InMemoryCatalog, MemoryStore, SessionStore, TemplateCatalog, TemplateHooks, TemplateLoader,
    TemplateOutcome, TemplatePayload,
};
