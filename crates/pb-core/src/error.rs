use crate::id::NodeId;
use thiserror::Error;

/// A document was rejected, or an arena mutation was refused.
///
/// Every variant except the arena ones is the `DocumentInvalid` condition:
/// the input was rejected before anything was mutated.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("document must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("document is a page collection (array), not a single page")]
    PageCollection,

    #[error("document has no `ROOT` node")]
    MissingRoot,

    #[error("`ROOT` must have a null parent, found `{0}`")]
    RootHasParent(String),

    #[error("node `{id}` is malformed: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("node `{0}` not found")]
    NodeNotFound(NodeId),

    #[error("node `{0}` already exists")]
    DuplicateId(NodeId),

    #[error("node `{0}` cannot contain children")]
    NotACanvas(NodeId),

    #[error("moving `{node}` under `{target}` would create a cycle")]
    WouldCreateCycle { node: NodeId, target: NodeId },

    #[error("the ROOT node cannot be removed, moved or re-identified")]
    RootImmutable,
}

impl DocumentError {
    /// Whether this is an input-rejection (`DocumentInvalid`) rather than a
    /// refused arena mutation.
    pub fn is_invalid_document(&self) -> bool {
        matches!(
            self,
            DocumentError::Syntax(_)
                | DocumentError::NotAnObject { .. }
                | DocumentError::PageCollection
                | DocumentError::MissingRoot
                | DocumentError::RootHasParent(_)
                | DocumentError::MalformedRecord { .. }
        )
    }
}

/// Human-readable JSON type name for error messages.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
