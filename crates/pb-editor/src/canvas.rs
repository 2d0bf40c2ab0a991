//! The live canvas: the single mutable working copy of the current page.
//!
//! The canvas owns one `Document` plus the per-node presentation flags the
//! layers panel toggles (`hidden`, `locked`). Those flags belong to the
//! editing session, not to the page, so they never reach `serialize()`.
//!
//! Every data-affecting change bumps `revision`; the session compares it
//! against the revision it last saved to decide whether auto-save has
//! anything to write.

use pb_core::document::{document_from_value, parse_document_with_report, serialize_document};
use pb_core::{BlockKind, DeserializeReport, Document, DocumentError, Node, NodeId, Props};
use serde_json::Value;
use std::collections::HashMap;

/// Session-only flags for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub hidden: bool,
    pub locked: bool,
}

impl NodeFlags {
    fn is_default(&self) -> bool {
        !self.hidden && !self.locked
    }
}

/// A change to the live canvas from an editor interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasMutation {
    /// Insert `node` under `parent`; `index: None` appends.
    AddNode {
        parent: NodeId,
        index: Option<usize>,
        node: Box<Node>,
    },
    /// Delete a node and its subtree.
    RemoveNode { id: NodeId },
    MoveNode {
        id: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// Set one prop by dotted path (`style.color`).
    SetProp { id: NodeId, path: String, value: Value },
    /// Replace the whole prop bag.
    SetProps { id: NodeId, props: Props },
    /// Set the layer label (`custom.displayName`). Empty clears it.
    SetDisplayName { id: NodeId, name: String },
    SetHidden { id: NodeId, hidden: bool },
    SetLocked { id: NodeId, locked: bool },
}

impl CanvasMutation {
    /// Whether this mutation changes the persisted document (as opposed to
    /// session-only presentation flags).
    pub fn affects_document(&self) -> bool {
        !matches!(
            self,
            CanvasMutation::SetHidden { .. } | CanvasMutation::SetLocked { .. }
        )
    }
}

/// The live canvas for the current page.
#[derive(Debug, Clone)]
pub struct Canvas {
    document: Document,
    flags: HashMap<NodeId, NodeFlags>,
    revision: u64,
    last_report: DeserializeReport,
}

impl Canvas {
    /// A canvas showing a bare ROOT.
    pub fn new() -> Self {
        Self {
            document: Document::new(),
            flags: HashMap::new(),
            revision: 0,
            last_report: DeserializeReport::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Monotonic change counter. Bumped by every document mutation and
    /// every load.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// What the most recent `deserialize` had to tolerate.
    pub fn last_report(&self) -> &DeserializeReport {
        &self.last_report
    }

    // ─── Serialize / deserialize ─────────────────────────────────────────

    /// Canonical JSON text for whatever is mounted.
    pub fn serialize(&self) -> String {
        serialize_document(&self.document)
    }

    /// Replace the canvas content with `text`.
    ///
    /// The text is parsed completely before anything is touched: on error
    /// the canvas (document, flags, revision) is left exactly as it was.
    /// On success nothing from the previous document survives.
    pub fn deserialize(&mut self, text: &str) -> Result<&DeserializeReport, DocumentError> {
        let (document, report) = parse_document_with_report(text)?;
        self.mount(document, report, false);
        Ok(&self.last_report)
    }

    /// Like [`Canvas::deserialize`] for an already-parsed JSON value.
    pub fn deserialize_value(&mut self, value: &Value) -> Result<&DeserializeReport, DocumentError> {
        let (document, report) = document_from_value(value)?;
        self.mount(document, report, false);
        Ok(&self.last_report)
    }

    /// Load `text` keeping presentation flags for nodes that still exist.
    /// Used by undo/redo, which swaps snapshots of the same page.
    pub(crate) fn restore(&mut self, text: &str) -> Result<(), DocumentError> {
        let (document, report) = parse_document_with_report(text)?;
        self.mount(document, report, true);
        Ok(())
    }

    /// Show a bare ROOT. This is the one place a document is synthesized
    /// rather than loaded.
    pub fn reset_to_blank(&mut self) {
        self.mount(Document::new(), DeserializeReport::default(), false);
    }

    /// Remove everything under ROOT, keeping ROOT's own props.
    pub fn clear(&mut self) {
        self.document.clear();
        self.flags.retain(|id, _| id.is_root());
        self.revision += 1;
    }

    fn mount(&mut self, document: Document, report: DeserializeReport, keep_flags: bool) {
        self.document = document;
        if keep_flags {
            let doc = &self.document;
            self.flags.retain(|id, _| doc.contains(*id));
        } else {
            self.flags.clear();
        }
        self.last_report = report;
        self.revision += 1;
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply one editor mutation. A failed mutation changes nothing.
    pub fn apply_mutation(&mut self, mutation: CanvasMutation) -> Result<(), DocumentError> {
        let affects_document = mutation.affects_document();
        match mutation {
            CanvasMutation::AddNode { parent, index, node } => {
                self.document
                    .insert_node(parent, index.unwrap_or(usize::MAX), *node)?;
            }
            CanvasMutation::RemoveNode { id } => {
                let removed = self.document.remove_subtree(id)?;
                for node in removed {
                    self.flags.remove(&node.id);
                }
            }
            CanvasMutation::MoveNode { id, parent, index } => {
                self.document.move_node(id, parent, index)?;
            }
            CanvasMutation::SetProp { id, path, value } => {
                let next = self.node(id)?.with_prop(&path, value);
                self.document.replace_node(next)?;
            }
            CanvasMutation::SetProps { id, props } => {
                let next = self.node(id)?.clone().with_props(props);
                self.document.replace_node(next)?;
            }
            CanvasMutation::SetDisplayName { id, name } => {
                let mut next = self.node(id)?.clone();
                if name.is_empty() {
                    next.custom.remove("displayName");
                } else {
                    next.custom.insert("displayName".into(), Value::String(name));
                }
                self.document.replace_node(next)?;
            }
            CanvasMutation::SetHidden { id, hidden } => {
                self.node(id)?;
                self.update_flags(id, |f| f.hidden = hidden);
            }
            CanvasMutation::SetLocked { id, locked } => {
                self.node(id)?;
                self.update_flags(id, |f| f.locked = locked);
            }
        }
        if affects_document {
            self.revision += 1;
        }
        Ok(())
    }

    /// Drop a new palette block into `parent`. Returns the generated id.
    pub fn add_block(
        &mut self,
        parent: NodeId,
        kind: BlockKind,
        index: Option<usize>,
    ) -> Result<NodeId, DocumentError> {
        let id = self.document.fresh_id(kind);
        self.apply_mutation(CanvasMutation::AddNode {
            parent,
            index,
            node: Box::new(Node::new(id, kind)),
        })?;
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Result<&Node, DocumentError> {
        self.document.get(id).ok_or(DocumentError::NodeNotFound(id))
    }

    fn update_flags(&mut self, id: NodeId, f: impl FnOnce(&mut NodeFlags)) {
        let flags = self.flags.entry(id).or_default();
        f(flags);
        if flags.is_default() {
            self.flags.remove(&id);
        }
    }

    // ─── Presentation flags ──────────────────────────────────────────────

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.flags.get(&id).copied().unwrap_or_default()
    }

    /// Hidden for this session, either by toggle or by the document's own
    /// `hidden` field.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.flags(id).hidden || self.document.get(id).is_some_and(|n| n.hidden)
    }

    pub fn is_locked(&self, id: NodeId) -> bool {
        self.flags(id).locked
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TWO_NODES: &str = r#"{
        "ROOT": { "type": { "resolvedName": "ContainerBlock" }, "isCanvas": true, "props": {}, "nodes": ["t1"], "parent": null },
        "t1": { "type": { "resolvedName": "TextBlock" }, "isCanvas": false, "props": { "text": "Hi" }, "nodes": [], "parent": "ROOT" }
    }"#;

    #[test]
    fn deserialize_replaces_previous_document() {
        let mut canvas = Canvas::new();
        canvas.add_block(NodeId::root(), BlockKind::Button, None).unwrap();
        canvas.deserialize(TWO_NODES).unwrap();
        assert_eq!(canvas.document().len(), 2);
        assert!(canvas.document().contains(NodeId::intern("t1")));
    }

    #[test]
    fn failed_deserialize_leaves_canvas_untouched() {
        let mut canvas = Canvas::new();
        canvas.deserialize(TWO_NODES).unwrap();
        canvas
            .apply_mutation(CanvasMutation::SetHidden {
                id: NodeId::intern("t1"),
                hidden: true,
            })
            .unwrap();
        let before = canvas.serialize();
        let revision = canvas.revision();

        assert!(canvas.deserialize("[1, 2]").is_err());
        assert!(canvas.deserialize(r#"{"a": {}}"#).is_err());
        assert!(canvas.deserialize("{ nope").is_err());

        assert_eq!(canvas.serialize(), before);
        assert_eq!(canvas.revision(), revision);
        assert!(canvas.is_hidden(NodeId::intern("t1")));
    }

    #[test]
    fn presentation_flags_are_not_serialized() {
        let mut canvas = Canvas::new();
        canvas.deserialize(TWO_NODES).unwrap();
        let before = canvas.serialize();
        let revision = canvas.revision();
        let t1 = NodeId::intern("t1");
        canvas
            .apply_mutation(CanvasMutation::SetHidden { id: t1, hidden: true })
            .unwrap();
        canvas
            .apply_mutation(CanvasMutation::SetLocked { id: t1, locked: true })
            .unwrap();
        assert!(canvas.is_hidden(t1));
        assert!(canvas.is_locked(t1));
        assert_eq!(canvas.serialize(), before);
        assert_eq!(canvas.revision(), revision);
    }

    #[test]
    fn set_prop_is_copy_on_write() {
        let mut canvas = Canvas::new();
        canvas.deserialize(TWO_NODES).unwrap();
        let t1 = NodeId::intern("t1");
        let before = canvas.document().get(t1).unwrap().clone();
        canvas
            .apply_mutation(CanvasMutation::SetProp {
                id: t1,
                path: "style.color".into(),
                value: json!("#ff0000"),
            })
            .unwrap();
        assert_eq!(before.prop("style.color"), None);
        assert_eq!(
            canvas.document().get(t1).unwrap().prop("style.color"),
            Some(&json!("#ff0000"))
        );
    }

    #[test]
    fn remove_drops_flags_of_the_subtree() {
        let mut canvas = Canvas::new();
        let grid = canvas.add_block(NodeId::root(), BlockKind::Grid, None).unwrap();
        let image = canvas.add_block(grid, BlockKind::Image, None).unwrap();
        canvas
            .apply_mutation(CanvasMutation::SetLocked { id: image, locked: true })
            .unwrap();
        canvas
            .apply_mutation(CanvasMutation::RemoveNode { id: grid })
            .unwrap();
        assert!(!canvas.document().contains(image));
        assert_eq!(canvas.flags(image), NodeFlags::default());
    }

    #[test]
    fn display_name_goes_to_custom() {
        let mut canvas = Canvas::new();
        let hero = canvas.add_block(NodeId::root(), BlockKind::Container, None).unwrap();
        canvas
            .apply_mutation(CanvasMutation::SetDisplayName {
                id: hero,
                name: "Hero".into(),
            })
            .unwrap();
        assert_eq!(canvas.document().get(hero).unwrap().label(), "Hero");
        canvas
            .apply_mutation(CanvasMutation::SetDisplayName {
                id: hero,
                name: String::new(),
            })
            .unwrap();
        assert_eq!(canvas.document().get(hero).unwrap().label(), "Container");
    }

    #[test]
    fn failed_mutation_does_not_bump_revision() {
        let mut canvas = Canvas::new();
        let text = canvas.add_block(NodeId::root(), BlockKind::Text, None).unwrap();
        let revision = canvas.revision();
        let err = canvas.add_block(text, BlockKind::Button, None).unwrap_err();
        assert!(matches!(err, DocumentError::NotACanvas(_)));
        assert_eq!(canvas.revision(), revision);
        assert!(canvas
            .apply_mutation(CanvasMutation::RemoveNode { id: NodeId::root() })
            .is_err());
    }

    #[test]
    fn clear_keeps_root() {
        let mut canvas = Canvas::new();
        canvas.deserialize(TWO_NODES).unwrap();
        canvas.clear();
        assert!(canvas.document().is_empty());
        assert!(canvas.document().root().id.is_root());
    }
}
