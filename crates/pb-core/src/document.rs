//! Document JSON codec: `Document` ↔ persisted page data.
//!
//! The persisted shape is a flat map of node id → record, always with a
//! `ROOT` entry whose `parent` is null. Serialization walks the arena from
//! ROOT so the output is deterministic; parsing rebuilds the arena from
//! ROOT's `nodes` closure.
//!
//! Parsing rejects a whole document (nothing is built) when the top level
//! is wrong: not JSON, not an object, an array, no ROOT. Inside a valid
//! envelope it is tolerant: dangling child ids, orphan records, cycles and
//! unknown block types are skipped or kept as placeholders and listed in a
//! `DeserializeReport` instead of failing the load.

use crate::error::{DocumentError, json_kind};
use crate::id::{NodeId, ROOT_ID};
use crate::model::{BlockType, Document, Node, Props, Slot};
use crate::registry;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

// ─── Wire records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TypeRef {
    Resolved {
        #[serde(rename = "resolvedName")]
        resolved_name: String,
    },
    /// Older documents store the type as a bare string.
    Plain(String),
}

impl TypeRef {
    fn name(&self) -> &str {
        match self {
            TypeRef::Resolved { resolved_name } => resolved_name,
            TypeRef::Plain(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    #[serde(rename = "type")]
    type_ref: TypeRef,
    #[serde(default)]
    is_canvas: bool,
    #[serde(default)]
    props: Props,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    custom: Props,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    nodes: Vec<NodeId>,
    #[serde(default)]
    linked_nodes: BTreeMap<String, NodeId>,
    #[serde(default)]
    parent: Option<NodeId>,
}

// ─── Report ──────────────────────────────────────────────────────────────

/// Everything the parser tolerated while building a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeserializeReport {
    /// `(parent, missing child)` references that had no record.
    pub dangling: Vec<(NodeId, NodeId)>,
    /// Records not reachable from ROOT; dropped.
    pub orphans: Vec<NodeId>,
    /// Records referenced a second time (cycle or shared child); the second
    /// reference was ignored.
    pub repeated: Vec<NodeId>,
    /// Records whose body could not be read; skipped like dangling ids.
    pub malformed: Vec<NodeId>,
    /// Nodes whose `parent` field disagreed with the list that holds them.
    pub reparented: Vec<NodeId>,
    /// Nodes whose type is outside the palette (kept as placeholders).
    pub unresolved: Vec<(NodeId, String)>,
    /// Nodes whose type used a legacy alias.
    pub legacy_aliases: Vec<NodeId>,
}

impl DeserializeReport {
    /// True when nothing structural had to be skipped or repaired.
    /// Unresolved types and legacy aliases do not count.
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
            && self.orphans.is_empty()
            && self.repeated.is_empty()
            && self.malformed.is_empty()
            && self.reparented.is_empty()
    }
}

// ─── Serialize ───────────────────────────────────────────────────────────

/// Serialize a document to its canonical JSON text.
#[must_use]
pub fn serialize_document(doc: &Document) -> String {
    Value::Object(document_to_map(doc)).to_string()
}

/// Serialize with indentation (for files meant to be read by people).
#[must_use]
pub fn serialize_document_pretty(doc: &Document) -> String {
    serde_json::to_string_pretty(&Value::Object(document_to_map(doc)))
        .unwrap_or_else(|_| serialize_document(doc))
}

/// The document as a JSON object, records in pre-order from ROOT.
#[must_use]
pub fn document_to_map(doc: &Document) -> Map<String, Value> {
    let mut out = Map::new();
    for node in doc.iter() {
        let record = NodeRecord {
            type_ref: TypeRef::Resolved {
                resolved_name: node.block.name().to_string(),
            },
            is_canvas: node.is_canvas,
            props: node.props.clone(),
            display_name: node.display_name.clone(),
            custom: node.custom.clone(),
            hidden: node.hidden,
            nodes: doc.children(node.id).to_vec(),
            linked_nodes: doc.linked_nodes(node.id).into_iter().collect(),
            parent: doc.parent(node.id),
        };
        // NodeRecord only holds JSON-native data; conversion cannot fail.
        if let Ok(value) = serde_json::to_value(record) {
            out.insert(node.id.as_str().to_string(), value);
        }
    }
    out
}

// ─── Parse ───────────────────────────────────────────────────────────────

/// Parse persisted page data into a document.
///
/// Empty text and the empty object `{}` both mean "a bare ROOT".
pub fn parse_document(text: &str) -> Result<Document, DocumentError> {
    parse_document_with_report(text).map(|(doc, _)| doc)
}

/// Like [`parse_document`], also returning what was tolerated.
pub fn parse_document_with_report(
    text: &str,
) -> Result<(Document, DeserializeReport), DocumentError> {
    if text.trim().is_empty() {
        return Ok((Document::new(), DeserializeReport::default()));
    }
    let value: Value = serde_json::from_str(text)?;
    document_from_value(&value)
}

/// Build a document from an already-parsed JSON value.
pub fn document_from_value(
    value: &Value,
) -> Result<(Document, DeserializeReport), DocumentError> {
    let map = match value {
        Value::Object(map) => map,
        Value::Array(_) => return Err(DocumentError::PageCollection),
        other => {
            return Err(DocumentError::NotAnObject {
                found: json_kind(other),
            });
        }
    };
    if map.is_empty() {
        return Ok((Document::new(), DeserializeReport::default()));
    }

    let root_value = map.get(ROOT_ID).ok_or(DocumentError::MissingRoot)?;
    let root_record = read_record(ROOT_ID, root_value)?;
    if let Some(parent) = root_record.parent {
        return Err(DocumentError::RootHasParent(parent.as_str().to_string()));
    }

    let mut report = DeserializeReport::default();
    let mut doc = Document::with_root(record_to_node(NodeId::root(), &root_record, &mut report));
    let mut visited: HashSet<NodeId> = HashSet::from([NodeId::root()]);

    // (parent index, parent id, child id, slot) awaiting attachment.
    let mut pending: Vec<(NodeIndex, NodeId, NodeId, Slot)> = Vec::new();
    queue_children(&mut pending, doc.root_index(), NodeId::root(), &root_record);

    while let Some((parent_idx, parent_id, child_id, slot)) = pending.pop() {
        if !visited.insert(child_id) {
            log::warn!("node `{child_id}` referenced more than once; ignoring reference from `{parent_id}`");
            report.repeated.push(child_id);
            continue;
        }
        let Some(raw) = map.get(child_id.as_str()) else {
            log::warn!("`{parent_id}` lists missing child `{child_id}`; skipping");
            report.dangling.push((parent_id, child_id));
            continue;
        };
        let record = match read_record(child_id.as_str(), raw) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("skipping unreadable node: {err}");
                report.malformed.push(child_id);
                continue;
            }
        };
        if record.parent != Some(parent_id) {
            log::debug!(
                "node `{child_id}` claims parent {:?}, held by `{parent_id}`",
                record.parent.map(|p| p.as_str().to_string())
            );
            report.reparented.push(child_id);
        }
        let node = record_to_node(child_id, &record, &mut report);
        let idx = doc.attach_unchecked(parent_idx, node, slot);
        queue_children(&mut pending, idx, child_id, &record);
    }

    for key in map.keys() {
        let id = NodeId::intern(key);
        if !visited.contains(&id) {
            log::warn!("dropping orphan node `{key}` (not reachable from ROOT)");
            report.orphans.push(id);
        }
    }

    Ok((doc, report))
}

fn read_record(id: &str, value: &Value) -> Result<NodeRecord, DocumentError> {
    if !value.is_object() {
        return Err(DocumentError::MalformedRecord {
            id: id.to_string(),
            reason: format!("expected an object, found {}", json_kind(value)),
        });
    }
    NodeRecord::deserialize(value).map_err(|e| DocumentError::MalformedRecord {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

/// Queue a record's children so they pop in render order, linked slots last.
fn queue_children(
    pending: &mut Vec<(NodeIndex, NodeId, NodeId, Slot)>,
    parent_idx: NodeIndex,
    parent_id: NodeId,
    record: &NodeRecord,
) {
    for (name, child) in record.linked_nodes.iter().rev() {
        pending.push((parent_idx, parent_id, *child, Slot::Linked(name.clone())));
    }
    for (pos, child) in record.nodes.iter().enumerate().rev() {
        pending.push((parent_idx, parent_id, *child, Slot::Child(pos as u32)));
    }
}

fn record_to_node(id: NodeId, record: &NodeRecord, report: &mut DeserializeReport) -> Node {
    let type_name = record.type_ref.name();
    let block = BlockType::resolve(type_name);
    match &block {
        BlockType::Unresolved(name) => {
            log::warn!("node `{id}` has unknown block type `{name}`; rendering placeholder");
            report.unresolved.push((id, name.clone()));
        }
        BlockType::Known(_) if registry::is_legacy_alias(type_name) => {
            report.legacy_aliases.push(id);
        }
        BlockType::Known(_) => {}
    }
    let display_name = if record.display_name.is_empty() {
        match block.kind() {
            Some(kind) => kind.spec().display_name.to_string(),
            None => type_name.to_string(),
        }
    } else {
        record.display_name.clone()
    };
    Node {
        id,
        block,
        props: record.props.clone(),
        is_canvas: record.is_canvas,
        display_name,
        custom: record.custom.clone(),
        hidden: record.hidden,
    }
}
