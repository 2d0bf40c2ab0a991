//! Core page-document data model.
//!
//! A page is a tree of block nodes rooted at the reserved `ROOT` container.
//! The tree lives in a single arena (`StableDiGraph`): edges go from
//! parent → child and carry the child's `Slot`, so parent linkage and
//! sibling order are one structure and cannot drift apart. An id index
//! gives O(1) lookup by `NodeId`.

use crate::error::DocumentError;
use crate::id::NodeId;
use crate::registry::{self, BlockKind};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::{EdgeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Open property bag. Only the concrete block interprets it.
pub type Props = serde_json::Map<String, Value>;

// ─── Block type reference ────────────────────────────────────────────────

/// What a node renders as.
///
/// Names outside the palette are kept verbatim so the document round-trips;
/// renderers draw a placeholder for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    Known(BlockKind),
    Unresolved(String),
}

impl BlockType {
    /// Resolve a `resolvedName` (canonical or legacy alias).
    pub fn resolve(name: &str) -> Self {
        match registry::resolve(name) {
            Some(spec) => BlockType::Known(spec.kind),
            None => BlockType::Unresolved(name.to_string()),
        }
    }

    pub fn kind(&self) -> Option<BlockKind> {
        match self {
            BlockType::Known(kind) => Some(*kind),
            BlockType::Unresolved(_) => None,
        }
    }

    /// Canonical name for known kinds, the original string otherwise.
    pub fn name(&self) -> &str {
        match self {
            BlockType::Known(kind) => kind.name(),
            BlockType::Unresolved(name) => name,
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// One block in a page's composition tree.
///
/// Structure (parent, children, linked slots) is not stored here; it lives
/// in the `Document` arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub block: BlockType,
    pub props: Props,
    pub is_canvas: bool,
    pub display_name: String,
    /// Editor-level metadata (`custom.displayName` overrides the label).
    pub custom: Props,
    /// The document's own `hidden` field. Session visibility toggles from
    /// the layers panel are tracked by the canvas, not here.
    pub hidden: bool,
}

impl Node {
    /// A node of `kind` with the registry's default props.
    pub fn new(id: NodeId, kind: BlockKind) -> Self {
        let spec = kind.spec();
        Self {
            id,
            block: BlockType::Known(kind),
            props: spec.default_props(),
            is_canvas: spec.is_canvas,
            display_name: spec.display_name.to_string(),
            custom: Props::new(),
            hidden: false,
        }
    }

    /// A bare `ROOT` container.
    pub fn root() -> Self {
        let mut node = Self::new(NodeId::root(), BlockKind::Container);
        node.is_canvas = true;
        node
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Label for layer/outline views: custom name, then display name, then
    /// the type name.
    pub fn label(&self) -> &str {
        if let Some(Value::String(name)) = self.custom.get("displayName")
            && !name.is_empty()
        {
            return name;
        }
        if !self.display_name.is_empty() {
            return &self.display_name;
        }
        self.block.name()
    }

    /// Read a prop by dotted path (`style.color`).
    pub fn prop(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.props.get(segments.next()?)?;
        for seg in segments {
            current = current.as_object()?.get(seg)?;
        }
        Some(current)
    }

    /// Copy-on-write prop update: returns a new node with `path` set to
    /// `value`, creating intermediate objects as needed. `self` is untouched.
    #[must_use]
    pub fn with_prop(&self, path: &str, value: Value) -> Node {
        let mut next = self.clone();
        set_path(&mut next.props, path, value);
        next
    }

    /// Copy-on-write removal of a prop by dotted path.
    #[must_use]
    pub fn without_prop(&self, path: &str) -> Node {
        let mut next = self.clone();
        remove_path(&mut next.props, path);
        next
    }
}

fn set_path(props: &mut Props, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            props.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = props
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Props::new()));
            if !entry.is_object() {
                *entry = Value::Object(Props::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}

fn remove_path(props: &mut Props, path: &str) {
    match path.split_once('.') {
        None => {
            props.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(inner)) = props.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

// ─── Arena ───────────────────────────────────────────────────────────────

/// Position of a node within its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Ordinary child; the number is its render order among siblings.
    Child(u32),
    /// Named slot owned by the parent block (`linkedNodes`).
    Linked(String),
}

/// One page document: the ROOT container and everything beneath it.
#[derive(Debug, Clone)]
pub struct Document {
    graph: StableDiGraph<Node, Slot>,
    root: NodeIndex,
    id_index: HashMap<NodeId, NodeIndex>,
}

impl Document {
    /// A document holding only a bare ROOT container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Node::root())
    }

    /// A document whose ROOT is `root` (its id is forced to `ROOT`).
    pub fn with_root(mut root: Node) -> Self {
        root.id = NodeId::root();
        let mut graph = StableDiGraph::new();
        let idx = graph.add_node(root);
        let mut id_index = HashMap::new();
        id_index.insert(NodeId::root(), idx);
        Self {
            graph,
            root: idx,
            id_index,
        }
    }

    pub fn root(&self) -> &Node {
        &self.graph[self.root]
    }

    /// Number of nodes, ROOT included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// True when ROOT has no children or linked nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Ordered child ids (render order). Linked slots are not included.
    pub fn children(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        match self.index_of(id) {
            Some(idx) => self
                .ordered_children(idx)
                .into_iter()
                .map(|(_, child)| self.graph[child].id)
                .collect(),
            None => SmallVec::new(),
        }
    }

    /// Named linked slots of a node, sorted by slot name.
    pub fn linked_nodes(&self, id: NodeId) -> Vec<(String, NodeId)> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut linked: Vec<(String, NodeId)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match e.weight() {
                Slot::Linked(name) => Some((name.clone(), self.graph[e.target()].id)),
                Slot::Child(_) => None,
            })
            .collect();
        linked.sort_by(|a, b| a.0.cmp(&b.0));
        linked
    }

    /// Pre-order walk from ROOT: children in order, then linked slots.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.preorder(self.root)
            .into_iter()
            .map(move |idx| &self.graph[idx])
    }

    /// `id` and everything beneath it, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        match self.index_of(id) {
            Some(idx) => self
                .preorder(idx)
                .into_iter()
                .map(|i| self.graph[i].id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let Some(mut current) = self.index_of(descendant) else {
            return false;
        };
        while let Some(parent) = self.parent_index(current) {
            if self.graph[parent].id == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// An id not yet used in this document, prefixed by the block kind.
    pub fn fresh_id(&self, kind: BlockKind) -> NodeId {
        loop {
            let id = NodeId::with_prefix(kind.id_prefix());
            if !self.contains(id) {
                return id;
            }
        }
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Append `node` as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeId, node: Node) -> Result<NodeId, DocumentError> {
        self.insert_node(parent, usize::MAX, node)
    }

    /// Insert `node` as a child of `parent` at `index` (clamped to the end).
    pub fn insert_node(
        &mut self,
        parent: NodeId,
        index: usize,
        node: Node,
    ) -> Result<NodeId, DocumentError> {
        let parent_idx = self.canvas_index(parent)?;
        self.check_new_id(node.id)?;
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.place_child(parent_idx, idx, index);
        Ok(id)
    }

    /// Attach `node` to `owner` under the named linked slot, replacing (and
    /// removing) whatever subtree occupied that slot before.
    pub fn link_node(
        &mut self,
        owner: NodeId,
        slot: &str,
        node: Node,
    ) -> Result<NodeId, DocumentError> {
        let owner_idx = self
            .index_of(owner)
            .ok_or(DocumentError::NodeNotFound(owner))?;
        self.check_new_id(node.id)?;
        if let Some((_, previous)) = self
            .linked_nodes(owner)
            .into_iter()
            .find(|(name, _)| name == slot)
        {
            self.remove_subtree(previous)?;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.graph
            .add_edge(owner_idx, idx, Slot::Linked(slot.to_string()));
        Ok(id)
    }

    /// Commit a new version of an existing node (same id). Returns the
    /// previous version. Structure is untouched.
    pub fn replace_node(&mut self, node: Node) -> Result<Node, DocumentError> {
        let idx = self
            .index_of(node.id)
            .ok_or(DocumentError::NodeNotFound(node.id))?;
        Ok(std::mem::replace(&mut self.graph[idx], node))
    }

    /// Delete `id` and its whole subtree; the parent's child order is
    /// compacted. Returns the removed nodes, pre-order.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<Node>, DocumentError> {
        if id.is_root() {
            return Err(DocumentError::RootImmutable);
        }
        let idx = self.index_of(id).ok_or(DocumentError::NodeNotFound(id))?;
        let parent = self.parent_index(idx);
        let doomed = self.preorder(idx);
        let mut removed = Vec::with_capacity(doomed.len());
        for i in doomed {
            if let Some(node) = self.graph.remove_node(i) {
                self.id_index.remove(&node.id);
                removed.push(node);
            }
        }
        if let Some(parent) = parent {
            self.renumber_children(parent);
        }
        Ok(removed)
    }

    /// Move `id` under `new_parent` at `index` (clamped).
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        index: usize,
    ) -> Result<(), DocumentError> {
        if id.is_root() {
            return Err(DocumentError::RootImmutable);
        }
        let idx = self.index_of(id).ok_or(DocumentError::NodeNotFound(id))?;
        let target = self.canvas_index(new_parent)?;
        if id == new_parent || self.is_ancestor_of(id, new_parent) {
            return Err(DocumentError::WouldCreateCycle {
                node: id,
                target: new_parent,
            });
        }
        let old_parent = self.parent_index(idx);
        if let Some(edge) = self.incoming_edge(idx) {
            self.graph.remove_edge(edge);
        }
        if let Some(old) = old_parent
            && old != target
        {
            self.renumber_children(old);
        }
        self.place_child(target, idx, index);
        Ok(())
    }

    /// Remove everything beneath ROOT, keeping ROOT itself.
    pub fn clear(&mut self) {
        let root = self.root;
        let doomed: Vec<NodeIndex> = self.preorder(root).into_iter().skip(1).collect();
        for idx in doomed {
            if let Some(node) = self.graph.remove_node(idx) {
                self.id_index.remove(&node.id);
            }
        }
    }

    // ─── Arena internals ─────────────────────────────────────────────────

    pub(crate) fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub(crate) fn root_index(&self) -> NodeIndex {
        self.root
    }

    pub(crate) fn graph(&self) -> &StableDiGraph<Node, Slot> {
        &self.graph
    }

    /// Attach an already-validated node without canvas or id checks.
    /// Used by the deserializer, which has its own tolerance rules.
    pub(crate) fn attach_unchecked(&mut self, parent: NodeIndex, node: Node, slot: Slot) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.graph.add_edge(parent, idx, slot);
        idx
    }

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    fn incoming_edge(&self, idx: NodeIndex) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|e| e.id())
    }

    fn canvas_index(&self, id: NodeId) -> Result<NodeIndex, DocumentError> {
        let idx = self.index_of(id).ok_or(DocumentError::NodeNotFound(id))?;
        if !self.graph[idx].is_canvas {
            return Err(DocumentError::NotACanvas(id));
        }
        Ok(idx)
    }

    fn check_new_id(&self, id: NodeId) -> Result<(), DocumentError> {
        if id.is_root() {
            return Err(DocumentError::RootImmutable);
        }
        if self.contains(id) {
            return Err(DocumentError::DuplicateId(id));
        }
        Ok(())
    }

    /// Ordinary children of `idx` sorted by slot order.
    fn ordered_children(&self, idx: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut children: Vec<(u32, EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match e.weight() {
                Slot::Child(order) => Some((*order, e.id(), e.target())),
                Slot::Linked(_) => None,
            })
            .collect();
        children.sort_by_key(|(order, _, _)| *order);
        children.into_iter().map(|(_, e, n)| (e, n)).collect()
    }

    /// Insert `child` into `parent`'s ordered children at `index`.
    fn place_child(&mut self, parent: NodeIndex, child: NodeIndex, index: usize) {
        let mut order: Vec<NodeIndex> = self
            .ordered_children(parent)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        let at = index.min(order.len());
        order.insert(at, child);
        self.graph.add_edge(parent, child, Slot::Child(0));
        self.write_order(parent, &order);
    }

    fn renumber_children(&mut self, parent: NodeIndex) {
        let order: Vec<NodeIndex> = self
            .ordered_children(parent)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        self.write_order(parent, &order);
    }

    /// Rewrite child slot numbers so they match `order` exactly.
    fn write_order(&mut self, parent: NodeIndex, order: &[NodeIndex]) {
        for (pos, &child) in order.iter().enumerate() {
            if let Some(edge) = self.graph.find_edge(parent, child) {
                self.graph[edge] = Slot::Child(pos as u32);
            }
        }
    }

    /// Pre-order traversal: ordered children first, then linked slots.
    fn preorder(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            let mut linked: Vec<(&str, NodeIndex)> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .filter_map(|e| match e.weight() {
                    Slot::Linked(name) => Some((name.as_str(), e.target())),
                    Slot::Child(_) => None,
                })
                .collect();
            linked.sort_by(|a, b| a.0.cmp(b.0));
            // Pushed in reverse so pops come out in render order.
            for (_, child) in linked.into_iter().rev() {
                stack.push(child);
            }
            for (_, child) in self.ordered_children(idx).into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    /// Structural equality: same nodes, same parents, same child order,
    /// same linked slots. Arena indices are ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|node| {
            other.get(node.id) == Some(node)
                && self.parent(node.id) == other.parent(node.id)
                && self.children(node.id) == other.children(node.id)
                && self.linked_nodes(node.id) == other.linked_nodes(node.id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ids(list: &[&str]) -> Vec<NodeId> {
        list.iter().map(|s| NodeId::intern(s)).collect()
    }

    fn sample() -> Document {
        let mut doc = Document::new();
        let root = NodeId::root();
        doc.add_node(root, Node::new(NodeId::intern("hero"), BlockKind::Container))
            .unwrap();
        doc.add_node(NodeId::intern("hero"), Node::new(NodeId::intern("title"), BlockKind::Heading))
            .unwrap();
        doc.add_node(NodeId::intern("hero"), Node::new(NodeId::intern("cta"), BlockKind::Button))
            .unwrap();
        doc.add_node(root, Node::new(NodeId::intern("footer"), BlockKind::Text))
            .unwrap();
        doc
    }

    #[test]
    fn new_document_is_bare_root() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert!(doc.is_empty());
        assert!(doc.root().is_canvas);
        assert_eq!(doc.parent(NodeId::root()), None);
    }

    #[test]
    fn children_keep_insertion_order() {
        let doc = sample();
        assert_eq!(doc.children(NodeId::root()).to_vec(), ids(&["hero", "footer"]));
        assert_eq!(doc.children(NodeId::intern("hero")).to_vec(), ids(&["title", "cta"]));
        assert_eq!(doc.parent(NodeId::intern("cta")), Some(NodeId::intern("hero")));
    }

    #[test]
    fn insert_at_index() {
        let mut doc = sample();
        doc.insert_node(NodeId::root(), 1, Node::new(NodeId::intern("divider"), BlockKind::Divider))
            .unwrap();
        assert_eq!(
            doc.children(NodeId::root()).to_vec(),
            ids(&["hero", "divider", "footer"])
        );
    }

    #[test]
    fn leaf_cannot_take_children() {
        let mut doc = sample();
        let err = doc
            .add_node(NodeId::intern("footer"), Node::new(NodeId::intern("x"), BlockKind::Text))
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotACanvas(_)));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut doc = sample();
        let err = doc
            .add_node(NodeId::root(), Node::new(NodeId::intern("title"), BlockKind::Text))
            .unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateId(_)));
    }

    #[test]
    fn remove_cascades_and_repairs_parent() {
        let mut doc = sample();
        let removed = doc.remove_subtree(NodeId::intern("hero")).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(!doc.contains(NodeId::intern("title")));
        assert!(!doc.contains(NodeId::intern("cta")));
        assert_eq!(doc.children(NodeId::root()).to_vec(), ids(&["footer"]));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut doc = sample();
        assert!(matches!(
            doc.remove_subtree(NodeId::root()),
            Err(DocumentError::RootImmutable)
        ));
    }

    #[test]
    fn move_between_parents() {
        let mut doc = sample();
        doc.move_node(NodeId::intern("cta"), NodeId::root(), 0).unwrap();
        assert_eq!(doc.children(NodeId::root()).to_vec(), ids(&["cta", "hero", "footer"]));
        assert_eq!(doc.children(NodeId::intern("hero")).to_vec(), ids(&["title"]));
        assert_eq!(doc.parent(NodeId::intern("cta")), Some(NodeId::root()));
    }

    #[test]
    fn reorder_within_parent() {
        let mut doc = sample();
        doc.move_node(NodeId::intern("title"), NodeId::intern("hero"), 5).unwrap();
        assert_eq!(doc.children(NodeId::intern("hero")).to_vec(), ids(&["cta", "title"]));
    }

    #[test]
    fn move_into_own_subtree_is_a_cycle() {
        let mut doc = sample();
        doc.add_node(NodeId::intern("hero"), Node::new(NodeId::intern("inner"), BlockKind::Grid))
            .unwrap();
        let err = doc
            .move_node(NodeId::intern("hero"), NodeId::intern("inner"), 0)
            .unwrap_err();
        assert!(matches!(err, DocumentError::WouldCreateCycle { .. }));
    }

    #[test]
    fn clear_keeps_root_only() {
        let mut doc = sample();
        doc.clear();
        assert!(doc.is_empty());
        assert!(!doc.contains(NodeId::intern("hero")));
        assert!(doc.children(NodeId::root()).is_empty());
    }

    #[test]
    fn with_prop_is_copy_on_write() {
        let doc = sample();
        let title = doc.get(NodeId::intern("title")).unwrap();
        let updated = title.with_prop("style.color", json!("#ff0000"));
        assert_eq!(updated.prop("style.color"), Some(&json!("#ff0000")));
        assert_eq!(title.prop("style.color"), None);
        // Scalar in the way becomes an object.
        let again = updated.with_prop("style.color.alpha", json!(0.5));
        assert_eq!(again.prop("style.color.alpha"), Some(&json!(0.5)));
        assert_eq!(again.without_prop("style.color").prop("style.color"), None);
    }

    #[test]
    fn replace_node_commits_new_version() {
        let mut doc = sample();
        let title = doc.get(NodeId::intern("title")).unwrap().clone();
        let prev = doc
            .replace_node(title.with_prop("text", json!("Welcome")))
            .unwrap();
        assert_eq!(prev.prop("text"), Some(&json!("Heading")));
        assert_eq!(
            doc.get(NodeId::intern("title")).unwrap().prop("text"),
            Some(&json!("Welcome"))
        );
    }

    #[test]
    fn linked_slots_replace_previous_occupant() {
        let mut doc = sample();
        doc.add_node(NodeId::root(), Node::new(NodeId::intern("tabs"), BlockKind::Tabs))
            .unwrap();
        doc.link_node(NodeId::intern("tabs"), "panel-0", Node::new(NodeId::intern("p0"), BlockKind::Container))
            .unwrap();
        doc.link_node(NodeId::intern("tabs"), "panel-0", Node::new(NodeId::intern("p0b"), BlockKind::Container))
            .unwrap();
        assert!(!doc.contains(NodeId::intern("p0")));
        assert_eq!(
            doc.linked_nodes(NodeId::intern("tabs")),
            vec![("panel-0".to_string(), NodeId::intern("p0b"))]
        );
        assert!(doc.children(NodeId::intern("tabs")).is_empty());
        assert_eq!(doc.parent(NodeId::intern("p0b")), Some(NodeId::intern("tabs")));
    }

    #[test]
    fn preorder_walk() {
        let doc = sample();
        let order: Vec<&str> = doc.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["ROOT", "hero", "title", "cta", "footer"]);
    }

    #[test]
    fn label_prefers_custom_name() {
        let mut node = Node::new(NodeId::intern("t"), BlockKind::Text);
        assert_eq!(node.label(), "Text");
        node.custom.insert("displayName".into(), json!("Intro copy"));
        assert_eq!(node.label(), "Intro copy");
    }

    #[test]
    fn fresh_id_avoids_existing() {
        let doc = sample();
        let id = doc.fresh_id(BlockKind::Text);
        assert!(!doc.contains(id));
        assert!(id.as_str().starts_with("text_"));
    }
}
