//! Structural diagnostics for page documents.
//!
//! Reports problems without modifying the document. A `Document` built
//! through the arena API is consistent by construction; these checks guard
//! the invariants anyway and also translate a `DeserializeReport` into the
//! same diagnostic form so hosts can show one list.

use crate::document::DeserializeReport;
use crate::id::NodeId;
use crate::model::{BlockType, Document};
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::visit::Dfs;
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The document violates a structural invariant.
    Error,
    /// Likely a mistake; the document still loads.
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub node_id: NodeId,
    pub message: String,
    pub severity: Severity,
    /// Short rule identifier (e.g. "orphan", "unresolved-type").
    pub rule: &'static str,
}

// ─── Public API ──────────────────────────────────────────────────────────

/// Run all structural checks over a document.
#[must_use]
pub fn validate_document(doc: &Document) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    check_root(doc, &mut diags);
    check_acyclic(doc, &mut diags);
    check_reachable(doc, &mut diags);
    check_single_parent(doc, &mut diags);
    check_leaf_children(doc, &mut diags);
    check_block_types(doc, &mut diags);
    diags
}

/// True when no `Error`-level diagnostic is present.
pub fn is_valid(doc: &Document) -> bool {
    validate_document(doc)
        .iter()
        .all(|d| d.severity != Severity::Error)
}

/// Diagnostics for what the parser had to repair or skip.
#[must_use]
pub fn report_diagnostics(report: &DeserializeReport) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for (parent, child) in &report.dangling {
        diags.push(Diagnostic {
            node_id: *parent,
            message: format!("`{parent}` lists `{child}`, which does not exist; it was skipped."),
            severity: Severity::Warning,
            rule: "dangling-child",
        });
    }
    for id in &report.orphans {
        diags.push(Diagnostic {
            node_id: *id,
            message: format!("`{id}` is not reachable from ROOT and was dropped."),
            severity: Severity::Warning,
            rule: "orphan",
        });
    }
    for id in &report.repeated {
        diags.push(Diagnostic {
            node_id: *id,
            message: format!("`{id}` is referenced more than once; later references were ignored."),
            severity: Severity::Warning,
            rule: "repeated-reference",
        });
    }
    for id in &report.malformed {
        diags.push(Diagnostic {
            node_id: *id,
            message: format!("`{id}` could not be read and was skipped."),
            severity: Severity::Warning,
            rule: "malformed-record",
        });
    }
    for id in &report.reparented {
        diags.push(Diagnostic {
            node_id: *id,
            message: format!("`{id}` had a parent pointer that disagreed with its container."),
            severity: Severity::Info,
            rule: "parent-mismatch",
        });
    }
    for (id, name) in &report.unresolved {
        diags.push(unresolved(*id, name));
    }
    for id in &report.legacy_aliases {
        diags.push(Diagnostic {
            node_id: *id,
            message: format!("`{id}` uses a legacy block name; it will be saved under the current name."),
            severity: Severity::Info,
            rule: "legacy-alias",
        });
    }
    diags
}

// ─── Rules ───────────────────────────────────────────────────────────────

fn check_root(doc: &Document, diags: &mut Vec<Diagnostic>) {
    let graph = doc.graph();
    let root = doc.root_index();
    if !doc.root().id.is_root() {
        diags.push(Diagnostic {
            node_id: doc.root().id,
            message: "The top-level node is not `ROOT`.".into(),
            severity: Severity::Error,
            rule: "root-id",
        });
    }
    if graph.neighbors_directed(root, Direction::Incoming).next().is_some() {
        diags.push(Diagnostic {
            node_id: NodeId::root(),
            message: "`ROOT` has a parent.".into(),
            severity: Severity::Error,
            rule: "root-parent",
        });
    }
}

fn check_acyclic(doc: &Document, diags: &mut Vec<Diagnostic>) {
    if is_cyclic_directed(doc.graph()) {
        diags.push(Diagnostic {
            node_id: NodeId::root(),
            message: "The node tree contains a cycle.".into(),
            severity: Severity::Error,
            rule: "cycle",
        });
    }
}

fn check_reachable(doc: &Document, diags: &mut Vec<Diagnostic>) {
    let graph = doc.graph();
    let mut seen = HashSet::new();
    let mut dfs = Dfs::new(graph, doc.root_index());
    while let Some(idx) = dfs.next(graph) {
        seen.insert(idx);
    }
    for idx in graph.node_indices() {
        if !seen.contains(&idx) {
            let id = graph[idx].id;
            diags.push(Diagnostic {
                node_id: id,
                message: format!("`{id}` is not reachable from ROOT."),
                severity: Severity::Error,
                rule: "orphan",
            });
        }
    }
}

fn check_single_parent(doc: &Document, diags: &mut Vec<Diagnostic>) {
    let graph = doc.graph();
    for idx in graph.node_indices() {
        let parents = graph.neighbors_directed(idx, Direction::Incoming).count();
        if idx != doc.root_index() && parents != 1 {
            let id = graph[idx].id;
            diags.push(Diagnostic {
                node_id: id,
                message: format!("`{id}` has {parents} parents; expected exactly one."),
                severity: Severity::Error,
                rule: "parent-count",
            });
        }
    }
}

fn check_leaf_children(doc: &Document, diags: &mut Vec<Diagnostic>) {
    for node in doc.iter() {
        if !node.is_canvas && !doc.children(node.id).is_empty() {
            diags.push(Diagnostic {
                node_id: node.id,
                message: format!("`{}` is not a canvas but has children.", node.id),
                severity: Severity::Warning,
                rule: "leaf-with-children",
            });
        }
    }
}

fn check_block_types(doc: &Document, diags: &mut Vec<Diagnostic>) {
    for node in doc.iter() {
        if let BlockType::Unresolved(name) = &node.block {
            diags.push(unresolved(node.id, name));
        }
    }
}

fn unresolved(id: NodeId, name: &str) -> Diagnostic {
    Diagnostic {
        node_id: id,
        message: format!("`{id}` uses unknown block type `{name}`; a placeholder is rendered."),
        severity: Severity::Info,
        rule: "unresolved-type",
    }
}
