//! Multi-page session: the ordered page list, the current-page pointer and
//! the live canvas that backs it.
//!
//! `PageSession` is the only writer of the canvas content. Page switches
//! and bulk loads run to completion synchronously, so no two pages are
//! ever mounted at once.
//!
//! Invariants held after every public call:
//! - `pages` is non-empty;
//! - `current_page_id()` names a page in `pages`;
//! - page ids are unique.

use crate::canvas::{Canvas, CanvasMutation};
use crate::commands::CommandStack;
use crate::error::SessionError;
use pb_core::{DeserializeReport, DocumentError, Page};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ─── Config ──────────────────────────────────────────────────────────────

/// Debounced persistence of the live canvas into the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoSaveConfig {
    pub enabled: bool,
    /// Quiet period after the last edit before the save fires.
    pub debounce_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub auto_save: AutoSaveConfig,
    /// Maximum undo steps kept for the current page.
    pub history_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_save: AutoSaveConfig::default(),
            history_depth: 100,
        }
    }
}

// ─── Events ──────────────────────────────────────────────────────────────

/// Notifications for the host UI, drained with [`PageSession::drain_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The current page changed (switch, add, delete, load).
    #[serde(rename_all = "camelCase")]
    PageChanged { page_id: String },
    /// The page list was replaced wholesale.
    #[serde(rename_all = "camelCase")]
    PagesLoaded { count: usize, current_page_id: String },
    #[serde(rename_all = "camelCase")]
    AutoSaved { page_id: String },
}

/// How a bulk load went.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The input list was empty; nothing changed.
    Ignored,
    Loaded { page_id: String },
    /// The selected page's data could not be read; the canvas shows a bare
    /// ROOT instead.
    Fallback { page_id: String, error: DocumentError },
}

// ─── Session ─────────────────────────────────────────────────────────────

pub struct PageSession {
    pages: Vec<Page>,
    current: String,
    canvas: Canvas,
    history: CommandStack,
    config: SessionConfig,
    /// Canvas revision last written to (or loaded from) the current page.
    saved_revision: u64,
    /// Set when the current page failed to load and the canvas fell back to
    /// blank. While the canvas still sits at that revision, writing it back
    /// would overwrite the page's real data with an empty document.
    failed_load_revision: Option<u64>,
    auto_save_deadline: Option<u64>,
    events: Vec<SessionEvent>,
}

impl PageSession {
    /// A session with one blank page.
    pub fn new(config: SessionConfig) -> Self {
        let page = Page::blank("Page 1");
        let current = page.id.clone();
        let canvas = Canvas::new();
        let saved_revision = canvas.revision();
        Self {
            pages: vec![page],
            current,
            canvas,
            history: CommandStack::new(config.history_depth),
            config,
            saved_revision,
            failed_load_revision: None,
            auto_save_deadline: None,
            events: Vec::new(),
        }
    }

    /// A session over `pages`, as if by [`PageSession::load_pages`].
    /// An empty list yields the single blank page of [`PageSession::new`].
    pub fn with_pages(config: SessionConfig, pages: Vec<Page>, initial: Option<&str>) -> Self {
        let mut session = Self::new(config);
        session.load_pages(pages, initial);
        session.events.clear();
        session
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always false; a session holds at least one page.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn current_page_id(&self) -> &str {
        &self.current
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.page(&self.current)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.index_of(&self.current)
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the canvas holds edits not yet written into the current page.
    pub fn is_dirty(&self) -> bool {
        self.canvas.revision() != self.saved_revision
    }

    /// Take the pending host notifications.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Page switching ──────────────────────────────────────────────────

    /// Make `target_id` the current page.
    ///
    /// Switching to the current page does nothing. Otherwise the canvas is
    /// written back into the outgoing page, then the target is mounted. If
    /// the target's data cannot be read the switch is still committed (the
    /// canvas shows a bare ROOT) and the error is returned.
    pub fn switch_to_page(&mut self, target_id: &str) -> Result<(), SessionError> {
        if target_id == self.current {
            return Ok(());
        }
        if self.index_of(target_id).is_none() {
            return Err(SessionError::PageNotFound(target_id.to_string()));
        }
        if self.pages.len() > 1 {
            self.write_back();
        }
        log::debug!("switching page {} -> {}", self.current, target_id);
        self.mount_page(target_id.to_string())
    }

    /// Commit `page_id` as current and load its data into the canvas.
    fn mount_page(&mut self, page_id: String) -> Result<(), SessionError> {
        let data = self
            .page(&page_id)
            .map(|p| p.data.clone())
            .unwrap_or_default();
        self.current = page_id.clone();
        self.history.clear();
        self.auto_save_deadline = None;
        self.failed_load_revision = None;

        let result = if data.trim().is_empty() {
            self.canvas.reset_to_blank();
            Ok(())
        } else {
            self.canvas.deserialize(&data).map(log_report)
        };
        let result = result.map_err(|source| {
            log::warn!("page {page_id} could not be loaded, showing a blank canvas: {source}");
            self.canvas.reset_to_blank();
            self.failed_load_revision = Some(self.canvas.revision());
            SessionError::Document {
                page_id: page_id.clone(),
                source,
            }
        });
        self.saved_revision = self.canvas.revision();
        self.events.push(SessionEvent::PageChanged { page_id });
        result
    }

    // ─── Page list operations ────────────────────────────────────────────

    /// Append a blank page (default name `Page N`) and switch to it.
    /// Returns the new page's id.
    pub fn add_page(&mut self, name: Option<&str>) -> Result<String, SessionError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("Page {}", self.pages.len() + 1),
        };
        let page = Page::blank(name);
        let id = page.id.clone();
        log::debug!("adding page {id} ({})", page.name);
        self.pages.push(page);
        self.switch_to_page(&id)?;
        Ok(id)
    }

    /// Copy page `id` (data, thumbnail) into a new page placed right after
    /// it. The current page does not change. Returns the copy's id.
    pub fn duplicate_page(&mut self, id: &str) -> Result<String, SessionError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| SessionError::PageNotFound(id.to_string()))?;
        if id == self.current {
            self.write_back();
        }
        let source = &self.pages[index];
        let mut copy = Page::new(format!("{} (Copy)", source.name), source.data.clone());
        copy.thumbnail = source.thumbnail.clone();
        let copy_id = copy.id.clone();
        log::debug!("duplicating page {id} as {copy_id}");
        self.pages.insert(index + 1, copy);
        Ok(copy_id)
    }

    /// Remove page `id`. Refused when it is the only page. If it was
    /// current, the neighbour before it (or the new first page) becomes
    /// current; an error loading that neighbour is returned after the
    /// delete has been committed.
    pub fn delete_page(&mut self, id: &str) -> Result<(), SessionError> {
        if self.pages.len() <= 1 {
            log::debug!("refusing to delete the last page");
            return Err(SessionError::PageDeleteRejected);
        }
        let index = self
            .index_of(id)
            .ok_or_else(|| SessionError::PageNotFound(id.to_string()))?;
        self.pages.remove(index);
        log::debug!("deleted page {id}");
        if id == self.current {
            let next = self.pages[index.saturating_sub(1)].id.clone();
            // The deleted page's canvas is discarded, not written back.
            self.mount_page(next)?;
        }
        Ok(())
    }

    pub fn rename_page(&mut self, id: &str, name: &str) -> Result<(), SessionError> {
        let page = self
            .pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SessionError::PageNotFound(id.to_string()))?;
        page.rename(name);
        Ok(())
    }

    /// Move the page at `from` to position `to`. The current page stays
    /// current.
    pub fn reorder_pages(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        let len = self.pages.len();
        for index in [from, to] {
            if index >= len {
                return Err(SessionError::IndexOutOfRange { index, len });
            }
        }
        if from != to {
            let page = self.pages.remove(from);
            self.pages.insert(to, page);
            log::debug!("moved page {from} -> {to}");
        }
        Ok(())
    }

    /// Replace the whole session with `pages`.
    ///
    /// An empty list is ignored. Otherwise `initial` is selected when it
    /// names one of the pages, else the first page. If the selected page
    /// cannot be read the canvas falls back to a bare ROOT.
    pub fn load_pages(&mut self, pages: Vec<Page>, initial: Option<&str>) -> LoadOutcome {
        if pages.is_empty() {
            return LoadOutcome::Ignored;
        }
        let pages = dedupe_ids(pages);
        let selected = initial
            .filter(|id| pages.iter().any(|p| p.id == *id))
            .map(str::to_string)
            .unwrap_or_else(|| pages[0].id.clone());
        log::debug!("loading {} pages, current {selected}", pages.len());
        self.pages = pages;
        let outcome = match self.mount_page(selected.clone()) {
            Ok(()) => LoadOutcome::Loaded {
                page_id: selected.clone(),
            },
            Err(SessionError::Document { source, .. }) => LoadOutcome::Fallback {
                page_id: selected.clone(),
                error: source,
            },
            Err(other) => {
                // mount_page only reports document errors.
                log::error!("unexpected load failure: {other}");
                LoadOutcome::Loaded {
                    page_id: selected.clone(),
                }
            }
        };
        self.events.push(SessionEvent::PagesLoaded {
            count: self.pages.len(),
            current_page_id: selected,
        });
        outcome
    }

    /// Store a raster preview for a page.
    pub fn set_thumbnail(&mut self, id: &str, thumbnail: Option<String>) -> Result<(), SessionError> {
        let page = self
            .pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SessionError::PageNotFound(id.to_string()))?;
        page.thumbnail = thumbnail;
        Ok(())
    }

    // ─── Live document ───────────────────────────────────────────────────

    /// Load a single document into the current page's canvas (single-page
    /// template, imported page data). The canvas is untouched on error.
    pub fn replace_current_document(
        &mut self,
        text: &str,
    ) -> Result<DeserializeReport, DocumentError> {
        let report = self.canvas.deserialize(text)?.clone();
        log_report(&report);
        self.history.clear();
        self.failed_load_revision = None;
        Ok(report)
    }

    /// Apply an editor mutation through the undo history.
    pub fn apply(&mut self, mutation: CanvasMutation, description: &str) -> Result<(), DocumentError> {
        self.history.execute(&mut self.canvas, mutation, description)
    }

    /// Drop a palette block into `parent` through the undo history.
    pub fn add_block(
        &mut self,
        parent: pb_core::NodeId,
        kind: pb_core::BlockKind,
        index: Option<usize>,
    ) -> Result<pb_core::NodeId, DocumentError> {
        let id = self.canvas.document().fresh_id(kind);
        self.apply(
            CanvasMutation::AddNode {
                parent,
                index,
                node: Box::new(pb_core::Node::new(id, kind)),
            },
            &format!("Add {}", kind.spec().display_name),
        )?;
        Ok(id)
    }

    pub fn begin_gesture(&mut self, description: &str) {
        self.history.begin_batch(&self.canvas, description);
    }

    pub fn end_gesture(&mut self) {
        self.history.end_batch(&self.canvas);
    }

    pub fn undo(&mut self) -> Option<String> {
        self.history.undo(&mut self.canvas)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.history.redo(&mut self.canvas)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Write the live canvas into the current page now. Returns whether
    /// the page data changed.
    pub fn save_current_page(&mut self) -> bool {
        self.auto_save_deadline = None;
        self.write_back()
    }

    /// Bring the current page up to date and return all pages, ready for
    /// export.
    pub fn flush(&mut self) -> &[Page] {
        self.write_back();
        &self.pages
    }

    /// Request a save once edits settle. Safe to call on every edit: each
    /// call pushes the deadline back by the debounce interval. `now_ms` is
    /// any monotonic millisecond clock.
    pub fn schedule_auto_save(&mut self, now_ms: u64) {
        if !self.config.auto_save.enabled {
            return;
        }
        self.auto_save_deadline = Some(now_ms.saturating_add(self.config.auto_save.debounce_ms));
    }

    pub fn has_pending_auto_save(&self) -> bool {
        self.auto_save_deadline.is_some()
    }

    /// Fire a due auto-save. The canvas is serialized at fire time, never
    /// earlier, so an explicit save in between is never overwritten with
    /// older content. Returns whether page data was written.
    pub fn poll_auto_save(&mut self, now_ms: u64) -> bool {
        if !self.config.auto_save.enabled {
            return false;
        }
        match self.auto_save_deadline {
            Some(deadline) if now_ms >= deadline => {
                self.auto_save_deadline = None;
                if !self.is_dirty() {
                    return false;
                }
                let written = self.write_back();
                if written {
                    log::debug!("auto-saved page {}", self.current);
                    self.events.push(SessionEvent::AutoSaved {
                        page_id: self.current.clone(),
                    });
                }
                written
            }
            _ => false,
        }
    }

    /// Serialize the canvas into the current page's data.
    fn write_back(&mut self) -> bool {
        let revision = self.canvas.revision();
        if self.failed_load_revision == Some(revision) {
            log::debug!("page {} failed to load and is unedited; keeping its data", self.current);
            return false;
        }
        let data = self.canvas.serialize();
        self.saved_revision = revision;
        let Some(page) = self.pages.iter_mut().find(|p| p.id == self.current) else {
            return false;
        };
        page.set_data(data)
    }
}

impl Default for PageSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn log_report(report: &DeserializeReport) {
    if !report.is_clean() {
        log::warn!(
            "document loaded with repairs: {} dangling, {} orphaned, {} repeated, {} malformed",
            report.dangling.len(),
            report.orphans.len(),
            report.repeated.len(),
            report.malformed.len(),
        );
    }
}

/// Give later pages that reuse an id the first free `{id}-2`, `{id}-3`, ...
/// The result depends only on the input.
fn dedupe_ids(mut pages: Vec<Page>) -> Vec<Page> {
    let mut taken: HashSet<String> = pages.iter().map(|p| p.id.clone()).collect();
    let mut seen = HashSet::new();
    for page in &mut pages {
        if seen.insert(page.id.clone()) {
            continue;
        }
        let renamed = (2..)
            .map(|n| format!("{}-{n}", page.id))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(pb_core::page::new_page_id);
        log::warn!("duplicate page id {}; renamed to {renamed}", page.id);
        taken.insert(renamed.clone());
        seen.insert(renamed.clone());
        page.id = renamed;
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::{BlockKind, NodeId};

    fn session_with(names: &[&str]) -> PageSession {
        let pages = names
            .iter()
            .map(|name| {
                let mut page = Page::blank(*name);
                page.id = name.to_string();
                page
            })
            .collect();
        PageSession::with_pages(SessionConfig::default(), pages, None)
    }

    #[test]
    fn new_session_has_one_blank_page() {
        let session = PageSession::default();
        assert_eq!(session.len(), 1);
        assert_eq!(session.pages()[0].name, "Page 1");
        assert_eq!(session.current_page_id(), session.pages()[0].id);
        assert!(session.canvas().document().is_empty());
    }

    #[test]
    fn switch_to_current_is_noop() {
        let mut session = session_with(&["a", "b"]);
        let before = session.pages().to_vec();
        let revision = session.canvas().revision();
        session.switch_to_page("a").unwrap();
        assert_eq!(session.pages(), &before[..]);
        assert_eq!(session.canvas().revision(), revision);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn switch_to_unknown_page_changes_nothing() {
        let mut session = session_with(&["a", "b"]);
        let err = session.switch_to_page("zzz").unwrap_err();
        assert!(matches!(err, SessionError::PageNotFound(_)));
        assert_eq!(session.current_page_id(), "a");
    }

    #[test]
    fn switch_writes_back_and_mounts() {
        let mut session = session_with(&["a", "b"]);
        session.add_block(NodeId::root(), BlockKind::Heading, None).unwrap();
        session.switch_to_page("b").unwrap();
        assert!(session.canvas().document().is_empty());
        assert!(session.page("a").unwrap().data.contains("HeadingBlock"));
        session.switch_to_page("a").unwrap();
        assert_eq!(session.canvas().document().len(), 2);
        assert_eq!(
            session.drain_events(),
            vec![
                SessionEvent::PageChanged { page_id: "b".into() },
                SessionEvent::PageChanged { page_id: "a".into() },
            ]
        );
    }

    #[test]
    fn history_is_cleared_on_page_change() {
        let mut session = session_with(&["a", "b"]);
        session.add_block(NodeId::root(), BlockKind::Text, None).unwrap();
        assert!(session.can_undo());
        session.switch_to_page("b").unwrap();
        assert!(!session.can_undo());
    }

    #[test]
    fn reorder_keeps_current_identity() {
        let mut session = session_with(&["a", "b", "c"]);
        session.switch_to_page("b").unwrap();
        session.reorder_pages(1, 2).unwrap();
        let ids: Vec<&str> = session.pages().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
        assert_eq!(session.current_page_id(), "b");
        assert!(matches!(
            session.reorder_pages(0, 3),
            Err(SessionError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn rename_bumps_updated_at() {
        let mut session = session_with(&["a"]);
        let before = session.page("a").unwrap().updated_at;
        session.rename_page("a", "Landing").unwrap();
        let page = session.page("a").unwrap();
        assert_eq!(page.name, "Landing");
        assert!(page.updated_at >= before);
        assert!(session.rename_page("nope", "x").is_err());
    }

    #[test]
    fn duplicate_inserts_after_source_without_switching() {
        let mut session = session_with(&["a", "b"]);
        session.add_block(NodeId::root(), BlockKind::Button, None).unwrap();
        session.set_thumbnail("a", Some("data:image/png;base64,AA==".into())).unwrap();
        let copy = session.duplicate_page("a").unwrap();
        let ids: Vec<&str> = session.pages().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", copy.as_str(), "b"]);
        assert_eq!(session.current_page_id(), "a");
        let copied = session.page(&copy).unwrap();
        assert_eq!(copied.name, "a (Copy)");
        assert_eq!(copied.data, session.page("a").unwrap().data);
        assert!(copied.data.contains("ButtonBlock"));
        assert!(copied.thumbnail.is_some());
    }

    #[test]
    fn auto_save_debounces() {
        let mut session = PageSession::default();
        session.add_block(NodeId::root(), BlockKind::Text, None).unwrap();
        session.schedule_auto_save(1_000);
        session.schedule_auto_save(2_500);
        assert!(!session.poll_auto_save(3_000));
        assert!(session.has_pending_auto_save());
        assert!(session.poll_auto_save(4_500));
        assert!(!session.is_dirty());
        assert!(session.current_page().unwrap().data.contains("TextBlock"));
        // Nothing pending, nothing changed.
        assert!(!session.poll_auto_save(10_000));
    }

    #[test]
    fn auto_save_skips_clean_canvas() {
        let mut session = PageSession::default();
        let before = session.current_page().unwrap().clone();
        session.schedule_auto_save(0);
        assert!(!session.poll_auto_save(5_000));
        assert_eq!(session.current_page().unwrap(), &before);
    }

    #[test]
    fn disabled_auto_save_is_noop() {
        let config = SessionConfig {
            auto_save: AutoSaveConfig {
                enabled: false,
                ..AutoSaveConfig::default()
            },
            ..SessionConfig::default()
        };
        let mut session = PageSession::new(config);
        session.add_block(NodeId::root(), BlockKind::Text, None).unwrap();
        session.schedule_auto_save(0);
        assert!(!session.has_pending_auto_save());
        assert!(!session.poll_auto_save(u64::MAX));
        assert!(session.is_dirty());
    }

    #[test]
    fn load_pages_dedupes_ids() {
        let mut a = Page::blank("A");
        a.id = "same".into();
        let mut b = Page::blank("B");
        b.id = "same".into();
        let mut session = PageSession::default();
        session.load_pages(vec![a, b], None);
        assert_eq!(session.len(), 2);
        assert_eq!(session.pages()[1].id, "same-2");
        assert_eq!(session.current_page_id(), "same");
    }

    #[test]
    fn config_reads_camel_case() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "autoSave": { "debounceMs": 500 } }"#).unwrap();
        assert!(config.auto_save.enabled);
        assert_eq!(config.auto_save.debounce_ms, 500);
        assert_eq!(config.history_depth, 100);
    }
}
