//! Integration tests: page session operations (pb-editor ↔ pb-core).
//!
//! Drives `PageSession` through the page-list operations, template loads
//! and failure paths, checking the session invariants after every step.

use pb_core::document::parse_document;
use pb_core::{BlockKind, NodeId, Page};
use pb_editor::template::{NoHooks, TemplateHooks, TemplateLoader, TemplateOutcome};
use pb_editor::{LoadOutcome, PageSession, SessionConfig, SessionError, SessionEvent};
use pretty_assertions::assert_eq;

const SINGLE_TEXT: &str = include_str!("fixtures/single_text.json");
const THREE_PAGES: &str = include_str!("fixtures/three_page_template.json");

// ─── Helpers ─────────────────────────────────────────────────────────────

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn page(id: &str, data: &str) -> Page {
    let mut page = Page::new(id.to_uppercase(), data);
    page.id = id.to_string();
    page
}

fn session(pages: Vec<Page>) -> PageSession {
    PageSession::with_pages(SessionConfig::default(), pages, None)
}

fn ids(session: &PageSession) -> Vec<&str> {
    session.pages().iter().map(|p| p.id.as_str()).collect()
}

/// The two session invariants: at least one page, current is one of them.
fn assert_invariants(session: &PageSession) {
    assert!(!session.pages().is_empty(), "session has no pages");
    assert!(
        session.page(session.current_page_id()).is_some(),
        "current page {} is not in the session",
        session.current_page_id()
    );
    let mut seen = std::collections::HashSet::new();
    for p in session.pages() {
        assert!(seen.insert(p.id.clone()), "duplicate page id {}", p.id);
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn add_page_saves_outgoing_and_switches() {
    init_logs();
    let mut s = session(vec![page("p1", SINGLE_TEXT)]);
    assert_eq!(s.canvas().document().len(), 2);
    s.add_block(NodeId::root(), BlockKind::Divider, None).unwrap();

    let new_id = s.add_page(None).unwrap();

    assert_eq!(s.len(), 2);
    assert_eq!(s.current_page_id(), new_id);
    let added = s.page(&new_id).unwrap();
    assert_eq!(added.name, "Page 2");
    let blank = parse_document(&added.data).unwrap();
    assert!(blank.is_empty());
    assert!(s.canvas().document().is_empty());

    // P1 was re-serialized before the switch, edit included.
    let p1 = parse_document(&s.page("p1").unwrap().data).unwrap();
    assert_eq!(p1.len(), 3);
    assert!(p1.contains(NodeId::intern("intro")));
    assert_invariants(&s);
}

#[test]
fn add_page_with_name() {
    let mut s = PageSession::default();
    let id = s.add_page(Some("Checkout")).unwrap();
    assert_eq!(s.page(&id).unwrap().name, "Checkout");
    assert_eq!(ids(&s).last().copied(), Some(id.as_str()));
}

#[test]
fn delete_current_moves_to_previous_neighbour() {
    let mut s = session(vec![page("p1", "{}"), page("p2", "{}"), page("p3", "{}")]);
    s.switch_to_page("p2").unwrap();

    s.delete_page("p2").unwrap();

    assert_eq!(ids(&s), ["p1", "p3"]);
    assert_eq!(s.current_page_id(), "p1");
    assert_invariants(&s);
}

#[test]
fn delete_first_current_moves_to_new_first() {
    let mut s = session(vec![page("p1", "{}"), page("p2", SINGLE_TEXT)]);
    s.delete_page("p1").unwrap();
    assert_eq!(s.current_page_id(), "p2");
    assert_eq!(s.canvas().document().len(), 2);
    assert_invariants(&s);
}

#[test]
fn delete_other_page_keeps_current() {
    let mut s = session(vec![page("p1", "{}"), page("p2", "{}"), page("p3", "{}")]);
    s.delete_page("p3").unwrap();
    assert_eq!(s.current_page_id(), "p1");
    assert_eq!(ids(&s), ["p1", "p2"]);
}

#[test]
fn delete_last_page_is_rejected() {
    let mut s = session(vec![page("only", SINGLE_TEXT)]);
    let before = s.pages().to_vec();

    let err = s.delete_page("only").unwrap_err();

    assert!(matches!(err, SessionError::PageDeleteRejected));
    assert_eq!(s.pages(), &before[..]);
    assert_eq!(s.current_page_id(), "only");
    assert_invariants(&s);
}

#[test]
fn multi_page_template_loads_all_pages() {
    init_logs();
    #[derive(Default)]
    struct Navigator {
        shown_for: Option<usize>,
        loaded: usize,
    }
    impl TemplateHooks for Navigator {
        fn on_loaded(&mut self, _id: Option<&str>, _count: usize) {
            self.loaded += 1;
        }
        fn on_multi_page(&mut self, count: usize) {
            self.shown_for = Some(count);
        }
    }

    let mut s = PageSession::default();
    let mut loader = TemplateLoader::new();
    let mut nav = Navigator::default();

    let outcome = loader.load_initial(&mut s, THREE_PAGES, &mut nav).unwrap();

    assert_eq!(outcome, TemplateOutcome::MultiPage { page_count: 3 });
    assert_eq!(ids(&s), ["home", "page-2", "page-3"]);
    let names: Vec<&str> = s.pages().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Home", "Pricing", "Page 3"]);
    assert_eq!(s.current_page_id(), "home");
    assert!(s.canvas().document().contains(NodeId::intern("title")));
    assert_eq!(nav.shown_for, Some(3));
    assert_eq!(nav.loaded, 1);
    assert_eq!(
        s.page("page-3").unwrap().created_at.to_rfc3339(),
        "2024-05-01T08:30:00+00:00"
    );
    assert_invariants(&s);
}

#[test]
fn load_pages_is_idempotent() {
    let input = vec![page("a", SINGLE_TEXT), page("b", "{}")];
    let mut s = PageSession::default();

    s.load_pages(input.clone(), Some("b"));
    let first = (s.pages().to_vec(), s.current_page_id().to_string(), s.canvas().serialize());
    s.load_pages(input, Some("b"));
    let second = (s.pages().to_vec(), s.current_page_id().to_string(), s.canvas().serialize());

    assert_eq!(first, second);
    assert_eq!(s.len(), 2);
}

#[test]
fn load_pages_renames_repeated_ids_the_same_way_every_time() {
    let input = vec![
        page("same", "{}"),
        page("same", SINGLE_TEXT),
        page("same-2", "{}"),
        page("same", "{}"),
    ];
    let mut s = PageSession::default();

    s.load_pages(input.clone(), None);
    let first = s.pages().to_vec();
    s.load_pages(input, None);

    assert_eq!(s.pages().to_vec(), first);
    assert_eq!(ids(&s), ["same", "same-3", "same-2", "same-4"]);
    assert_eq!(s.page("same-3").map(|p| p.data.as_str()), Some(SINGLE_TEXT));
}

#[test]
fn load_pages_ignores_empty_input() {
    let mut s = session(vec![page("a", "{}")]);
    assert!(matches!(s.load_pages(Vec::new(), None), LoadOutcome::Ignored));
    assert_eq!(ids(&s), ["a"]);
}

#[test]
fn load_pages_unknown_initial_selects_first() {
    let mut s = PageSession::default();
    s.load_pages(vec![page("a", "{}"), page("b", "{}")], Some("zzz"));
    assert_eq!(s.current_page_id(), "a");
}

#[test]
fn load_pages_falls_back_to_blank_root() {
    let mut s = PageSession::default();
    let outcome = s.load_pages(vec![page("broken", "[1, 2, 3]"), page("ok", "{}")], None);

    let LoadOutcome::Fallback { page_id, error } = outcome else {
        panic!("expected a fallback");
    };
    assert_eq!(page_id, "broken");
    assert!(error.is_invalid_document());
    assert!(s.canvas().document().is_empty());
    assert_eq!(s.current_page_id(), "broken");
    assert_invariants(&s);
}

#[test]
fn failed_switch_still_commits_and_keeps_data() {
    let mut s = session(vec![page("good", SINGLE_TEXT), page("bad", "{\"ROOT\": 5")]);
    s.drain_events();

    let err = s.switch_to_page("bad").unwrap_err();

    assert!(matches!(err, SessionError::Document { ref page_id, .. } if page_id == "bad"));
    assert_eq!(s.current_page_id(), "bad");
    assert!(s.canvas().document().is_empty());
    assert_eq!(
        s.drain_events(),
        vec![SessionEvent::PageChanged { page_id: "bad".into() }]
    );

    // Leaving the broken page unedited must not overwrite its data.
    s.switch_to_page("good").unwrap();
    assert_eq!(s.page("bad").unwrap().data, "{\"ROOT\": 5");
    assert_eq!(s.canvas().document().len(), 2);
}

#[test]
fn editing_a_failed_page_replaces_its_data() {
    let mut s = session(vec![page("good", "{}"), page("bad", "not json")]);
    let _ = s.switch_to_page("bad");
    s.add_block(NodeId::root(), BlockKind::Heading, None).unwrap();
    assert!(s.save_current_page());
    assert!(parse_document(&s.page("bad").unwrap().data).is_ok());
}

#[test]
fn switch_to_same_page_does_not_touch_timestamps() {
    let mut s = session(vec![page("a", SINGLE_TEXT), page("b", "{}")]);
    let before = s.page("a").unwrap().clone();
    s.switch_to_page("a").unwrap();
    assert_eq!(s.page("a").unwrap(), &before);
}

#[test]
fn single_page_sessions_never_serialize_on_switch() {
    let mut s = session(vec![page("only", SINGLE_TEXT)]);
    s.add_block(NodeId::root(), BlockKind::Text, None).unwrap();
    assert!(s.switch_to_page("only").is_ok());
    assert_eq!(s.page("only").unwrap().data, SINGLE_TEXT);
}

#[test]
fn flush_captures_live_edits() {
    let mut s = session(vec![page("a", "{}")]);
    s.add_block(NodeId::root(), BlockKind::Image, None).unwrap();
    let pages = s.flush();
    assert!(pages[0].data.contains("ImageBlock"));
}

#[test]
fn explicit_save_wins_over_stale_auto_save() {
    let mut s = session(vec![page("a", "{}")]);
    let heading = s.add_block(NodeId::root(), BlockKind::Heading, None).unwrap();
    s.schedule_auto_save(0);
    s.apply(
        pb_editor::CanvasMutation::SetProp {
            id: heading,
            path: "text".into(),
            value: serde_json::json!("Final"),
        },
        "Edit heading",
    )
    .unwrap();
    assert!(s.save_current_page());
    let saved = s.page("a").unwrap().data.clone();
    // The debounce timer was consumed by the explicit save.
    assert!(!s.poll_auto_save(60_000));
    assert_eq!(s.page("a").unwrap().data, saved);
    assert!(saved.contains("Final"));
}

#[test]
fn undo_history_survives_until_page_change() {
    let mut s = session(vec![page("a", "{}"), page("b", "{}")]);
    s.add_block(NodeId::root(), BlockKind::Button, None).unwrap();
    assert_eq!(s.undo().as_deref(), Some("Add Button"));
    assert!(s.canvas().document().is_empty());
    assert_eq!(s.redo().as_deref(), Some("Add Button"));
    s.switch_to_page("b").unwrap();
    assert!(!s.can_undo());
    assert!(!s.can_redo());
}

#[test]
fn single_page_template_keeps_page_list() {
    let mut s = session(vec![page("a", "{}"), page("b", "{}")]);
    let mut loader = TemplateLoader::new();
    loader.load_initial(&mut s, SINGLE_TEXT, &mut NoHooks).unwrap();
    assert_eq!(ids(&s), ["a", "b"]);
    assert!(s.is_dirty());
    s.save_current_page();
    assert!(s.page("a").unwrap().data.contains("Welcome to the shop"));
}
