//! Integration tests: importing export files into a session.

use pb_editor::import::{import_page_data_from_path, import_pages, import_pages_from_path};
use pb_editor::{ImportError, PageSession, SessionConfig};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn missing_data_rejects_import_and_leaves_session_alone() {
    let mut session = PageSession::default();
    let current = session.current_page_id().to_string();
    session.rename_page(&current, "Draft").unwrap();
    let before = session.pages().to_vec();

    let result = import_pages_from_path(fixture("missing_data.json"));

    let err = result.unwrap_err();
    assert!(matches!(err, ImportError::Invalid(_)));
    assert!(!err.is_io());
    assert_eq!(session.pages(), &before[..]);
}

#[test]
fn exported_file_round_trips_into_a_session() {
    let pages = import_pages_from_path(fixture("export_two_pages.json")).unwrap();
    let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["page-home", "page-contact"]);
    assert!(pages[1].thumbnail.is_some());
    // updatedAt is reset to the import time.
    assert!(pages.iter().all(|p| p.updated_at > p.created_at));

    let mut session = PageSession::with_pages(SessionConfig::default(), pages, None);
    assert_eq!(session.current_page_id(), "page-home");
    assert_eq!(session.canvas().document().len(), 2);
    session.switch_to_page("page-contact").unwrap();
    assert!(session.canvas().document().is_empty());
}

#[test]
fn unreadable_vs_invalid() {
    let missing = import_pages_from_path(fixture("no_such_file.json")).unwrap_err();
    assert!(missing.is_io());

    let invalid = import_pages("{\"pages\": 1}".as_bytes()).unwrap_err();
    assert!(!invalid.is_io());
    assert_ne!(missing.guidance(), invalid.guidance());
}

#[test]
fn single_page_data_import() {
    let data = import_page_data_from_path(fixture("single_text.json")).unwrap();
    let doc = pb_core::parse_document(&data).unwrap();
    assert_eq!(doc.len(), 2);
    let err = import_page_data_from_path(fixture("three_page_template.json")).unwrap_err();
    assert!(matches!(err, ImportError::Invalid(_)));
}
