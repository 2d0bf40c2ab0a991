//! Importing pages from files written by the JSON exporter.
//!
//! Imports are all-or-nothing: one bad page rejects the whole file. Errors
//! distinguish "could not read the file" from "read it, but it is not a
//! page export" (see [`ImportError::is_io`]).

use crate::error::ImportError;
use chrono::Utc;
use pb_core::error::json_kind;
use pb_core::page::parse_timestamp;
use pb_core::{Page, PageRecord};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read an export file (`{ "pages": [...] }`) into page records.
///
/// Every page must carry `id`, `name` and `data`. `updatedAt` is reset to
/// the import time; `createdAt` is kept when readable.
pub fn import_pages<R: Read>(reader: R) -> Result<Vec<Page>, ImportError> {
    import_pages_from_str(&read_text(reader)?)
}

pub fn import_pages_from_path(path: impl AsRef<Path>) -> Result<Vec<Page>, ImportError> {
    let file = File::open(path.as_ref())?;
    import_pages(BufReader::new(file))
}

/// Like [`import_pages`] for text already in memory (the web host reads
/// the file itself).
pub fn import_pages_from_str(text: &str) -> Result<Vec<Page>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let items = match &value {
        Value::Object(map) => match map.get("pages") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ImportError::Invalid(format!(
                    "`pages` must be an array, found {}",
                    json_kind(other)
                )));
            }
            None => return Err(ImportError::Invalid("missing `pages`".into())),
        },
        other => {
            return Err(ImportError::Invalid(format!(
                "expected an object with `pages`, found {}",
                json_kind(other)
            )));
        }
    };
    if items.is_empty() {
        return Err(ImportError::Invalid("the file contains no pages".into()));
    }

    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut pages = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let page = page_from_item(index, item, now)?;
        if !seen.insert(page.id.clone()) {
            return Err(ImportError::Invalid(format!(
                "page {} reuses id `{}`",
                index + 1,
                page.id
            )));
        }
        pages.push(page);
    }
    log::info!("imported {} pages", pages.len());
    Ok(pages)
}

fn page_from_item(
    index: usize,
    item: &Value,
    now: chrono::DateTime<Utc>,
) -> Result<Page, ImportError> {
    let number = index + 1;
    let Value::Object(map) = item else {
        return Err(ImportError::Invalid(format!(
            "page {number} must be an object, found {}",
            json_kind(item)
        )));
    };
    let missing: Vec<&str> = ["id", "name", "data"]
        .into_iter()
        .filter(|field| map.get(*field).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::Invalid(format!(
            "page {number} is missing {}",
            missing.join(", ")
        )));
    }

    let record: PageRecord = serde_json::from_value(item.clone())
        .map_err(|err| ImportError::Invalid(format!("page {number}: {err}")))?;
    let id = record
        .id_text()
        .ok_or_else(|| ImportError::Invalid(format!("page {number} has an empty or non-text id")))?;
    let name = match &record.name {
        Some(Value::String(name)) => name.clone(),
        _ => return Err(ImportError::Invalid(format!("page {number} has a non-text name"))),
    };
    let data = match &record.data {
        Some(Value::String(_) | Value::Object(_)) => record.data_text().unwrap_or_default(),
        other => {
            return Err(ImportError::Invalid(format!(
                "page {number} data must be text or an object, found {}",
                other.as_ref().map_or("nothing", json_kind)
            )));
        }
    };

    Ok(Page {
        id,
        name,
        data,
        created_at: record.created_at.as_ref().and_then(parse_timestamp).unwrap_or(now),
        updated_at: now,
        thumbnail: record.thumbnail,
    })
}

/// Read a single page document. The content must be a JSON object; it is
/// returned re-serialized, otherwise unchanged.
pub fn import_page_data<R: Read>(reader: R) -> Result<String, ImportError> {
    import_page_data_from_str(&read_text(reader)?)
}

pub fn import_page_data_from_path(path: impl AsRef<Path>) -> Result<String, ImportError> {
    let file = File::open(path.as_ref())?;
    import_page_data(BufReader::new(file))
}

pub fn import_page_data_from_str(text: &str) -> Result<String, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ImportError::Invalid(format!(
            "page data must be a JSON object, found {}",
            json_kind(&value)
        )));
    }
    Ok(value.to_string())
}

/// Read the whole file. Bytes that are not UTF-8 were read fine, so they
/// count as invalid content rather than an I/O failure.
fn read_text<R: Read>(mut reader: R) -> Result<String, ImportError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|err| ImportError::Invalid(format!("the file is not UTF-8 text: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_export_envelope() {
        let text = r#"{
            "version": "1.0",
            "timestamp": "2024-03-01T10:00:00Z",
            "pages": [
                { "id": "a", "name": "Home", "data": "{}", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-02T00:00:00Z" },
                { "id": "b", "name": "About", "data": { "ROOT": { "nodes": [], "parent": null } } }
            ],
            "metadata": { "totalPages": 2 }
        }"#;
        let pages = import_pages(text.as_bytes()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].name, "Home");
        assert_eq!(pages[0].created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(pages[0].updated_at > pages[0].created_at);
        assert_eq!(pages[1].data, r#"{"ROOT":{"nodes":[],"parent":null}}"#);
    }

    #[test]
    fn missing_field_rejects_whole_file() {
        let text = r#"{ "pages": [
            { "id": "ok", "name": "Fine", "data": "{}" },
            { "id": "a", "name": "A" }
        ] }"#;
        let err = import_pages(text.as_bytes()).unwrap_err();
        assert!(!err.is_io());
        assert!(err.to_string().contains("page 2 is missing data"));
    }

    #[test]
    fn non_utf8_bytes_are_validation_level() {
        let mut bytes = br#"{ "pages": [ { "id": "a", "name": "A", "data": "{}" } ] }"#.to_vec();
        bytes.insert(30, 0xff);
        let err = import_pages(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, ImportError::Invalid(_)), "{err}");
        assert!(!err.is_io());
        assert!(!err.guidance().contains("could not be opened"));

        let err = import_page_data(&[0x7b_u8, 0xff, 0x7d][..]).unwrap_err();
        assert!(!err.is_io());
    }

    #[test]
    fn shape_errors_are_validation_level() {
        for text in ["[]", r#"{ "pages": {} }"#, r#"{ "pages": [] }"#, r#"{ "pages": [3] }"#] {
            let err = import_pages(text.as_bytes()).unwrap_err();
            assert!(matches!(err, ImportError::Invalid(_)), "{text}: {err}");
        }
        let err = import_pages("not json".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
        assert!(!err.is_io());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = r#"{ "pages": [
            { "id": "a", "name": "A", "data": "{}" },
            { "id": "a", "name": "B", "data": "{}" }
        ] }"#;
        assert!(import_pages(text.as_bytes()).is_err());
    }

    #[test]
    fn unreadable_file_is_io() {
        let err = import_pages_from_path("/definitely/not/here.json").unwrap_err();
        assert!(err.is_io());
        assert!(err.guidance().contains("could not be opened"));
    }

    #[test]
    fn page_data_is_normalized() {
        let data = import_page_data(r#"{ "ROOT" :  { "nodes" : [] } }"#.as_bytes()).unwrap();
        assert_eq!(data, r#"{"ROOT":{"nodes":[]}}"#);
        assert!(matches!(
            import_page_data("[1]".as_bytes()),
            Err(ImportError::Invalid(_))
        ));
    }
}
