//! Page records: named, timestamped containers for one serialized document.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Page data for a page that has never been edited. The canvas layer
/// treats it as "render the default root only".
pub const EMPTY_PAGE_DATA: &str = "{}";

/// One page of the session.
///
/// `data` is the canonical at-rest form (document JSON text). The live
/// canvas is the working copy for whichever page is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub name: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Cached raster preview (data URL). Derived, never authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Page {
    /// A new page with a fresh id.
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_page_id(),
            name: name.into(),
            data: data.into(),
            created_at: now,
            updated_at: now,
            thumbnail: None,
        }
    }

    /// A new page with empty document data.
    pub fn blank(name: impl Into<String>) -> Self {
        Self::new(name, EMPTY_PAGE_DATA)
    }

    /// Whether the page holds no document text at all.
    pub fn has_data(&self) -> bool {
        !self.data.trim().is_empty()
    }

    /// Replace the document text. Bumps `updated_at` only when the text
    /// actually changed; returns whether it did.
    pub fn set_data(&mut self, data: String) -> bool {
        if self.data == data {
            return false;
        }
        self.data = data;
        self.touch();
        true
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        // Never move backwards, even if the wall clock does.
        self.updated_at = now.max(self.updated_at);
    }
}

/// A fresh page id (`page-<uuid>`).
pub fn new_page_id() -> String {
    format!("page-{}", Uuid::new_v4().simple())
}

/// Lenient page-like input: every field optional, `data` may be a string
/// or an inline document object. Template and import payloads are read
/// into this shape and then normalized with their own rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl PageRecord {
    /// The id as a string, if present and non-empty. Numeric ids are accepted.
    pub fn id_text(&self) -> Option<String> {
        scalar_text(self.id.as_ref()?)
    }

    pub fn name_text(&self) -> Option<String> {
        scalar_text(self.name.as_ref()?)
    }

    /// `data` as document text: strings verbatim, objects re-serialized.
    /// `null` counts as absent.
    pub fn data_text(&self) -> Option<String> {
        match self.data.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a timestamp written either as RFC 3339 text or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_page_has_empty_document() {
        let page = Page::blank("Page 1");
        assert_eq!(page.data, "{}");
        assert!(page.id.starts_with("page-"));
        assert_eq!(page.created_at, page.updated_at);
    }

    #[test]
    fn set_data_only_bumps_on_change() {
        let mut page = Page::blank("Home");
        let before = page.updated_at;
        assert!(!page.set_data("{}".into()));
        assert_eq!(page.updated_at, before);
        assert!(page.set_data("{\"ROOT\":{}}".into()));
        assert!(page.updated_at >= before);
    }

    #[test]
    fn page_ids_are_unique() {
        assert_ne!(Page::blank("a").id, Page::blank("a").id);
    }

    #[test]
    fn serde_uses_camel_case() {
        let page = Page::blank("Home");
        let value = serde_json::to_value(&page).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("thumbnail").is_none());
        let back: Page = serde_json::from_value(value).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn record_data_is_coerced_to_text() {
        let record: PageRecord =
            serde_json::from_value(json!({ "data": { "ROOT": { "nodes": [] } } })).unwrap();
        assert_eq!(record.data_text().unwrap(), r#"{"ROOT":{"nodes":[]}}"#);
        let record: PageRecord = serde_json::from_value(json!({ "data": "{}" })).unwrap();
        assert_eq!(record.data_text().unwrap(), "{}");
        let record: PageRecord = serde_json::from_value(json!({ "data": null })).unwrap();
        assert_eq!(record.data_text(), None);
    }

    #[test]
    fn timestamps_accept_text_and_millis() {
        let a = parse_timestamp(&json!("2024-03-01T10:00:00Z")).unwrap();
        let b = parse_timestamp(&json!(1_709_287_200_000i64)).unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp(&json!("yesterday")).is_none());
    }
}
