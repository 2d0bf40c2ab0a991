//! JSON snapshot of the whole session, in the envelope the importer reads.

use crate::artifact::{Artifact, ExportFormat};
use crate::error::{ExportError, logged};
use chrono::{DateTime, Utc};
use pb_core::Page;
use serde::{Deserialize, Serialize};

pub const EXPORT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonExportOptions {
    /// Indent the output.
    pub pretty: bool,
}

impl Default for JsonExportOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub pages: Vec<Page>,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub total_pages: usize,
    pub exported_at: DateTime<Utc>,
}

impl ExportEnvelope {
    pub fn new(pages: &[Page], now: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION.to_string(),
            timestamp: now,
            pages: pages.to_vec(),
            metadata: ExportMetadata {
                total_pages: pages.len(),
                exported_at: now,
            },
        }
    }
}

/// Export `pages` as `<stem>.json`.
pub fn export_json(
    pages: &[Page],
    options: &JsonExportOptions,
    stem: &str,
) -> Result<Artifact, ExportError> {
    logged(encode(pages, options, Utc::now()).map(|bytes| Artifact::new(stem, ExportFormat::Json, bytes)))
}

fn encode(pages: &[Page], options: &JsonExportOptions, now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let envelope = ExportEnvelope::new(pages, now);
    let bytes = if options.pretty {
        serde_json::to_vec_pretty(&envelope)?
    } else {
        serde_json::to_vec(&envelope)?
    };
    log::debug!("JSON export: {} pages, {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn envelope_shape() {
        let pages = vec![Page::blank("Home"), Page::blank("About")];
        let artifact = export_json(&pages, &JsonExportOptions { pretty: false }, "site").unwrap();
        assert_eq!(artifact.filename, "site.json");
        assert_eq!(artifact.mime, "application/json");

        let value: Value = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["metadata"]["totalPages"], 2);
        assert_eq!(value["metadata"]["exportedAt"], value["timestamp"]);
        assert_eq!(value["pages"][1]["name"], "About");
        assert_eq!(value["pages"][0]["data"], "{}");
        assert!(value["pages"][0].get("createdAt").is_some());
    }

    #[test]
    fn envelope_round_trips() {
        let pages = vec![Page::blank("Home")];
        let artifact = export_json(&pages, &JsonExportOptions::default(), "x").unwrap();
        let back: ExportEnvelope = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(back.pages, pages);
    }
}
