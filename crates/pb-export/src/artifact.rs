//! Finished export files.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Png,
    Pdf,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Html => "text/html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Png => "PNG",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Html => "HTML",
        })
    }
}

/// A complete file, ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// `stem` is sanitized and given the format's extension.
    pub fn new(stem: &str, format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            filename: format!("{}.{}", sanitize_stem(stem), format.extension()),
            mime: format.mime(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Keep a filename stem portable: path separators and control characters
/// become `-`, a trailing extension-like dot is dropped, empty becomes
/// `page`.
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "page".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(Artifact::new("My Page", ExportFormat::Pdf, vec![]).filename, "My Page.pdf");
        assert_eq!(Artifact::new("a/b:c", ExportFormat::Png, vec![]).filename, "a-b-c.png");
        assert_eq!(Artifact::new("  ", ExportFormat::Json, vec![]).filename, "page.json");
        assert_eq!(Artifact::new("..", ExportFormat::Html, vec![]).filename, "page.html");
    }

    #[test]
    fn data_url() {
        let artifact = Artifact::new("x", ExportFormat::Json, b"{}".to_vec());
        assert_eq!(artifact.mime, "application/json");
        assert_eq!(artifact.to_data_url(), "data:application/json;base64,e30=");
    }
}
