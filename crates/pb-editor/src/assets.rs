//! Uploaded media. Assets live beside the pages, not inside them: node
//! props refer to an asset only by its `url`.

use crate::error::AssetError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use uuid::Uuid;

/// Default per-file upload limit (10 MiB).
pub const DEFAULT_MAX_ASSET_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl AssetKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.split_once('/').map(|(top, _)| top) {
            Some("image") => AssetKind::Image,
            Some("video") => AssetKind::Video,
            Some("audio") => AssetKind::Audio,
            _ if mime == "application/pdf" || mime.starts_with("text/") => AssetKind::Document,
            _ => AssetKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    /// `data:` URL carrying the bytes.
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub mime: String,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A file handed to [`AssetStore::upload`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct AssetStore {
    assets: Vec<Asset>,
    max_bytes: usize,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_ASSET_BYTES)
    }

    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            assets: Vec::new(),
            max_bytes,
        }
    }

    /// Store `files`, newest first in [`AssetStore::list`]. The batch is
    /// checked up front: one rejected file rejects the whole upload.
    pub fn upload(&mut self, files: Vec<UploadFile>) -> Result<Vec<Asset>, AssetError> {
        for file in &files {
            if file.bytes.is_empty() {
                return Err(AssetError::Empty(file.name.clone()));
            }
            if file.bytes.len() > self.max_bytes {
                return Err(AssetError::TooLarge {
                    name: file.name.clone(),
                    size: file.bytes.len(),
                    limit: self.max_bytes,
                });
            }
        }
        let uploaded: Vec<Asset> = files.into_iter().map(to_asset).collect();
        for asset in &uploaded {
            log::debug!("stored asset {} ({}, {} bytes)", asset.id, asset.mime, asset.size);
            self.assets.insert(0, asset.clone());
        }
        Ok(uploaded)
    }

    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn list(&self) -> &[Asset] {
        &self.assets
    }

    pub fn by_kind(&self, kind: AssetKind) -> impl Iterator<Item = &Asset> + '_ {
        self.assets.iter().filter(move |a| a.kind == kind)
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Asset> + 'a {
        self.assets.iter().filter(move |a| a.tags.iter().any(|t| t == tag))
    }

    /// Add a tag (no duplicates).
    pub fn tag(&mut self, id: &str, tag: &str) -> Result<(), AssetError> {
        let asset = self
            .assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AssetError::NotFound(id.to_string()))?;
        if !asset.tags.iter().any(|t| t == tag) {
            asset.tags.push(tag.to_string());
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Asset, AssetError> {
        let index = self
            .assets
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AssetError::NotFound(id.to_string()))?;
        Ok(self.assets.remove(index))
    }
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_asset(file: UploadFile) -> Asset {
    let kind = AssetKind::from_mime(&file.mime);
    let (width, height) = match kind {
        AssetKind::Image => match probe_dimensions(&file.bytes) {
            Some((w, h)) => (Some(w), Some(h)),
            None => {
                log::warn!("could not read dimensions of image {}", file.name);
                (None, None)
            }
        },
        _ => (None, None),
    };
    Asset {
        id: format!("asset-{}", Uuid::new_v4().simple()),
        url: data_url(&file.mime, &file.bytes),
        kind,
        size: file.bytes.len(),
        width,
        height,
        created_at: Utc::now(),
        tags: Vec::new(),
        name: file.name,
        mime: file.mime,
    }
}

/// Pixel size from the image header, without decoding the pixels.
fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
