//! Template loading: turning an opaque template payload into session state.
//!
//! A payload is either one document (a JSON object with a `ROOT` record),
//! or a page collection: a non-empty JSON array of page-like records, or an
//! export envelope `{ "pages": [...] }`. Collections replace the whole
//! session; single documents replace the current page's canvas.
//!
//! Payloads arrive from three places, all funnelled through
//! [`TemplateLoader`]: the host's initial data, a catalog lookup by
//! template id, or a value parked in session storage between wizard steps.
//! Failures never escape as panics; they go to [`TemplateHooks::on_error`]
//! and the returned `Result`, and leave the session as it was.

use crate::error::TemplateError;
use crate::session::PageSession;
use chrono::Utc;
use pb_core::error::json_kind;
use pb_core::page::parse_timestamp;
use pb_core::{EMPTY_PAGE_DATA, Page, PageRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

// ─── Host callbacks ──────────────────────────────────────────────────────

/// Notifications from a template load. All methods default to no-ops.
pub trait TemplateHooks {
    /// The template was applied. `template_id` is `None` for anonymous
    /// initial data.
    fn on_loaded(&mut self, _template_id: Option<&str>, _page_count: usize) {}

    /// The template could not be applied; `message` is meant for people.
    fn on_error(&mut self, _message: &str) {}

    /// A multi-page template was loaded; the host should reveal its page
    /// navigator so pages 2..N are not silently hidden.
    fn on_multi_page(&mut self, _page_count: usize) {}
}

/// Hooks that ignore everything.
pub struct NoHooks;

impl TemplateHooks for NoHooks {}

// ─── Payload shapes ──────────────────────────────────────────────────────

/// A parsed template payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePayload {
    /// One document, kept as text for the canvas.
    SinglePage(String),
    MultiPage(Vec<Page>),
}

impl TemplatePayload {
    pub fn page_count(&self) -> usize {
        match self {
            TemplatePayload::SinglePage(_) => 1,
            TemplatePayload::MultiPage(pages) => pages.len(),
        }
    }
}

/// Classify and normalize a raw payload.
pub fn parse_template(text: &str) -> Result<TemplatePayload, TemplateError> {
    let value: Value = serde_json::from_str(text)?;
    match &value {
        Value::Array(items) if !items.is_empty() => pages_from_records(items).map(TemplatePayload::MultiPage),
        // An empty array falls through to the single-page branch, where the
        // canvas rejects it.
        Value::Array(_) => Ok(TemplatePayload::SinglePage(text.to_string())),
        Value::Object(map) if !map.contains_key("ROOT") => match map.get("pages") {
            Some(Value::Array(items)) if !items.is_empty() => {
                pages_from_records(items).map(TemplatePayload::MultiPage)
            }
            _ => Ok(TemplatePayload::SinglePage(text.to_string())),
        },
        Value::Object(_) => Ok(TemplatePayload::SinglePage(text.to_string())),
        other => Err(TemplateError::UnsupportedShape(json_kind(other))),
    }
}

/// Normalize page-like records: `id` defaults to `page-{n}`, `name` to
/// `Page {n}`, object `data` is serialized to text, missing timestamps are
/// "now".
fn pages_from_records(items: &[Value]) -> Result<Vec<Page>, TemplateError> {
    let now = Utc::now();
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(TemplateError::InvalidRecord {
                    index,
                    reason: format!("expected a page object, found {}", json_kind(item)),
                });
            }
            let record: PageRecord =
                serde_json::from_value(item.clone()).map_err(|err| TemplateError::InvalidRecord {
                    index,
                    reason: err.to_string(),
                })?;
            let number = index + 1;
            Ok(Page {
                id: record.id_text().unwrap_or_else(|| format!("page-{number}")),
                name: record.name_text().unwrap_or_else(|| format!("Page {number}")),
                data: record
                    .data_text()
                    .unwrap_or_else(|| EMPTY_PAGE_DATA.to_string()),
                created_at: record.created_at.as_ref().and_then(parse_timestamp).unwrap_or(now),
                updated_at: record.updated_at.as_ref().and_then(parse_timestamp).unwrap_or(now),
                thumbnail: record.thumbnail,
            })
        })
        .collect()
}

// ─── Catalog and storage ─────────────────────────────────────────────────

/// A template the user can pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub payload: String,
}

/// Source of templates looked up by id.
pub trait TemplateCatalog {
    fn get(&self, id: &str) -> Option<&TemplateEntry>;
    fn list(&self) -> Vec<&TemplateEntry>;
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: Vec<TemplateEntry>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry with the same id.
    pub fn insert(&mut self, entry: TemplateEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

impl TemplateCatalog for InMemoryCatalog {
    fn get(&self, id: &str) -> Option<&TemplateEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn list(&self) -> Vec<&TemplateEntry> {
        self.entries.iter().collect()
    }
}

/// String key/value storage that outlives one view (browser session
/// storage in the web host).
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
    fn remove_item(&mut self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl SessionStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// Storage key of a template chosen in one step and applied in the next.
pub const PARKED_TEMPLATE_KEY: &str = "pageBuilder.selectedTemplate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkedTemplate {
    #[serde(default)]
    pub template_id: Option<String>,
    pub payload: String,
}

/// Park a template payload for a later step.
pub fn park_template(store: &mut dyn SessionStore, template_id: Option<&str>, payload: &str) {
    let parked = ParkedTemplate {
        template_id: template_id.map(str::to_string),
        payload: payload.to_string(),
    };
    match serde_json::to_string(&parked) {
        Ok(value) => store.set_item(PARKED_TEMPLATE_KEY, value),
        Err(err) => log::error!("could not park template: {err}"),
    }
}

/// The parked template, if any, left in place. A value that is not a
/// parked-template record is treated as a bare payload.
pub fn peek_parked_template(store: &dyn SessionStore) -> Option<ParkedTemplate> {
    let raw = store.get_item(PARKED_TEMPLATE_KEY)?;
    Some(
        serde_json::from_str::<ParkedTemplate>(&raw).unwrap_or(ParkedTemplate {
            template_id: None,
            payload: raw,
        }),
    )
}

/// Remove and return the parked template, if any.
pub fn take_parked_template(store: &mut dyn SessionStore) -> Option<ParkedTemplate> {
    let parked = peek_parked_template(store)?;
    store.remove_item(PARKED_TEMPLATE_KEY);
    Some(parked)
}

// ─── Loader ──────────────────────────────────────────────────────────────

/// What a load did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOutcome {
    /// This payload was already applied in this loader's lifetime.
    AlreadyApplied,
    SinglePage,
    MultiPage { page_count: usize },
}

/// Applies templates to a session, at most once per distinct template.
#[derive(Debug, Default)]
pub struct TemplateLoader {
    applied: Option<AppliedKey>,
    loaded_template_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AppliedKey {
    Id(String),
    Fingerprint(u64),
}

impl TemplateLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the last template applied, if it had one.
    pub fn loaded_template_id(&self) -> Option<&str> {
        self.loaded_template_id.as_deref()
    }

    /// Forget what was applied so the same payload can be loaded again.
    pub fn reset(&mut self) {
        self.applied = None;
        self.loaded_template_id = None;
    }

    /// Apply initial data supplied by the host. Calling this again with the
    /// same payload (e.g. on a re-render) does nothing.
    pub fn load_initial(
        &mut self,
        session: &mut PageSession,
        payload: &str,
        hooks: &mut dyn TemplateHooks,
    ) -> Result<TemplateOutcome, TemplateError> {
        self.load(session, None, payload, hooks)
    }

    /// Look up `template_id` in `catalog` and apply it.
    pub fn load_from_catalog(
        &mut self,
        session: &mut PageSession,
        catalog: &dyn TemplateCatalog,
        template_id: &str,
        hooks: &mut dyn TemplateHooks,
    ) -> Result<TemplateOutcome, TemplateError> {
        let Some(entry) = catalog.get(template_id) else {
            let err = TemplateError::NotFound(template_id.to_string());
            hooks.on_error(&err.to_string());
            return Err(err);
        };
        self.load(session, Some(template_id), &entry.payload, hooks)
    }

    /// Apply the template parked in `store`. It is consumed only once the
    /// load succeeds; a failed load leaves it parked. `Ok(None)` when
    /// nothing is parked.
    pub fn load_parked(
        &mut self,
        session: &mut PageSession,
        store: &mut dyn SessionStore,
        hooks: &mut dyn TemplateHooks,
    ) -> Result<Option<TemplateOutcome>, TemplateError> {
        let Some(parked) = peek_parked_template(store) else {
            return Ok(None);
        };
        let outcome = self.load(session, parked.template_id.as_deref(), &parked.payload, hooks)?;
        store.remove_item(PARKED_TEMPLATE_KEY);
        Ok(Some(outcome))
    }

    fn load(
        &mut self,
        session: &mut PageSession,
        template_id: Option<&str>,
        payload: &str,
        hooks: &mut dyn TemplateHooks,
    ) -> Result<TemplateOutcome, TemplateError> {
        let key = match template_id {
            Some(id) => AppliedKey::Id(id.to_string()),
            None => AppliedKey::Fingerprint(fingerprint(payload)),
        };
        if self.applied.as_ref() == Some(&key) {
            log::debug!("template already applied; skipping");
            return Ok(TemplateOutcome::AlreadyApplied);
        }

        match apply_payload(session, payload, hooks) {
            Ok(outcome) => {
                self.applied = Some(key);
                self.loaded_template_id = template_id.map(str::to_string);
                let count = match &outcome {
                    TemplateOutcome::MultiPage { page_count } => *page_count,
                    _ => 1,
                };
                log::info!("template {} loaded ({count} pages)", template_id.unwrap_or("<initial>"));
                hooks.on_loaded(template_id, count);
                Ok(outcome)
            }
            Err(err) => {
                log::warn!("template could not be loaded: {err}");
                hooks.on_error(&err.to_string());
                Err(err)
            }
        }
    }
}

/// Parse `payload` and apply it. Nothing is changed unless parsing (and,
/// for a single page, the document itself) succeeds.
fn apply_payload(
    session: &mut PageSession,
    payload: &str,
    hooks: &mut dyn TemplateHooks,
) -> Result<TemplateOutcome, TemplateError> {
    match parse_template(payload)? {
        TemplatePayload::MultiPage(pages) => {
            let page_count = pages.len();
            session.load_pages(pages, None);
            hooks.on_multi_page(page_count);
            Ok(TemplateOutcome::MultiPage { page_count })
        }
        TemplatePayload::SinglePage(text) => {
            session.replace_current_document(&text)?;
            Ok(TemplateOutcome::SinglePage)
        }
    }
}

fn fingerprint(payload: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    payload.hash(&mut hasher);
    hasher.finish()
}
