//! WASM bridge for the page builder: exposes the Rust session engine to the
//! browser editor.
//!
//! Compiled via `wasm-pack build --target web`. Structured values cross the
//! boundary as JSON strings; binary exports cross as byte arrays. Raster
//! exports take pixels the host has already rendered (RGBA8, row-major).

use pb_core::document::parse_document_with_report;
use pb_core::validate::{Severity, report_diagnostics, validate_document};
use pb_core::{BlockKind, DeviceMode, NodeId, ZoomConfig, ZoomState, registry};
use pb_editor::assets::UploadFile;
use pb_editor::import::{import_page_data_from_str, import_pages_from_str};
use pb_editor::template::{TemplateEntry, park_template};
use pb_editor::{
    AssetStore, CanvasMutation, InMemoryCatalog, MemoryStore, PageSession, SessionConfig,
    TemplateHooks, TemplateLoader, TemplateOutcome,
};
use pb_export::{
    Artifact, HtmlOptions, JsonExportOptions, PdfOptions, PngOptions, RasterSurface,
    RenderedSurface,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;

/// The main WASM-facing editor controller.
///
/// Owns the page session, template loader, viewport state and asset store.
/// All interaction from the browser goes through this struct.
#[wasm_bindgen]
pub struct PageBuilder {
    session: PageSession,
    templates: TemplateLoader,
    catalog: InMemoryCatalog,
    /// Session storage stand-in for templates parked between wizard steps.
    storage: MemoryStore,
    assets: AssetStore,
    zoom: ZoomState,
    device: DeviceMode,
}

#[wasm_bindgen]
impl PageBuilder {
    /// Create an editor with one blank page. `config_json` is a
    /// `SessionConfig` as JSON; empty means defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<PageBuilder, JsError> {
        console_error_panic_hook_setup();
        let config: SessionConfig = parse_options(config_json)?;
        Ok(Self {
            session: PageSession::new(config),
            templates: TemplateLoader::new(),
            catalog: InMemoryCatalog::new(),
            storage: MemoryStore::default(),
            assets: AssetStore::new(),
            zoom: ZoomState::new(ZoomConfig::default()),
            device: DeviceMode::default(),
        })
    }

    // ─── Pages ───────────────────────────────────────────────────────────

    /// The page list as a JSON array of page records.
    pub fn pages_json(&self) -> String {
        to_json(&self.session.pages())
    }

    pub fn current_page_id(&self) -> String {
        self.session.current_page_id().to_string()
    }

    pub fn switch_to_page(&mut self, page_id: &str) -> Result<(), JsError> {
        Ok(self.session.switch_to_page(page_id)?)
    }

    /// Append a page and switch to it. Returns the new page id.
    pub fn add_page(&mut self, name: Option<String>) -> Result<String, JsError> {
        Ok(self.session.add_page(name.as_deref())?)
    }

    pub fn duplicate_page(&mut self, page_id: &str) -> Result<String, JsError> {
        Ok(self.session.duplicate_page(page_id)?)
    }

    pub fn delete_page(&mut self, page_id: &str) -> Result<(), JsError> {
        Ok(self.session.delete_page(page_id)?)
    }

    pub fn rename_page(&mut self, page_id: &str, name: &str) -> Result<(), JsError> {
        Ok(self.session.rename_page(page_id, name)?)
    }

    pub fn reorder_pages(&mut self, from: usize, to: usize) -> Result<(), JsError> {
        Ok(self.session.reorder_pages(from, to)?)
    }

    pub fn set_thumbnail(&mut self, page_id: &str, data_url: Option<String>) -> Result<(), JsError> {
        Ok(self.session.set_thumbnail(page_id, data_url)?)
    }

    /// Session events since the last call, as a JSON array.
    pub fn drain_events(&mut self) -> String {
        to_json(&self.session.drain_events())
    }

    // ─── Canvas ──────────────────────────────────────────────────────────

    /// The live canvas as page data.
    pub fn document_json(&self) -> String {
        self.session.canvas().serialize()
    }

    /// Replace the current page's canvas. Returns `true` when nothing had
    /// to be repaired on the way in.
    pub fn set_document(&mut self, data: &str) -> Result<bool, JsError> {
        Ok(self.session.replace_current_document(data)?.is_clean())
    }

    /// Drop a palette block (`"TextBlock"`, or a legacy `"Text"`) into
    /// `parent_id`. Returns the new node id.
    pub fn add_block(
        &mut self,
        parent_id: &str,
        block_name: &str,
        index: Option<usize>,
    ) -> Result<String, JsError> {
        let kind = block_kind(block_name).map_err(|e| JsError::new(&e))?;
        let id = self.session.add_block(NodeId::intern(parent_id), kind, index)?;
        Ok(id.as_str().to_string())
    }

    pub fn remove_node(&mut self, node_id: &str) -> Result<(), JsError> {
        let id = NodeId::intern(node_id);
        Ok(self
            .session
            .apply(CanvasMutation::RemoveNode { id }, "Delete block")?)
    }

    pub fn move_node(&mut self, node_id: &str, parent_id: &str, index: usize) -> Result<(), JsError> {
        let mutation = CanvasMutation::MoveNode {
            id: NodeId::intern(node_id),
            parent: NodeId::intern(parent_id),
            index,
        };
        Ok(self.session.apply(mutation, "Move block")?)
    }

    /// Set one prop by dotted path. `value_json` is any JSON value.
    pub fn set_prop(&mut self, node_id: &str, path: &str, value_json: &str) -> Result<(), JsError> {
        let value: Value = serde_json::from_str(value_json)?;
        let mutation = CanvasMutation::SetProp {
            id: NodeId::intern(node_id),
            path: path.to_string(),
            value,
        };
        Ok(self.session.apply(mutation, &format!("Edit {path}"))?)
    }

    pub fn set_display_name(&mut self, node_id: &str, name: &str) -> Result<(), JsError> {
        let mutation = CanvasMutation::SetDisplayName {
            id: NodeId::intern(node_id),
            name: name.to_string(),
        };
        Ok(self.session.apply(mutation, "Rename layer")?)
    }

    pub fn set_hidden(&mut self, node_id: &str, hidden: bool) -> Result<(), JsError> {
        let id = NodeId::intern(node_id);
        Ok(self
            .session
            .apply(CanvasMutation::SetHidden { id, hidden }, "Toggle visibility")?)
    }

    pub fn set_locked(&mut self, node_id: &str, locked: bool) -> Result<(), JsError> {
        let id = NodeId::intern(node_id);
        Ok(self
            .session
            .apply(CanvasMutation::SetLocked { id, locked }, "Toggle lock")?)
    }

    pub fn is_hidden(&self, node_id: &str) -> bool {
        self.session.canvas().is_hidden(NodeId::intern(node_id))
    }

    pub fn is_locked(&self, node_id: &str) -> bool {
        self.session.canvas().is_locked(NodeId::intern(node_id))
    }

    /// Start grouping edits (a drag, a slider) into one undo step.
    pub fn begin_gesture(&mut self, description: &str) {
        self.session.begin_gesture(description);
    }

    pub fn end_gesture(&mut self) {
        self.session.end_gesture();
    }

    /// Undo the last edit. Returns its description, or `undefined`.
    pub fn undo(&mut self) -> Option<String> {
        self.session.undo()
    }

    pub fn redo(&mut self) -> Option<String> {
        self.session.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    // ─── Saving ──────────────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    /// Write the canvas into the current page now. Returns `true` if the
    /// page data changed.
    pub fn save_current_page(&mut self) -> bool {
        self.session.save_current_page()
    }

    /// Call after every edit with `Date.now()`.
    pub fn schedule_auto_save(&mut self, now_ms: f64) {
        self.session.schedule_auto_save(millis(now_ms));
    }

    /// Call from a timer with `Date.now()`. Returns `true` if a save fired.
    pub fn poll_auto_save(&mut self, now_ms: f64) -> bool {
        self.session.poll_auto_save(millis(now_ms))
    }

    /// [`schedule_auto_save`](Self::schedule_auto_save) with the browser clock.
    pub fn schedule_auto_save_now(&mut self) {
        self.session.schedule_auto_save(millis(js_sys::Date::now()));
    }

    /// [`poll_auto_save`](Self::poll_auto_save) with the browser clock.
    pub fn poll_auto_save_now(&mut self) -> bool {
        self.session.poll_auto_save(millis(js_sys::Date::now()))
    }

    // ─── Templates ───────────────────────────────────────────────────────

    /// Make a template available to `load_template`.
    pub fn register_template(&mut self, id: &str, name: &str, category: Option<String>, payload: String) {
        self.catalog.insert(TemplateEntry {
            id: id.to_string(),
            name: name.to_string(),
            category,
            payload,
        });
    }

    /// Apply the host's initial data. Returns a JSON outcome.
    pub fn load_initial(&mut self, payload: &str) -> Result<String, JsError> {
        let mut hooks = ConsoleHooks;
        let outcome = self
            .templates
            .load_initial(&mut self.session, payload, &mut hooks)?;
        Ok(outcome_json(&outcome))
    }

    /// Apply a registered template by id. Returns a JSON outcome.
    pub fn load_template(&mut self, template_id: &str) -> Result<String, JsError> {
        let mut hooks = ConsoleHooks;
        let outcome =
            self.templates
                .load_from_catalog(&mut self.session, &self.catalog, template_id, &mut hooks)?;
        Ok(outcome_json(&outcome))
    }

    /// Park a payload for the next `load_parked` (e.g. across a wizard step).
    pub fn park_template(&mut self, template_id: Option<String>, payload: &str) {
        park_template(&mut self.storage, template_id.as_deref(), payload);
    }

    /// Apply and consume the parked template. Returns `undefined` when none
    /// is parked.
    pub fn load_parked(&mut self) -> Result<Option<String>, JsError> {
        let mut hooks = ConsoleHooks;
        let outcome = self
            .templates
            .load_parked(&mut self.session, &mut self.storage, &mut hooks)?;
        Ok(outcome.as_ref().map(outcome_json))
    }

    // ─── Import ──────────────────────────────────────────────────────────

    /// Replace every page with those in an exported project file.
    pub fn import_pages(&mut self, text: &str) -> Result<usize, JsError> {
        let pages = import_pages_from_str(text)?;
        let count = pages.len();
        self.session.load_pages(pages, None);
        Ok(count)
    }

    /// Load one page's document into the current canvas.
    pub fn import_page_data(&mut self, text: &str) -> Result<(), JsError> {
        let data = import_page_data_from_str(text)?;
        self.session.replace_current_document(&data)?;
        Ok(())
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// All pages (live canvas included) as a JSON project file.
    pub fn export_json(&mut self, options_json: &str, stem: &str) -> Result<ExportedFile, JsError> {
        let options: JsonExportOptions = parse_options(options_json)?;
        let pages = self.session.flush();
        Ok(pb_export::export_json(pages, &options, stem)?.into())
    }

    pub fn export_html(&mut self, options_json: &str, stem: &str) -> Result<ExportedFile, JsError> {
        let options: HtmlOptions = parse_options(options_json)?;
        let current = self.session.current_page_id().to_string();
        let pages = self.session.flush();
        Ok(pb_export::export_html(pages, &current, &options, stem)?.into())
    }

    /// PNG of one page the host rendered to `rgba` at 1×.
    pub fn export_png(
        &self,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
        options_json: &str,
        stem: &str,
    ) -> Result<ExportedFile, JsError> {
        let options: PngOptions = parse_options(options_json)?;
        let surface = RasterSurface::from_rgba(width, height, rgba)?;
        Ok(pb_export::export_png(Some(&surface), &options, stem)?.into())
    }

    /// One PDF page per rendered frame. `rgba` holds every frame back to
    /// back; `widths[i]`/`heights[i]` give frame `i`'s size.
    pub fn export_pdf(
        &self,
        widths: Vec<u32>,
        heights: Vec<u32>,
        rgba: Vec<u8>,
        options_json: &str,
        stem: &str,
    ) -> Result<ExportedFile, JsError> {
        let options: PdfOptions = parse_options(options_json)?;
        let frames = split_frames(&widths, &heights, &rgba).map_err(|e| JsError::new(&e))?;
        let surfaces = frames
            .into_iter()
            .map(|(w, h, bytes)| RasterSurface::from_rgba(w, h, bytes))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&dyn RenderedSurface> =
            surfaces.iter().map(|s| s as &dyn RenderedSurface).collect();
        Ok(pb_export::export_pdf(&refs, &options, stem)?.into())
    }

    /// Render a thumbnail for `page_id` from pixels and store it on the page.
    pub fn update_thumbnail(
        &mut self,
        page_id: &str,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
        max_width: u32,
    ) -> Result<(), JsError> {
        let surface = RasterSurface::from_rgba(width, height, rgba)?;
        let url = pb_export::render_thumbnail(&surface, max_width)?;
        Ok(self.session.set_thumbnail(page_id, Some(url))?)
    }

    // ─── Assets ──────────────────────────────────────────────────────────

    /// Upload one file. Returns the stored asset as JSON.
    pub fn upload_asset(&mut self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<String, JsError> {
        let file = UploadFile {
            name: name.to_string(),
            mime: mime.to_string(),
            bytes,
        };
        let assets = self.assets.upload(vec![file])?;
        Ok(to_json(&assets.first()))
    }

    pub fn assets_json(&self) -> String {
        to_json(&self.assets.list())
    }

    pub fn tag_asset(&mut self, asset_id: &str, tag: &str) -> Result<(), JsError> {
        Ok(self.assets.tag(asset_id, tag)?)
    }

    pub fn remove_asset(&mut self, asset_id: &str) -> Result<(), JsError> {
        self.assets.remove(asset_id)?;
        Ok(())
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn zoom_level(&self) -> f32 {
        self.zoom.level()
    }

    pub fn zoom_percent(&self) -> u32 {
        self.zoom.percent()
    }

    pub fn set_zoom(&mut self, level: f32) -> f32 {
        self.zoom.set(level)
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.zoom.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.zoom.zoom_out()
    }

    pub fn reset_zoom(&mut self) -> f32 {
        self.zoom.reset()
    }

    /// Zoom so the current device width fits `available_width`.
    pub fn fit_to_width(&mut self, available_width: f32) -> f32 {
        let content = self.device.viewport().width;
        self.zoom.fit_to_width(content, available_width)
    }

    pub fn device_mode(&self) -> String {
        self.device.name().to_string()
    }

    /// Returns `false` for an unknown mode name.
    pub fn set_device_mode(&mut self, name: &str) -> bool {
        match DeviceMode::from_name(name) {
            Some(mode) => {
                self.device = mode;
                true
            }
            None => false,
        }
    }

    pub fn cycle_device_mode(&mut self) -> String {
        self.device = self.device.cycle();
        self.device_mode()
    }

    /// `{"width":..,"height":..}` of the current device.
    pub fn viewport_json(&self) -> String {
        to_json(&self.device.viewport())
    }
}

/// A finished export, handed to the browser for download.
#[wasm_bindgen]
pub struct ExportedFile {
    filename: String,
    mime: String,
    bytes: Vec<u8>,
}

#[wasm_bindgen]
impl ExportedFile {
    #[wasm_bindgen(getter)]
    pub fn filename(&self) -> String {
        self.filename.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime(&self) -> String {
        self.mime.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl From<Artifact> for ExportedFile {
    fn from(artifact: Artifact) -> Self {
        Self {
            filename: artifact.filename,
            mime: artifact.mime.to_string(),
            bytes: artifact.bytes,
        }
    }
}

// ─── Template hooks ──────────────────────────────────────────────────────

/// The loader already logs loads and failures; the JS side reads the
/// returned outcome instead of callbacks.
struct ConsoleHooks;

impl TemplateHooks for ConsoleHooks {
    fn on_multi_page(&mut self, page_count: usize) {
        log::info!("multi-page template with {page_count} pages; page navigator should open");
    }
}

fn outcome_json(outcome: &TemplateOutcome) -> String {
    let value = match outcome {
        TemplateOutcome::AlreadyApplied => json!({ "outcome": "alreadyApplied" }),
        TemplateOutcome::SinglePage => json!({ "outcome": "singlePage", "pageCount": 1 }),
        // The host should reveal its page navigator for these.
        TemplateOutcome::MultiPage { page_count } => {
            json!({ "outcome": "multiPage", "pageCount": page_count })
        }
    };
    value.to_string()
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Empty or whitespace-only means `T::default()`.
fn parse_options<T: DeserializeOwned + Default>(json: &str) -> Result<T, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(json)
}

fn millis(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 {
        now_ms as u64
    } else {
        0
    }
}

fn block_kind(name: &str) -> Result<BlockKind, String> {
    registry::resolve(name)
        .map(|spec| spec.kind)
        .ok_or_else(|| format!("unknown block type `{name}`"))
}

/// Cut a back-to-back RGBA buffer into `(width, height, bytes)` frames.
fn split_frames(widths: &[u32], heights: &[u32], rgba: &[u8]) -> Result<Vec<(u32, u32, Vec<u8>)>, String> {
    if widths.len() != heights.len() {
        return Err(format!(
            "{} widths but {} heights",
            widths.len(),
            heights.len()
        ));
    }
    let mut frames = Vec::with_capacity(widths.len());
    let mut offset = 0usize;
    for (&w, &h) in widths.iter().zip(heights) {
        let len = w as usize * h as usize * 4;
        let Some(bytes) = rgba.get(offset..offset + len) else {
            return Err(format!(
                "pixel buffer ends at {} bytes; frame {} needs {offset}..{}",
                rgba.len(),
                frames.len() + 1,
                offset + len
            ));
        };
        frames.push((w, h, bytes.to_vec()));
        offset += len;
    }
    if offset != rgba.len() {
        return Err(format!("{} trailing bytes after the last frame", rgba.len() - offset));
    }
    Ok(frames)
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Page builder WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no editor needed) ─────────────────────────────

/// Check page data without loading it. Returns JSON:
/// `{"ok":true,"diagnostics":[...]}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(page_data: &str) -> String {
    match parse_document_with_report(page_data) {
        Ok((doc, report)) => {
            let mut diags = report_diagnostics(&report);
            diags.extend(validate_document(&doc));
            let ok = diags.iter().all(|d| d.severity != Severity::Error);
            let diagnostics: Vec<Value> = diags
                .iter()
                .map(|d| {
                    json!({
                        "nodeId": d.node_id.as_str(),
                        "rule": d.rule,
                        "severity": severity_name(d.severity),
                        "message": d.message,
                    })
                })
                .collect();
            json!({ "ok": ok, "diagnostics": diagnostics }).to_string()
        }
        Err(err) => json!({ "ok": false, "error": err.to_string() }).to_string(),
    }
}

/// The block palette as JSON: name, label and whether it takes children.
#[wasm_bindgen]
pub fn block_palette() -> String {
    let palette: Vec<Value> = registry::all()
        .iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "displayName": spec.display_name,
                "isCanvas": spec.is_canvas,
                "defaultProps": spec.default_props(),
            })
        })
        .collect();
    Value::Array(palette).to_string()
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}
