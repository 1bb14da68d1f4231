//! Browser bindings for the signflow editor.
//!
//! The host keeps pdf.js and the DOM; it forwards pointer and keyboard events
//! here and draws whatever geometry comes back. Structured values cross the
//! boundary as plain JS objects via `serde-wasm-bindgen`.

mod capture;

use std::sync::Arc;

use kurbo::Point;
use serde::Serialize;
use serde::de::DeserializeOwned;
use signflow_editor::{
    CommitOutcome, EditKind, EditorSession, EditorSettings, KeyOutcome, KeyPress, PageSize,
    PointerTarget, RawTextItem, ReleaseOutcome, RenderOutcome, RenderTicket, ResizeHandle,
    SignatureMode, SignatureSession,
};
use wasm_bindgen::prelude::*;

use capture::FlagCapture;

/// Initialize WASM module
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("signflow WASM module initialized");
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    Ok(serde_wasm_bindgen::from_value(value)?)
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// What a key press did, flattened for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
enum KeyReport {
    Committed,
    Discarded,
    Cancelled,
    Ignored,
}

impl From<KeyOutcome> for KeyReport {
    fn from(outcome: KeyOutcome) -> Self {
        match outcome {
            KeyOutcome::Commit(CommitOutcome::Committed(_)) => Self::Committed,
            KeyOutcome::Commit(_) => Self::Discarded,
            KeyOutcome::Cancelled => Self::Cancelled,
            KeyOutcome::Ignored => Self::Ignored,
        }
    }
}

/// The page editor: navigation, zoom, text selection and edits.
#[wasm_bindgen]
pub struct Editor {
    session: EditorSession,
}

impl Editor {
    fn install(
        &mut self,
        ticket: RenderTicket,
        page_size: PageSize,
        items: &[RawTextItem],
    ) -> RenderOutcome {
        let outcome = self.session.apply_render(ticket, page_size, items);
        if outcome == RenderOutcome::Stale {
            log::debug!("render {} arrived after a newer request", ticket.generation);
        }
        outcome
    }

    fn release(&mut self) -> Option<EditKind> {
        match self.session.pointer_up() {
            ReleaseOutcome::Opened(kind) => Some(kind),
            ReleaseOutcome::Nothing => None,
        }
    }

    fn key(&mut self, key: KeyPress) -> KeyReport {
        KeyReport::from(self.session.handle_key(key))
    }
}

#[wasm_bindgen]
impl Editor {
    /// `settings` may be `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(page_count: u32, settings: JsValue) -> Result<Editor, JsValue> {
        let settings = if settings.is_undefined() || settings.is_null() {
            EditorSettings::default()
        } else {
            from_js::<EditorSettings>(settings)?.normalized()
        };
        let session = EditorSession::new(page_count, Arc::new(settings)).map_err(js_error)?;
        log::info!("editor opened with {page_count} pages");
        Ok(Self { session })
    }

    pub fn page(&self) -> u32 {
        self.session.page()
    }

    #[wasm_bindgen(js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.session.page_count()
    }

    pub fn scale(&self) -> f64 {
        self.session.scale().get()
    }

    #[wasm_bindgen(js_name = renderState)]
    pub fn render_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.render_state())
    }

    #[wasm_bindgen(js_name = requestRender)]
    pub fn request_render(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.request_render())
    }

    /// Installs the text items pdf.js produced for `ticket`.
    #[wasm_bindgen(js_name = applyRender)]
    pub fn apply_render(
        &mut self,
        ticket: JsValue,
        page_width: f64,
        page_height: f64,
        items: JsValue,
    ) -> Result<JsValue, JsValue> {
        let ticket: RenderTicket = from_js(ticket)?;
        let items: Vec<RawTextItem> = from_js(items)?;
        let page_size = PageSize {
            width: page_width,
            height: page_height,
        };
        to_js(&self.install(ticket, page_size, &items))
    }

    /// Tells the editor the render for `ticket` failed; the current page stays.
    #[wasm_bindgen(js_name = abandonRender)]
    pub fn abandon_render(&mut self, ticket: JsValue) -> Result<bool, JsValue> {
        let ticket: RenderTicket = from_js(ticket)?;
        Ok(self.session.abandon_render(&ticket))
    }

    /// The render request still waiting for `applyRender`, or `undefined`.
    #[wasm_bindgen(js_name = pendingRender)]
    pub fn pending_render(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.pending_render())
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.next_page())
    }

    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.previous_page())
    }

    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&mut self, page: u32) -> Result<JsValue, JsValue> {
        let ticket = self.session.go_to_page(page).map_err(js_error)?;
        to_js(&ticket)
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> Result<JsValue, JsValue> {
        let ticket = self.session.zoom_in().map_err(js_error)?;
        to_js(&ticket)
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> Result<JsValue, JsValue> {
        let ticket = self.session.zoom_out().map_err(js_error)?;
        to_js(&ticket)
    }

    pub fn runs(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.run_views())
    }

    /// `target` is `{ kind: "canvas" }` or `{ kind: "run", id }`.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64, target: JsValue) -> Result<bool, JsValue> {
        let target: PointerTarget = from_js(target)?;
        Ok(self.session.pointer_down(Point::new(x, y), target))
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.session.pointer_move(Point::new(x, y));
    }

    /// Returns `"merge"`, `"empty"` or `null`.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> Result<JsValue, JsValue> {
        match self.release() {
            Some(kind) => to_js(&kind),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = selectionRect)]
    pub fn selection_rect(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.selection().selection_rect())
    }

    #[wasm_bindgen(js_name = selectedRuns)]
    pub fn selected_runs(&self) -> Vec<u32> {
        self.session
            .selection()
            .selected_runs()
            .iter()
            .filter_map(|id| u32::try_from(*id).ok())
            .collect()
    }

    #[wasm_bindgen(js_name = activeEdit)]
    pub fn active_edit(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.active_edit())
    }

    #[wasm_bindgen(js_name = setActiveText)]
    pub fn set_active_text(&mut self, text: &str) {
        self.session.set_active_text(text);
    }

    #[wasm_bindgen(js_name = resizeActive)]
    pub fn resize_active(&mut self, content_width: f64, content_height: f64) {
        self.session.resize_active(content_width, content_height);
    }

    /// `key` is `{ key: "enter" | "escape" | "other", modifierHeld }`.
    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&mut self, key: JsValue) -> Result<JsValue, JsValue> {
        let key: KeyPress = from_js(key)?;
        to_js(&self.key(key))
    }

    #[wasm_bindgen(js_name = commitActive)]
    pub fn commit_active(&mut self) -> bool {
        matches!(self.session.commit_active(), CommitOutcome::Committed(_))
    }

    #[wasm_bindgen(js_name = cancelActive)]
    pub fn cancel_active(&mut self) {
        self.session.cancel_active();
    }

    /// Called when a run's editable element loses focus.
    #[wasm_bindgen(js_name = syncRun)]
    pub fn sync_run(&mut self, id: usize, text: &str) -> Result<(), JsValue> {
        self.session.sync_run(id, text).map_err(js_error)
    }

    #[wasm_bindgen(js_name = revertRun)]
    pub fn revert_run(&mut self, id: usize) -> Result<(), JsValue> {
        self.session.revert_run(id).map_err(js_error)
    }

    #[wasm_bindgen(js_name = pageSelectionEdits)]
    pub fn page_selection_edits(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.page_selection_edits())
    }

    #[wasm_bindgen(js_name = removeSelectionEdit)]
    pub fn remove_selection_edit(&mut self, index: usize) -> bool {
        self.session.remove_selection_edit(index).is_some()
    }

    #[wasm_bindgen(js_name = selectImage)]
    pub fn select_image(&mut self, data_uri: &str) -> Result<(), JsValue> {
        self.session.select_image(data_uri).map_err(js_error)
    }

    #[wasm_bindgen(js_name = armImagePlacement)]
    pub fn arm_image_placement(&mut self) -> bool {
        self.session.arm_image_placement()
    }

    /// Returns the placed image block, or `null` when placement was not armed.
    #[wasm_bindgen(js_name = canvasClick)]
    pub fn canvas_click(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        to_js(&self.session.canvas_click(Point::new(x, y)))
    }

    #[wasm_bindgen(js_name = pageImageBlocks)]
    pub fn page_image_blocks(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.page_image_blocks())
    }

    #[wasm_bindgen(js_name = removeImageBlock)]
    pub fn remove_image_block(&mut self, index: usize) -> bool {
        self.session.remove_image_block(index).is_some()
    }

    /// The instruction list to send to the document service on save.
    #[wasm_bindgen(js_name = buildReplaceBlocks)]
    pub fn build_replace_blocks(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.build_replace_blocks())
    }

    /// `undefined` until a page has been rendered.
    #[wasm_bindgen(js_name = startSignature)]
    pub fn start_signature(&self) -> Option<Signature> {
        let capture = Arc::new(FlagCapture::default());
        let session = self.session.start_signature(capture.clone())?;
        Some(Signature { session, capture })
    }
}

/// A signing session: capture pad plus on-page placement.
#[wasm_bindgen]
pub struct Signature {
    session: SignatureSession,
    capture: Arc<FlagCapture>,
}

#[wasm_bindgen]
impl Signature {
    #[wasm_bindgen(constructor)]
    pub fn new(page: u32, page_width: f64, page_height: f64) -> Signature {
        let capture = Arc::new(FlagCapture::default());
        let page_size = PageSize {
            width: page_width,
            height: page_height,
        };
        Self {
            session: SignatureSession::new(page, page_size, capture.clone()),
            capture,
        }
    }

    /// Whether a gesture currently wants the pointer captured.
    ///
    /// Hosts mirror this with `setPointerCapture`/`releasePointerCapture`.
    #[wasm_bindgen(js_name = pointerCaptured)]
    pub fn pointer_captured(&self) -> bool {
        self.capture.is_held()
    }

    /// `mode` is `"draw"`, `"type"` or `"upload"`.
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&mut self, mode: JsValue) -> Result<(), JsValue> {
        let mode: SignatureMode = from_js(mode)?;
        self.session.pad.set_mode(mode);
        Ok(())
    }

    #[wasm_bindgen(js_name = beginStroke)]
    pub fn begin_stroke(&mut self, x: f64, y: f64) {
        self.session.pad.begin_stroke(Point::new(x, y));
    }

    #[wasm_bindgen(js_name = strokeTo)]
    pub fn stroke_to(&mut self, x: f64, y: f64) {
        self.session.pad.stroke_to(Point::new(x, y));
    }

    #[wasm_bindgen(js_name = endStroke)]
    pub fn end_stroke(&mut self) {
        self.session.pad.end_stroke();
    }

    /// RGBA bytes of the draw canvas, for `ImageData`.
    #[wasm_bindgen(js_name = drawCanvasRgba)]
    pub fn draw_canvas_rgba(&self) -> Vec<u8> {
        self.session.pad.canvas().as_raw().clone()
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    #[wasm_bindgen(js_name = setTypedText)]
    pub fn set_typed_text(&mut self, text: &str) {
        self.session.pad.set_typed_text(text);
    }

    #[wasm_bindgen(js_name = typedLayout)]
    pub fn typed_layout(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.pad.typed_layout())
    }

    #[wasm_bindgen(js_name = setTypedRaster)]
    pub fn set_typed_raster(&mut self, data_uri: &str) -> Result<(), JsValue> {
        self.session.pad.set_typed_raster(data_uri).map_err(js_error)
    }

    #[wasm_bindgen(js_name = loadUpload)]
    pub fn load_upload(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        self.session.pad.load_upload(bytes).map_err(js_error)
    }

    #[wasm_bindgen(js_name = hasSignature)]
    pub fn has_signature(&self) -> bool {
        self.session.pad.has_signature()
    }

    pub fn apply(&mut self) -> Result<bool, JsValue> {
        self.session.apply().map_err(js_error)
    }

    pub fn image(&self) -> Option<String> {
        self.session.pad.image().map(str::to_string)
    }

    #[wasm_bindgen(js_name = setCanvasSize)]
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.session.placement.set_canvas_size(width, height);
    }

    pub fn rect(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.placement.rect())
    }

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.session.placement.begin_drag(Point::new(x, y));
    }

    /// `handle` is one of `"n" "e" "s" "w" "nw" "ne" "sw" "se"`.
    #[wasm_bindgen(js_name = beginResize)]
    pub fn begin_resize(&mut self, handle: JsValue, x: f64, y: f64) -> Result<(), JsValue> {
        let handle: ResizeHandle = from_js(handle)?;
        self.session.placement.begin_resize(handle, Point::new(x, y));
        Ok(())
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.session.placement.pointer_move(Point::new(x, y));
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) {
        self.session.placement.pointer_up();
    }

    pub fn cancel(&mut self) {
        self.session.placement.cancel();
    }

    /// The placement record in page points.
    pub fn confirm(&self) -> Result<JsValue, JsValue> {
        let placement = self.session.confirm().map_err(js_error)?;
        to_js(&placement)
    }
}
