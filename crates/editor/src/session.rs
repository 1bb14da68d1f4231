//! The interactive editing session for one open document.

use std::sync::Arc;

use kurbo::Point;
use serde::{Deserialize, Serialize};
use signflow_store::{DocumentId, DocumentRecord, DocumentStore, ReplaceInstruction};
use snafu::{ResultExt, ensure};

use crate::accumulator::{EditAccumulator, ImageBlock};
use crate::error::{EditorResult, PageOutOfRangeSnafu, StoreSnafu};
use crate::geometry::{PageRenderState, PageSize, Scale};
use crate::runs::{RawTextItem, TextRunSet, TextRunView};
use crate::selection::{
    CommitOutcome, KeyOutcome, KeyPress, PointerTarget, ReleaseContext, ReleaseOutcome,
    SelectionEdit, SelectionEngine,
};
use crate::settings::EditorSettings;
use crate::signature::SignatureSession;
use crate::signature::capture::PointerCapture;

/// Identifies one render cycle. Only the latest ticket may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTicket {
    pub generation: u64,
    pub page: u32,
    pub scale: Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderOutcome {
    #[serde(rename_all = "camelCase")]
    Applied { discarded_run_edits: usize },
    /// A newer render was requested after this ticket was issued.
    Stale,
}

pub struct EditorSession {
    settings: Arc<EditorSettings>,
    /// Page and scale of the runs currently installed.
    page: u32,
    page_count: u32,
    scale: Scale,
    generation: u64,
    pending: Option<RenderTicket>,
    render_state: Option<PageRenderState>,
    runs: TextRunSet,
    selection: SelectionEngine,
    accumulator: EditAccumulator,
}

impl EditorSession {
    pub fn new(page_count: u32, settings: Arc<EditorSettings>) -> EditorResult<Self> {
        let scale = Scale::new(settings.initial_scale)?;
        Ok(Self {
            page: 1,
            page_count,
            scale,
            generation: 0,
            pending: None,
            render_state: None,
            runs: TextRunSet::empty(scale),
            selection: SelectionEngine::new(),
            accumulator: EditAccumulator::new(settings.image_width, settings.image_height),
            settings,
        })
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// The page the installed runs belong to. Moves only when a render is applied.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// The outstanding render request, if one has not been applied or abandoned.
    pub fn pending_render(&self) -> Option<RenderTicket> {
        self.pending
    }

    /// Geometry of the last applied render, if any.
    pub fn render_state(&self) -> Option<&PageRenderState> {
        self.render_state.as_ref()
    }

    pub fn runs(&self) -> &TextRunSet {
        &self.runs
    }

    pub fn run_views(&self) -> Vec<TextRunView> {
        self.runs.views()
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn accumulator(&self) -> &EditAccumulator {
        &self.accumulator
    }

    fn target(&self) -> (u32, Scale) {
        self.pending
            .map_or((self.page, self.scale), |ticket| (ticket.page, ticket.scale))
    }

    fn issue(&mut self, page: u32, scale: Scale) -> RenderTicket {
        self.generation += 1;
        let ticket = RenderTicket {
            generation: self.generation,
            page,
            scale,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Starts a render cycle for the most recently requested page and scale.
    pub fn request_render(&mut self) -> RenderTicket {
        let (page, scale) = self.target();
        self.issue(page, scale)
    }

    pub fn is_current(&self, ticket: &RenderTicket) -> bool {
        self.pending
            .is_some_and(|pending| pending.generation == ticket.generation)
    }

    /// Installs the result of a render cycle and rebuilds the runs.
    ///
    /// Run edits survive a re-render of the same page; moving to another page
    /// drops them and reports how many were lost.
    pub fn apply_render(
        &mut self,
        ticket: RenderTicket,
        page_size: PageSize,
        items: &[RawTextItem],
    ) -> RenderOutcome {
        if !self.is_current(&ticket) {
            tracing::debug!(
                generation = ticket.generation,
                latest = self.generation,
                page = ticket.page,
                "dropping stale render"
            );
            return RenderOutcome::Stale;
        }

        let scale = ticket.scale;
        let mut runs = TextRunSet::extract(items, scale);
        let same_page = self
            .render_state
            .is_some_and(|state| state.page_number == ticket.page);
        let discarded_run_edits = if same_page {
            runs.adopt_edits(&self.runs)
        } else {
            self.runs.edited().count()
        };
        if discarded_run_edits > 0 {
            tracing::warn!(
                page = ticket.page,
                discarded = discarded_run_edits,
                "unsaved run edits discarded by re-render"
            );
        }

        self.pending = None;
        self.page = ticket.page;
        self.scale = scale;
        self.render_state = Some(PageRenderState::new(ticket.page, scale, page_size));
        self.runs = runs;
        self.selection.reset();
        tracing::info!(
            page = ticket.page,
            scale = scale.get(),
            runs = self.runs.len(),
            "page rendered"
        );
        RenderOutcome::Applied {
            discarded_run_edits,
        }
    }

    /// Drops a render that failed; page and scale stay where they were.
    ///
    /// Returns `false` when the ticket was already superseded.
    pub fn abandon_render(&mut self, ticket: &RenderTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.pending = None;
        tracing::warn!(
            page = ticket.page,
            scale = ticket.scale.get(),
            kept_page = self.page,
            "render abandoned"
        );
        true
    }

    pub fn go_to_page(&mut self, page: u32) -> EditorResult<RenderTicket> {
        ensure!(
            (1..=self.page_count).contains(&page),
            PageOutOfRangeSnafu {
                stage: "session-go-to-page",
                page,
                page_count: self.page_count,
            }
        );
        let (_, scale) = self.target();
        tracing::info!(page, "navigating");
        Ok(self.issue(page, scale))
    }

    /// `None` when already on the last page.
    pub fn next_page(&mut self) -> Option<RenderTicket> {
        let (page, scale) = self.target();
        (page < self.page_count).then(|| {
            tracing::info!(page = page + 1, "navigating");
            self.issue(page + 1, scale)
        })
    }

    /// `None` when already on the first page.
    pub fn previous_page(&mut self) -> Option<RenderTicket> {
        let (page, scale) = self.target();
        (page > 1).then(|| {
            tracing::info!(page = page - 1, "navigating");
            self.issue(page - 1, scale)
        })
    }

    pub fn zoom_in(&mut self) -> EditorResult<RenderTicket> {
        let (page, scale) = self.target();
        let scale = Scale::new(round_scale(scale.get() + self.settings.zoom_step))?;
        tracing::info!(scale = scale.get(), "zooming in");
        Ok(self.issue(page, scale))
    }

    /// `None` once the scale has reached the configured minimum.
    pub fn zoom_out(&mut self) -> EditorResult<Option<RenderTicket>> {
        let minimum = self.settings.min_zoom_scale;
        let (page, scale) = self.target();
        if scale.get() <= minimum {
            return Ok(None);
        }
        let next = Scale::new(round_scale(scale.get() - self.settings.zoom_step).max(minimum))?;
        tracing::info!(scale = next.get(), "zooming out");
        Ok(Some(self.issue(page, next)))
    }

    pub fn pointer_down(&mut self, point: Point, target: PointerTarget) -> bool {
        self.selection.pointer_down(point, target)
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.selection.pointer_move(point, &self.runs);
    }

    pub fn pointer_up(&mut self) -> ReleaseOutcome {
        let outcome = self.selection.pointer_up(
            &self.runs,
            ReleaseContext {
                page: self.page,
                default_font_size: self.settings.default_font_size,
            },
        );
        if let ReleaseOutcome::Opened(kind) = outcome {
            tracing::debug!(?kind, page = self.page, "edit opened");
        }
        outcome
    }

    pub fn active_edit(&self) -> Option<&SelectionEdit> {
        self.selection.active_edit()
    }

    pub fn set_active_text(&mut self, text: &str) {
        self.selection.set_active_text(text);
    }

    pub fn resize_active(&mut self, content_width_px: f64, content_height_px: f64) {
        let mapper = self.runs.mapper();
        self.selection
            .resize_active(content_width_px, content_height_px, &mapper);
    }

    pub fn handle_key(&mut self, key: KeyPress) -> KeyOutcome {
        let outcome = self.selection.handle_key(key, &mut self.runs);
        if let KeyOutcome::Commit(commit) = &outcome {
            self.record_commit(commit);
        }
        outcome
    }

    pub fn commit_active(&mut self) -> CommitOutcome {
        let outcome = self.selection.commit(&mut self.runs);
        self.record_commit(&outcome);
        outcome
    }

    pub fn cancel_active(&mut self) {
        self.selection.cancel();
    }

    fn record_commit(&mut self, outcome: &CommitOutcome) {
        match outcome {
            CommitOutcome::Committed(edit) => {
                tracing::info!(
                    page = edit.page,
                    chars = edit.text.chars().count(),
                    "edit committed"
                );
                self.accumulator.push_selection_edit(edit.clone());
            }
            CommitOutcome::Discarded => tracing::debug!("blank edit discarded"),
            CommitOutcome::NoActiveEdit => {}
        }
    }

    /// Stores the text the view holds for a run after blur.
    pub fn sync_run(&mut self, id: usize, text: &str) -> EditorResult<()> {
        self.runs.sync_from_view(id, text)
    }

    pub fn revert_run(&mut self, id: usize) -> EditorResult<()> {
        self.runs.revert(id)
    }

    pub fn page_selection_edits(&self) -> Vec<SelectionEdit> {
        self.accumulator
            .selection_edits_for_page(self.page)
            .cloned()
            .collect()
    }

    pub fn remove_selection_edit(&mut self, index: usize) -> Option<SelectionEdit> {
        self.accumulator.remove_selection_edit(index)
    }

    pub fn select_image(&mut self, data_uri: &str) -> EditorResult<()> {
        self.accumulator.select_image(data_uri)
    }

    pub fn arm_image_placement(&mut self) -> bool {
        self.accumulator.arm_image_placement()
    }

    /// A click on the page canvas; places the selected image when armed.
    pub fn canvas_click(&mut self, pixel: Point) -> Option<ImageBlock> {
        let point = self.runs.mapper().point_to_pdf(pixel);
        let block = self.accumulator.place_image_at(self.page, point)?.clone();
        tracing::info!(page = block.page, x = point.x, y = point.y, "image placed");
        Some(block)
    }

    pub fn page_image_blocks(&self) -> Vec<ImageBlock> {
        self.accumulator
            .image_blocks_for_page(self.page)
            .cloned()
            .collect()
    }

    pub fn remove_image_block(&mut self, index: usize) -> Option<ImageBlock> {
        self.accumulator.remove_image_block(index)
    }

    pub fn build_replace_blocks(&self) -> Vec<ReplaceInstruction> {
        let page_width = self.render_state.map_or(0.0, |state| state.pdf_width);
        self.accumulator
            .build_replace_blocks(&self.runs, self.page, page_width)
    }

    /// Sends the replacement list to the document service.
    ///
    /// Returns `None` without contacting the store when nothing changed.
    pub fn save(
        &self,
        store: &dyn DocumentStore,
        document_id: DocumentId,
    ) -> EditorResult<Option<DocumentRecord>> {
        let instructions = self.build_replace_blocks();
        if instructions.is_empty() {
            tracing::info!(%document_id, "nothing to save");
            return Ok(None);
        }
        let record = store
            .submit_replacements(document_id, &instructions)
            .context(StoreSnafu {
                stage: "session-save",
            })?;
        tracing::info!(%document_id, blocks = instructions.len(), "replacements saved");
        Ok(Some(record))
    }

    /// Opens a signing session for the page on screen.
    pub fn start_signature(&self, capture: Arc<dyn PointerCapture>) -> Option<SignatureSession> {
        let state = self.render_state?;
        Some(SignatureSession::new(
            state.page_number,
            state.page_size(),
            capture,
        ))
    }
}

/// Two decimals, so repeated zoom steps land on the same scales.
fn round_scale(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runs::tests::item;
    use crate::selection::{EditKind, Key};

    const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    fn session(page_count: u32) -> EditorSession {
        EditorSession::new(page_count, Arc::new(EditorSettings::default())).unwrap()
    }

    fn rendered(items: &[RawTextItem]) -> EditorSession {
        let mut session = session(3);
        let ticket = session.request_render();
        session.apply_render(ticket, LETTER, items);
        session
    }

    #[test]
    fn starts_on_first_page_at_configured_scale() {
        let session = session(3);
        assert_eq!(session.page(), 1);
        assert_eq!(session.scale().get(), 1.2);
        assert!(session.render_state().is_none());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut session = session(3);
        let first = session.request_render();
        let second = session.next_page().unwrap();

        assert_eq!(
            session.apply_render(first, LETTER, &[item("old", 0.0, 0.0, 10.0, 10.0)]),
            RenderOutcome::Stale
        );
        assert!(session.runs().is_empty());

        let outcome = session.apply_render(second, LETTER, &[item("new", 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(
            outcome,
            RenderOutcome::Applied {
                discarded_run_edits: 0
            }
        );
        assert_eq!(session.render_state().unwrap().page_number, 2);
        assert_eq!(session.runs().get(0).unwrap().original_text, "new");
    }

    #[test]
    fn navigation_is_bounded() {
        let mut session = session(2);
        assert!(session.previous_page().is_none());
        assert!(session.next_page().is_some());
        assert!(session.next_page().is_none());
        assert!(session.go_to_page(0).is_err());
        assert!(session.go_to_page(3).is_err());
        assert_eq!(session.go_to_page(1).unwrap().page, 1);
    }

    #[test]
    fn navigation_discards_run_edits_and_reports_count() {
        let mut session = rendered(&[
            item("a", 0.0, 0.0, 10.0, 10.0),
            item("b", 20.0, 0.0, 10.0, 10.0),
        ]);
        session.sync_run(0, "x").unwrap();
        session.sync_run(1, "y").unwrap();

        let ticket = session.next_page().unwrap();
        let outcome = session.apply_render(ticket, LETTER, &[item("c", 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(
            outcome,
            RenderOutcome::Applied {
                discarded_run_edits: 2
            }
        );
        assert!(session.build_replace_blocks().is_empty());
    }

    #[test]
    fn zoom_keeps_run_edits_of_the_same_page() {
        let mut session = rendered(&[item("a", 12.0, 12.0, 12.0, 12.0)]);
        session.sync_run(0, "alpha").unwrap();

        let ticket = session.zoom_in().unwrap();
        assert_eq!(ticket.scale.get(), 1.4);
        let zoomed = item("a", 14.0, 14.0, 14.0, 14.0);
        assert_eq!(
            session.apply_render(ticket, LETTER, &[zoomed]),
            RenderOutcome::Applied {
                discarded_run_edits: 0
            }
        );
        assert_eq!(session.build_replace_blocks()[0].text, "alpha");
    }

    #[test]
    fn zoom_out_stops_at_minimum() {
        let mut session = session(1);
        let mut steps = 0;
        while let Some(ticket) = session.zoom_out().unwrap() {
            steps += 1;
            if steps == 2 {
                session.apply_render(ticket, LETTER, &[]);
            }
        }
        assert_eq!(steps, 3);
        assert_eq!(session.pending_render().unwrap().scale.get(), 0.6);
        assert_eq!(session.scale().get(), 0.8);
    }

    #[test]
    fn pending_navigation_keeps_edits_on_their_page() {
        let mut session = rendered(&[
            item("Total", 100.0, 200.0, 50.0, 18.0),
            item("Due", 100.0, 400.0, 30.0, 18.0),
        ]);
        session.sync_run(1, "Paid").unwrap();

        let ticket = session.next_page().unwrap();
        assert_eq!(ticket.page, 2);
        assert_eq!(session.page(), 1);

        assert!(session.pointer_down(Point::new(90.0, 190.0), PointerTarget::Canvas));
        session.pointer_move(Point::new(160.0, 220.0));
        assert_eq!(session.pointer_up(), ReleaseOutcome::Opened(EditKind::Merge));
        assert_eq!(session.active_edit().unwrap().page, 1);
        session.set_active_text("Grand total");
        assert!(matches!(
            session.commit_active(),
            CommitOutcome::Committed(_)
        ));

        let blocks = session.build_replace_blocks();
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|block| block.page == 1));

        let store = signflow_store::MemoryDocumentStore::new();
        let record = store
            .insert(signflow_store::NewDocument {
                owner_id: signflow_store::OwnerId::new_v7(),
                file_name: "invoice.pdf".to_string(),
                bytes: b"%PDF-1.7".to_vec(),
            })
            .unwrap();
        session.save(&store, record.id).unwrap();
        let saved = store.replacement_batches(record.id).unwrap();
        assert!(saved[0].iter().all(|block| block.page == 1));
    }

    #[test]
    fn abandoned_render_keeps_the_page_on_screen() {
        let mut session = rendered(&[item("a", 0.0, 0.0, 10.0, 10.0)]);
        let ticket = session.go_to_page(3).unwrap();
        assert!(session.abandon_render(&ticket));

        assert_eq!(session.page(), 1);
        assert!(session.pending_render().is_none());
        assert_eq!(session.render_state().unwrap().page_number, 1);
        assert_eq!(
            session.apply_render(ticket, LETTER, &[]),
            RenderOutcome::Stale
        );
        assert!(!session.abandon_render(&ticket));

        // Navigation continues from the page on screen.
        assert_eq!(session.next_page().unwrap().page, 2);
    }

    #[test]
    fn abandoning_a_superseded_ticket_keeps_the_newer_request() {
        let mut session = rendered(&[]);
        let first = session.zoom_in().unwrap();
        let second = session.zoom_in().unwrap();
        assert!(!session.abandon_render(&first));
        assert_eq!(session.pending_render(), Some(second));
        assert_eq!(second.scale.get(), 1.6);
    }

    #[test]
    fn committed_merge_lands_in_accumulator() {
        let mut session = rendered(&[item("Total", 100.0, 200.0, 50.0, 18.0)]);
        assert!(session.pointer_down(Point::new(90.0, 190.0), PointerTarget::Canvas));
        session.pointer_move(Point::new(160.0, 220.0));
        assert_eq!(session.pointer_up(), ReleaseOutcome::Opened(EditKind::Merge));

        session.set_active_text("Grand total");
        let outcome = session.handle_key(KeyPress {
            key: Key::Enter,
            modifier_held: false,
        });
        assert!(matches!(outcome, KeyOutcome::Commit(CommitOutcome::Committed(_))));

        let blocks = session.build_replace_blocks();
        let texts: Vec<_> = blocks.iter().map(|block| block.text.as_str()).collect();
        assert_eq!(texts, ["", "Grand total"]);
        assert_eq!(session.page_selection_edits().len(), 1);
    }

    #[test]
    fn armed_click_places_image_in_pdf_units() {
        let mut session = rendered(&[]);
        session
            .select_image(&crate::data_uri::tests::png_data_uri())
            .unwrap();
        assert!(session.canvas_click(Point::new(120.0, 240.0)).is_none());
        assert!(session.arm_image_placement());

        let block = session.canvas_click(Point::new(120.0, 240.0)).unwrap();
        assert!((block.bounds.x - 100.0).abs() < 1e-9);
        assert!((block.bounds.y - 200.0).abs() < 1e-9);
        assert_eq!(block.bounds.width, 140.0);
        assert_eq!(session.page_image_blocks().len(), 1);
    }

    #[test]
    fn signature_session_needs_a_rendered_page() {
        let capture: Arc<dyn PointerCapture> = Arc::new(crate::signature::capture::NoCapture);
        assert!(session(1).start_signature(capture.clone()).is_none());

        let signing = rendered(&[]).start_signature(capture).unwrap();
        assert_eq!(signing.page(), 1);
        assert_eq!(signing.page_size(), LETTER);
    }
}
