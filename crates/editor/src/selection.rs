//! Drag selection over the rendered page and the free-form edit it opens.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::geometry::{CoordinateMapper, PdfRect, PixelRect};
use crate::runs::TextRunSet;

/// Below this size in both axes a drag counts as a click.
pub const CLICK_THRESHOLD_PX: f64 = 6.0;
/// Box opened by a click on empty page area.
pub const EMPTY_EDIT_WIDTH_PX: f64 = 180.0;
pub const EMPTY_EDIT_HEIGHT_PX: f64 = 32.0;
/// Floors for merged font sizes.
pub const MIN_MERGE_FONT_PX: f64 = 10.0;
pub const MIN_MERGE_FONT_PT: f64 = 8.0;

/// A free-form replacement in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEdit {
    pub page: u32,
    #[serde(flatten)]
    pub bounds: PdfRect,
    pub text: String,
    pub font_size_pixel: f64,
    pub font_size_pdf: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditKind {
    /// Opened over one or more runs; committing blanks them.
    Merge,
    /// Opened by clicking empty page area.
    Empty,
}

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum PointerTarget {
    Canvas,
    Run(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPress {
    pub key: Key,
    #[serde(default)]
    pub modifier_held: bool,
}

/// Result of releasing a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Opened(EditKind),
    Nothing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(SelectionEdit),
    /// The edit held only whitespace and was dropped.
    Discarded,
    NoActiveEdit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Commit(CommitOutcome),
    Cancelled,
    Ignored,
}

/// Page-level inputs the engine needs when a drag ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseContext {
    pub page: u32,
    /// Font size in points used for edits opened on empty area.
    pub default_font_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { start: Point, end: Point },
}

#[derive(Debug, Clone, PartialEq)]
struct OpenEdit {
    edit: SelectionEdit,
    kind: EditKind,
    sources: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEngine {
    drag: DragState,
    selected: Vec<usize>,
    open: Option<OpenEdit>,
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self {
            drag: DragState::Idle,
            selected: Vec::new(),
            open: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Run ids under the current drag, in id order.
    pub fn selected_runs(&self) -> &[usize] {
        &self.selected
    }

    pub fn selection_rect(&self) -> Option<PixelRect> {
        match self.drag {
            DragState::Dragging { start, end } => Some(PixelRect::from_corners(start, end)),
            DragState::Idle => None,
        }
    }

    pub fn active_edit(&self) -> Option<&SelectionEdit> {
        self.open.as_ref().map(|open| &open.edit)
    }

    pub fn active_kind(&self) -> Option<EditKind> {
        self.open.as_ref().map(|open| open.kind)
    }

    /// Starts a drag unless the pointer landed on an editable run.
    ///
    /// Starting a drag throws away any edit that was open but not committed.
    pub fn pointer_down(&mut self, point: Point, target: PointerTarget) -> bool {
        if let PointerTarget::Run(_) = target {
            return false;
        }
        self.drag = DragState::Dragging {
            start: point,
            end: point,
        };
        self.selected.clear();
        self.open = None;
        true
    }

    pub fn pointer_move(&mut self, point: Point, runs: &TextRunSet) {
        let DragState::Dragging { start, .. } = self.drag else {
            return;
        };
        self.drag = DragState::Dragging { start, end: point };
        self.selected = runs.intersecting(&PixelRect::from_corners(start, point));
    }

    pub fn pointer_up(&mut self, runs: &TextRunSet, context: ReleaseContext) -> ReleaseOutcome {
        let Some(rect) = self.selection_rect() else {
            return ReleaseOutcome::Nothing;
        };
        self.drag = DragState::Idle;
        let mapper = runs.mapper();

        if !self.selected.is_empty() {
            self.open = Some(self.merge_edit(runs, &rect, context.page));
            return ReleaseOutcome::Opened(EditKind::Merge);
        }

        if rect.width < CLICK_THRESHOLD_PX && rect.height < CLICK_THRESHOLD_PX {
            let pixel = PixelRect::new(rect.x, rect.y, EMPTY_EDIT_WIDTH_PX, EMPTY_EDIT_HEIGHT_PX);
            self.open = Some(OpenEdit {
                edit: SelectionEdit {
                    page: context.page,
                    bounds: mapper.rect_to_pdf(&pixel),
                    text: String::new(),
                    font_size_pixel: mapper.to_pixel(context.default_font_size),
                    font_size_pdf: context.default_font_size,
                },
                kind: EditKind::Empty,
                sources: Vec::new(),
            });
            return ReleaseOutcome::Opened(EditKind::Empty);
        }

        ReleaseOutcome::Nothing
    }

    pub fn set_active_text(&mut self, text: &str) {
        if let Some(open) = self.open.as_mut() {
            open.edit.text = text.to_string();
        }
    }

    /// Tracks the editor box as content grows, given its rendered size in pixels.
    pub fn resize_active(
        &mut self,
        content_width_px: f64,
        content_height_px: f64,
        mapper: &CoordinateMapper,
    ) {
        if let Some(open) = self.open.as_mut() {
            open.edit.bounds.width = mapper.to_pdf(content_width_px);
            open.edit.bounds.height = mapper.to_pdf(content_height_px);
        }
    }

    pub fn handle_key(&mut self, key: KeyPress, runs: &mut TextRunSet) -> KeyOutcome {
        match key.key {
            Key::Enter if !key.modifier_held => KeyOutcome::Commit(self.commit(runs)),
            Key::Escape => {
                self.cancel();
                KeyOutcome::Cancelled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Finalizes the open edit. A merge blanks the runs it replaced.
    pub fn commit(&mut self, runs: &mut TextRunSet) -> CommitOutcome {
        let Some(open) = self.open.take() else {
            return CommitOutcome::NoActiveEdit;
        };
        self.drag = DragState::Idle;
        self.selected.clear();

        let text = open.edit.text.trim().to_string();
        if text.is_empty() {
            return CommitOutcome::Discarded;
        }

        runs.clear_text(&open.sources);
        CommitOutcome::Committed(SelectionEdit { text, ..open.edit })
    }

    /// Drops the open edit; runs are left untouched.
    pub fn cancel(&mut self) {
        self.open = None;
    }

    /// Forgets everything tied to the current run collection.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn merge_edit(&self, runs: &TextRunSet, rect: &PixelRect, page: u32) -> OpenEdit {
        let mapper = runs.mapper();
        let sources: Vec<_> = self
            .selected
            .iter()
            .filter_map(|id| runs.get(*id))
            .collect();
        let count = sources.len().max(1) as f64;

        let text = sources
            .iter()
            .map(|run| run.edited_text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let mean_px = sources
            .iter()
            .map(|run| run.font_size_pixel(&mapper))
            .sum::<f64>()
            / count;
        let mean_pt = sources.iter().map(|run| run.font_size_pdf).sum::<f64>() / count;

        OpenEdit {
            edit: SelectionEdit {
                page,
                bounds: mapper.rect_to_pdf(rect),
                text,
                font_size_pixel: mean_px.round().max(MIN_MERGE_FONT_PX),
                font_size_pdf: mean_pt.round().max(MIN_MERGE_FONT_PT),
            },
            kind: EditKind::Merge,
            sources: sources.iter().map(|run| run.id).collect(),
        }
    }
}
