//! Text runs extracted from one page at one scale.

use kurbo::Affine;
use serde::{Deserialize, Serialize};
use snafu::OptionExt;

use crate::error::{EditorResult, UnknownRunSnafu};
use crate::geometry::{CoordinateMapper, PdfRect, PixelRect, Scale};

/// A positioned text item as reported by the page source at some scale.
///
/// `transform` is the item's text matrix with the viewport already applied, so
/// `(e, f)` is the baseline origin in render pixels. `width` is in render pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTextItem {
    pub text: String,
    pub transform: [f64; 6],
    pub width: f64,
}

/// One editable fragment of page text.
///
/// Geometry is kept in PDF points; pixel geometry is derived through a
/// [`CoordinateMapper`] so zoom changes cannot drift the stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub id: usize,
    pub original_text: String,
    pub edited_text: String,
    pub bounds: PdfRect,
    pub font_size_pdf: f64,
}

impl TextRun {
    pub fn is_edited(&self) -> bool {
        self.edited_text != self.original_text
    }

    pub fn pixel_bounds(&self, mapper: &CoordinateMapper) -> PixelRect {
        mapper.rect_to_pixel(&self.bounds)
    }

    pub fn font_size_pixel(&self, mapper: &CoordinateMapper) -> f64 {
        mapper.to_pixel(self.font_size_pdf)
    }

    /// Flat snapshot with both coordinate spaces, for hosts that position overlays.
    pub fn view(&self, mapper: &CoordinateMapper) -> TextRunView {
        let pixel = self.pixel_bounds(mapper);
        TextRunView {
            id: self.id,
            original_text: self.original_text.clone(),
            edited_text: self.edited_text.clone(),
            pixel_x: pixel.x,
            pixel_y: pixel.y,
            pixel_width: pixel.width,
            pixel_height: pixel.height,
            pdf_x: self.bounds.x,
            pdf_y: self.bounds.y,
            pdf_width: self.bounds.width,
            pdf_height: self.bounds.height,
            font_size_pixel: self.font_size_pixel(mapper),
            font_size_pdf: self.font_size_pdf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRunView {
    pub id: usize,
    pub original_text: String,
    pub edited_text: String,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub pdf_x: f64,
    pub pdf_y: f64,
    pub pdf_width: f64,
    pub pdf_height: f64,
    pub font_size_pixel: f64,
    pub font_size_pdf: f64,
}

/// All runs of the current page, valid for exactly one scale.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRunSet {
    scale: Scale,
    runs: Vec<TextRun>,
}

impl TextRunSet {
    pub fn empty(scale: Scale) -> Self {
        Self {
            scale,
            runs: Vec::new(),
        }
    }

    /// Builds the run collection from raw items reported at `scale`.
    ///
    /// Blank items are dropped before ids are assigned, so ids stay dense.
    pub fn extract(items: &[RawTextItem], scale: Scale) -> Self {
        let mapper = CoordinateMapper::new(scale);
        let runs = items
            .iter()
            .filter(|item| !item.text.trim().is_empty())
            .enumerate()
            .map(|(id, item)| {
                let [_, _, c, d, e, f] = Affine::new(item.transform).as_coeffs();
                let glyph_height = c.hypot(d);
                let pixel = PixelRect::new(e, f - glyph_height, item.width, glyph_height);
                TextRun {
                    id,
                    original_text: item.text.clone(),
                    edited_text: item.text.clone(),
                    bounds: mapper.rect_to_pdf(&pixel),
                    font_size_pdf: mapper.to_pdf(glyph_height),
                }
            })
            .collect();

        Self { scale, runs }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.scale)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextRun> {
        self.runs.iter()
    }

    pub fn get(&self, id: usize) -> Option<&TextRun> {
        self.runs.get(id)
    }

    /// Ids of runs whose pixel box overlaps `rect`, in id order.
    pub fn intersecting(&self, rect: &PixelRect) -> Vec<usize> {
        let mapper = self.mapper();
        self.runs
            .iter()
            .filter(|run| run.pixel_bounds(&mapper).overlaps(rect))
            .map(|run| run.id)
            .collect()
    }

    /// Stores the text the view holds for a run. Trailing whitespace is dropped.
    pub fn sync_from_view(&mut self, id: usize, text: &str) -> EditorResult<()> {
        let run = self.run_mut(id, "runs-sync-from-view")?;
        run.edited_text = text.trim_end().to_string();
        Ok(())
    }

    pub fn revert(&mut self, id: usize) -> EditorResult<()> {
        let run = self.run_mut(id, "runs-revert")?;
        run.edited_text = run.original_text.clone();
        Ok(())
    }

    /// Blanks the edited text of every listed run; unknown ids are skipped.
    pub fn clear_text(&mut self, ids: &[usize]) {
        for id in ids {
            if let Some(run) = self.runs.get_mut(*id) {
                run.edited_text.clear();
            }
        }
    }

    pub fn edited(&self) -> impl Iterator<Item = &TextRun> {
        self.runs.iter().filter(|run| run.is_edited())
    }

    /// Copies edits from a previous extraction of the same page.
    ///
    /// An edit carries over when the run with the same id has the same
    /// original text. Returns how many edits could not be carried.
    pub fn adopt_edits(&mut self, previous: &TextRunSet) -> usize {
        let mut dropped = 0;
        for old in previous.edited() {
            match self.runs.get_mut(old.id) {
                Some(run) if run.original_text == old.original_text => {
                    run.edited_text = old.edited_text.clone();
                }
                _ => dropped += 1,
            }
        }
        dropped
    }

    pub fn views(&self) -> Vec<TextRunView> {
        let mapper = self.mapper();
        self.runs.iter().map(|run| run.view(&mapper)).collect()
    }

    fn run_mut(&mut self, id: usize, stage: &'static str) -> EditorResult<&mut TextRun> {
        self.runs.get_mut(id).context(UnknownRunSnafu { stage, id })
    }
}
