//! Everything the user changed, and the instruction list it flattens into.

use kurbo::Point;
use serde::Serialize;
use signflow_store::ReplaceInstruction;

use crate::data_uri;
use crate::error::EditorResult;
use crate::geometry::PdfRect;
use crate::runs::TextRunSet;
use crate::selection::SelectionEdit;

/// Smallest width or height an instruction may carry, in points.
pub const MIN_BLOCK_EXTENT_PT: f64 = 10.0;
/// Smallest font size an instruction may carry, in points.
pub const MIN_FONT_SIZE_PT: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub page: u32,
    #[serde(flatten)]
    pub bounds: PdfRect,
    pub image_data_uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditAccumulator {
    selection_edits: Vec<SelectionEdit>,
    image_blocks: Vec<ImageBlock>,
    selected_image: Option<String>,
    place_image_next: bool,
    image_width: f64,
    image_height: f64,
}

impl EditAccumulator {
    /// `image_width`/`image_height` are the default size, in points, of placed images.
    pub fn new(image_width: f64, image_height: f64) -> Self {
        Self {
            selection_edits: Vec::new(),
            image_blocks: Vec::new(),
            selected_image: None,
            place_image_next: false,
            image_width,
            image_height,
        }
    }

    pub fn push_selection_edit(&mut self, edit: SelectionEdit) {
        self.selection_edits.push(edit);
    }

    pub fn selection_edits(&self) -> &[SelectionEdit] {
        &self.selection_edits
    }

    pub fn selection_edits_for_page(&self, page: u32) -> impl Iterator<Item = &SelectionEdit> {
        self.selection_edits
            .iter()
            .filter(move |edit| edit.page == page)
    }

    pub fn remove_selection_edit(&mut self, index: usize) -> Option<SelectionEdit> {
        (index < self.selection_edits.len()).then(|| self.selection_edits.remove(index))
    }

    /// Remembers the image the next armed click will place.
    pub fn select_image(&mut self, data_uri: &str) -> EditorResult<()> {
        let uri = data_uri::validate(data_uri, "accumulator-select-image")?;
        self.selected_image = Some(uri.to_string());
        Ok(())
    }

    /// Primes placement; does nothing until an image has been selected.
    pub fn arm_image_placement(&mut self) -> bool {
        self.place_image_next = self.selected_image.is_some();
        self.place_image_next
    }

    pub fn is_placement_armed(&self) -> bool {
        self.place_image_next
    }

    /// Consumes the placement flag, dropping an image block at `pdf_point`.
    pub fn place_image_at(&mut self, page: u32, pdf_point: Point) -> Option<&ImageBlock> {
        if !self.place_image_next {
            return None;
        }
        let uri = self.selected_image.clone()?;
        self.place_image_next = false;
        self.image_blocks.push(ImageBlock {
            page,
            bounds: PdfRect::new(pdf_point.x, pdf_point.y, self.image_width, self.image_height),
            image_data_uri: uri,
        });
        self.image_blocks.last()
    }

    pub fn image_blocks(&self) -> &[ImageBlock] {
        &self.image_blocks
    }

    pub fn image_blocks_for_page(&self, page: u32) -> impl Iterator<Item = &ImageBlock> {
        self.image_blocks
            .iter()
            .filter(move |block| block.page == page)
    }

    pub fn remove_image_block(&mut self, index: usize) -> Option<ImageBlock> {
        (index < self.image_blocks.len()).then(|| self.image_blocks.remove(index))
    }

    /// Flattens run overrides and committed edits into replacement instructions.
    ///
    /// Run overrides come first in id order, then committed edits in commit order.
    /// A run's box widens with its text length but never past the right page
    /// edge; `page_width` of zero disables that cap.
    pub fn build_replace_blocks(
        &self,
        runs: &TextRunSet,
        page: u32,
        page_width: f64,
    ) -> Vec<ReplaceInstruction> {
        let run_blocks = runs.edited().map(|run| {
            let old_len = run.original_text.chars().count().max(1) as f64;
            let new_len = run.edited_text.chars().count().max(1) as f64;
            let width_scale = (new_len / old_len).max(1.0);
            let max_line_width = if page_width > 0.0 {
                (page_width - run.bounds.x).max(MIN_BLOCK_EXTENT_PT)
            } else {
                run.bounds.width
            };

            ReplaceInstruction {
                page,
                x: run.bounds.x,
                y: run.bounds.y,
                width: (run.bounds.width * width_scale)
                    .max(MIN_BLOCK_EXTENT_PT)
                    .min(max_line_width),
                height: run.bounds.height.max(MIN_BLOCK_EXTENT_PT),
                text: run.edited_text.clone(),
                font_size: font_size_points(run.font_size_pdf),
            }
        });

        let selection_blocks = self.selection_edits.iter().map(|edit| ReplaceInstruction {
            page: edit.page,
            x: edit.bounds.x,
            y: edit.bounds.y,
            width: edit.bounds.width,
            height: edit.bounds.height,
            text: edit.text.clone(),
            font_size: font_size_points(edit.font_size_pdf),
        });

        run_blocks.chain(selection_blocks).collect()
    }
}

fn font_size_points(size: f64) -> u32 {
    size.round().max(MIN_FONT_SIZE_PT) as u32
}
