//! Glyph capture and grouping into positioned text items.
//!
//! Notes:
//! - PDF text is not guaranteed to have a reliable Unicode mapping. `Glyph::as_unicode()` is
//!   best-effort and may return `None`; such glyphs still shape the layout.
//! - Bounding boxes are in top-left page points, as produced by
//!   `initial_transform(true)`.

use hayro_interpret::font::Glyph;
use hayro_interpret::{
    BlendMode, ClipPath, Device, GlyphDrawMode, Image, Paint, PathDrawMode, SoftMask,
};
use kurbo::{Affine, Rect, Shape};
use signflow_editor::{RawTextItem, Scale};

/// A single glyph event, optionally mapped to a Unicode character.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub ch: Option<char>,
    /// Page-space box. Type3 glyphs have none without running their program.
    pub bbox: Option<Rect>,
}

/// A `hayro-interpret` [`Device`] that records glyph events in drawing order.
#[derive(Debug, Default)]
pub struct GlyphCollector {
    pub glyphs: Vec<PlacedGlyph>,
}

/// Thresholds for splitting glyph streams into words and items.
#[derive(Debug, Clone)]
pub struct GroupingOptions {
    /// Minimum vertical overlap ratio (relative to the smaller glyph bbox height)
    /// to consider two glyphs on the same line.
    pub same_line_overlap_ratio: f64,
    /// A gap wider than this times the average glyph height becomes a space.
    pub space_gap_ratio: f64,
    /// A gap wider than this times the average glyph height starts a new item.
    pub item_gap_ratio: f64,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            same_line_overlap_ratio: 0.5,
            space_gap_ratio: 0.25,
            item_gap_ratio: 1.5,
        }
    }
}

/// Text with the box it occupies in top-left page points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub bbox: Rect,
}

impl TextItem {
    /// Expresses the item the way a viewport-applied text layer reports it:
    /// an upright matrix whose origin sits on the baseline, in render pixels.
    pub fn to_raw(&self, scale: Scale) -> RawTextItem {
        let s = scale.get();
        let height = self.bbox.height() * s;
        RawTextItem {
            text: self.text.clone(),
            transform: [height, 0.0, 0.0, height, self.bbox.x0 * s, self.bbox.y1 * s],
            width: self.bbox.width() * s,
        }
    }
}

impl GlyphCollector {
    pub fn items(&self) -> Vec<TextItem> {
        self.items_with(&GroupingOptions::default())
    }

    /// Folds consecutive glyphs on one line into items, inferring spaces from gaps.
    ///
    /// Items break on a line change, on a wide gap, and when the pen jumps back
    /// to the left.
    pub fn items_with(&self, opts: &GroupingOptions) -> Vec<TextItem> {
        let mut items = Vec::new();
        let mut current: Option<TextItem> = None;
        let mut last_bbox: Option<Rect> = None;

        for glyph in &self.glyphs {
            let Some(bbox) = glyph.bbox else {
                if let (Some(item), Some(ch)) = (current.as_mut(), glyph.ch) {
                    item.text.push(ch);
                }
                continue;
            };

            let mut space = false;
            if let (Some(prev), Some(item)) = (last_bbox, current.as_ref()) {
                let gap = bbox.x0 - prev.x1;
                let avg_height = 0.5 * (prev.height() + bbox.height());
                let continues = is_same_line(prev, bbox, opts.same_line_overlap_ratio)
                    && gap <= opts.item_gap_ratio * avg_height
                    && gap >= -avg_height;
                if !continues {
                    items.extend(finish(current.take()));
                } else {
                    space = gap > opts.space_gap_ratio * avg_height
                        && !item.text.is_empty()
                        && !item.text.ends_with(' ');
                }
            }

            let item = current.get_or_insert_with(|| TextItem {
                text: String::new(),
                bbox,
            });
            if space {
                item.text.push(' ');
            }
            if let Some(ch) = glyph.ch {
                item.text.push(ch);
            }
            item.bbox = item.bbox.union(bbox);
            last_bbox = Some(bbox);
        }

        items.extend(finish(current));
        items
    }
}

fn finish(item: Option<TextItem>) -> Option<TextItem> {
    item.filter(|item| !item.text.trim().is_empty())
}

fn is_same_line(a: Rect, b: Rect, min_overlap_ratio: f64) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    if overlap <= 0.0 {
        return false;
    }

    let denom = a.height().min(b.height());
    if denom <= 0.0 {
        return false;
    }

    (overlap / denom) >= min_overlap_ratio
}

impl<'a> Device<'a> for GlyphCollector {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &kurbo::BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        // Transforming the outline keeps rotated and sheared text correct.
        let bbox = match glyph {
            Glyph::Outline(outline) => {
                let path = transform * (glyph_transform * outline.outline());
                Some(path.bounding_box())
            }
            Glyph::Type3(_) => None,
        };

        self.glyphs.push(PlacedGlyph {
            ch: glyph.as_unicode(),
            bbox,
        });
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}
