//! Proof rasters: a white page at the requested scale with glyph and image
//! boxes filled in, enough to check geometry without a full rasterizer.

use hayro_interpret::font::Glyph;
use hayro_interpret::{
    BlendMode, ClipPath, Device, GlyphDrawMode, Image as PdfImage, Paint, PathDrawMode, SoftMask,
};
use image::{Rgba, RgbaImage};
use kurbo::{Affine, Rect, Shape};
use signflow_editor::Scale;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GLYPH_INK: Rgba<u8> = Rgba([48, 48, 48, 255]);
const IMAGE_INK: Rgba<u8> = Rgba([200, 200, 200, 255]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    Glyph(Rect),
    Image(Rect),
}

/// Records where ink lands on the page, in top-left page points.
#[derive(Debug, Default)]
pub struct MarkDevice {
    pub marks: Vec<Mark>,
}

impl MarkDevice {
    /// Paints the recorded marks onto a `width x height` page at `scale`.
    pub fn paint(&self, width: f64, height: f64, scale: Scale) -> RgbaImage {
        let s = scale.get();
        let pixel_width = (width * s).round().max(1.0) as u32;
        let pixel_height = (height * s).round().max(1.0) as u32;
        let mut raster = RgbaImage::from_pixel(pixel_width, pixel_height, PAPER);

        // Images first so text stays visible on top.
        for mark in &self.marks {
            if let Mark::Image(rect) = mark {
                fill(&mut raster, rect.scale_from_origin(s), IMAGE_INK);
            }
        }
        for mark in &self.marks {
            if let Mark::Glyph(rect) = mark {
                fill(&mut raster, rect.scale_from_origin(s), GLYPH_INK);
            }
        }
        raster
    }
}

fn fill(raster: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let (width, height) = raster.dimensions();
    let clamp = |value: f64, max: u32| value.max(0.0).min(f64::from(max)) as u32;
    let x0 = clamp(rect.x0.floor(), width);
    let x1 = clamp(rect.x1.ceil(), width);
    let y0 = clamp(rect.y0.floor(), height);
    let y1 = clamp(rect.y1.ceil(), height);
    for y in y0..y1 {
        for x in x0..x1 {
            raster.put_pixel(x, y, color);
        }
    }
}

impl<'a> Device<'a> for MarkDevice {
    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        draw_mode: &GlyphDrawMode,
    ) {
        if matches!(draw_mode, GlyphDrawMode::Invisible) {
            return;
        }
        if let Glyph::Outline(outline) = glyph {
            let path = transform * (glyph_transform * outline.outline());
            self.marks.push(Mark::Glyph(path.bounding_box()));
        }
    }

    fn draw_image(&mut self, _image: PdfImage<'a, '_>, transform: Affine) {
        // Images are drawn into the unit square.
        let bounds = transform.transform_rect_bbox(Rect::new(0.0, 0.0, 1.0, 1.0));
        self.marks.push(Mark::Image(bounds));
    }

    fn draw_path(
        &mut self,
        _path: &kurbo::BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}
    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}
    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}
    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }
    fn pop_clip_path(&mut self) {}
    fn pop_transparency_group(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_matches_page_times_scale() {
        let device = MarkDevice::default();
        let raster = device.paint(612.0, 792.0, Scale::new(1.5).unwrap());
        assert_eq!(raster.dimensions(), (918, 1188));
        assert_eq!(*raster.get_pixel(0, 0), PAPER);
    }

    #[test]
    fn marks_are_scaled_and_clipped() {
        let device = MarkDevice {
            marks: vec![
                Mark::Image(Rect::new(0.0, 0.0, 20.0, 20.0)),
                Mark::Glyph(Rect::new(5.0, 5.0, 10.0, 10.0)),
                Mark::Glyph(Rect::new(95.0, 95.0, 400.0, 400.0)),
            ],
        };
        let raster = device.paint(100.0, 100.0, Scale::new(2.0).unwrap());

        assert_eq!(*raster.get_pixel(12, 12), GLYPH_INK);
        assert_eq!(*raster.get_pixel(30, 30), IMAGE_INK);
        assert_eq!(*raster.get_pixel(199, 199), GLYPH_INK);
        assert_eq!(*raster.get_pixel(100, 100), PAPER);
    }
}
