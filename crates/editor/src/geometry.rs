//! Coordinate spaces and the conversions between them.
//!
//! Four spaces meet in the editor:
//! - PDF space: page points, scale independent. Canonical for everything stored.
//! - Render space: pixels of the raster drawn at the current zoom `Scale`.
//! - Screen space: CSS pixels of the canvas as laid out by the host.
//! - Page-native pixels are render space at scale 1 and need no type of their own.
//!
//! Nothing here rounds. Callers pick their rounding policy.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::error::{EditorResult, InvalidScaleSnafu};

/// Zoom factor between PDF points and render pixels.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Scale(f64);

impl From<Scale> for f64 {
    fn from(scale: Scale) -> Self {
        scale.0
    }
}

impl TryFrom<f64> for Scale {
    type Error = crate::error::EditorError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Scale {
    pub fn new(value: f64) -> EditorResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return InvalidScaleSnafu {
                stage: "scale-new",
                value,
            }
            .fail();
        }
        Ok(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

macro_rules! define_rect {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub x: f64,
            pub y: f64,
            pub width: f64,
            pub height: f64,
        }

        impl $name {
            pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
                Self {
                    x,
                    y,
                    width,
                    height,
                }
            }

            /// Normalized rect spanned by two corners in any order.
            pub fn from_corners(a: Point, b: Point) -> Self {
                Self {
                    x: a.x.min(b.x),
                    y: a.y.min(b.y),
                    width: (a.x - b.x).abs(),
                    height: (a.y - b.y).abs(),
                }
            }

            pub fn right(&self) -> f64 {
                self.x + self.width
            }

            pub fn bottom(&self) -> f64 {
                self.y + self.height
            }

            pub fn origin(&self) -> Point {
                Point::new(self.x, self.y)
            }

            /// Open overlap test: rects that only share an edge do not overlap.
            pub fn overlaps(&self, other: &Self) -> bool {
                self.x < other.right()
                    && self.right() > other.x
                    && self.y < other.bottom()
                    && self.bottom() > other.y
            }
        }
    };
}

define_rect!(
    /// Rectangle in PDF points.
    PdfRect
);
define_rect!(
    /// Rectangle in render pixels at some `Scale`.
    PixelRect
);
define_rect!(
    /// Rectangle in host layout pixels, relative to the canvas origin.
    ScreenRect
);

/// Page size in PDF points. Constant per page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Converts between PDF points and render pixels for one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    scale: Scale,
}

impl CoordinateMapper {
    pub fn new(scale: Scale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn to_pixel(&self, pdf: f64) -> f64 {
        pdf * self.scale.0
    }

    pub fn to_pdf(&self, pixel: f64) -> f64 {
        pixel / self.scale.0
    }

    pub fn point_to_pdf(&self, pixel: Point) -> Point {
        Point::new(self.to_pdf(pixel.x), self.to_pdf(pixel.y))
    }

    pub fn rect_to_pixel(&self, rect: &PdfRect) -> PixelRect {
        PixelRect::new(
            self.to_pixel(rect.x),
            self.to_pixel(rect.y),
            self.to_pixel(rect.width),
            self.to_pixel(rect.height),
        )
    }

    pub fn rect_to_pdf(&self, rect: &PixelRect) -> PdfRect {
        PdfRect::new(
            self.to_pdf(rect.x),
            self.to_pdf(rect.y),
            self.to_pdf(rect.width),
            self.to_pdf(rect.height),
        )
    }
}

/// Maps measured screen geometry onto the page.
///
/// Uses the ratio between the page's native size and the canvas size the host
/// actually laid out, so it stays correct even if layout disagrees with the
/// nominal zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMapper {
    ratio_x: f64,
    ratio_y: f64,
}

impl ScreenMapper {
    /// Returns `None` when the measured canvas has no usable area.
    pub fn new(page: PageSize, canvas_width: f64, canvas_height: f64) -> Option<Self> {
        let usable = |value: f64| value.is_finite() && value > 0.0;
        if !usable(canvas_width) || !usable(canvas_height) {
            return None;
        }
        Some(Self {
            ratio_x: page.width / canvas_width,
            ratio_y: page.height / canvas_height,
        })
    }

    pub fn rect_to_pdf(&self, rect: &ScreenRect) -> PdfRect {
        PdfRect::new(
            rect.x * self.ratio_x,
            rect.y * self.ratio_y,
            rect.width * self.ratio_x,
            rect.height * self.ratio_y,
        )
    }
}

/// Geometry of the page currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRenderState {
    pub page_number: u32,
    pub scale: Scale,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub pdf_width: f64,
    pub pdf_height: f64,
}

impl PageRenderState {
    pub fn new(page_number: u32, scale: Scale, size: PageSize) -> Self {
        let mapper = CoordinateMapper::new(scale);
        Self {
            page_number,
            scale,
            pixel_width: mapper.to_pixel(size.width),
            pixel_height: mapper.to_pixel(size.height),
            pdf_width: size.width,
            pdf_height: size.height,
        }
    }

    pub fn page_size(&self) -> PageSize {
        PageSize {
            width: self.pdf_width,
            height: self.pdf_height,
        }
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.scale)
    }
}
