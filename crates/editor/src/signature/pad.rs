//! The three ways of producing a signature raster.

use image::{Rgba, RgbaImage};
use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::data_uri;
use crate::error::EditorResult;

pub const DRAW_CANVAS_WIDTH: u32 = 350;
pub const DRAW_CANVAS_HEIGHT: u32 = 150;
pub const STROKE_WIDTH_PX: f64 = 2.0;
pub const TYPED_FONT: &str = "48px \"Brush Script MT\", cursive";

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    #[default]
    Draw,
    Type,
    Upload,
}

/// How the host should paint a typed signature onto its offscreen canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedLayout {
    pub text: String,
    pub font: &'static str,
    pub fill: &'static str,
    pub text_align: &'static str,
    pub text_baseline: &'static str,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

#[derive(Debug, Clone)]
pub struct SignaturePad {
    mode: SignatureMode,
    canvas: RgbaImage,
    pen: Option<Point>,
    typed_text: String,
    typed_raster: Option<String>,
    uploaded: Option<String>,
    image: Option<String>,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new()
    }
}

impl SignaturePad {
    pub fn new() -> Self {
        Self {
            mode: SignatureMode::Draw,
            canvas: RgbaImage::new(DRAW_CANVAS_WIDTH, DRAW_CANVAS_HEIGHT),
            pen: None,
            typed_text: String::new(),
            typed_raster: None,
            uploaded: None,
            image: None,
        }
    }

    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SignatureMode) {
        self.mode = mode;
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// The applied signature, if any.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn begin_stroke(&mut self, point: Point) {
        self.pen = Some(point);
    }

    /// Strokes a line from the last pen position. Ignored while the pen is up.
    pub fn stroke_to(&mut self, point: Point) {
        let Some(from) = self.pen else {
            return;
        };
        self.draw_segment(from, point);
        self.pen = Some(point);
    }

    pub fn end_stroke(&mut self) {
        self.pen = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_some()
    }

    /// Wipes the draw canvas and forgets the applied signature.
    pub fn clear(&mut self) {
        self.canvas = RgbaImage::new(DRAW_CANVAS_WIDTH, DRAW_CANVAS_HEIGHT);
        self.pen = None;
        self.image = None;
    }

    pub fn set_typed_text(&mut self, text: &str) {
        if text != self.typed_text {
            self.typed_raster = None;
        }
        self.typed_text = text.to_string();
    }

    pub fn typed_layout(&self) -> Option<TypedLayout> {
        if self.typed_text.is_empty() {
            return None;
        }
        Some(TypedLayout {
            text: self.typed_text.clone(),
            font: TYPED_FONT,
            fill: "#000",
            text_align: "center",
            text_baseline: "middle",
            canvas_width: DRAW_CANVAS_WIDTH,
            canvas_height: DRAW_CANVAS_HEIGHT,
            anchor_x: f64::from(DRAW_CANVAS_WIDTH) / 2.0,
            anchor_y: f64::from(DRAW_CANVAS_HEIGHT) / 2.0,
        })
    }

    /// Stores what the host painted for [`Self::typed_layout`].
    pub fn set_typed_raster(&mut self, data_uri: &str) -> EditorResult<()> {
        let uri = data_uri::validate(data_uri, "pad-set-typed-raster")?;
        self.typed_raster = Some(uri.to_string());
        Ok(())
    }

    /// Accepts the bytes of a user-supplied file; non-raster files are rejected.
    pub fn load_upload(&mut self, bytes: &[u8]) -> EditorResult<()> {
        self.uploaded = Some(data_uri::from_image_bytes(bytes, "pad-load-upload")?);
        Ok(())
    }

    pub fn has_signature(&self) -> bool {
        self.canvas.as_raw().iter().any(|byte| *byte != 0)
            || !self.typed_text.is_empty()
            || self.uploaded.is_some()
    }

    /// Snapshots the raster of the current mode as the active signature.
    ///
    /// Returns `false` when the mode has nothing to offer yet.
    pub fn apply(&mut self) -> EditorResult<bool> {
        let snapshot = match self.mode {
            SignatureMode::Draw => Some(data_uri::encode_png(&self.canvas, "pad-apply-draw")?),
            SignatureMode::Type => self.typed_raster.clone(),
            SignatureMode::Upload => self.uploaded.clone(),
        };
        let applied = snapshot.is_some();
        if applied {
            self.image = snapshot;
        }
        Ok(applied)
    }

    fn draw_segment(&mut self, from: Point, to: Point) {
        let length = from.distance(to);
        let steps = (length * 2.0).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            self.stamp(from.lerp(to, t));
        }
    }

    fn stamp(&mut self, center: Point) {
        let half = STROKE_WIDTH_PX / 2.0;
        let (width, height) = self.canvas.dimensions();
        let x0 = (center.x - half).floor().max(0.0) as u32;
        let y0 = (center.y - half).floor().max(0.0) as u32;
        let x1 = ((center.x + half).ceil().max(0.0) as u32).min(width);
        let y1 = ((center.y + half).ceil().max(0.0) as u32).min(height);
        for y in y0..y1 {
            for x in x0..x1 {
                self.canvas.put_pixel(x, y, INK);
            }
        }
    }
}
