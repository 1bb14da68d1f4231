//! The on-page signature rectangle: drag, eight-handle resize, and the final
//! conversion into page points.

use std::sync::Arc;

use kurbo::{Point, Size, Vec2};
use serde::Deserialize;
use snafu::OptionExt;

use super::capture::{CaptureGuard, PointerCapture};
use crate::error::{DegenerateCanvasSnafu, EditorResult};
use crate::geometry::{PageSize, ScreenMapper, ScreenRect};

pub const MIN_SIGNATURE_SIZE_PX: f64 = 40.0;
pub const DEFAULT_SIGNATURE_WIDTH_PX: f64 = 200.0;
pub const DEFAULT_SIGNATURE_HEIGHT_PX: f64 = 100.0;
pub const DEFAULT_SIGNATURE_ORIGIN_PX: (f64, f64) = (100.0, 100.0);
/// Smallest width or height reported to the document service, in points.
pub const MIN_PLACED_EXTENT_PT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    E,
    S,
    W,
    Nw,
    Ne,
    Sw,
    Se,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::N,
        ResizeHandle::E,
        ResizeHandle::S,
        ResizeHandle::W,
        ResizeHandle::Nw,
        ResizeHandle::Ne,
        ResizeHandle::Sw,
        ResizeHandle::Se,
    ];

    fn north(self) -> bool {
        matches!(self, Self::N | Self::Nw | Self::Ne)
    }

    fn south(self) -> bool {
        matches!(self, Self::S | Self::Sw | Self::Se)
    }

    fn east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    fn west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }
}

/// Placement rectangle in PDF points, rounded for submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug)]
enum Gesture {
    Idle,
    Dragging {
        grab_offset: Vec2,
        _capture: CaptureGuard,
    },
    Resizing {
        handle: ResizeHandle,
        origin: ScreenRect,
        pointer_origin: Point,
        _capture: CaptureGuard,
    },
}

/// Tracks the signature rectangle in canvas-relative screen pixels.
#[derive(Debug)]
pub struct PlacementEngine {
    rect: ScreenRect,
    canvas: Option<Size>,
    gesture: Gesture,
    capture: Arc<dyn PointerCapture>,
}

impl PlacementEngine {
    pub fn new(capture: Arc<dyn PointerCapture>) -> Self {
        let (x, y) = DEFAULT_SIGNATURE_ORIGIN_PX;
        Self {
            rect: ScreenRect::new(x, y, DEFAULT_SIGNATURE_WIDTH_PX, DEFAULT_SIGNATURE_HEIGHT_PX),
            canvas: None,
            gesture: Gesture::Idle,
            capture,
        }
    }

    pub fn rect(&self) -> ScreenRect {
        self.rect
    }

    pub fn canvas_size(&self) -> Option<Size> {
        self.canvas
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    pub fn active_handle(&self) -> Option<ResizeHandle> {
        match self.gesture {
            Gesture::Resizing { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Records the canvas size as laid out on screen and pulls the rect inside it.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas = Some(Size::new(width, height));
        self.rect = self.clamped(self.rect);
    }

    /// Back to the default size, keeping the current origin.
    pub fn reset_size(&mut self) {
        self.rect.width = DEFAULT_SIGNATURE_WIDTH_PX;
        self.rect.height = DEFAULT_SIGNATURE_HEIGHT_PX;
        self.rect = self.clamped(self.rect);
    }

    pub fn begin_drag(&mut self, pointer: Point) {
        self.gesture = Gesture::Idle;
        self.gesture = Gesture::Dragging {
            grab_offset: pointer - self.rect.origin(),
            _capture: CaptureGuard::acquire(&self.capture),
        };
    }

    pub fn begin_resize(&mut self, handle: ResizeHandle, pointer: Point) {
        self.gesture = Gesture::Idle;
        self.gesture = Gesture::Resizing {
            handle,
            origin: self.rect,
            pointer_origin: pointer,
            _capture: CaptureGuard::acquire(&self.capture),
        };
    }

    pub fn pointer_move(&mut self, pointer: Point) {
        let next = match &self.gesture {
            Gesture::Idle => return,
            Gesture::Dragging { grab_offset, .. } => {
                let origin = pointer - *grab_offset;
                ScreenRect::new(origin.x, origin.y, self.rect.width, self.rect.height)
            }
            Gesture::Resizing {
                handle,
                origin,
                pointer_origin,
                ..
            } => self.resized(*origin, *handle, pointer - *pointer_origin),
        };
        self.rect = self.clamped(next);
    }

    /// Ends the gesture; the capture is released with it.
    pub fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
    }

    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Converts the rect into page points using the measured canvas size.
    pub fn to_page_rect(&self, page: PageSize) -> EditorResult<PlacedRect> {
        let canvas = self.canvas.unwrap_or(Size::ZERO);
        let mapper =
            ScreenMapper::new(page, canvas.width, canvas.height).context(DegenerateCanvasSnafu {
                stage: "placement-to-page-rect",
                width: canvas.width,
                height: canvas.height,
            })?;
        let pdf = mapper.rect_to_pdf(&self.rect);
        Ok(PlacedRect {
            x: pdf.x.round().max(0.0),
            y: pdf.y.round().max(0.0),
            width: pdf.width.round().max(MIN_PLACED_EXTENT_PT),
            height: pdf.height.round().max(MIN_PLACED_EXTENT_PT),
        })
    }

    /// Applies a pointer delta to the rect captured at resize start.
    ///
    /// West and north handles move the origin so the opposite edge stays put.
    fn resized(&self, origin: ScreenRect, handle: ResizeHandle, delta: Vec2) -> ScreenRect {
        let canvas = self.canvas.unwrap_or(Size::new(f64::INFINITY, f64::INFINITY));
        let mut next = origin;

        if handle.east() {
            let room = (canvas.width - origin.x).max(MIN_SIGNATURE_SIZE_PX);
            next.width = (origin.width + delta.x).max(MIN_SIGNATURE_SIZE_PX).min(room);
        }
        if handle.west() {
            let right = origin.right();
            next.width = (origin.width - delta.x)
                .max(MIN_SIGNATURE_SIZE_PX)
                .min(right.max(MIN_SIGNATURE_SIZE_PX));
            next.x = right - next.width;
        }
        if handle.south() {
            let room = (canvas.height - origin.y).max(MIN_SIGNATURE_SIZE_PX);
            next.height = (origin.height + delta.y).max(MIN_SIGNATURE_SIZE_PX).min(room);
        }
        if handle.north() {
            let bottom = origin.bottom();
            next.height = (origin.height - delta.y)
                .max(MIN_SIGNATURE_SIZE_PX)
                .min(bottom.max(MIN_SIGNATURE_SIZE_PX));
            next.y = bottom - next.height;
        }
        next
    }

    /// Enforces the minimum size, then keeps the rect inside the canvas.
    fn clamped(&self, rect: ScreenRect) -> ScreenRect {
        let mut next = rect;
        next.width = next.width.max(MIN_SIGNATURE_SIZE_PX);
        next.height = next.height.max(MIN_SIGNATURE_SIZE_PX);
        let Some(canvas) = self.canvas else {
            return next;
        };

        next.width = next.width.min(canvas.width.max(MIN_SIGNATURE_SIZE_PX));
        next.height = next.height.min(canvas.height.max(MIN_SIGNATURE_SIZE_PX));
        next.x = next.x.min(canvas.width - next.width).max(0.0);
        next.y = next.y.min(canvas.height - next.height).max(0.0);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::capture::NoCapture;
    use crate::signature::capture::tests::CountingCapture;

    fn engine() -> PlacementEngine {
        let mut engine = PlacementEngine::new(Arc::new(NoCapture));
        engine.set_canvas_size(900.0, 1200.0);
        engine
    }

    fn assert_inside(rect: ScreenRect, width: f64, height: f64) {
        assert!(rect.width >= MIN_SIGNATURE_SIZE_PX, "{rect:?}");
        assert!(rect.height >= MIN_SIGNATURE_SIZE_PX, "{rect:?}");
        assert!(rect.x >= 0.0 && rect.y >= 0.0, "{rect:?}");
        assert!(rect.right() <= width + 1e-9, "{rect:?}");
        assert!(rect.bottom() <= height + 1e-9, "{rect:?}");
    }

    #[test]
    fn drag_follows_pointer_from_grab_offset() {
        let mut engine = engine();
        engine.begin_drag(Point::new(150.0, 120.0));
        engine.pointer_move(Point::new(250.0, 320.0));
        engine.pointer_up();

        assert_eq!(engine.rect(), ScreenRect::new(200.0, 300.0, 200.0, 100.0));
        assert!(engine.is_idle());
    }

    #[test]
    fn drag_is_clamped_to_canvas() {
        let mut engine = engine();
        engine.begin_drag(Point::new(150.0, 120.0));
        engine.pointer_move(Point::new(5000.0, -400.0));

        assert_eq!(engine.rect(), ScreenRect::new(700.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn west_handle_keeps_east_edge_fixed() {
        let mut engine = engine();
        engine.begin_resize(ResizeHandle::W, Point::new(100.0, 150.0));
        engine.pointer_move(Point::new(60.0, 170.0));

        assert_eq!(engine.rect(), ScreenRect::new(60.0, 100.0, 240.0, 100.0));
        assert_eq!(engine.active_handle(), Some(ResizeHandle::W));

        engine.pointer_move(Point::new(400.0, 170.0));
        let rect = engine.rect();
        assert_eq!(rect.width, MIN_SIGNATURE_SIZE_PX);
        assert_eq!(rect.right(), 300.0);
    }

    #[test]
    fn north_west_corner_moves_both_axes() {
        let mut engine = engine();
        engine.begin_resize(ResizeHandle::Nw, Point::new(100.0, 100.0));
        engine.pointer_move(Point::new(80.0, 90.0));

        assert_eq!(engine.rect(), ScreenRect::new(80.0, 90.0, 220.0, 110.0));
    }

    #[test]
    fn south_east_corner_grows_without_moving_origin() {
        let mut engine = engine();
        engine.begin_resize(ResizeHandle::Se, Point::new(300.0, 200.0));
        engine.pointer_move(Point::new(350.0, 260.0));

        assert_eq!(engine.rect(), ScreenRect::new(100.0, 100.0, 250.0, 160.0));
    }

    #[test]
    fn every_handle_stays_clamped_under_extreme_deltas() {
        let deltas = [
            Vec2::new(-10_000.0, -10_000.0),
            Vec2::new(10_000.0, 10_000.0),
            Vec2::new(-10_000.0, 10_000.0),
            Vec2::new(10_000.0, -10_000.0),
            Vec2::new(-190.0, 3.0),
            Vec2::new(0.0, 0.0),
        ];
        for handle in ResizeHandle::ALL {
            for delta in deltas {
                let mut engine = engine();
                let start = Point::new(200.0, 150.0);
                engine.begin_resize(handle, start);
                engine.pointer_move(start + delta);
                engine.pointer_up();
                assert_inside(engine.rect(), 900.0, 1200.0);
            }
        }
    }

    #[test]
    fn every_gesture_releases_capture_once() {
        let counter = Arc::new(CountingCapture::default());
        let mut engine = PlacementEngine::new(counter.clone());
        engine.set_canvas_size(900.0, 1200.0);

        engine.begin_drag(Point::new(120.0, 120.0));
        engine.pointer_move(Point::new(130.0, 130.0));
        engine.pointer_up();
        engine.pointer_up();
        assert_eq!(counter.counts(), (1, 1));

        engine.begin_resize(ResizeHandle::E, Point::new(300.0, 150.0));
        engine.begin_resize(ResizeHandle::S, Point::new(200.0, 200.0));
        assert_eq!(counter.counts(), (3, 2));

        engine.cancel();
        assert_eq!(counter.counts(), (3, 3));

        engine.begin_drag(Point::new(120.0, 120.0));
        drop(engine);
        assert_eq!(counter.counts(), (4, 4));
    }

    #[test]
    fn page_rect_uses_measured_canvas_ratio() {
        let mut engine = engine();
        engine.begin_drag(Point::new(100.0, 100.0));
        engine.pointer_move(Point::new(91.0, 121.0));
        engine.pointer_up();

        let placed = engine
            .to_page_rect(PageSize {
                width: 600.0,
                height: 800.0,
            })
            .unwrap();
        assert_eq!(
            placed,
            PlacedRect {
                x: 61.0,
                y: 81.0,
                width: 133.0,
                height: 67.0,
            }
        );
    }

    #[test]
    fn page_rect_needs_a_measured_canvas() {
        let engine = PlacementEngine::new(Arc::new(NoCapture));
        let page = PageSize {
            width: 600.0,
            height: 800.0,
        };
        assert!(engine.to_page_rect(page).is_err());
    }
}
