//! Scripted editing sessions, replayed against a real PDF.

use std::path::PathBuf;

use serde::Deserialize;
use signflow_editor::{Key, PointerTarget};

/// One user action. Coordinates are render pixels at the current scale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    GoToPage {
        page: u32,
    },
    NextPage,
    PreviousPage,
    ZoomIn,
    ZoomOut,
    /// Pointer down, one move, pointer up.
    Drag {
        from: [f64; 2],
        to: [f64; 2],
        #[serde(default = "canvas_target")]
        target: PointerTarget,
    },
    Type {
        text: String,
    },
    /// Live size of the open editor box, in pixels.
    Resize {
        width: f64,
        height: f64,
    },
    Key {
        key: Key,
        #[serde(default)]
        modifier_held: bool,
    },
    SyncRun {
        id: usize,
        text: String,
    },
    RevertRun {
        id: usize,
    },
    RemoveEdit {
        index: usize,
    },
    /// Selects an image file, arms placement and clicks at `at`.
    PlaceImage {
        path: PathBuf,
        at: [f64; 2],
    },
}

fn canvas_target() -> PointerTarget {
    PointerTarget::Canvas
}

pub fn parse(json: &str) -> serde_json::Result<Vec<Step>> {
    serde_json::from_str(json)
}
