//! Editing core for signing and correcting PDF pages in a browser-hosted viewer.
//!
//! The host renders pages and reports positioned text; this crate keeps the
//! geometry straight across PDF points, render pixels and screen pixels, runs
//! the selection and signature state machines, and flattens everything the
//! user did into PDF-space instructions for the document service.

pub mod accumulator;
pub mod data_uri;
#[cfg(feature = "native")]
pub mod driver;
pub mod error;
pub mod geometry;
pub mod runs;
pub mod selection;
pub mod session;
pub mod settings;
pub mod signature;
pub mod source;

pub use accumulator::{EditAccumulator, ImageBlock};
pub use error::{EditorError, EditorResult};
pub use geometry::{
    CoordinateMapper, PageRenderState, PageSize, PdfRect, PixelRect, Scale, ScreenMapper,
    ScreenRect,
};
pub use runs::{RawTextItem, TextRun, TextRunSet, TextRunView};
pub use selection::{
    CommitOutcome, EditKind, Key, KeyOutcome, KeyPress, PointerTarget, ReleaseOutcome,
    SelectionEdit, SelectionEngine,
};
pub use session::{EditorSession, RenderOutcome, RenderTicket};
pub use settings::{EditorSettings, SettingsError, SettingsStore};
pub use signature::SignatureSession;
pub use signature::capture::{CaptureGuard, NoCapture, PointerCapture};
pub use signature::pad::{SignatureMode, SignaturePad, TypedLayout};
pub use signature::placement::{PlacementEngine, ResizeHandle};
pub use source::PageSource;
