use image::RgbaImage;

use crate::error::EditorResult;
use crate::geometry::{PageSize, Scale};
use crate::runs::RawTextItem;

/// The page-rendering engine the editor drives.
///
/// Pages are 1-based. `render` produces a raster of
/// `page_size * scale` pixels and `text_items` returns items already mapped
/// into that raster's top-left pixel space.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> u32;
    fn page_size(&self, page: u32) -> EditorResult<PageSize>;
    fn render(&self, page: u32, scale: Scale) -> EditorResult<RgbaImage>;
    fn text_items(&self, page: u32, scale: Scale) -> EditorResult<Vec<RawTextItem>>;
}
