//! Native page source for the editor, built on `hayro-interpret`.
//!
//! This crate provides:
//! - Text items via [`text::GlyphCollector`]
//! - Proof rasters via [`render::MarkDevice`]
//! - [`HayroPageSource`], which serves both through the editor's `PageSource`

pub mod error;
pub mod render;
pub mod text;

use std::path::Path;
use std::sync::Arc;

use hayro_interpret::hayro_syntax::Pdf;
use hayro_interpret::util::PageExt;
use hayro_interpret::{Context, Device, InterpreterSettings, interpret_page};
use image::RgbaImage;
use kurbo::Rect;
use signflow_editor::{EditorResult, PageSize, PageSource, RawTextItem, Scale};
use snafu::ResultExt;

pub use error::{PdfError, PdfResult};
use error::{PageNotFoundSnafu, ParseSnafu, ReadSnafu};
use render::MarkDevice;
use text::{GlyphCollector, TextItem};

/// Serves pages of one PDF document.
///
/// Only the bytes and page sizes are kept; each call parses the document
/// again, so the source stays `Send + Sync` regardless of the parser's types.
#[derive(Debug, Clone)]
pub struct HayroPageSource {
    data: Arc<Vec<u8>>,
    page_sizes: Vec<PageSize>,
}

impl HayroPageSource {
    pub fn new(bytes: Vec<u8>) -> PdfResult<Self> {
        let data = Arc::new(bytes);
        let pdf = parse(&data, "hayro-source-new")?;
        let page_sizes = pdf
            .pages()
            .iter()
            .map(|page| {
                let (width, height) = page.render_dimensions();
                PageSize {
                    width: f64::from(width),
                    height: f64::from(height),
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(pages = page_sizes.len(), "pdf parsed");
        Ok(Self { data, page_sizes })
    }

    pub fn open(path: &Path) -> PdfResult<Self> {
        let bytes = std::fs::read(path).context(ReadSnafu {
            stage: "hayro-source-open",
            path: path.to_path_buf(),
        })?;
        Self::new(bytes)
    }

    /// Grouped text of a page in top-left page points.
    pub fn page_text(&self, page: u32) -> PdfResult<Vec<TextItem>> {
        let mut collector = GlyphCollector::default();
        self.interpret(page, "hayro-source-page-text", &mut collector)?;
        Ok(collector.items())
    }

    pub fn proof_raster(&self, page: u32, scale: Scale) -> PdfResult<RgbaImage> {
        let size = self.size_of(page, "hayro-source-proof-raster")?;
        let mut device = MarkDevice::default();
        self.interpret(page, "hayro-source-proof-raster", &mut device)?;
        Ok(device.paint(size.width, size.height, scale))
    }

    fn size_of(&self, page: u32, stage: &'static str) -> PdfResult<PageSize> {
        let index = self.index_of(page, stage)?;
        Ok(self.page_sizes[index])
    }

    fn index_of(&self, page: u32, stage: &'static str) -> PdfResult<usize> {
        let page_count = self.page_count();
        snafu::ensure!(
            (1..=page_count).contains(&page),
            PageNotFoundSnafu {
                stage,
                page,
                page_count,
            }
        );
        Ok(page as usize - 1)
    }

    fn interpret<D>(&self, page: u32, stage: &'static str, device: &mut D) -> PdfResult<()>
    where
        D: for<'a> Device<'a>,
    {
        let index = self.index_of(page, stage)?;
        let pdf = parse(&self.data, stage)?;
        let Some(page) = pdf.pages().get(index) else {
            return PageNotFoundSnafu {
                stage,
                page,
                page_count: self.page_count(),
            }
            .fail();
        };

        let (width, height) = page.render_dimensions();
        let bbox = Rect::new(0.0, 0.0, f64::from(width), f64::from(height));
        let mut context = Context::new(
            page.initial_transform(true),
            bbox,
            page.xref(),
            InterpreterSettings::default(),
        );
        interpret_page(page, &mut context, device);
        Ok(())
    }
}

fn parse(data: &Arc<Vec<u8>>, stage: &'static str) -> PdfResult<Pdf> {
    Pdf::new(data.clone()).map_err(|error| {
        ParseSnafu {
            stage,
            details: format!("{error:?}"),
        }
        .build()
    })
}

impl PageSource for HayroPageSource {
    fn page_count(&self) -> u32 {
        u32::try_from(self.page_sizes.len()).unwrap_or(u32::MAX)
    }

    fn page_size(&self, page: u32) -> EditorResult<PageSize> {
        Ok(self.size_of(page, "hayro-source-page-size")?)
    }

    fn render(&self, page: u32, scale: Scale) -> EditorResult<RgbaImage> {
        Ok(self.proof_raster(page, scale)?)
    }

    fn text_items(&self, page: u32, scale: Scale) -> EditorResult<Vec<RawTextItem>> {
        let items = self.page_text(page)?;
        Ok(items.iter().map(|item| item.to_raw(scale)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_parse_error() {
        let error = HayroPageSource::new(b"definitely not a pdf".to_vec()).unwrap_err();
        assert!(matches!(error, PdfError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let error = HayroPageSource::open(Path::new("/nonexistent/input.pdf")).unwrap_err();
        assert!(matches!(error, PdfError::Read { .. }));
    }

    #[test]
    fn page_errors_surface_as_editor_errors() {
        let source = HayroPageSource {
            data: Arc::new(Vec::new()),
            page_sizes: vec![PageSize {
                width: 612.0,
                height: 792.0,
            }],
        };
        assert_eq!(source.page_count(), 1);
        assert!(source.page_size(1).is_ok());

        let error = source.page_size(2).unwrap_err();
        assert!(matches!(
            error,
            signflow_editor::EditorError::PageSource { .. }
        ));
    }
}
