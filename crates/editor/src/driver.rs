//! Native glue that runs page work off the interactive thread.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use snafu::ResultExt;

use crate::error::{BackgroundSnafu, EditorResult, ReadUploadSnafu};
use crate::session::{EditorSession, RenderOutcome};
use crate::signature::pad::SignaturePad;
use crate::source::PageSource;

/// Result of one refresh: the raster to show and what happened to the session.
#[derive(Debug)]
pub struct PageRefresh {
    pub raster: Option<RgbaImage>,
    pub outcome: RenderOutcome,
}

/// Renders then extracts the current page and installs the result.
///
/// The page work runs on the blocking pool; rendering finishes before text
/// extraction starts. If the session moved on while the work was running the
/// result is dropped and no raster is returned. On failure the request is
/// abandoned and the session keeps showing the page it had.
pub async fn refresh_page(
    session: &mut EditorSession,
    source: Arc<dyn PageSource>,
) -> EditorResult<PageRefresh> {
    let ticket = session.request_render();
    let (page, scale) = (ticket.page, ticket.scale);

    let work = tokio::task::spawn_blocking(move || {
        let size = source.page_size(page)?;
        let raster = source.render(page, scale)?;
        let items = source.text_items(page, scale)?;
        EditorResult::Ok((size, raster, items))
    })
    .await
    .map_err(|error| {
        BackgroundSnafu {
            stage: "driver-refresh-page",
            message: error.to_string(),
        }
        .build()
    })
    .and_then(|result| result);

    let (size, raster, items) = match work {
        Ok(rendered) => rendered,
        Err(error) => {
            session.abandon_render(&ticket);
            return Err(error);
        }
    };

    let outcome = session.apply_render(ticket, size, &items);
    let raster = matches!(outcome, RenderOutcome::Applied { .. }).then_some(raster);
    Ok(PageRefresh { raster, outcome })
}

/// Reads a signature image from disk into the pad's upload slot.
pub async fn read_signature_upload(pad: &mut SignaturePad, path: &Path) -> EditorResult<()> {
    let bytes = tokio::fs::read(path).await.context(ReadUploadSnafu {
        stage: "driver-read-signature-upload",
        path: path.to_path_buf(),
    })?;
    pad.load_upload(&bytes)?;
    tracing::info!(?path, bytes = bytes.len(), "signature upload loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use base64::Engine;

    use super::*;
    use crate::data_uri;
    use crate::error::EditorError;
    use crate::geometry::{PageSize, Scale};
    use crate::runs::RawTextItem;
    use crate::runs::tests::item;
    use crate::settings::EditorSettings;

    struct OnePage;

    impl PageSource for OnePage {
        fn page_count(&self) -> u32 {
            1
        }

        fn page_size(&self, _page: u32) -> EditorResult<PageSize> {
            Ok(PageSize {
                width: 100.0,
                height: 50.0,
            })
        }

        fn render(&self, _page: u32, scale: Scale) -> EditorResult<RgbaImage> {
            let width = (100.0 * scale.get()).round() as u32;
            let height = (50.0 * scale.get()).round() as u32;
            Ok(RgbaImage::new(width, height))
        }

        fn text_items(&self, _page: u32, _scale: Scale) -> EditorResult<Vec<RawTextItem>> {
            Ok(vec![item("Hi", 10.0, 10.0, 20.0, 12.0)])
        }
    }

    #[tokio::test]
    async fn refresh_installs_runs_and_returns_raster() {
        let mut session = EditorSession::new(1, Arc::new(EditorSettings::default())).unwrap();
        let refresh = refresh_page(&mut session, Arc::new(OnePage)).await.unwrap();

        let raster = refresh.raster.unwrap();
        assert_eq!(raster.dimensions(), (120, 60));
        assert_eq!(session.runs().len(), 1);
        assert!((session.render_state().unwrap().pixel_width - 120.0).abs() < 1e-9);
    }

    /// Serves page 1 and fails on anything else.
    struct BrokenAfterFirst;

    impl PageSource for BrokenAfterFirst {
        fn page_count(&self) -> u32 {
            2
        }

        fn page_size(&self, page: u32) -> EditorResult<PageSize> {
            if page == 1 {
                OnePage.page_size(page)
            } else {
                Err(EditorError::PageSource {
                    stage: "test-broken-page",
                    message: format!("page {page} is damaged"),
                })
            }
        }

        fn render(&self, page: u32, scale: Scale) -> EditorResult<RgbaImage> {
            OnePage.render(page, scale)
        }

        fn text_items(&self, page: u32, scale: Scale) -> EditorResult<Vec<RawTextItem>> {
            OnePage.text_items(page, scale)
        }
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_page() {
        let source: Arc<dyn PageSource> = Arc::new(BrokenAfterFirst);
        let mut session = EditorSession::new(2, Arc::new(EditorSettings::default())).unwrap();
        refresh_page(&mut session, source.clone()).await.unwrap();
        session.sync_run(0, "Hello").unwrap();

        session.next_page().unwrap();
        let error = refresh_page(&mut session, source).await.unwrap_err();
        assert!(matches!(error, EditorError::PageSource { .. }));

        assert_eq!(session.page(), 1);
        assert!(session.pending_render().is_none());
        assert_eq!(session.render_state().unwrap().page_number, 1);
        let blocks = session.build_replace_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].page, 1);
        assert_eq!(blocks[0].text, "Hello");
    }

    #[tokio::test]
    async fn upload_reads_image_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let raster = RgbaImage::new(2, 2);
        let uri = data_uri::encode_png(&raster, "test").unwrap();
        let encoded = uri.trim_start_matches("data:image/png;base64,");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        file.write_all(&bytes).unwrap();

        let mut pad = SignaturePad::new();
        read_signature_upload(&mut pad, file.path()).await.unwrap();
        assert!(pad.has_signature());
    }

    #[tokio::test]
    async fn missing_upload_is_an_error() {
        let mut pad = SignaturePad::new();
        let result = read_signature_upload(&mut pad, Path::new("/nonexistent/sig.png")).await;
        assert!(result.is_err());
        assert!(!pad.has_signature());
    }
}
