//! Signing: capture a signature raster, then place it on the page.

pub mod capture;
pub mod pad;
pub mod placement;

use std::sync::Arc;

use signflow_store::{DocumentId, DocumentRecord, DocumentStore, SignaturePlacement};
use snafu::{OptionExt, ResultExt};

use crate::error::{EditorResult, NoSignatureSnafu, StoreSnafu};
use crate::geometry::PageSize;
use capture::PointerCapture;
use pad::SignaturePad;
use placement::PlacementEngine;

/// One signing session on one page of one document.
#[derive(Debug)]
pub struct SignatureSession {
    pub pad: SignaturePad,
    pub placement: PlacementEngine,
    page: u32,
    page_size: PageSize,
}

impl SignatureSession {
    pub fn new(page: u32, page_size: PageSize, capture: Arc<dyn PointerCapture>) -> Self {
        Self {
            pad: SignaturePad::new(),
            placement: PlacementEngine::new(capture),
            page,
            page_size,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Moves the session to another page; the placement rect is kept.
    pub fn set_page(&mut self, page: u32, page_size: PageSize) {
        self.page = page;
        self.page_size = page_size;
    }

    /// Snapshots the pad's current mode and resets the placement size.
    pub fn apply(&mut self) -> EditorResult<bool> {
        let applied = self.pad.apply()?;
        if applied {
            self.placement.reset_size();
            tracing::info!(mode = ?self.pad.mode(), "signature applied");
        } else {
            tracing::debug!(mode = ?self.pad.mode(), "nothing to apply for signature mode");
        }
        Ok(applied)
    }

    pub fn clear(&mut self) {
        self.pad.clear();
    }

    /// Builds the placement record in page points.
    pub fn confirm(&self) -> EditorResult<SignaturePlacement> {
        let image = self.pad.image().context(NoSignatureSnafu {
            stage: "signature-confirm",
        })?;
        let rect = self.placement.to_page_rect(self.page_size)?;
        tracing::info!(
            page = self.page,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "signature placement confirmed"
        );
        Ok(SignaturePlacement {
            image_data: image.to_string(),
            page: self.page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        })
    }

    /// Confirms and hands the placement to the document service.
    pub fn submit(
        &self,
        store: &dyn DocumentStore,
        document_id: DocumentId,
    ) -> EditorResult<DocumentRecord> {
        let placement = self.confirm()?;
        store
            .submit_signature(document_id, placement)
            .context(StoreSnafu {
                stage: "signature-submit",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture::NoCapture;
    use kurbo::Point;
    use signflow_store::{DocumentStatus, MemoryDocumentStore, NewDocument, OwnerId};

    fn session() -> SignatureSession {
        let page = PageSize {
            width: 600.0,
            height: 800.0,
        };
        let mut session = SignatureSession::new(2, page, Arc::new(NoCapture));
        session.placement.set_canvas_size(900.0, 1200.0);
        session
    }

    fn draw_something(session: &mut SignatureSession) {
        session.pad.begin_stroke(Point::new(20.0, 20.0));
        session.pad.stroke_to(Point::new(120.0, 60.0));
        session.pad.end_stroke();
    }

    #[test]
    fn confirm_without_signature_is_rejected() {
        let session = session();
        assert!(session.confirm().is_err());
    }

    #[test]
    fn apply_resets_placement_size() {
        let mut session = session();
        session
            .placement
            .begin_resize(placement::ResizeHandle::Se, Point::new(300.0, 200.0));
        session.placement.pointer_move(Point::new(500.0, 400.0));
        session.placement.pointer_up();
        assert_eq!(session.placement.rect().width, 400.0);

        draw_something(&mut session);
        assert!(session.apply().unwrap());
        assert_eq!(session.placement.rect().width, 200.0);
        assert_eq!(session.placement.rect().height, 100.0);
    }

    #[test]
    fn confirm_maps_default_rect_through_canvas_ratio() {
        let mut session = session();
        draw_something(&mut session);
        session.apply().unwrap();

        let placement = session.confirm().unwrap();
        assert_eq!(placement.page, 2);
        assert_eq!(
            (placement.x, placement.y, placement.width, placement.height),
            (67.0, 67.0, 133.0, 67.0)
        );
        assert!(placement.image_data.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn submit_marks_document_signed() {
        let store = MemoryDocumentStore::new();
        let record = store
            .insert(NewDocument {
                owner_id: OwnerId::new_v7(),
                file_name: "lease.pdf".to_string(),
                bytes: b"%PDF-1.7".to_vec(),
            })
            .unwrap();

        let mut session = session();
        draw_something(&mut session);
        session.apply().unwrap();

        let updated = session.submit(&store, record.id).unwrap();
        assert_eq!(updated.status, DocumentStatus::Signed);
        assert_eq!(store.signatures(record.id).unwrap().len(), 1);
    }
}
