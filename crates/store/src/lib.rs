pub mod error;
pub mod ids;
pub mod memory;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use ids::{DocumentId, OwnerId};
pub use memory::MemoryDocumentStore;
pub use types::{
    DEFAULT_DOCUMENT_FILE_NAME, DocumentRecord, DocumentStatus, NewDocument, ReplaceInstruction,
    SignaturePlacement,
};

/// Remote document service as seen by the editor.
///
/// Transport, authentication and the actual PDF mutation live behind this
/// trait; the editor only hands over PDF-space instructions.
pub trait DocumentStore: Send + Sync {
    fn get(&self, document_id: DocumentId) -> StoreResult<DocumentRecord>;
    fn download_bytes(&self, document_id: DocumentId) -> StoreResult<Vec<u8>>;
    fn submit_replacements(
        &self,
        document_id: DocumentId,
        instructions: &[ReplaceInstruction],
    ) -> StoreResult<DocumentRecord>;
    fn submit_signature(
        &self,
        document_id: DocumentId,
        placement: SignaturePlacement,
    ) -> StoreResult<DocumentRecord>;
}
