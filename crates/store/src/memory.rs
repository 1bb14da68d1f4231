use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use snafu::OptionExt;

use super::error::{NotFoundSnafu, PoisonedSnafu, RejectedSnafu, StoreResult};
use super::ids::DocumentId;
use super::types::{
    DEFAULT_DOCUMENT_FILE_NAME, DocumentRecord, DocumentStatus, NewDocument, ReplaceInstruction,
    SignaturePlacement,
};
use super::DocumentStore;

#[derive(Debug, Clone)]
struct StoredDocument {
    record: DocumentRecord,
    bytes: Vec<u8>,
    replacement_batches: Vec<Vec<ReplaceInstruction>>,
    signatures: Vec<SignaturePlacement>,
}

/// Process-local document store.
///
/// Keeps every submission so callers (tests, the CLI replay) can inspect what
/// the editor would have sent to the remote service.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, input: NewDocument) -> StoreResult<DocumentRecord> {
        let now = unix_timestamp_seconds();
        let file_name = if input.file_name.trim().is_empty() {
            DEFAULT_DOCUMENT_FILE_NAME.to_string()
        } else {
            input.file_name.trim().to_string()
        };
        let record = DocumentRecord {
            id: DocumentId::new_v7(),
            owner_id: input.owner_id,
            file_name,
            status: DocumentStatus::Draft,
            created_at_unix_seconds: now,
            updated_at_unix_seconds: now,
        };

        let mut documents = self
            .documents
            .write()
            .ok()
            .context(PoisonedSnafu { stage: "memory-insert" })?;
        documents.insert(
            record.id,
            StoredDocument {
                record: record.clone(),
                bytes: input.bytes,
                replacement_batches: Vec::new(),
                signatures: Vec::new(),
            },
        );
        tracing::debug!(document_id = %record.id, "stored document");
        Ok(record)
    }

    pub fn replacement_batches(
        &self,
        document_id: DocumentId,
    ) -> StoreResult<Vec<Vec<ReplaceInstruction>>> {
        self.with_document(document_id, "memory-list-replacements", |document| {
            document.replacement_batches.clone()
        })
    }

    pub fn signatures(&self, document_id: DocumentId) -> StoreResult<Vec<SignaturePlacement>> {
        self.with_document(document_id, "memory-list-signatures", |document| {
            document.signatures.clone()
        })
    }

    fn with_document<T>(
        &self,
        document_id: DocumentId,
        stage: &'static str,
        read: impl FnOnce(&StoredDocument) -> T,
    ) -> StoreResult<T> {
        let documents = self.documents.read().ok().context(PoisonedSnafu { stage })?;
        let document = documents.get(&document_id).context(NotFoundSnafu {
            stage,
            id: document_id.to_string(),
        })?;
        Ok(read(document))
    }

    fn with_document_mut<T>(
        &self,
        document_id: DocumentId,
        stage: &'static str,
        write: impl FnOnce(&mut StoredDocument) -> T,
    ) -> StoreResult<T> {
        let mut documents = self.documents.write().ok().context(PoisonedSnafu { stage })?;
        let document = documents.get_mut(&document_id).context(NotFoundSnafu {
            stage,
            id: document_id.to_string(),
        })?;
        Ok(write(document))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, document_id: DocumentId) -> StoreResult<DocumentRecord> {
        self.with_document(document_id, "memory-get", |document| {
            document.record.clone()
        })
    }

    fn download_bytes(&self, document_id: DocumentId) -> StoreResult<Vec<u8>> {
        self.with_document(document_id, "memory-download", |document| {
            document.bytes.clone()
        })
    }

    fn submit_replacements(
        &self,
        document_id: DocumentId,
        instructions: &[ReplaceInstruction],
    ) -> StoreResult<DocumentRecord> {
        if let Some(details) = instructions.iter().find_map(invalid_instruction) {
            return RejectedSnafu {
                stage: "memory-submit-replacements-validate",
                id: document_id.to_string(),
                details,
            }
            .fail();
        }

        let record = self.with_document_mut(
            document_id,
            "memory-submit-replacements",
            |document| {
                document.replacement_batches.push(instructions.to_vec());
                document.record.updated_at_unix_seconds = unix_timestamp_seconds();
                document.record.clone()
            },
        )?;
        tracing::info!(
            document_id = %document_id,
            count = instructions.len(),
            "accepted replacement instructions"
        );
        Ok(record)
    }

    fn submit_signature(
        &self,
        document_id: DocumentId,
        placement: SignaturePlacement,
    ) -> StoreResult<DocumentRecord> {
        if placement.page == 0 || placement.image_data.trim().is_empty() {
            return RejectedSnafu {
                stage: "memory-submit-signature-validate",
                id: document_id.to_string(),
                details: "signature needs a page and an image".to_string(),
            }
            .fail();
        }

        let record = self.with_document_mut(document_id, "memory-submit-signature", |document| {
            document.signatures.push(placement);
            document.record.status = DocumentStatus::Signed;
            document.record.updated_at_unix_seconds = unix_timestamp_seconds();
            document.record.clone()
        })?;
        tracing::info!(document_id = %document_id, "accepted signature placement");
        Ok(record)
    }
}

fn invalid_instruction(instruction: &ReplaceInstruction) -> Option<String> {
    if instruction.page == 0 {
        return Some("page numbers start at 1".to_string());
    }
    let geometry = [
        instruction.x,
        instruction.y,
        instruction.width,
        instruction.height,
    ];
    if geometry.iter().any(|value| !value.is_finite() || *value < 0.0) {
        return Some(format!(
            "instruction on page {} has invalid geometry",
            instruction.page
        ));
    }
    None
}

fn unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
