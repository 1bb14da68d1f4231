use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, OwnerId};

/// File name used when an upload arrives without one.
pub const DEFAULT_DOCUMENT_FILE_NAME: &str = "document.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Signed,
    Completed,
    Pending,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub owner_id: OwnerId,
    pub file_name: String,
    pub status: DocumentStatus,
    /// Unix seconds.
    #[serde(rename = "createdAt")]
    pub created_at_unix_seconds: u64,
    /// Unix seconds.
    #[serde(rename = "updatedAt")]
    pub updated_at_unix_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub owner_id: OwnerId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One text replacement in PDF points, handed to the document-mutation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceInstruction {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font_size: u32,
}

/// Final signature rectangle in PDF points plus the raster to stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePlacement {
    #[serde(rename = "signatureImage")]
    pub image_data: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
