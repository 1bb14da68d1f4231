use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PdfError {
    #[snafu(display("failed to read pdf at {path:?} on `{stage}`: {source}"))]
    Read {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse pdf on `{stage}`: {details}"))]
    Parse {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("page {page} is outside 1..={page_count} on `{stage}`"))]
    PageNotFound {
        stage: &'static str,
        page: u32,
        page_count: u32,
    },
}

pub type PdfResult<T> = Result<T, PdfError>;

impl From<PdfError> for signflow_editor::EditorError {
    fn from(error: PdfError) -> Self {
        let stage = match &error {
            PdfError::Read { stage, .. }
            | PdfError::Parse { stage, .. }
            | PdfError::PageNotFound { stage, .. } => *stage,
        };
        signflow_editor::EditorError::PageSource {
            stage,
            message: error.to_string(),
        }
    }
}
