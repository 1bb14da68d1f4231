use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EditorError {
    #[snafu(display("scale {value} is not a positive finite number"))]
    InvalidScale { stage: &'static str, value: f64 },
    #[snafu(display("page {page} is outside 1..={page_count}"))]
    PageOutOfRange {
        stage: &'static str,
        page: u32,
        page_count: u32,
    },
    #[snafu(display("no text run with id {id} on the current page"))]
    UnknownRun { stage: &'static str, id: usize },
    #[snafu(display("unsupported image: {details}"))]
    UnsupportedImage {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("no signature has been applied yet"))]
    NoSignature { stage: &'static str },
    #[snafu(display("measured canvas size {width}x{height} cannot be mapped to the page"))]
    DegenerateCanvas {
        stage: &'static str,
        width: f64,
        height: f64,
    },
    #[snafu(display("failed to encode signature raster on `{stage}`: {source}"))]
    EncodeRaster {
        stage: &'static str,
        source: image::ImageError,
    },
    #[snafu(display("failed to decode uploaded image on `{stage}`: {source}"))]
    DecodeRaster {
        stage: &'static str,
        source: image::ImageError,
    },
    #[snafu(display("page source failed on `{stage}`: {message}"))]
    PageSource {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("document store failed on `{stage}`: {source}"))]
    Store {
        stage: &'static str,
        source: signflow_store::StoreError,
    },
    #[snafu(display("failed to read signature file {path:?} on `{stage}`: {source}"))]
    ReadUpload {
        stage: &'static str,
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("background page task failed on `{stage}`: {message}"))]
    Background {
        stage: &'static str,
        message: String,
    },
}

pub type EditorResult<T> = Result<T, EditorError>;
