use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("document with id '{id}' was not found"))]
    NotFound { stage: &'static str, id: String },
    #[snafu(display("document id '{raw}' is invalid"))]
    InvalidId {
        stage: &'static str,
        raw: String,
        source: uuid::Error,
    },
    #[snafu(display("document '{id}' rejected submission: {details}"))]
    Rejected {
        stage: &'static str,
        id: String,
        details: String,
    },
    #[snafu(display("document store lock was poisoned at {stage}"))]
    Poisoned { stage: &'static str },
}

pub type StoreResult<T> = Result<T, StoreError>;
