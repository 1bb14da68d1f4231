use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use uuid::Uuid;

use super::error::{InvalidIdSnafu, StoreError, StoreResult};

macro_rules! uuid_key {
    ($(#[$meta:meta])* $name:ident, $stage:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Time-ordered, so keys sort by creation.
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Accepts the forms the document service hands out, including
            /// braced and `urn:uuid:` spellings.
            pub fn parse(raw: &str) -> StoreResult<Self> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .context(InvalidIdSnafu {
                        stage: $stage,
                        raw: raw.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), formatter)
            }
        }

        impl FromStr for $name {
            type Err = StoreError;

            fn from_str(raw: &str) -> StoreResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

uuid_key!(
    /// A PDF held by the document service.
    DocumentId,
    "parse-document-id"
);
uuid_key!(
    /// The account that uploaded a document.
    OwnerId,
    "parse-owner-id"
);
