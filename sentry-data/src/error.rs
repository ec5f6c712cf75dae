/*!
Errors raised while reading Sentry data
*/

/// Problems with the shape or content of Sentry data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A risk scale value that is not a finite decimal number.
    #[error("invalid risk score {0:?}")]
    InvalidScore(String),

    /// The body is not valid JSON or is missing required fields.
    #[error("malformed JSON: {0}")]
    Json(serde_json::Error),

    /// The response was produced by some other service.
    #[error("unexpected data source {found:?} (expected {expected:?})")]
    UnexpectedSource { found: String, expected: String },

    /// The response uses a schema version this crate does not understand.
    #[error("unexpected data format version {found:?} (expected {expected:?})")]
    UnexpectedVersion { found: String, expected: String },

    /// One row of the `data` array could not be decoded.
    #[error("malformed record {index}: {error}")]
    Record { index: usize, error: serde_json::Error },
}

// Not `#[from]`: the JSON message is already part of the display text and
// must not show up again as a separate cause.
impl From<serde_json::Error> for DataError {
    fn from(error: serde_json::Error) -> Self {
        DataError::Json(error)
    }
}
