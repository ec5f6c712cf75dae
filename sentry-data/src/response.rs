/*!
Validation of the Sentry API response envelope
*/

use serde::Deserialize;

use crate::error::DataError;
use crate::object::TrackedObject;

/// `signature.source` of genuine Sentry responses
pub const SENTRY_SOURCE: &str = "NASA/JPL Sentry Data API";
/// Schema version this crate understands
pub const SENTRY_VERSION: &str = "2.0";

/// Identifies the service and schema that produced a response.
#[derive(Debug, Clone, Deserialize)]
pub struct Signature {
    pub source: String,
    pub version: String,
}

impl Signature {
    /// Check this signature against the expected source and version.
    pub fn verify(&self, source: &str, version: &str) -> Result<(), DataError> {
        if self.source != source {
            return Err(DataError::UnexpectedSource {
                found: self.source.clone(),
                expected: source.to_string(),
            });
        }
        if self.version != version {
            return Err(DataError::UnexpectedVersion {
                found: self.version.clone(),
                expected: version.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    signature: Signature,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Parse a summary-mode response body.
///
/// The signature is checked before any row is decoded, so a response from a
/// newer schema fails on its version rather than on some renamed field.
pub fn parse_response(
    body: &str,
    source: &str,
    version: &str,
) -> Result<Vec<TrackedObject>, DataError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    envelope.signature.verify(source, version)?;

    envelope
        .data
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value(row).map_err(|error| DataError::Record { index, error })
        })
        .collect()
}
