/*!
Parsers and types for the NASA/JPL Sentry impact-risk table.

The Sentry API lists near-Earth objects with a non-zero probability of
impacting Earth. This crate models one row of that table, the persisted
snapshot of previously seen rows, and validation of the API envelope.
*/

pub mod error;
pub mod object;
pub mod response;
pub mod score;
pub mod snapshot;

pub use error::DataError;
pub use object::{SavedObject, TrackedObject};
pub use response::{SENTRY_SOURCE, SENTRY_VERSION, Signature, parse_response};
pub use score::Score;
pub use snapshot::{Snapshot, SnapshotFile};
