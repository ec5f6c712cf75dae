/*!
Fatal error categories for a tracker run
*/

use std::error::Error;
use std::path::PathBuf;

use sentry_data::DataError;

/// Anything that ends a run with the error exit code.
///
/// A missing or corrupt snapshot and a failed alert sound are not errors;
/// they are handled where they occur.
#[derive(Debug, thiserror::Error)]
pub enum AsentryError {
    /// Transport failure or non-success status from the Sentry API.
    #[error("network error")]
    Network(#[from] reqwest::Error),

    /// The response did not have the expected signature or shape.
    #[error("unexpected data format")]
    Format(#[from] DataError),

    /// The new snapshot could not be written.
    #[error("could not save snapshot to {}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration file or unresolvable default paths.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl AsentryError {
    /// Short category name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            AsentryError::Network(_) => "network",
            AsentryError::Format(_) => "format",
            AsentryError::Persistence { .. } => "persistence",
            AsentryError::Config(_) => "config",
            AsentryError::Other(_) => "other",
        }
    }

    /// Messages of every underlying cause, outermost first, excluding this error.
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut current = self.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        causes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_names_path_and_cause() {
        let err = AsentryError::Persistence {
            path: PathBuf::from("/nope/.asentry"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.kind(), "persistence");
        assert!(err.to_string().contains("/nope/.asentry"));
        assert_eq!(err.causes(), vec!["denied".to_string()]);
    }

    #[test]
    fn format_error_chains_data_error() {
        let err = AsentryError::from(DataError::UnexpectedVersion {
            found: "1.0".into(),
            expected: "2.0".into(),
        });
        assert_eq!(err.kind(), "format");
        assert_eq!(err.to_string(), "unexpected data format");
        assert_eq!(err.causes().len(), 1);
        assert!(err.causes()[0].contains("1.0"));
    }
}
