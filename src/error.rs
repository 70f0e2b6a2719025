//! Error types for chaos actions

use thiserror::Error;

/// Errors raised while reading configuration or secrets
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration key: {0}")]
    MissingKey(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by the machine actions
#[derive(Error, Debug)]
pub enum ChaosError {
    /// The fetch step returned nothing; no client was built and nothing was mutated
    #[error("No {kind} found")]
    NoCandidates { kind: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication, resource query or management API failure, passed through as-is
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl ChaosError {
    /// True when the action aborted because nothing matched the filter
    pub fn is_no_candidates(&self) -> bool {
        matches!(self, ChaosError::NoCandidates { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_candidates_message_names_resource_kind() {
        let err = ChaosError::NoCandidates {
            kind: "virtual machines",
        };
        assert_eq!(err.to_string(), "No virtual machines found");
        assert!(err.is_no_candidates());
    }

    #[test]
    fn test_upstream_error_is_transparent() {
        let err = ChaosError::from(anyhow::anyhow!("API request failed: 403 Forbidden"));
        assert_eq!(err.to_string(), "API request failed: 403 Forbidden");
        assert!(!err.is_no_candidates());
    }
}
