//! Error types for the recommendation pipeline
//!
//! Every failure here aborts the in-flight request. Situations that the
//! pipeline answers with an empty recommendation (too few labels, unknown
//! metric names) are not errors and never show up in this enum.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// Stopword resource could not be read
    #[error("Failed to load stopwords from {path}: {source}")]
    StopwordsLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lemmatizer could not be started or returned garbage
    #[error("Lemmatizer error: {0}")]
    Lemmatizer(String),

    /// Feature space holds no attribute at all
    #[error("Feature space is empty")]
    EmptyFeatureSpace,

    /// Dataset was encoded against another feature space
    #[error("Dataset mismatch: expected {expected} attributes, found {found}")]
    DatasetMismatch { expected: usize, found: usize },

    /// Prediction input must hold exactly one instance
    #[error("Input dataset must contain exactly one instance, found {0}")]
    InstanceCount(usize),

    /// Learner could not be built from the given data
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Collaborator storage failed
    #[error("Repository error: {0}")]
    Repository(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset snapshot could not be (de)serialized
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_cbor::Error),

    /// JSON input could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RecommendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_error_names_the_path() {
        let err = RecommendError::StopwordsLoad {
            path: PathBuf::from("/nowhere/stopwords.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nowhere/stopwords.txt"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn mismatch_error_reports_both_sizes() {
        let err = RecommendError::DatasetMismatch { expected: 7, found: 5 };
        assert_eq!(err.to_string(), "Dataset mismatch: expected 7 attributes, found 5");
    }
}
