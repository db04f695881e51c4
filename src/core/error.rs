//! Synthesis error types

use thiserror::Error;

/// Errors raised while turning versions into a pipeline definition
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Malformed version '{version}': {source}")]
    MalformedVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("Invalid task name '{0}': must be a lowercase RFC 1123 label of at most 63 characters")]
    InvalidTaskName(String),
}
