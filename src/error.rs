//! Error taxonomy for the review page.
//!
//! ERROR HANDLING
//! ==============
//! Fetch failures stay local to the resource that raised them and render a
//! retry fallback. Mutation failures are returned to the caller of the action
//! and never touch list state. Signing in is a gate outcome, not an error.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Transport-level failure reported by a [`crate::net::api::ReviewApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status: {status}")]
    Status { status: u16 },
    #[error("authentication required")]
    Unauthorized,
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("not available on server")]
    Unavailable,
}

impl ApiError {
    /// Map a non-success HTTP status to the matching variant.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            _ => Self::Status { status },
        }
    }
}

/// Initial or refreshed load of a page resource failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load {resource}: {source}")]
pub struct FetchError {
    pub resource: &'static str,
    #[source]
    pub source: ApiError,
}

/// Author input rejected before it reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("review content is empty")]
    EmptyContent,
    #[error("review content is {len} characters, limit is {max}")]
    ContentTooLong { len: usize, max: usize },
}

/// A submit, edit or delete did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("invalid review: {0}")]
    Invalid(#[from] InputError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Page configuration could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
