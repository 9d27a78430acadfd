//! Error taxonomy for the knowledge graph engine.
//!
//! Failures fall into two camps: build-time failures (fetch, integrity,
//! parse) which abort a rebuild and leave the previous graph serving, and
//! caller-input failures which are always recoverable. "Entity not found"
//! is deliberately not represented here; it is a domain-level outcome
//! carried in query results, never an error.

use thiserror::Error;

/// Errors produced by the knowledge graph engine.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// Network failure, non-success status, or timeout while fetching the bundle.
    #[error("Bundle fetch failed: {0}")]
    Fetch(String),

    /// The fetched bundle did not match the configured digest. Fatal for the
    /// build in progress; parsing never starts on unverified bytes.
    #[error("Bundle integrity check failed: expected sha256 {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// The bundle bytes could not be parsed as a STIX bundle.
    #[error("Bundle parse failed: {0}")]
    Parse(String),

    /// Caller-supplied input exceeded a guard-rail bound or was malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No graph has been built yet and the caller asked for one without
    /// triggering a rebuild.
    #[error("Knowledge graph not initialized")]
    NotInitialized,

    /// Filesystem failure while writing a layer artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure while rendering an artifact.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for knowledge graph operations.
pub type AtlasResult<T> = Result<T, AtlasError>;

impl AtlasError {
    /// True when the error is safe to show to a remote caller verbatim.
    ///
    /// Everything else is logged server-side and rendered as a generic
    /// internal error so internal detail never crosses the RPC boundary.
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            AtlasError::InvalidInput(_)
                | AtlasError::Fetch(_)
                | AtlasError::Integrity { .. }
                | AtlasError::NotInitialized
        )
    }
}
