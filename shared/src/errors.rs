/// Unified error types for the Coverfetch system.
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Report;

/// Top-level error type for the Coverfetch system.
#[derive(Debug, Error)]
pub enum CoverError {
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Invalid username or password")]
    MissingCredentials,

    #[error("{} cover(s) could not be saved:\n{0}", .0.failures.len())]
    Persist(Report),
}

/// Errors raised while retrieving a single variant.
///
/// These never reach the caller of the fetch stage: the variant is logged
/// and dropped from the result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A storage write that failed for one variant.
#[derive(Debug, Error)]
#[error("failed to write {key} to {}: {source}", path.display())]
pub struct WriteError {
    pub key: String,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Errors from validating a target identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid spotify uri: {0:?}")]
    Malformed(String),

    #[error("id does not fit in 128 bits: {0}")]
    IdOverflow(String),
}

/// Errors returned by the metadata service client.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unrecognised image size tag.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown image size: {0:?}")]
pub struct UnknownImageSize(pub String);

/// Result type alias for Coverfetch operations.
pub type CoverResult<T> = Result<T, CoverError>;
