//! Typed error hierarchy for the cairn engine.
//!
//! Three top-level enums cover the three subsystems:
//! - `DiscoveryError` — plan enumeration failures
//! - `StateDetectionError` — plan index read/decode failures
//! - `ManifestError` — `parallel.json` read/decode failures
//!
//! The dividing line everywhere: an artifact that is absent is normal
//! control flow and yields a default value; an artifact that is present but
//! unreadable or corrupt raises one of these, carrying the offending path
//! and the underlying cause so the caller can decide to skip or abort.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from plan discovery (enumerating the plans root).
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to read plans root at {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from state detection over a single plan.
#[derive(Debug, Error)]
pub enum StateDetectionError {
    #[error("Failed to read plan index at {path}: {source}")]
    IndexUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {path}: {source}")]
    ArtifactScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the parallel-execution manifest (`parallel.json`).
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read parallel manifest at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed parallel manifest at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Achievement record {index} in {path} has neither 'achievement_id' nor 'id'")]
    MissingId { path: PathBuf, index: usize },
}
