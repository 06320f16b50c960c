//! Central error type for the declgraph crate.
//!
//! Per-boundary errors (`EnumerationError`, `ParseError`) live next to their
//! collaborators; this module aggregates everything the facade and CLI can
//! surface.

use std::path::PathBuf;

use crate::manifest::EnumerationError;

/// Error type for explorer-level operations.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Enumeration failures are fatal: the previous snapshot stays
    /// authoritative and the error propagates unchanged.
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error("snapshot cache at {} is not valid: {message}", path.display())]
    InvalidSnapshot { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
