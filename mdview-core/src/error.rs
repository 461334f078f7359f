//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for the Markdown Viewer Core
//!
//! Every fallible operation in the crate returns `AppResult<T>`. Variants carry
//! the path they failed on so the UI can surface a precise message. Navigation
//! misses and partial listings are *not* errors; they are reported through the
//! outcome enums of the tree and navigator modules.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Convenient alias carrying our unified error type
pub type AppResult<T> = Result<T, AppError>;

/// Unified error type for all viewer operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Permissions error for file/directory access.
    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// Requested file or directory does not exist.
    #[error("File or directory not found: {0:?}")]
    NotFound(PathBuf),

    /// A directory could be opened but not listed.
    #[error("Failed to list {path:?}: {reason}")]
    ListFailed { path: PathBuf, reason: String },

    /// A document could not be read when opening or reloading it.
    #[error("Failed to open {path:?}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Directory navigation errors
    #[error("Navigation failed: cannot access {path:?}: {reason}")]
    NavigationFailed { path: PathBuf, reason: String },

    /// Operation referenced a node that is no longer part of the tree.
    #[error("Unknown tree node: {0}")]
    UnknownNode(usize),

    /// Input validation errors
    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    /// Classify an I/O failure on `path`, keeping permission and not-found
    /// failures distinct from everything else.
    pub fn from_io<P: Into<PathBuf>>(path: P, err: &io::Error) -> Self {
        let path = path.into();

        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::ListFailed {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Create an open failure error
    pub fn open_failed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::OpenFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classify a read failure while opening a document.
    pub fn open_io<P: Into<PathBuf>>(path: P, err: &io::Error) -> Self {
        let path = path.into();

        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::OpenFailed {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Create a navigation failure error
    pub fn navigation_failed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::NavigationFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an input validation error
    pub fn invalid_input<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors that mean "the file or directory is gone".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        let other = io::Error::other("disk on fire");

        assert!(matches!(
            AppError::from_io("/a", &denied),
            AppError::PermissionDenied(_)
        ));
        assert!(AppError::from_io("/a", &missing).is_not_found());
        assert!(matches!(
            AppError::from_io("/a", &other),
            AppError::ListFailed { .. }
        ));
        assert!(matches!(
            AppError::open_io("/a.md", &other),
            AppError::OpenFailed { .. }
        ));
    }

    #[test]
    fn test_messages_carry_path() {
        let err = AppError::navigation_failed("/vol/x.md", "path is not absolute");
        let msg = err.to_string();

        assert!(msg.contains("x.md"));
        assert!(msg.contains("not absolute"));
    }
}
