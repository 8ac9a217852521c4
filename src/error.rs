use std::{fmt, io, path::StripPrefixError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::Error as WalkdirError;

use crate::codec::SourceLocation;

/// Every failure a merge pass, a serialization or a storage call can report.
///
/// The validation variants (everything from `Format` to `UnknownReference`) abort a merge pass
/// before the storage backend is touched. Their messages always contain the lowercase keyword of
/// the failure class ("format", "classification", "inconsistent", "duplicate", "isolate",
/// "invalid"), so callers reporting to a curator can rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum LanguoidError {
    #[error("Malformed line, bad format: {0}")]
    Format(String),
    #[error("Entry outside of any classification context: {0}")]
    ClassificationContext(String),
    #[error("Languoid data is inconsistent: {0}")]
    InconsistentName(String),
    #[error("Languoid name is a duplicate: {0}")]
    DuplicateName(String),
    #[error("Chain combines the isolate marker with other ancestors: {0}")]
    IsolateConflict(String),
    #[error("Dialect entry references an invalid (unknown) language: {0}")]
    UnknownReference(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl LanguoidError {
    /// Prefix the message of a validation error with the location it was raised for.
    pub fn located(self, location: &SourceLocation) -> Self {
        match self {
            LanguoidError::Format(msg) => LanguoidError::Format(format!("{location}: {msg}")),
            LanguoidError::ClassificationContext(msg) => {
                LanguoidError::ClassificationContext(format!("{location}: {msg}"))
            }
            LanguoidError::InconsistentName(msg) => {
                LanguoidError::InconsistentName(format!("{location}: {msg}"))
            }
            LanguoidError::DuplicateName(msg) => {
                LanguoidError::DuplicateName(format!("{location}: {msg}"))
            }
            LanguoidError::IsolateConflict(msg) => {
                LanguoidError::IsolateConflict(format!("{location}: {msg}"))
            }
            LanguoidError::UnknownReference(msg) => {
                LanguoidError::UnknownReference(format!("{location}: {msg}"))
            }
            other => other,
        }
    }

    /// True for the errors that reject the content of the text sources, as opposed to storage or
    /// configuration failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LanguoidError::Format(_)
                | LanguoidError::ClassificationContext(_)
                | LanguoidError::InconsistentName(_)
                | LanguoidError::DuplicateName(_)
                | LanguoidError::IsolateConflict(_)
                | LanguoidError::UnknownReference(_)
        )
    }
}

impl From<StripPrefixError> for LanguoidError {
    fn from(src: StripPrefixError) -> LanguoidError {
        LanguoidError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for LanguoidError {
    fn from(src: toml::de::Error) -> LanguoidError {
        LanguoidError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for LanguoidError {
    fn from(src: toml::ser::Error) -> LanguoidError {
        LanguoidError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<io::Error> for LanguoidError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => LanguoidError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => LanguoidError::PermissionDenied,
            _ => LanguoidError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<WalkdirError> for LanguoidError {
    fn from(x: WalkdirError) -> Self {
        let path = x.path().map(|p| format!("{p:?}")).unwrap_or_default();
        match x.into_io_error() {
            Some(io_error) => {
                tracing::debug!("walkdir failed at {path}");
                LanguoidError::from(io_error)
            }
            None => LanguoidError::Io(format!("Filesystem loop detected at {path}")),
        }
    }
}

impl From<fmt::Error> for LanguoidError {
    fn from(x: fmt::Error) -> Self {
        LanguoidError::Custom(format!("{x}"))
    }
}

