//! Backend error descriptors.
//!
//! Errors cross the boundary as a name plus a human-readable message. The
//! names follow the DOM file-system error vocabulary so callers can switch on
//! them (`"NotFoundError"`, `"InvalidModificationError"`, ...).

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/// DOM-style error name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
pub enum ErrorName {
    /// Malformed path or name.
    #[strum(serialize = "EncodingError")]
    Encoding,
    /// The requested change is not allowed on this target.
    #[strum(serialize = "InvalidModificationError")]
    InvalidModification,
    /// The operation could not run in the current state (e.g. backend gone).
    #[strum(serialize = "InvalidStateError")]
    InvalidState,
    #[strum(serialize = "NotFoundError")]
    NotFound,
    #[strum(serialize = "NotReadableError")]
    NotReadable,
    /// Target may not be modified (root, non-empty directory, read-only).
    #[strum(serialize = "NoModificationAllowedError")]
    NoModificationAllowed,
    #[strum(serialize = "PathExistsError")]
    PathExists,
    #[strum(serialize = "QuotaExceededError")]
    QuotaExceeded,
    /// Path escapes the sandbox.
    #[strum(serialize = "SecurityError")]
    Security,
    /// Wrong kind of entry (file where a directory was expected, or vice versa).
    #[strum(serialize = "TypeMismatchError")]
    TypeMismatch,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl ErrorName {
    /// The wire/display name, e.g. `"NotFoundError"`.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Opaque backend error: a name and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{name}: {message}")]
pub struct ErrorInfo {
    pub name: ErrorName,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(name: ErrorName, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
        }
    }

    /// Create a NotFoundError.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorName::NotFound, message)
    }

    /// Create an InvalidModificationError.
    pub fn invalid_modification(message: impl Into<String>) -> Self {
        Self::new(ErrorName::InvalidModification, message)
    }

    /// Create a NoModificationAllowedError.
    pub fn no_modification_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorName::NoModificationAllowed, message)
    }

    /// Create a PathExistsError.
    pub fn path_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorName::PathExists, message)
    }

    /// Create an EncodingError.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new(ErrorName::Encoding, message)
    }

    /// Create a TypeMismatchError.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorName::TypeMismatch, message)
    }

    /// Create an InvalidStateError.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorName::InvalidState, message)
    }

    /// Create an Unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorName::Unknown, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_error_name_strings() {
        assert_eq!(ErrorName::NotFound.as_str(), "NotFoundError");
        assert_eq!(ErrorName::Unknown.to_string(), "Unknown");
        assert_eq!(
            ErrorName::from_str("NoModificationAllowedError").unwrap(),
            ErrorName::NoModificationAllowed
        );
        assert!(ErrorName::from_str("NotFound").is_err());
    }

    #[test]
    fn test_every_name_parses_back() {
        for name in ErrorName::iter() {
            assert_eq!(ErrorName::from_str(name.as_str()).unwrap(), name);
        }
    }

    #[test]
    fn test_error_info_display() {
        let err = ErrorInfo::not_found("/a/b.txt");
        assert_eq!(err.to_string(), "NotFoundError: /a/b.txt");
    }
}
