//! Errors delivered to callers.

use sdfs_types::{ErrorInfo, ErrorName, OperationKind};
use thiserror::Error;

use crate::constants::BACKEND_DISCONNECTED;

/// A DOM-style error as seen by the caller of an entry or reader operation.
///
/// Callers usually switch on [`name`](Self::name) (`"NotFoundError"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DomError {
    kind: ErrorName,
    message: String,
}

impl DomError {
    pub fn new(kind: ErrorName, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The error name, e.g. `"NotFoundError"`.
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn kind(&self) -> ErrorName {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn backend_disconnected() -> Self {
        Self::new(ErrorName::InvalidState, BACKEND_DISCONNECTED)
    }

    pub(crate) fn unexpected_payload(kind: OperationKind) -> Self {
        Self::new(
            ErrorName::Unknown,
            format!("backend sent a malformed {kind} reply"),
        )
    }
}

impl From<ErrorInfo> for DomError {
    fn from(info: ErrorInfo) -> Self {
        Self {
            kind: info.name,
            message: info.message,
        }
    }
}

/// Result type for the async entry API.
pub type FsResult<T> = Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_display() {
        let err = DomError::from(ErrorInfo::not_found("/a/b.txt"));
        assert_eq!(err.name(), "NotFoundError");
        assert_eq!(err.kind(), ErrorName::NotFound);
        assert_eq!(err.message(), "/a/b.txt");
        assert_eq!(err.to_string(), "NotFoundError: /a/b.txt");
    }

    #[test]
    fn test_link_errors_are_invalid_state() {
        assert_eq!(DomError::backend_disconnected().name(), "InvalidStateError");
        assert_eq!(
            DomError::backend_disconnected().message(),
            BACKEND_DISCONNECTED
        );
        assert_eq!(
            DomError::unexpected_payload(OperationKind::ReadEntries).kind(),
            ErrorName::Unknown
        );
    }
}
