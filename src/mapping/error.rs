//! Administrative error and outcome types.

use thiserror::Error;

/// Errors returned by administrative calls that name something the table
/// does not hold, or carry input it cannot accept.
///
/// Lookups never produce these; a failed lookup leaves the mapping result
/// unset instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperError {
    /// Handler pattern does not have one of the recognised shapes.
    #[error("invalid handler pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// No host or alias is registered under this name.
    #[error("no host registered as {0:?}")]
    UnknownHost(String),

    /// The name belongs to an alias where a real host is required.
    #[error("{0:?} is an alias, not a host")]
    HostIsAlias(String),

    /// The host has no application mounted at this path.
    #[error("host {host:?} has no application at {path:?}")]
    UnknownApplication { host: String, path: String },

    /// Welcome file names are relative and non-empty.
    #[error("invalid welcome file {0:?}")]
    InvalidWelcomeFile(String),

    /// The application has no such version.
    #[error("application {path:?} on host {host:?} has no version {version:?}")]
    UnknownVersion {
        host: String,
        path: String,
        version: String,
    },
}

/// Result type for administrative calls.
pub type MapperResult<T> = Result<T, MapperError>;

/// What an administrative add did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new entry was published.
    Added,
    /// The entry was already registered for the same target.
    Unchanged,
    /// The name is taken by a different target; the old mapping is kept.
    Rejected,
}

impl Registration {
    /// Whether the entry is in the table after the call.
    pub fn is_registered(self) -> bool {
        !matches!(self, Registration::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapperError::UnknownVersion {
            host: "example.com".into(),
            path: "/app".into(),
            version: "2".into(),
        };
        assert_eq!(
            err.to_string(),
            "application \"/app\" on host \"example.com\" has no version \"2\""
        );
        assert!(MapperError::HostIsAlias("www".into()).to_string().contains("alias"));
    }

    #[test]
    fn test_registration_outcome() {
        assert!(Registration::Added.is_registered());
        assert!(Registration::Unchanged.is_registered());
        assert!(!Registration::Rejected.is_registered());
    }
}
