//! Error types for the table connector.
//!
//! # Design
//! `ConnectorError` is the failure side of every call and carries only two
//! outcomes. Its `Display` strings are the fixed messages callers match on;
//! the underlying transport failure is kept as `source()` for diagnostics.

use thiserror::Error;

/// Failure outcome of a `fetch` / `create` call.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The instance answered with its hibernation page.
    #[error("service is hibernating")]
    Hibernating,

    /// The transport reported an error; the cause is preserved.
    #[error("there was an error in the request")]
    Transport(#[source] TransportError),
}

/// Errors reported by a `Transport` while executing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport completed without an error and without a response.
    #[error("no response received")]
    NoResponse,

    /// A failure reported by a host that executed the request itself.
    #[error("transport failure: {0}")]
    Failed(String),

    #[error(transparent)]
    Http(#[from] ureq::Error),
}

/// Errors raised while loading `ConnectionOptions`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid connection options: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_fixed() {
        assert_eq!(ConnectorError::Hibernating.to_string(), "service is hibernating");
        let err = ConnectorError::Transport(TransportError::Failed("connection reset".into()));
        assert_eq!(err.to_string(), "there was an error in the request");
    }

    #[test]
    fn transport_cause_is_kept_as_source() {
        let err = ConnectorError::Transport(TransportError::Failed("connection reset".into()));
        let source = err.source().expect("transport error should carry a source");
        assert_eq!(source.to_string(), "transport failure: connection reset");
        assert!(ConnectorError::Hibernating.source().is_none());
    }
}
