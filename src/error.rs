//! Error types for the sandbox MCP bridge.
//!
//! Uses thiserror for deriving std::error::Error and miette for rich diagnostics.
//! Startup failures surface through [`Error`]; failures inside a tool call are
//! [`ToolError`]s and are always rendered to text before they reach the caller.

use std::fmt;
use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the application.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Invalid configuration
    #[error("Invalid configuration")]
    #[diagnostic(code(smb::config))]
    Config(#[from] ConfigError),

    /// MCP server error
    #[error("MCP server error")]
    #[diagnostic(code(smb::server))]
    Server(#[from] ServerError),

    /// I/O error
    #[error("I/O error: {0}")]
    #[diagnostic(code(smb::io))]
    Io(#[from] std::io::Error),
}

/// Errors raised while validating the backend configuration.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// The control-plane URL could not be parsed.
    #[error("Invalid control-plane URL {url:?}: {source}")]
    #[diagnostic(
        code(smb::config::control_plane_url),
        help("Use an absolute http(s) URL such as https://api.hopx.dev")
    )]
    InvalidControlPlaneUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The agent URL template is unusable.
    #[error("Invalid agent URL template {template:?}: {reason}")]
    #[diagnostic(
        code(smb::config::agent_url_template),
        help("The template must be an absolute URL containing {{sandbox_id}}")
    )]
    InvalidAgentTemplate { template: String, reason: String },

    /// A timeout was configured as zero.
    #[error("Timeout `{name}` must be greater than zero")]
    #[diagnostic(code(smb::config::timeout))]
    ZeroTimeout { name: &'static str },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(smb::config::http_client))]
    HttpClient(#[source] reqwest::Error),
}

/// Errors related to the MCP server.
#[derive(Error, Debug, Diagnostic)]
pub enum ServerError {
    /// Failed to initialize server
    #[error("Failed to initialize MCP server: {0}")]
    #[diagnostic(code(smb::server::init))]
    InitializationFailed(String),

    /// Transport error
    #[error("Transport error: {0}")]
    #[diagnostic(code(smb::server::transport))]
    Transport(String),

    /// The HTTP listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(smb::server::bind),
        help("Check that the address is free or pick another with --bind")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single tool invocation.
///
/// A non-2xx backend response is not a `ToolError`; it is returned as
/// [`crate::client::ApiResponse::Remote`] and formatted like a normal result.
#[derive(Error, Debug, Diagnostic)]
pub enum ToolError {
    /// A tool argument failed validation. No request was sent.
    #[error("invalid argument `{field}`: {reason}")]
    #[diagnostic(code(smb::tool::invalid_argument))]
    InvalidArgument { field: &'static str, reason: String },

    /// No credential is bound to the current request. No request was sent.
    #[error(
        "missing authentication: send `Authorization: Bearer <token>` with the MCP request"
    )]
    #[diagnostic(code(smb::tool::unauthenticated))]
    Unauthenticated,

    /// The request never produced a response. The message carries the whole
    /// cause chain, since reqwest's own message omits it.
    #[error("{kind}: {}", cause_chain(.source))]
    #[diagnostic(code(smb::tool::transport))]
    Transport {
        kind: TransportFailure,
        #[source]
        source: reqwest::Error,
    },
}

impl ToolError {
    /// Builds an `InvalidArgument` error for `field`.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Wraps a reqwest failure, classifying it by cause.
    #[must_use]
    pub fn transport(source: reqwest::Error) -> Self {
        Self::Transport {
            kind: TransportFailure::classify(&source),
            source,
        }
    }

    /// Returns true if this is a transport failure caused by a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                kind: TransportFailure::Timeout,
                ..
            }
        )
    }
}

/// Coarse cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Other,
}

impl TransportFailure {
    fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connect => f.write_str("connection failed"),
            Self::Other => f.write_str("transport error"),
        }
    }
}

/// Joins `error` and every `source()` beneath it with `": "`.
fn cause_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut next = error.source();
    while let Some(cause) = next {
        let cause_text = cause.to_string();
        // skip causes whose message is already the tail of the text
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        next = cause.source();
    }
    text
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_names_field() {
        let err = ToolError::invalid("sandbox_id", "must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid argument `sandbox_id`: must not be empty"
        );
        assert!(!err.is_timeout());
    }

    #[derive(Debug, Error)]
    #[error("error sending request")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_cause_chain_includes_sources() {
        let inner =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        let text = cause_chain(&Outer(inner));
        assert_eq!(text, "error sending request: Connection refused");
    }

    #[test]
    fn test_unauthenticated_mentions_bearer() {
        assert!(ToolError::Unauthenticated.to_string().contains("Bearer"));
    }
}
