//! Error types for client operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured host did not resolve.
    #[error("failed to resolve server address {address}: {source}")]
    Resolve {
        /// Address as configured.
        address: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Opening the TCP connection failed.
    #[error("failed to connect to server at {address}: {source}")]
    Connect {
        /// Resolved address.
        address: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The request could not be serialised.
    #[error("failed to serialise request: {0}")]
    SerialiseRequest(#[source] serde_json::Error),
    /// Writing the request failed.
    #[error("failed to send request: {0}")]
    SendRequest(#[source] io::Error),
    /// Reading from the server failed or timed out.
    #[error("failed to read from server: {0}")]
    ReadResponse(#[source] io::Error),
    /// A line from the server was not the expected JSON shape.
    #[error("failed to parse server message: {0}")]
    ParseMessage(#[source] serde_json::Error),
    /// The server closed the connection before replying.
    #[error("server closed the connection without replying")]
    MissingReply,
    /// The server answered with an error message.
    #[error("server rejected the request: {message}")]
    Server {
        /// Error text sent by the server.
        message: String,
    },
    /// The server acknowledged a different action than the one requested.
    #[error("expected a '{expected}' reply, got '{actual}'")]
    UnexpectedAction {
        /// Action that was requested.
        expected: &'static str,
        /// Action the server reported.
        actual: String,
    },
}

impl ClientError {
    /// Error text sent by the server, when the server rejected the request.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether a read gave up because the configured timeout elapsed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ReadResponse(source)
                if matches!(source.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }
}
