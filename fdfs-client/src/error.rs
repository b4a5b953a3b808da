//! Client-side error type.

use std::io;

use fdfs_protocol::ProtocolError;
use thiserror::Error;

/// Errors returned by tracker and storage clients.
#[derive(Error, Debug)]
pub enum ClientError {
    /// TCP connection could not be established.
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// TCP connection was not established within the configured timeout.
    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),

    /// Transport or protocol failure during an exchange.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration could not be loaded or is incomplete.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// The server status code, if the server rejected the request.
    pub fn status_code(&self) -> Option<u8> {
        match self {
            ClientError::Protocol(e) => e.status_code(),
            _ => None,
        }
    }

    /// Returns true if the server reported that the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Protocol(e) if e.is_not_found())
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Protocol(ProtocolError::Io(e))
    }
}
