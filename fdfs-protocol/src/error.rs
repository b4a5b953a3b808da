//! Error types for the FastDFS wire protocol.

use std::io;
use std::num::NonZeroU8;

use thiserror::Error;

/// Status code for "no such file or directory", as reported by storage servers.
pub const STATUS_NOT_FOUND: u8 = 2;

/// Protocol-level errors that can occur during an exchange.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The underlying transport failed to read or write.
    #[error("Transport error: {0}")]
    Io(#[from] io::Error),

    /// The reply header carried a nonzero status byte. No body was read.
    #[error("Server returned status {0}")]
    Status(u8),

    /// The frame body ended before a fixed-layout record could be read.
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// The attachment source reached EOF before the announced size.
    #[error("Attachment ended early: expected {expected} bytes, got {actual}")]
    AttachmentTooShort { expected: u64, actual: u64 },

    /// A frame that was used for decoding was encoded without a reset.
    #[error("Frame must be reset before it is encoded again")]
    FrameNotReset,

    /// A fixed field held a value outside its domain.
    #[error("Failed to decode field: {0}")]
    DecodeError(String),
}

impl ProtocolError {
    /// The server status code, if this error came from a status byte.
    pub fn status_code(&self) -> Option<u8> {
        match self {
            ProtocolError::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the server reported that the file does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(STATUS_NOT_FOUND)
    }
}

/// Status byte of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Status 0: the exchange succeeded and a body follows.
    Success,
    /// Any other value: an application error code with no body.
    Failure(NonZeroU8),
}

impl From<u8> for FrameStatus {
    fn from(value: u8) -> Self {
        match NonZeroU8::new(value) {
            None => FrameStatus::Success,
            Some(code) => FrameStatus::Failure(code),
        }
    }
}

impl From<FrameStatus> for u8 {
    fn from(value: FrameStatus) -> Self {
        match value {
            FrameStatus::Success => 0,
            FrameStatus::Failure(code) => code.get(),
        }
    }
}

impl FrameStatus {
    /// Returns true if this status indicates success.
    pub fn is_success(self) -> bool {
        self == FrameStatus::Success
    }

    /// Convert into a `Result`, mapping failures to [`ProtocolError::Status`].
    pub fn into_result(self) -> Result<(), ProtocolError> {
        match self {
            FrameStatus::Success => Ok(()),
            FrameStatus::Failure(code) => Err(ProtocolError::Status(code.get())),
        }
    }
}
