//! HTTP/2 flow-control error types
//!
//! This module defines the errors raised by the flow-control coordinators and
//! maps them to the error codes defined in RFC 7540 Section 7.

use std::fmt;

use super::stream::StreamId;

/// HTTP/2 flow-control errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Peer sent more DATA on a stream than the stream window allowed
    #[error("Flow control error on stream {stream_id}: received {requested} bytes with {available} available")]
    StreamFlowControl {
        stream_id: StreamId,
        requested: u32,
        available: u32,
    },

    /// Peer sent more DATA on the connection than the connection window allowed
    #[error("Flow control error on connection: received {requested} bytes with {available} available")]
    ConnectionFlowControl { requested: u32, available: u32 },

    /// Stream ID is not usable for a request stream
    #[error("Invalid stream ID: {0}")]
    InvalidStreamId(u32),

    /// Stream not found
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamId),

    /// Stream already registered
    #[error("Stream already open: {0}")]
    DuplicateStream(StreamId),

    /// Invalid settings value
    #[error("Invalid settings value: {0}")]
    InvalidSettings(String),
}

impl Error {
    /// RFC 7540 error code to put in the RST_STREAM or GOAWAY frame
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::StreamFlowControl { .. } | Error::ConnectionFlowControl { .. } => {
                ErrorCode::FlowControlError
            }
            Error::StreamNotFound(_) => ErrorCode::StreamClosed,
            Error::InvalidStreamId(_) | Error::DuplicateStream(_) => ErrorCode::ProtocolError,
            Error::InvalidSettings(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the whole connection must be torn down (GOAWAY) rather than
    /// only the offending stream (RST_STREAM)
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::StreamFlowControl { .. } | Error::StreamNotFound(_) => false,
            Error::ConnectionFlowControl { .. }
            | Error::InvalidStreamId(_)
            | Error::DuplicateStream(_)
            | Error::InvalidSettings(_) => true,
        }
    }

    /// Stream the error is scoped to, if any
    pub fn stream_id(&self) -> Option<StreamId> {
        match self {
            Error::StreamFlowControl { stream_id, .. } => Some(*stream_id),
            Error::StreamNotFound(id) => Some(*id),
            _ => None,
        }
    }
}

/// HTTP/2 error codes as defined in RFC 7540 Section 7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// Graceful shutdown
    NoError = 0x0,
    /// Protocol error detected
    ProtocolError = 0x1,
    /// Implementation fault
    InternalError = 0x2,
    /// Flow-control limits exceeded
    FlowControlError = 0x3,
    /// Frame received for closed stream
    StreamClosed = 0x5,
}

impl ErrorCode {
    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    fn name(&self) -> &'static str {
        match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FlowControlError => "FLOW_CONTROL_ERROR",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u32())
    }
}

/// Result type for HTTP/2 flow-control operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ErrorCode::NoError.as_u32(), 0x0);
        assert_eq!(ErrorCode::FlowControlError.as_u32(), 0x3);
        assert_eq!(ErrorCode::StreamClosed.as_u32(), 0x5);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            ErrorCode::FlowControlError.to_string(),
            "FLOW_CONTROL_ERROR (0x3)"
        );
    }

    #[test]
    fn test_flow_control_error_scope() {
        let stream_err = Error::StreamFlowControl {
            stream_id: 3,
            requested: 35000,
            available: 30535,
        };
        assert_eq!(stream_err.code(), ErrorCode::FlowControlError);
        assert!(!stream_err.is_connection_error());
        assert_eq!(stream_err.stream_id(), Some(3));

        let conn_err = Error::ConnectionFlowControl {
            requested: 1,
            available: 0,
        };
        assert_eq!(conn_err.code(), ErrorCode::FlowControlError);
        assert!(conn_err.is_connection_error());
        assert_eq!(conn_err.stream_id(), None);
    }

    #[test]
    fn test_error_display() {
        let err = Error::StreamFlowControl {
            stream_id: 1,
            requested: 10,
            available: 5,
        };
        assert_eq!(
            err.to_string(),
            "Flow control error on stream 1: received 10 bytes with 5 available"
        );

        let err = Error::StreamNotFound(42);
        assert_eq!(err.to_string(), "Stream not found: 42");
    }
}
