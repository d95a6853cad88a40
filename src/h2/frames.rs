//! WINDOW_UPDATE frames handed to the frame writer
//!
//! The flow-control engine decides how much credit to grant; writing the
//! frame is left to whoever implements [`WindowUpdateSink`].

use std::sync::{mpsc, Mutex, PoisonError};

use bytes::{BufMut, Bytes, BytesMut};

use super::stream::StreamId;

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// WINDOW_UPDATE frame type (0x8)
pub const WINDOW_UPDATE_FRAME_TYPE: u8 = 0x8;

/// WINDOW_UPDATE payload length (always 4 bytes)
pub const WINDOW_UPDATE_PAYLOAD_SIZE: usize = 4;

/// WINDOW_UPDATE frame (RFC 7540 Section 6.9)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    /// Stream ID (0 for connection-level)
    pub stream_id: StreamId,
    /// Window size increment
    pub size_increment: u32,
}

impl WindowUpdateFrame {
    /// Create a new WINDOW_UPDATE frame
    pub fn new(stream_id: StreamId, size_increment: u32) -> Self {
        WindowUpdateFrame {
            stream_id,
            size_increment,
        }
    }

    /// Whether this frame targets the connection window
    pub fn is_connection_level(&self) -> bool {
        self.stream_id == super::CONNECTION_STREAM_ID
    }

    /// Encode the frame (header + 4 byte payload)
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + WINDOW_UPDATE_PAYLOAD_SIZE);

        // Length (24 bits), type, flags
        buf.put_uint(WINDOW_UPDATE_PAYLOAD_SIZE as u64, 3);
        buf.put_u8(WINDOW_UPDATE_FRAME_TYPE);
        buf.put_u8(0);

        // Stream ID and increment, reserved bit must be 0
        buf.put_u32(self.stream_id & 0x7FFFFFFF);
        buf.put_u32(self.size_increment & 0x7FFFFFFF);

        buf.freeze()
    }
}

/// Receives the WINDOW_UPDATE frames produced by the flow-control engine
///
/// Called from whichever thread returned the credit, so implementations must
/// not block for long; queue the frame and let the writer send it.
pub trait WindowUpdateSink: Send + Sync {
    /// Schedule a WINDOW_UPDATE frame for writing
    fn window_update(&self, frame: WindowUpdateFrame);
}

impl<F> WindowUpdateSink for F
where
    F: Fn(WindowUpdateFrame) + Send + Sync,
{
    fn window_update(&self, frame: WindowUpdateFrame) {
        self(frame)
    }
}

impl WindowUpdateSink for Mutex<Vec<WindowUpdateFrame>> {
    fn window_update(&self, frame: WindowUpdateFrame) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
    }
}

impl WindowUpdateSink for mpsc::Sender<WindowUpdateFrame> {
    fn window_update(&self, frame: WindowUpdateFrame) {
        // A closed receiver means the writer is gone with the connection.
        if self.send(frame).is_err() {
            tracing::trace!(stream_id = frame.stream_id, "dropping WINDOW_UPDATE, writer closed");
        }
    }
}
