//! Stream-level input flow control
//!
//! Pairs a stream's own receive window with the connection window it shares
//! with every other stream. Incoming DATA debits both, consumed bytes credit
//! both, and each window decides on its own when a WINDOW_UPDATE is due.

use std::fmt;
use std::sync::Arc;

use super::error::{Error, Result};
use super::flow_control::InputFlowControl;
use super::frames::{WindowUpdateFrame, WindowUpdateSink};
use super::CONNECTION_STREAM_ID;

/// Stream ID type
pub type StreamId = u32;

/// Input flow control for one stream
///
/// Ordering: the stream window is checked first. A stream-level violation
/// leaves the connection window untouched; only bytes the stream accepted
/// (or discarded after an abort) are charged to the connection.
pub struct StreamInputFlowControl {
    stream_id: StreamId,
    stream: InputFlowControl,
    connection: Arc<InputFlowControl>,
    writer: Arc<dyn WindowUpdateSink>,
}

impl StreamInputFlowControl {
    /// Create the flow control for `stream_id`
    pub fn new(
        stream_id: StreamId,
        initial_window_size: u32,
        min_window_update_size: u32,
        connection: Arc<InputFlowControl>,
        writer: Arc<dyn WindowUpdateSink>,
    ) -> Self {
        StreamInputFlowControl {
            stream_id,
            stream: InputFlowControl::new(initial_window_size, min_window_update_size),
            connection,
            writer,
        }
    }

    /// Get stream ID
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// The stream's own window
    pub fn window(&self) -> &InputFlowControl {
        &self.stream
    }

    /// The connection window shared with other streams
    pub fn connection_window(&self) -> &InputFlowControl {
        &self.connection
    }

    /// Bytes the peer may still send on this stream
    pub fn available(&self) -> u32 {
        self.stream.available()
    }

    /// Whether the stream window has been aborted
    pub fn is_aborted(&self) -> bool {
        self.stream.is_aborted()
    }

    /// Account for `bytes` of DATA received on this stream.
    ///
    /// Returns `Ok(true)` when the bytes should be buffered for the
    /// application, `Ok(false)` when they must be dropped because the stream
    /// or the connection was aborted. Dropped bytes on an aborted stream are
    /// immediately credited back to the connection; dropped bytes on an
    /// aborted connection leave the stream window as it was.
    pub fn advance(&self, bytes: u32) -> Result<bool> {
        let stream_accepted = self.stream.advance(bytes).map_err(|exceeded| {
            tracing::warn!(
                stream_id = self.stream_id,
                requested = exceeded.requested,
                available = exceeded.available,
                "stream flow-control window exceeded"
            );
            Error::StreamFlowControl {
                stream_id: self.stream_id,
                requested: exceeded.requested,
                available: exceeded.available,
            }
        })?;

        let connection_accepted = self.connection.advance(bytes).map_err(|exceeded| {
            tracing::warn!(
                stream_id = self.stream_id,
                requested = exceeded.requested,
                available = exceeded.available,
                "connection flow-control window exceeded"
            );
            Error::ConnectionFlowControl {
                requested: exceeded.requested,
                available: exceeded.available,
            }
        })?;

        if !connection_accepted {
            // Connection torn down: the data is dropped, so the stream keeps its credit.
            if stream_accepted {
                self.stream.revert_advance(bytes);
            }
            return Ok(false);
        }

        if !stream_accepted {
            // Nobody will read this data, count it as consumed right away.
            self.update_connection_window(bytes);
            return Ok(false);
        }

        Ok(true)
    }

    /// Account for a padded DATA frame.
    ///
    /// The whole frame payload (pad length octet, data and padding) counts
    /// against both windows, but only `data_len` bytes are ever buffered, so
    /// the rest is handed back at once.
    pub fn advance_padded(&self, data_len: u32, padding_len: u32) -> Result<bool> {
        let total = data_len.saturating_add(padding_len);
        let accepted = self.advance(total)?;
        if accepted && padding_len > 0 {
            self.update_windows(padding_len);
        }
        Ok(accepted)
    }

    /// Return `bytes` of credit after the application read them.
    pub fn update_windows(&self, bytes: u32) {
        let stream_update = match self.stream.try_update_window(bytes) {
            Some(size) => size,
            // Aborted. Unread bytes went back to the connection in abort().
            None => return,
        };

        if stream_update > 0 {
            self.writer
                .window_update(WindowUpdateFrame::new(self.stream_id, stream_update));
        }

        self.update_connection_window(bytes);
    }

    /// The peer finished sending (END_STREAM), so stream-level WINDOW_UPDATEs
    /// are pointless from now on. Connection credit is still returned.
    pub fn stop_window_updates(&self) {
        self.stream.stop_window_updates();
    }

    /// Abort the stream window and return its unread bytes to the connection.
    ///
    /// Returns the number of unread bytes released, `0` if already aborted.
    /// The connection window is never aborted from here.
    pub fn abort(&self) -> u32 {
        let unread = self.stream.abort();
        if unread > 0 {
            tracing::debug!(stream_id = self.stream_id, unread, "releasing unread stream data");
            self.update_connection_window(unread);
        }
        unread
    }

    fn update_connection_window(&self, bytes: u32) {
        match self.connection.try_update_window(bytes) {
            Some(0) => {}
            Some(size) => self
                .writer
                .window_update(WindowUpdateFrame::new(CONNECTION_STREAM_ID, size)),
            None if self.connection.is_aborted() => {}
            None => tracing::warn!(
                stream_id = self.stream_id,
                bytes,
                available = self.connection.available(),
                "connection window update would exceed the maximum window size, credit dropped"
            ),
        }
    }
}

impl fmt::Debug for StreamInputFlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamInputFlowControl")
            .field("stream_id", &self.stream_id)
            .field("stream", &self.stream)
            .field("connection", &self.connection)
            .finish()
    }
}
