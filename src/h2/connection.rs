//! Connection-level input flow control
//!
//! Owns the connection receive window and the per-stream controllers built
//! on top of it. The stream registry is only touched when streams open and
//! close; byte accounting goes through the `Arc` handles and never takes a lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::error::{Error, Result};
use super::flow_control::InputFlowControl;
use super::frames::{WindowUpdateFrame, WindowUpdateSink};
use super::settings::FlowControlSettings;
use super::stream::{StreamId, StreamInputFlowControl};
use super::{CONNECTION_STREAM_ID, DEFAULT_INITIAL_WINDOW_SIZE, MAX_STREAM_ID};

/// Input flow control for one HTTP/2 connection
pub struct ConnectionInputFlowControl {
    settings: FlowControlSettings,
    connection: Arc<InputFlowControl>,
    writer: Arc<dyn WindowUpdateSink>,
    streams: RwLock<HashMap<StreamId, Arc<StreamInputFlowControl>>>,
}

impl ConnectionInputFlowControl {
    /// Create the connection window described by `settings`.
    ///
    /// WINDOW_UPDATE frames for this connection and its streams are handed to
    /// `writer`.
    pub fn new(settings: FlowControlSettings, writer: Arc<dyn WindowUpdateSink>) -> Self {
        let connection = Arc::new(InputFlowControl::new(
            settings.get_initial_connection_window_size(),
            settings.get_connection_window_update_threshold(),
        ));

        ConnectionInputFlowControl {
            settings,
            connection,
            writer,
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Settings in use
    pub fn settings(&self) -> &FlowControlSettings {
        &self.settings
    }

    /// The connection window
    pub fn window(&self) -> &InputFlowControl {
        &self.connection
    }

    /// Bytes the peer may still send on the connection
    pub fn available(&self) -> u32 {
        self.connection.available()
    }

    /// Whether the connection window has been aborted
    pub fn is_aborted(&self) -> bool {
        self.connection.is_aborted()
    }

    /// WINDOW_UPDATE to send right after the connection preface.
    ///
    /// The peer assumes a 65535 byte connection window until told otherwise;
    /// a larger configured window has to be announced explicitly.
    pub fn initial_window_update(&self) -> Option<WindowUpdateFrame> {
        let diff = self
            .connection
            .initial_window_size()
            .saturating_sub(DEFAULT_INITIAL_WINDOW_SIZE);
        (diff > 0).then(|| WindowUpdateFrame::new(CONNECTION_STREAM_ID, diff))
    }

    /// Start accounting for a new stream
    pub fn open_stream(&self, stream_id: StreamId) -> Result<Arc<StreamInputFlowControl>> {
        if stream_id == CONNECTION_STREAM_ID || stream_id > MAX_STREAM_ID {
            return Err(Error::InvalidStreamId(stream_id));
        }

        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        if streams.contains_key(&stream_id) {
            return Err(Error::DuplicateStream(stream_id));
        }

        let stream = Arc::new(StreamInputFlowControl::new(
            stream_id,
            self.settings.get_initial_stream_window_size(),
            self.settings.get_stream_window_update_threshold(),
            self.connection.clone(),
            self.writer.clone(),
        ));
        streams.insert(stream_id, stream.clone());
        tracing::debug!(stream_id, window = stream.available(), "stream opened");

        Ok(stream)
    }

    /// Get a stream by ID
    pub fn stream(&self, stream_id: StreamId) -> Option<Arc<StreamInputFlowControl>> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&stream_id)
            .cloned()
    }

    /// Get number of registered streams
    pub fn stream_count(&self) -> usize {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn require_stream(&self, stream_id: StreamId) -> Result<Arc<StreamInputFlowControl>> {
        self.stream(stream_id)
            .ok_or(Error::StreamNotFound(stream_id))
    }

    /// Account for a DATA frame of `data_len` bytes plus `padding_len` bytes
    /// of padding overhead.
    ///
    /// Returns whether the data should be delivered to the stream. A stream
    /// error means RST_STREAM, a connection error means GOAWAY; see
    /// [`Error::is_connection_error`].
    pub fn on_data(&self, stream_id: StreamId, data_len: u32, padding_len: u32) -> Result<bool> {
        self.require_stream(stream_id)?
            .advance_padded(data_len, padding_len)
    }

    /// The application consumed `bytes` from the stream's request body
    pub fn on_consumed(&self, stream_id: StreamId, bytes: u32) -> Result<()> {
        self.require_stream(stream_id)?.update_windows(bytes);
        Ok(())
    }

    /// END_STREAM received: the peer will not send on this stream again
    pub fn end_of_stream(&self, stream_id: StreamId) -> Result<()> {
        self.require_stream(stream_id)?.stop_window_updates();
        Ok(())
    }

    /// Abort a stream's window (RST_STREAM either way).
    ///
    /// The stream stays registered so DATA already in flight is still
    /// charged to the connection. Returns the unread bytes released.
    pub fn reset_stream(&self, stream_id: StreamId) -> Result<u32> {
        let stream = self.require_stream(stream_id)?;
        let unread = stream.abort();
        tracing::debug!(stream_id, unread, "stream reset");
        Ok(unread)
    }

    /// Forget a finished stream, aborting its window first
    pub fn remove_stream(&self, stream_id: StreamId) -> Option<Arc<StreamInputFlowControl>> {
        let stream = self
            .streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&stream_id)?;
        stream.abort();
        Some(stream)
    }

    /// Graceful shutdown: credit is still tracked but no connection-level
    /// WINDOW_UPDATE is sent anymore
    pub fn stop_window_updates(&self) {
        self.connection.stop_window_updates();
    }

    /// Tear down the connection window.
    ///
    /// Stream windows are left alone, but every stream debit now fails on the
    /// connection leg. Returns the connection's unreturned credit.
    pub fn abort(&self) -> u32 {
        let unread = self.connection.abort();
        tracing::debug!(unread, streams = self.stream_count(), "connection input aborted");
        unread
    }
}
