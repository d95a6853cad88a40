//! Input flow-control configuration
//!
//! Window sizes the server grants to the peer and the batching thresholds
//! that decide when returned credit is worth a WINDOW_UPDATE frame.

use super::error::{Error, Result};
use super::{DEFAULT_INITIAL_WINDOW_SIZE, MAX_WINDOW_SIZE};

/// Default connection window (128 KiB)
pub const DEFAULT_CONNECTION_WINDOW_SIZE: u32 = 128 * 1024;

/// Default stream window (96 KiB)
pub const DEFAULT_STREAM_WINDOW_SIZE: u32 = 96 * 1024;

/// Input flow-control settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowControlSettings {
    /// Connection-level receive window (default: 131072)
    pub initial_connection_window_size: Option<u32>,

    /// Stream-level receive window, advertised as SETTINGS_INITIAL_WINDOW_SIZE
    /// (default: 98304)
    pub initial_stream_window_size: Option<u32>,

    /// Returned connection credit must exceed this before a WINDOW_UPDATE is
    /// reported (default: half the connection window)
    pub connection_window_update_threshold: Option<u32>,

    /// Returned stream credit must exceed this before a WINDOW_UPDATE is
    /// reported (default: half the stream window)
    pub stream_window_update_threshold: Option<u32>,
}

impl FlowControlSettings {
    /// Create empty settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Get connection window size (with default)
    pub fn get_initial_connection_window_size(&self) -> u32 {
        self.initial_connection_window_size
            .unwrap_or(DEFAULT_CONNECTION_WINDOW_SIZE)
    }

    /// Get stream window size (with default)
    pub fn get_initial_stream_window_size(&self) -> u32 {
        self.initial_stream_window_size
            .unwrap_or(DEFAULT_STREAM_WINDOW_SIZE)
    }

    /// Get connection update threshold (with default)
    pub fn get_connection_window_update_threshold(&self) -> u32 {
        self.connection_window_update_threshold
            .unwrap_or(self.get_initial_connection_window_size() / 2)
    }

    /// Get stream update threshold (with default)
    pub fn get_stream_window_update_threshold(&self) -> u32 {
        self.stream_window_update_threshold
            .unwrap_or(self.get_initial_stream_window_size() / 2)
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<()> {
        let connection_window = self.get_initial_connection_window_size();
        let stream_window = self.get_initial_stream_window_size();

        // The peer starts with a 65535 byte connection window and only a
        // WINDOW_UPDATE can grow it, so a smaller window cannot be enforced.
        check_window("Connection", connection_window)?;
        check_window("Stream", stream_window)?;

        check_threshold(
            "Connection",
            self.get_connection_window_update_threshold(),
            connection_window,
        )?;
        check_threshold(
            "Stream",
            self.get_stream_window_update_threshold(),
            stream_window,
        )?;

        Ok(())
    }
}

fn check_window(scope: &str, size: u32) -> Result<()> {
    if !(DEFAULT_INITIAL_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&size) {
        return Err(Error::InvalidSettings(format!(
            "{} window size {} outside valid range ({}-{})",
            scope, size, DEFAULT_INITIAL_WINDOW_SIZE, MAX_WINDOW_SIZE
        )));
    }
    Ok(())
}

fn check_threshold(scope: &str, threshold: u32, window: u32) -> Result<()> {
    // Pending credit never exceeds the window, so a threshold at or above it
    // would never flush.
    if threshold >= window {
        return Err(Error::InvalidSettings(format!(
            "{} window update threshold {} must be below the window size {}",
            scope, threshold, window
        )));
    }
    Ok(())
}

/// Builder for input flow-control settings
pub struct FlowControlSettingsBuilder {
    settings: FlowControlSettings,
}

impl FlowControlSettingsBuilder {
    /// Create a new settings builder
    pub fn new() -> Self {
        FlowControlSettingsBuilder {
            settings: FlowControlSettings::new(),
        }
    }

    /// Set connection window size
    pub fn initial_connection_window_size(mut self, size: u32) -> Self {
        self.settings.initial_connection_window_size = Some(size);
        self
    }

    /// Set stream window size
    pub fn initial_stream_window_size(mut self, size: u32) -> Self {
        self.settings.initial_stream_window_size = Some(size);
        self
    }

    /// Set connection update threshold
    pub fn connection_window_update_threshold(mut self, threshold: u32) -> Self {
        self.settings.connection_window_update_threshold = Some(threshold);
        self
    }

    /// Set stream update threshold
    pub fn stream_window_update_threshold(mut self, threshold: u32) -> Self {
        self.settings.stream_window_update_threshold = Some(threshold);
        self
    }

    /// Build the settings
    pub fn build(self) -> Result<FlowControlSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

impl Default for FlowControlSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
