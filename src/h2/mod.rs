//! HTTP/2 input flow control
//!
//! This module implements the receive side of HTTP/2 flow control as defined
//! in RFC 7540 Section 5.2 and Section 6.9.
//!
//! # Architecture
//!
//! Two layers cooperate:
//!
//! - [`InputFlowControl`]: a lock-free byte-credit window. One exists per
//!   stream and one per connection. Incoming DATA debits it, application
//!   reads credit it back, and credit is batched before being reported as a
//!   WINDOW_UPDATE increment.
//! - [`StreamInputFlowControl`] / [`ConnectionInputFlowControl`]: compose a
//!   stream window with the shared connection window so that every debit and
//!   credit reaches both, and hand the resulting WINDOW_UPDATE frames to a
//!   [`WindowUpdateSink`] owned by the frame writer.
//!
//! Frame parsing, HPACK and the send-side windows belong to the surrounding
//! connection layer and are not part of this module.
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use h2flow::h2::{ConnectionInputFlowControl, FlowControlSettingsBuilder, WindowUpdateFrame};
//!
//! # fn example() -> h2flow::Result<()> {
//! let settings = FlowControlSettingsBuilder::new()
//!     .initial_connection_window_size(65535)
//!     .initial_stream_window_size(65535)
//!     .build()?;
//!
//! let written = Arc::new(Mutex::new(Vec::<WindowUpdateFrame>::new()));
//! let connection = ConnectionInputFlowControl::new(settings, written.clone());
//!
//! let stream = connection.open_stream(1)?;
//! assert!(connection.on_data(1, 35000, 0)?);
//!
//! // The application read the body, give the credit back to the peer.
//! stream.update_windows(35000);
//! assert_eq!(written.lock().unwrap().len(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod settings;
pub mod stream;

pub use connection::ConnectionInputFlowControl;
pub use error::{Error, ErrorCode, Result};
pub use flow_control::{InputFlowControl, WindowExceeded, WindowState};
pub use frames::{WindowUpdateFrame, WindowUpdateSink};
pub use settings::{FlowControlSettings, FlowControlSettingsBuilder};
pub use stream::{StreamId, StreamInputFlowControl};

/// Default initial window size (65535 bytes)
///
/// Both the connection window and every stream window start at this size
/// until SETTINGS or WINDOW_UPDATE frames say otherwise (RFC 7540 Section 6.9.2).
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;

/// Maximum flow-control window size (2^31 - 1)
pub const MAX_WINDOW_SIZE: u32 = 0x7FFFFFFF;

/// Maximum stream ID value (2^31 - 1)
pub const MAX_STREAM_ID: u32 = 0x7FFFFFFF;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;
