//! h2flow - HTTP/2 input flow control
//!
//! This crate provides the read-side flow-control engine of an HTTP/2 server:
//! per-stream and per-connection byte-credit windows, the coordination that
//! keeps them in step, and the WINDOW_UPDATE sizes to advertise back to the peer.

pub mod h2;
mod sync;

pub use h2::{
    ConnectionInputFlowControl, Error, ErrorCode, FlowControlSettings,
    FlowControlSettingsBuilder, InputFlowControl, Result, StreamInputFlowControl,
    WindowUpdateFrame, WindowUpdateSink,
};
