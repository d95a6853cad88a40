//! Synchronization primitives with optional loom support.
//!
//! Window state lives in atomics re-exported from here so the CAS loops can be
//! model-checked with loom while production builds use std atomics.

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
