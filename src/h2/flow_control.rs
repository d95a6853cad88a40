//! HTTP/2 input flow control
//!
//! This module implements the receive window as defined in RFC 7540
//! Section 6.9: the number of bytes the peer may still send before it has to
//! wait for a WINDOW_UPDATE.
//!
//! # Thread Safety
//!
//! The window is shared between the connection read loop, which debits it as
//! DATA arrives, and the request body readers, which credit it back. All of
//! the state that decides success or failure lives in a single `AtomicU64`:
//!
//! - Bits 0-31: available bytes (never above 2^31 - 1)
//! - Bit 63: aborted tombstone
//!
//! Every mutation is a compare-and-swap loop over that word, so advances,
//! credits and the abort are linearizable against each other without a lock.
//! Returned credit is batched in a second atomic, `pending_update`, which only
//! decides when a WINDOW_UPDATE is worth sending.

use std::fmt;

use super::MAX_WINDOW_SIZE;
use crate::sync::{AtomicBool, AtomicU32, AtomicU64, Ordering};

const ABORTED_BIT: u64 = 1 << 63;
const AVAILABLE_MASK: u64 = u32::MAX as u64;

/// Snapshot of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Accepting data, with this many bytes available
    Open(u32),
    /// Permanently closed; keeps the byte count it had when aborted
    Aborted(u32),
}

impl WindowState {
    /// Bytes the peer may still send
    pub fn available(self) -> u32 {
        match self {
            WindowState::Open(available) | WindowState::Aborted(available) => available,
        }
    }

    /// Whether the window has been aborted
    pub fn is_aborted(self) -> bool {
        matches!(self, WindowState::Aborted(_))
    }

    fn pack(self) -> u64 {
        match self {
            WindowState::Open(available) => available as u64,
            WindowState::Aborted(available) => ABORTED_BIT | available as u64,
        }
    }

    fn unpack(word: u64) -> Self {
        let available = (word & AVAILABLE_MASK) as u32;
        if word & ABORTED_BIT != 0 {
            WindowState::Aborted(available)
        } else {
            WindowState::Open(available)
        }
    }
}

/// The peer sent more than the window allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("received {requested} bytes with {available} available")]
pub struct WindowExceeded {
    /// Bytes the peer sent
    pub requested: u32,
    /// Bytes the window had left
    pub available: u32,
}

/// Receive window for one stream or for the whole connection
pub struct InputFlowControl {
    /// Packed [`WindowState`]
    state: AtomicU64,
    /// Credit returned but not yet reported in a WINDOW_UPDATE
    pending_update: AtomicU32,
    /// Set once the peer can no longer send (END_STREAM, GOAWAY)
    window_updates_disabled: AtomicBool,
    initial_window_size: u32,
    min_window_update_size: u32,
}

impl InputFlowControl {
    /// Create a window of `initial_window_size` bytes.
    ///
    /// Returned credit is only reported once the batch grows strictly larger
    /// than `min_window_update_size`. Both values are clamped to 2^31 - 1.
    pub fn new(initial_window_size: u32, min_window_update_size: u32) -> Self {
        let initial_window_size = initial_window_size.min(MAX_WINDOW_SIZE);
        InputFlowControl {
            state: AtomicU64::new(WindowState::Open(initial_window_size).pack()),
            pending_update: AtomicU32::new(0),
            window_updates_disabled: AtomicBool::new(false),
            initial_window_size,
            min_window_update_size: min_window_update_size.min(MAX_WINDOW_SIZE),
        }
    }

    /// Current state of the window
    pub fn state(&self) -> WindowState {
        WindowState::unpack(self.state.load(Ordering::Acquire))
    }

    /// Bytes the peer may still send
    pub fn available(&self) -> u32 {
        self.state().available()
    }

    /// Whether [`abort`](Self::abort) has taken effect
    pub fn is_aborted(&self) -> bool {
        self.state().is_aborted()
    }

    /// Window size the peer started with
    pub fn initial_window_size(&self) -> u32 {
        self.initial_window_size
    }

    /// Batching threshold for WINDOW_UPDATE increments
    pub fn min_window_update_size(&self) -> u32 {
        self.min_window_update_size
    }

    /// Credit returned but not yet reported
    pub fn pending_update_size(&self) -> u32 {
        self.pending_update.load(Ordering::Acquire)
    }

    /// Whether WINDOW_UPDATE reporting has been stopped
    pub fn window_updates_disabled(&self) -> bool {
        self.window_updates_disabled.load(Ordering::Acquire)
    }

    /// Debit `bytes` of incoming data.
    ///
    /// Returns `Ok(true)` when the bytes were debited and `Ok(false)` when the
    /// window is aborted, in which case nobody will read the data and the
    /// caller should count it as consumed. Data beyond the available window
    /// is an error even after an abort: the peer never had that credit.
    /// Nothing is debited unless `Ok(true)` is returned.
    pub fn advance(&self, bytes: u32) -> Result<bool, WindowExceeded> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let state = WindowState::unpack(current);
            let available = state.available();
            if bytes > available {
                return Err(WindowExceeded {
                    requested: bytes,
                    available,
                });
            }

            let next = match state {
                WindowState::Aborted(_) => return Ok(false),
                WindowState::Open(_) => WindowState::Open(available - bytes),
            };

            match self.state.compare_exchange_weak(
                current,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(true),
                Err(actual) => current = actual,
            }
        }
    }

    /// Debit `bytes`, reporting only whether they were accepted.
    ///
    /// `false` covers both an exhausted window and an aborted one.
    pub fn try_advance(&self, bytes: u32) -> bool {
        matches!(self.advance(bytes), Ok(true))
    }

    /// Undo an `advance(bytes)` that returned `Ok(true)`.
    ///
    /// The credit goes straight back to `available` without entering the
    /// WINDOW_UPDATE batch, since the peer never learned of the debit being
    /// consumed. No-op once aborted; `abort` already counted those bytes.
    pub(crate) fn revert_advance(&self, bytes: u32) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let available = match WindowState::unpack(current) {
                WindowState::Aborted(_) => return,
                WindowState::Open(available) => available,
            };

            let next = WindowState::Open(available.saturating_add(bytes).min(MAX_WINDOW_SIZE));
            match self.state.compare_exchange_weak(
                current,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Return `bytes` of credit after the application consumed them.
    ///
    /// Returns `None` when the window is aborted or the credit would push it
    /// past 2^31 - 1; nothing is applied in that case. Otherwise returns the
    /// WINDOW_UPDATE increment to send, which is `0` while the returned credit
    /// is still being batched.
    pub fn try_update_window(&self, bytes: u32) -> Option<u32> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let available = match WindowState::unpack(current) {
                WindowState::Aborted(_) => return None,
                WindowState::Open(available) => available,
            };

            let next = match available.checked_add(bytes) {
                Some(next) if next <= MAX_WINDOW_SIZE => next,
                _ => return None,
            };

            match self.state.compare_exchange_weak(
                current,
                WindowState::Open(next).pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        Some(self.batch_update(bytes))
    }

    /// Add credit to the pending batch and take the whole batch once it
    /// crosses the threshold.
    fn batch_update(&self, bytes: u32) -> u32 {
        let mut current = self.pending_update.load(Ordering::Acquire);
        loop {
            // The peer cannot send anymore, so it has no use for more credit.
            if self.window_updates_disabled.load(Ordering::Acquire) {
                return 0;
            }

            let pending = current.saturating_add(bytes);
            let (next, size_to_send) = if pending > self.min_window_update_size {
                (0, pending)
            } else {
                (pending, 0)
            };

            match self.pending_update.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if size_to_send > 0 {
                        tracing::trace!(size_to_send, "window update batch ready");
                    }
                    return size_to_send;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Keep accepting credit but never report another WINDOW_UPDATE.
    pub fn stop_window_updates(&self) {
        self.window_updates_disabled.store(true, Ordering::Release);
    }

    /// Permanently close the window.
    ///
    /// Returns the credit debited but never returned (initial size minus
    /// available) so the caller can hand it back to the connection window.
    /// Every call after the first returns `0`.
    pub fn abort(&self) -> u32 {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let available = match WindowState::unpack(current) {
                WindowState::Aborted(_) => return 0,
                WindowState::Open(available) => available,
            };

            match self.state.compare_exchange_weak(
                current,
                WindowState::Aborted(available).pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let unread = self.initial_window_size.saturating_sub(available);
                    tracing::debug!(available, unread, "input window aborted");
                    return unread;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl fmt::Debug for InputFlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFlowControl")
            .field("state", &self.state())
            .field("pending_update", &self.pending_update_size())
            .field("window_updates_disabled", &self.window_updates_disabled())
            .field("initial_window_size", &self.initial_window_size)
            .field("min_window_update_size", &self.min_window_update_size)
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::h2::DEFAULT_INITIAL_WINDOW_SIZE;

    #[test]
    fn test_window_state_packing() {
        for state in [
            WindowState::Open(0),
            WindowState::Open(MAX_WINDOW_SIZE),
            WindowState::Aborted(0),
            WindowState::Aborted(12345),
        ] {
            assert_eq!(WindowState::unpack(state.pack()), state);
        }
        assert!(WindowState::Aborted(1).is_aborted());
        assert_eq!(WindowState::Aborted(7).available(), 7);
    }

    #[test]
    fn test_advance_until_exhausted() {
        let window = InputFlowControl::new(100, 10);
        assert_eq!(window.available(), 100);

        assert!(window.try_advance(60));
        assert_eq!(window.available(), 40);

        // Too much, nothing is debited
        assert_eq!(
            window.advance(41),
            Err(WindowExceeded {
                requested: 41,
                available: 40
            })
        );
        assert_eq!(window.available(), 40);

        assert!(window.try_advance(40));
        assert_eq!(window.available(), 0);
        assert!(!window.try_advance(1));
        assert!(window.try_advance(0));
    }

    #[test]
    fn test_update_window_batches() {
        let window = InputFlowControl::new(100, 10);
        assert!(window.try_advance(100));

        // 10 is not strictly above the threshold
        assert_eq!(window.try_update_window(4), Some(0));
        assert_eq!(window.try_update_window(6), Some(0));
        assert_eq!(window.pending_update_size(), 10);

        assert_eq!(window.try_update_window(1), Some(11));
        assert_eq!(window.pending_update_size(), 0);
        assert_eq!(window.available(), 11);

        // A single large return is reported at once
        assert_eq!(window.try_update_window(50), Some(50));
        assert_eq!(window.available(), 61);
    }

    #[test]
    fn test_update_window_overflow() {
        let window = InputFlowControl::new(MAX_WINDOW_SIZE, 0);
        assert_eq!(window.try_update_window(1), None);
        assert_eq!(window.available(), MAX_WINDOW_SIZE);
        assert_eq!(window.pending_update_size(), 0);

        assert!(window.try_advance(10));
        assert_eq!(window.try_update_window(u32::MAX), None);
        assert_eq!(window.try_update_window(10), Some(10));
    }

    #[test]
    fn test_stop_window_updates() {
        let window = InputFlowControl::new(DEFAULT_INITIAL_WINDOW_SIZE, 0);
        assert!(window.try_advance(1000));
        window.stop_window_updates();

        // Credit still lands, but nothing is reported
        assert_eq!(window.try_update_window(1000), Some(0));
        assert_eq!(window.available(), DEFAULT_INITIAL_WINDOW_SIZE);
        assert!(window.window_updates_disabled());
    }

    #[test]
    fn test_abort() {
        let window = InputFlowControl::new(100, 10);
        assert!(window.try_advance(30));
        assert_eq!(window.try_update_window(5), Some(0));

        assert_eq!(window.abort(), 25);
        assert!(window.is_aborted());
        assert_eq!(window.state(), WindowState::Aborted(75));

        // Second abort is a no-op
        assert_eq!(window.abort(), 0);

        assert!(!window.try_advance(1));
        assert_eq!(window.advance(1), Ok(false));
        assert_eq!(window.try_update_window(1), None);
        assert_eq!(window.available(), 75);
    }

    #[test]
    fn test_revert_advance() {
        let window = InputFlowControl::new(100, 10);
        assert!(window.try_advance(40));

        window.revert_advance(40);
        assert_eq!(window.available(), 100);
        assert_eq!(window.pending_update_size(), 0);

        assert!(window.try_advance(40));
        assert_eq!(window.abort(), 40);
        window.revert_advance(40);
        assert_eq!(window.state(), WindowState::Aborted(60));
    }

    #[test]
    fn test_advance_past_window_after_abort_is_still_an_error() {
        let window = InputFlowControl::new(10, 0);
        window.abort();
        assert!(window.advance(11).is_err());
        assert_eq!(window.advance(10), Ok(false));
    }

    #[test]
    fn test_debug_output() {
        let window = InputFlowControl::new(10, 5);
        let debug = format!("{:?}", window);
        assert!(debug.contains("Open(10)"));
    }
}
