// ABOUTME: Monotonic wrap-around sequence number generator for outbound requests
// ABOUTME: Lock-free; concurrent callers never observe the same value twice between wraps

use std::sync::atomic::{AtomicU32, Ordering};

/// Issues sequence numbers for outbound request PDUs.
///
/// Values run 1, 2, 3, ... up to the configured maximum, then wrap back to 1.
/// 0 and 0xFFFFFFFF are reserved by the protocol and are never issued.
#[derive(Debug)]
pub struct SequenceGenerator {
    // Stores the last issued value; 0 means nothing issued yet
    last: AtomicU32,
    max: u32,
}

impl SequenceGenerator {
    pub fn new(max: u32) -> Self {
        assert!(max >= 1 && max < 0xFFFF_FFFF, "sequence_max out of range");
        Self {
            last: AtomicU32::new(0),
            max,
        }
    }

    /// The next sequence number. Thread-safe; two concurrent callers always
    /// receive distinct values (unless the counter wraps in between, which
    /// the pending table guards against).
    pub fn next_value(&self) -> u32 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let next = if current >= self.max { 1 } else { current + 1 };
            match self.last.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new(i32::MAX as u32)
    }
}
