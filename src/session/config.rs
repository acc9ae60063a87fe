// ABOUTME: Timer and limit configuration shared by every session role
// ABOUTME: Provides SessionConfig with builder-style setters and protocol-sensible defaults

use std::time::Duration;

/// Timers and limits governing one SMPP session.
///
/// Every blocking wait in the session layer is bounded by one of these
/// values; there is no unbounded wait anywhere.
///
/// # Example
///
/// ```rust
/// use smpp_session::session::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_transaction_timer(Duration::from_secs(5))
///     .with_enquire_link_interval(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum idle time on the read side before a liveness probe is
    /// triggered (default: 60 seconds). Expiry is not an error.
    pub session_timer: Duration,

    /// Idle time after which the keepalive loop sends an enquire_link
    /// (default: 30 seconds).
    pub enquire_link_interval: Duration,

    /// How often the keepalive loop wakes to check idleness
    /// (default: 2 seconds).
    pub keepalive_granularity: Duration,

    /// Maximum wait for a request's matching response
    /// (default: 10 seconds).
    pub transaction_timer: Duration,

    /// Maximum wait for the bind handshake to complete, covering both the
    /// client's wait for bind_resp and the server's wait for the first bind
    /// (default: 30 seconds).
    pub bind_timer: Duration,

    /// Highest sequence number issued before wrapping back to 1
    /// (default: `i32::MAX`, the ceiling most SMSC implementations assume).
    pub sequence_max: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timer: Duration::from_secs(60),
            enquire_link_interval: Duration::from_secs(30),
            keepalive_granularity: Duration::from_secs(2),
            transaction_timer: Duration::from_secs(10),
            bind_timer: Duration::from_secs(30),
            sequence_max: i32::MAX as u32,
        }
    }
}

impl SessionConfig {
    pub fn with_session_timer(mut self, timer: Duration) -> Self {
        self.session_timer = timer;
        self
    }

    pub fn with_enquire_link_interval(mut self, interval: Duration) -> Self {
        self.enquire_link_interval = interval;
        self
    }

    pub fn with_keepalive_granularity(mut self, granularity: Duration) -> Self {
        self.keepalive_granularity = granularity;
        self
    }

    pub fn with_transaction_timer(mut self, timer: Duration) -> Self {
        self.transaction_timer = timer;
        self
    }

    pub fn with_bind_timer(mut self, timer: Duration) -> Self {
        self.bind_timer = timer;
        self
    }

    pub fn with_sequence_max(mut self, max: u32) -> Self {
        self.sequence_max = max;
        self
    }
}
