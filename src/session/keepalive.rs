// ABOUTME: The keepalive loop: periodic enquire_link probes while the session is bound
// ABOUTME: Probe failures are logged, never fatal on their own; the reader's timeout branch escalates

use crate::session::pending::WaitMode;
use crate::session::{SessionCore, SmppError};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{trace, warn};

/// Probe the link at the configured enquire-link interval.
///
/// Wakes every `keepalive_granularity` to compare idle time against
/// `enquire_link_interval`, so a lowered interval takes effect without
/// restarting the loop. An unanswered probe is only logged: the next wake
/// retries, and the reader loop's own timeout branch is the one that
/// escalates persistent silence into teardown.
pub(crate) async fn run_keepalive(core: Arc<SessionCore>) {
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            _ = core.shutdown.notified() => break,
            _ = sleep(core.config.keepalive_granularity) => {}
        }

        let state = core.state.current();
        if state.is_terminal() {
            break;
        }
        if !state.is_bound() {
            continue;
        }
        if core.idle_for() < core.config.enquire_link_interval {
            continue;
        }

        match core.ping(WaitMode::Lenient).await {
            Ok(()) => {
                trace!("enquire_link answered");
                consecutive_failures = 0;
            }
            Err(SmppError::Closed) | Err(SmppError::Connection(_)) => break,
            Err(e) => {
                consecutive_failures += 1;
                warn!(
                    consecutive = consecutive_failures,
                    error = %e,
                    "enquire_link probe unanswered"
                );
            }
        }
    }
}
