// ABOUTME: The pending-response table correlating in-flight requests with their responses
// ABOUTME: Concurrent map keyed by sequence number, one oneshot per entry, timeout-bounded waits

use crate::codec::Pdu;
use crate::datatypes::CommandId;
use crate::session::error::{SmppError, SmppResult};
use crate::session::sequence::SequenceGenerator;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// How a pending entry was resolved by the reader loop.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// The correlated response arrived and decoded.
    Done(Pdu),
    /// A correlated frame arrived but cannot serve as this request's
    /// response (e.g. a generic_nack naming our sequence number).
    Invalid(String),
}

/// How [`PendingTable::wait`] treats a non-success command_status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum WaitMode {
    /// Non-zero status fails the wait with `NegativeResponse`.
    Strict,
    /// Non-zero status is logged and the response returned anyway. Used for
    /// non-critical commands like unbind and enquire_link, where a grumpy
    /// peer should not abort local teardown or liveness tracking.
    Lenient,
}

/// One outstanding request awaiting its correlated response.
///
/// Holds the receiving end of a single-resolution rendezvous: the reader
/// loop resolves it at most once, and whichever of {response arrival,
/// timeout, send failure} happens first detaches the entry from the table.
#[derive(Debug)]
pub struct PendingResponse {
    sequence: u32,
    expected: CommandId,
    rx: oneshot::Receiver<Resolution>,
}

impl PendingResponse {
    /// The sequence number reserved for this request.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

/// Concurrent map from sequence number to in-flight request.
///
/// The lock is held only for map mutation, never across a wait, so one slow
/// request cannot block unrelated ones. Per-entry wakeups go through the
/// entry's own oneshot channel.
pub(crate) struct PendingTable {
    sequence: SequenceGenerator,
    entries: Mutex<HashMap<u32, PendingEntry>>,
}

struct PendingEntry {
    expected: CommandId,
    tx: oneshot::Sender<Resolution>,
}

impl PendingTable {
    pub(crate) fn new(sequence_max: u32) -> Self {
        Self {
            sequence: SequenceGenerator::new(sequence_max),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve a sequence number and register an entry expecting a response
    /// of the given kind.
    ///
    /// # Panics
    ///
    /// If the generator wrapped into a sequence number still occupied by an
    /// in-flight request. With the default `i32::MAX` ceiling and
    /// timeout-bounded waits this cannot happen; hitting it means broken
    /// timeout discipline, a programming error.
    pub(crate) fn add(&self, expected: CommandId) -> PendingResponse {
        let sequence = self.sequence.next_value();
        let (tx, rx) = oneshot::channel();

        let mut entries = self.entries.lock().expect("pending lock poisoned");
        if entries.contains_key(&sequence) {
            panic!("sequence number {sequence} wrapped into an in-flight request");
        }
        entries.insert(sequence, PendingEntry { expected, tx });

        PendingResponse {
            sequence,
            expected,
            rx,
        }
    }

    /// Draw a sequence number without registering an entry. For requests
    /// the protocol defines no response to (outbind, alert_notification).
    pub(crate) fn next_sequence(&self) -> u32 {
        self.sequence.next_value()
    }

    /// Detach the entry for `sequence`, if present. Idempotent: a second
    /// removal of the same number is a no-op returning `false`.
    pub(crate) fn remove(&self, sequence: u32) -> bool {
        self.entries
            .lock()
            .expect("pending lock poisoned")
            .remove(&sequence)
            .is_some()
    }

    /// The response kind the entry for `sequence` expects, if one is
    /// in flight.
    pub(crate) fn expected_kind(&self, sequence: u32) -> Option<CommandId> {
        self.entries
            .lock()
            .expect("pending lock poisoned")
            .get(&sequence)
            .map(|entry| entry.expected)
    }

    /// Resolve the entry for `sequence` with its response. Wakes exactly one
    /// waiter; returns `false` when no entry was in flight (already
    /// resolved, timed out, or never existed).
    pub(crate) fn done(&self, sequence: u32, response: Pdu) -> bool {
        self.resolve(sequence, Resolution::Done(response))
    }

    /// Resolve the entry for `sequence` with an error instead of a
    /// response. Same single-shot semantics as [`Self::done`].
    pub(crate) fn done_with_invalid_response(&self, sequence: u32, reason: String) -> bool {
        self.resolve(sequence, Resolution::Invalid(reason))
    }

    fn resolve(&self, sequence: u32, resolution: Resolution) -> bool {
        let entry = self
            .entries
            .lock()
            .expect("pending lock poisoned")
            .remove(&sequence);
        match entry {
            Some(entry) => {
                // A dropped receiver (waiter gave up between our removal and
                // this send) is fine; the entry is gone either way
                let _ = entry.tx.send(resolution);
                true
            }
            None => false,
        }
    }

    /// Fail every in-flight entry. Called on session close so waiters see
    /// `Closed` immediately instead of running out their timers.
    pub(crate) fn fail_all(&self) {
        let drained: Vec<PendingEntry> = {
            let mut entries = self.entries.lock().expect("pending lock poisoned");
            entries.drain().map(|(_, entry)| entry).collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing in-flight requests on close");
        }
        // Dropping the senders closes the channels; waiters observe Closed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("pending lock poisoned").len()
    }

    /// Suspend until the entry resolves or `timeout` elapses.
    ///
    /// On timeout the waiter itself removes the entry, so no entry outlives
    /// its timeout window.
    pub(crate) async fn wait(
        &self,
        pending: PendingResponse,
        timeout: Duration,
        mode: WaitMode,
    ) -> SmppResult<Pdu> {
        let sequence = pending.sequence;
        let expected = pending.expected;

        let resolution = match tokio::time::timeout(timeout, pending.rx).await {
            Ok(Ok(resolution)) => resolution,
            // Sender dropped without resolving: the session closed
            Ok(Err(_)) => return Err(SmppError::Closed),
            Err(_) => {
                self.remove(sequence);
                return Err(SmppError::Timeout);
            }
        };

        match resolution {
            Resolution::Invalid(reason) => Err(SmppError::InvalidResponse(reason)),
            Resolution::Done(response) => {
                if response.command_id() != expected {
                    return Err(SmppError::InvalidResponse(format!(
                        "expected {:?} for sequence {}, got {:?}",
                        expected,
                        sequence,
                        response.command_id()
                    )));
                }
                let status = response.command_status();
                if !status.is_ok() {
                    match mode {
                        WaitMode::Strict => return Err(SmppError::NegativeResponse(status)),
                        WaitMode::Lenient => {
                            warn!(sequence, ?status, kind = ?expected, "ignoring negative response");
                        }
                    }
                }
                Ok(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{CommandStatus, EnquireLinkResponse, SubmitSmResponse, UnbindResponse};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn table() -> PendingTable {
        PendingTable::new(i32::MAX as u32)
    }

    #[tokio::test]
    async fn concurrent_adds_reserve_distinct_sequences() {
        let table = Arc::new(table());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                (0..500)
                    .map(|_| table.add(CommandId::SubmitSmResp).sequence())
                    .collect::<Vec<u32>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for sequence in handle.await.unwrap() {
                assert!(seen.insert(sequence), "duplicate sequence {sequence}");
            }
        }
        assert_eq!(table.len(), 4000);
    }

    #[tokio::test]
    async fn done_resolves_waiter() {
        let table = table();
        let pending = table.add(CommandId::SubmitSmResp);
        let sequence = pending.sequence();

        let resolved = table.done(
            sequence,
            Pdu::SubmitSmResp(SubmitSmResponse::new(sequence, "msg-42")),
        );
        assert!(resolved);

        let response = table
            .wait(pending, Duration::from_secs(1), WaitMode::Strict)
            .await
            .unwrap();
        match response {
            Pdu::SubmitSmResp(resp) => assert_eq!(resp.message_id, "msg-42"),
            other => panic!("unexpected resolution {other:?}"),
        }
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn at_most_once_resolution() {
        let table = table();
        let pending = table.add(CommandId::EnquireLinkResp);
        let sequence = pending.sequence();

        assert!(table.done(
            sequence,
            Pdu::EnquireLinkResp(EnquireLinkResponse::new(sequence)),
        ));
        // Second resolution of any flavour is a no-op
        assert!(!table.done_with_invalid_response(sequence, "late".into()));
        assert!(!table.done(
            sequence,
            Pdu::EnquireLinkResp(EnquireLinkResponse::new(sequence)),
        ));

        // The waiter observes exactly the first outcome
        let response = table
            .wait(pending, Duration::from_secs(1), WaitMode::Strict)
            .await
            .unwrap();
        assert_eq!(response.sequence_number(), sequence);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_entry() {
        let table = table();
        let pending = table.add(CommandId::SubmitSmResp);
        let sequence = pending.sequence();

        let result = table
            .wait(pending, Duration::from_millis(100), WaitMode::Strict)
            .await;
        assert!(matches!(result, Err(SmppError::Timeout)));

        // The waiter cleaned up after itself
        assert_eq!(table.len(), 0);
        assert!(!table.remove(sequence));
    }

    #[tokio::test]
    async fn strict_wait_fails_on_negative_status() {
        let table = table();
        let pending = table.add(CommandId::SubmitSmResp);
        let sequence = pending.sequence();

        table.done(
            sequence,
            Pdu::SubmitSmResp(SubmitSmResponse::error(
                sequence,
                CommandStatus::MessageQueueFull,
            )),
        );

        let result = table
            .wait(pending, Duration::from_secs(1), WaitMode::Strict)
            .await;
        assert!(matches!(
            result,
            Err(SmppError::NegativeResponse(CommandStatus::MessageQueueFull))
        ));
    }

    #[tokio::test]
    async fn lenient_wait_logs_and_returns_negative_status() {
        let table = table();
        let pending = table.add(CommandId::UnbindResp);
        let sequence = pending.sequence();

        table.done(
            sequence,
            Pdu::UnbindResp(UnbindResponse::error(sequence, CommandStatus::SystemError)),
        );

        let response = table
            .wait(pending, Duration::from_secs(1), WaitMode::Lenient)
            .await
            .unwrap();
        assert_eq!(response.command_status(), CommandStatus::SystemError);
    }

    #[tokio::test]
    async fn mismatched_response_kind_is_invalid() {
        let table = table();
        let pending = table.add(CommandId::SubmitSmResp);
        let sequence = pending.sequence();

        table.done(
            sequence,
            Pdu::EnquireLinkResp(EnquireLinkResponse::new(sequence)),
        );

        let result = table
            .wait(pending, Duration::from_secs(1), WaitMode::Strict)
            .await;
        assert!(matches!(result, Err(SmppError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn invalid_resolution_surfaces_as_invalid_response() {
        let table = table();
        let pending = table.add(CommandId::QuerySmResp);
        let sequence = pending.sequence();

        table.done_with_invalid_response(sequence, "generic_nack named this sequence".into());

        let result = table
            .wait(pending, Duration::from_secs(1), WaitMode::Strict)
            .await;
        assert!(matches!(result, Err(SmppError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fail_all_wakes_waiters_with_closed() {
        let table = Arc::new(table());
        let pending = table.add(CommandId::SubmitSmResp);

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                table
                    .wait(pending, Duration::from_secs(30), WaitMode::Strict)
                    .await
            })
        };
        tokio::task::yield_now().await;

        table.fail_all();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(SmppError::Closed)));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn expected_kind_tracks_in_flight_entries() {
        let table = table();
        let pending = table.add(CommandId::QuerySmResp);
        let sequence = pending.sequence();

        assert_eq!(table.expected_kind(sequence), Some(CommandId::QuerySmResp));
        table.remove(sequence);
        assert_eq!(table.expected_kind(sequence), None);
    }

    #[test]
    #[should_panic(expected = "wrapped into an in-flight request")]
    fn wrap_into_occupied_sequence_panics() {
        let table = PendingTable::new(2);
        let _a = table.add(CommandId::SubmitSmResp); // sequence 1
        let _b = table.add(CommandId::SubmitSmResp); // sequence 2
        let _c = table.add(CommandId::SubmitSmResp); // wraps to 1, occupied
    }
}
