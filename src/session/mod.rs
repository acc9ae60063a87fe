// ABOUTME: The SMPP session engine: correlation table, state machine, reader and keepalive loops
// ABOUTME: SessionCore carries the internals shared by the client and server façades

pub mod bind;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
mod keepalive;
mod pending;
mod reader;
mod sequence;
pub mod server;
pub mod state;

pub use bind::BindRequest;
pub use client::{BindCredentials, EsmeSession, EsmeSessionBuilder, OutboundSession};
pub use config::SessionConfig;
pub use error::{SmppError, SmppResult};
pub use handler::{
    DeliveryHandler, MessageStatus, NullDeliveryHandler, ProcessRequestError, SmscHandler,
};
pub use pending::PendingResponse;
pub use sequence::SequenceGenerator;
pub use server::{SmscSession, SmscSessionBuilder};
pub use state::{SessionIdentity, SessionRole, SessionState, SessionStateListener};

use crate::codec::Pdu;
use crate::connection::FrameWriter;
use crate::datatypes::{CommandId, EnquireLink};
use crate::session::pending::{PendingTable, WaitMode};
use crate::session::state::StateCell;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

/// The role-specific callback a reader loop dispatches unsolicited requests
/// to.
pub(crate) enum HandlerKind {
    Esme(Arc<dyn DeliveryHandler>),
    Smsc(Arc<dyn SmscHandler>),
}

/// Internals shared by the caller's tasks, the reader loop and the keepalive
/// loop. The façades own an `Arc` of this; the loops hold non-owning clones
/// that let the session be torn down from any of the three.
pub(crate) struct SessionCore {
    pub(crate) config: SessionConfig,
    pub(crate) identity: SessionIdentity,
    pub(crate) pending: PendingTable,
    pub(crate) state: StateCell,
    pub(crate) handler: HandlerKind,
    /// Single-writer discipline for the transport: façade calls, the reader
    /// loop's responses and the keepalive probes all send through this lock.
    writer: tokio::sync::Mutex<FrameWriter>,
    last_activity: Mutex<Instant>,
    /// Tripped once on close; both loops select on it.
    pub(crate) shutdown: Notify,
    /// Server roles only: hands inbound bind requests to user code.
    pub(crate) bind_gate: Option<mpsc::Sender<BindRequest>>,
}

impl SessionCore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        role: SessionRole,
        initial: SessionState,
        peer: SocketAddr,
        config: SessionConfig,
        handler: HandlerKind,
        listener: Option<Arc<dyn SessionStateListener>>,
        writer: FrameWriter,
        bind_gate: Option<mpsc::Sender<BindRequest>>,
    ) -> Arc<Self> {
        let identity = SessionIdentity { role, peer };
        Arc::new(Self {
            pending: PendingTable::new(config.sequence_max),
            config,
            state: StateCell::new(initial, identity.clone(), listener),
            identity,
            handler,
            writer: tokio::sync::Mutex::new(writer),
            last_activity: Mutex::new(Instant::now()),
            shutdown: Notify::new(),
            bind_gate,
        })
    }

    /// Stamp session activity. Called for every PDU received.
    pub(crate) fn touch(&self) {
        *self.last_activity.lock().expect("activity lock poisoned") = Instant::now();
    }

    /// Time since the last received PDU.
    pub(crate) fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .expect("activity lock poisoned")
            .elapsed()
    }

    /// Encode and send one PDU. The writer lock serializes concurrent
    /// senders.
    pub(crate) async fn send(&self, pdu: &Pdu) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_pdu(pdu).await
    }

    /// The send-and-wait template every request operation follows: the
    /// caller has reserved `pending` and stamped its sequence number into
    /// `pdu`. A send failure removes the entry, force-closes the session and
    /// propagates; otherwise the wait is bounded by the transaction timer.
    pub(crate) async fn request(
        &self,
        pdu: Pdu,
        pending: PendingResponse,
        mode: WaitMode,
    ) -> SmppResult<Pdu> {
        debug_assert_eq!(pdu.sequence_number(), pending.sequence());

        if let Err(e) = self.send(&pdu).await {
            self.pending.remove(pending.sequence());
            self.close().await;
            return Err(SmppError::Connection(e));
        }
        debug!(sequence = pending.sequence(), kind = ?pdu.command_id(), "request sent");

        self.pending
            .wait(pending, self.config.transaction_timer, mode)
            .await
    }

    /// Send an enquire_link and wait for its response through the same
    /// machinery as any other request.
    pub(crate) async fn ping(&self, mode: WaitMode) -> SmppResult<()> {
        let pending = self.pending.add(CommandId::EnquireLinkResp);
        let probe = Pdu::EnquireLink(EnquireLink::new(pending.sequence()));
        self.request(probe, pending, mode).await.map(|_| ())
    }

    /// Route an inbound response to its pending entry.
    ///
    /// An unmatched response is logged; for the bind_resp and query_sm_resp
    /// classes it is additionally answered with a generic_nack, the one
    /// consistent policy applied to every command kind.
    pub(crate) async fn resolve_response(&self, pdu: Pdu) {
        let sequence = pdu.sequence_number();
        let kind = pdu.command_id();

        if self.pending.done(sequence, pdu) {
            return;
        }

        warn!(sequence, ?kind, "response matches no in-flight request");
        if nack_unmatched(kind) {
            let nack = Pdu::GenericNack(crate::datatypes::GenericNack::error(
                sequence,
                crate::datatypes::CommandStatus::InvalidPredefinedMessageId,
            ));
            if let Err(e) = self.send(&nack).await {
                debug!(error = %e, "failed to nack unmatched response");
            }
        }
    }

    /// Terminal teardown, the universal cancellation mechanism: drives the
    /// state to `Closed`, fails every in-flight request, stops both loops
    /// and shuts the transport down. Idempotent.
    pub(crate) async fn close(&self) {
        let old = self.state.transition(SessionState::Closed);
        if old == SessionState::Closed {
            return;
        }
        self.pending.fail_all();
        self.shutdown.notify_waiters();

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "transport shutdown failed");
        }
    }

    /// Synchronous subset of [`Self::close`] for drop paths, where the
    /// writer cannot be flushed. The loops still observe the shutdown and
    /// exit.
    pub(crate) fn close_sync(&self) {
        let old = self.state.transition(SessionState::Closed);
        if old == SessionState::Closed {
            return;
        }
        self.pending.fail_all();
        self.shutdown.notify_waiters();
    }

    pub(crate) fn spawn_loops(self: &Arc<Self>, reader: crate::connection::FrameReader) {
        tokio::spawn(reader::run_reader(self.clone(), reader));
        tokio::spawn(keepalive::run_keepalive(self.clone()));
    }
}

/// Whether an unmatched response of this kind warrants a generic_nack on top
/// of the log line.
fn nack_unmatched(kind: CommandId) -> bool {
    matches!(
        kind,
        CommandId::BindTransmitterResp
            | CommandId::BindReceiverResp
            | CommandId::BindTransceiverResp
            | CommandId::QuerySmResp
    )
}
