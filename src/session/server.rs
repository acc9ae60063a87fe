// ABOUTME: The SMSC (server) session façade: accept-and-bind plus the delivery operation surface
// ABOUTME: Also implements connect_and_outbind, where the SMSC dials out and invites a bind

use crate::codec::Pdu;
use crate::connection::split;
use crate::datatypes::{AlertNotification, CommandId, DataSm, DeliverSm, Outbind, Unbind};
use crate::session::bind::BindRequest;
use crate::session::error::{SmppError, SmppResult};
use crate::session::handler::SmscHandler;
use crate::session::pending::WaitMode;
use crate::session::state::{SessionRole, SessionState, SessionStateListener};
use crate::session::{HandlerKind, SessionConfig, SessionCore};
use std::sync::Arc;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn};

/// Configures and establishes [`SmscSession`]s.
///
/// One builder can accept any number of connections; each call hands back an
/// independent session.
pub struct SmscSessionBuilder {
    config: SessionConfig,
    handler: Arc<dyn SmscHandler>,
    listener: Option<Arc<dyn SessionStateListener>>,
}

impl SmscSessionBuilder {
    pub fn new(handler: Arc<dyn SmscHandler>) -> Self {
        Self {
            config: SessionConfig::default(),
            handler,
            listener: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_state_listener(mut self, listener: Arc<dyn SessionStateListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Take over an accepted connection and start serving it.
    ///
    /// The reader loop starts immediately so the peer's bind can arrive;
    /// call [`SmscSession::wait_for_bind`] to receive it and decide.
    pub fn accept(&self, stream: TcpStream) -> SmppResult<SmscSession> {
        self.establish(stream, SessionState::Open, None)
    }

    /// Dial out to an ESME and invite it to bind via `outbind`.
    ///
    /// The session starts in the outbound state; the invited peer's bind
    /// arrives through [`SmscSession::wait_for_bind`] like any other.
    pub async fn connect_and_outbind(
        &self,
        addr: impl ToSocketAddrs,
        system_id: &str,
        password: Option<String>,
    ) -> SmppResult<SmscSession> {
        let stream = TcpStream::connect(addr).await?;
        let session = self.establish(stream, SessionState::Outbound, Some((system_id, password)))?;
        Ok(session)
    }

    fn establish(
        &self,
        stream: TcpStream,
        initial: SessionState,
        outbind: Option<(&str, Option<String>)>,
    ) -> SmppResult<SmscSession> {
        let peer = stream.peer_addr()?;
        let (reader, writer) = split(stream);

        // Capacity 1: one undecided bind at a time. A second bind while the
        // first sits here is refused with bind_fail by the reader loop.
        let (bind_tx, bind_rx) = mpsc::channel(1);

        let core = SessionCore::new(
            SessionRole::Smsc,
            initial,
            peer,
            self.config.clone(),
            HandlerKind::Smsc(Arc::clone(&self.handler)),
            self.listener.clone(),
            writer,
            Some(bind_tx),
        );

        if let Some((system_id, password)) = outbind {
            let sequence = core.pending.next_sequence();
            let outbind = Outbind::new(sequence, system_id, password);
            let core = Arc::clone(&core);
            let pdu = Pdu::Outbind(outbind);
            // Fired from the reader task's runtime; a send failure closes
            // the session like any other write failure
            tokio::spawn(async move {
                if let Err(e) = core.send(&pdu).await {
                    warn!(error = %e, "outbind send failed");
                    core.close().await;
                }
            });
        }

        core.spawn_loops(reader);
        info!(peer = %peer, ?initial, "serving connection");

        Ok(SmscSession { core, bind_rx })
    }
}

/// A server-side session over one accepted (or dialed) connection.
pub struct SmscSession {
    core: Arc<SessionCore>,
    bind_rx: mpsc::Receiver<BindRequest>,
}

impl SmscSession {
    pub fn state(&self) -> SessionState {
        self.core.state.current()
    }

    /// Wait for the peer's bind request, bounded by the bind timer.
    ///
    /// Returns [`SmppError::Timeout`] if no bind arrives in time and
    /// [`SmppError::Closed`] if the connection ends first. The returned
    /// [`BindRequest`] must be accepted or rejected before the peer's own
    /// timer gives up on the handshake.
    pub async fn wait_for_bind(&mut self) -> SmppResult<BindRequest> {
        match timeout(self.core.config.bind_timer, self.bind_rx.recv()).await {
            Err(_elapsed) => Err(SmppError::Timeout),
            Ok(None) => Err(SmppError::Closed),
            Ok(Some(request)) => Ok(request),
        }
    }

    fn require_delivery(&self, operation: &'static str) -> SmppResult<()> {
        let state = self.core.state.current();
        match state {
            SessionState::BoundRx | SessionState::BoundTrx => Ok(()),
            _ => Err(SmppError::ProtocolState { state, operation }),
        }
    }

    /// Deliver a mobile-originated message or a delivery receipt.
    pub async fn deliver_sm(&self, mut deliver: DeliverSm) -> SmppResult<()> {
        self.require_delivery("deliver_sm")?;
        deliver.validate()?;

        let pending = self.core.pending.add(CommandId::DeliverSmResp);
        deliver.sequence_number = pending.sequence();

        self.core
            .request(Pdu::DeliverSm(Box::new(deliver)), pending, WaitMode::Strict)
            .await?;
        Ok(())
    }

    /// Push a data_sm to the peer. Returns the message_id from the response,
    /// which may be empty.
    pub async fn data_sm(&self, mut data: DataSm) -> SmppResult<String> {
        self.require_delivery("data_sm")?;
        data.validate()?;

        let pending = self.core.pending.add(CommandId::DataSmResp);
        data.sequence_number = pending.sequence();

        let response = self
            .core
            .request(Pdu::DataSm(Box::new(data)), pending, WaitMode::Strict)
            .await?;
        match response {
            Pdu::DataSmResp(resp) => Ok(resp.message_id),
            other => Err(SmppError::InvalidResponse(format!(
                "expected data_sm_resp, got {:?}",
                other.command_id()
            ))),
        }
    }

    /// Notify the peer that a previously unavailable subscriber is
    /// reachable again. alert_notification has no response; this returns as
    /// soon as the PDU is written.
    pub async fn alert_notification(&self, mut alert: AlertNotification) -> SmppResult<()> {
        self.require_delivery("alert_notification")?;
        alert.validate()?;

        alert.sequence_number = self.core.pending.next_sequence();
        self.core.send(&Pdu::AlertNotification(alert)).await?;
        Ok(())
    }

    /// Probe the link with an enquire_link and wait for the answer.
    pub async fn enquire_link(&self) -> SmppResult<()> {
        self.core.ping(WaitMode::Strict).await
    }

    /// Unbind gracefully, then close the connection.
    ///
    /// As on the client side, the transition to `Unbound` does not wait for
    /// the peer: a missing or negative unbind_resp is logged, not returned.
    pub async fn unbind_and_close(self) -> SmppResult<()> {
        let state = self.core.state.current();
        if !state.is_bound() {
            self.core.close().await;
            return Err(SmppError::ProtocolState {
                state,
                operation: "unbind",
            });
        }

        let pending = self.core.pending.add(CommandId::UnbindResp);
        let unbind = Pdu::Unbind(Unbind::new(pending.sequence()));

        let wait = self.core.request(unbind, pending, WaitMode::Lenient).await;
        self.core.state.transition(SessionState::Unbound);
        if let Err(e) = wait {
            warn!(error = %e, "unbind completed without a clean response");
        }

        self.core.close().await;
        Ok(())
    }

    /// Tear the session down immediately, without the unbind handshake.
    pub async fn close(self) {
        self.core.close().await;
    }
}

impl Drop for SmscSession {
    fn drop(&mut self) {
        self.core.close_sync();
    }
}
