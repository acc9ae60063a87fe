// ABOUTME: The ESME (client) session façade: connect-and-bind plus the blocking operation surface
// ABOUTME: Also implements the outbound-accept path where the SMSC dials in and invites a bind

use crate::codec::Pdu;
use crate::connection::{split, FrameReader, ReadError};
use crate::datatypes::{
    Bind, BindType, CancelSm, CommandId, DataSm, InterfaceVersion, NumericPlanIndicator, Outbind,
    QuerySm, ReplaceSm, SubmitSm, TypeOfNumber,
};
use crate::session::error::{SmppError, SmppResult};
use crate::session::handler::{DeliveryHandler, MessageStatus, NullDeliveryHandler};
use crate::session::pending::WaitMode;
use crate::session::state::{SessionRole, SessionState, SessionStateListener};
use crate::session::{HandlerKind, SessionConfig, SessionCore};
use std::sync::Arc;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::{info, warn};

/// Credentials and addressing for the bind handshake.
#[derive(Debug, Clone)]
pub struct BindCredentials {
    pub system_id: String,
    pub password: Option<String>,
    pub system_type: String,
    pub bind_type: BindType,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

impl BindCredentials {
    /// Credentials for a transmitter bind.
    pub fn transmitter(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(system_id, password, BindType::Transmitter)
    }

    /// Credentials for a receiver bind.
    pub fn receiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(system_id, password, BindType::Receiver)
    }

    /// Credentials for a transceiver bind.
    pub fn transceiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(system_id, password, BindType::Transceiver)
    }

    fn new(system_id: impl Into<String>, password: impl Into<String>, bind_type: BindType) -> Self {
        Self {
            system_id: system_id.into(),
            password: Some(password.into()),
            system_type: String::new(),
            bind_type,
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_address_range(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        range: impl Into<String>,
    ) -> Self {
        self.addr_ton = ton;
        self.addr_npi = npi;
        self.address_range = range.into();
        self
    }

    fn into_bind(self, sequence_number: u32) -> Bind {
        Bind {
            command_status: crate::datatypes::CommandStatus::Ok,
            sequence_number,
            bind_type: self.bind_type,
            system_id: self.system_id,
            password: self.password,
            system_type: self.system_type,
            interface_version: self.interface_version,
            addr_ton: self.addr_ton,
            addr_npi: self.addr_npi,
            address_range: self.address_range,
        }
    }
}

/// Configures and establishes an [`EsmeSession`].
pub struct EsmeSessionBuilder {
    credentials: BindCredentials,
    config: SessionConfig,
    handler: Arc<dyn DeliveryHandler>,
    listener: Option<Arc<dyn SessionStateListener>>,
}

impl EsmeSessionBuilder {
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Callback for unsolicited inbound traffic (deliver_sm, data_sm,
    /// alert_notification). Required for receiver and transceiver binds to
    /// be useful; a transmitter-only session can leave the default in place.
    pub fn with_handler(mut self, handler: Arc<dyn DeliveryHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_state_listener(mut self, listener: Arc<dyn SessionStateListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Connect to the SMSC and perform the bind handshake.
    ///
    /// On any failure the connection is torn down and nothing is left
    /// running.
    pub async fn connect_and_bind(self, addr: impl ToSocketAddrs) -> SmppResult<EsmeSession> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?;
        let (reader, writer) = split(stream);

        let core = SessionCore::new(
            SessionRole::Esme,
            SessionState::Open,
            peer,
            self.config,
            HandlerKind::Esme(self.handler),
            self.listener,
            writer,
            None,
        );

        EsmeSession::bind_handshake(core, reader, self.credentials).await
    }

    /// Take over a connection the SMSC initiated (the outbound variant) and
    /// wait for its `outbind` invitation.
    ///
    /// Returns the decoded invitation alongside a half-established session;
    /// verify the invitation's credentials, then call
    /// [`OutboundSession::bind`] to complete the handshake.
    pub async fn accept_outbound(
        self,
        stream: TcpStream,
    ) -> SmppResult<(Outbind, OutboundSession)> {
        let peer = stream.peer_addr()?;
        let (mut reader, writer) = split(stream);

        let core = SessionCore::new(
            SessionRole::Esme,
            SessionState::Outbound,
            peer,
            self.config,
            HandlerKind::Esme(self.handler),
            self.listener,
            writer,
            None,
        );

        let outbind = match timeout(core.config.bind_timer, reader.read_pdu()).await {
            Err(_elapsed) => {
                core.close().await;
                return Err(SmppError::Timeout);
            }
            Ok(Err(e)) => {
                core.close().await;
                return Err(read_error(e));
            }
            Ok(Ok(None)) => {
                core.close().await;
                return Err(SmppError::Closed);
            }
            Ok(Ok(Some(Pdu::Outbind(outbind)))) => outbind,
            Ok(Ok(Some(other))) => {
                core.close().await;
                return Err(SmppError::InvalidResponse(format!(
                    "expected outbind, got {:?}",
                    other.command_id()
                )));
            }
        };

        info!(system_id = %outbind.system_id, peer = %peer, "outbind invitation received");
        core.state.transition(SessionState::Open);

        Ok((
            outbind,
            OutboundSession {
                core,
                reader,
                credentials: self.credentials,
            },
        ))
    }
}

/// An outbound connection past its `outbind` invitation, awaiting the bind.
pub struct OutboundSession {
    core: Arc<SessionCore>,
    reader: FrameReader,
    credentials: BindCredentials,
}

impl OutboundSession {
    /// Complete the handshake with the credentials the builder was given.
    pub async fn bind(self) -> SmppResult<EsmeSession> {
        EsmeSession::bind_handshake(self.core, self.reader, self.credentials).await
    }

    /// Decline the invitation and drop the connection.
    pub async fn close(self) {
        self.core.close().await;
    }
}

/// A bound client session.
///
/// All operations are callable concurrently from multiple tasks: each
/// reserves its own sequence number and waits on its own pending entry, so
/// responses arriving out of order resolve independently.
pub struct EsmeSession {
    core: Arc<SessionCore>,
    peer_system_id: String,
}

impl std::fmt::Debug for EsmeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsmeSession")
            .field("peer_system_id", &self.peer_system_id)
            .finish_non_exhaustive()
    }
}

impl EsmeSession {
    /// Start configuring a client session.
    pub fn builder(credentials: BindCredentials) -> EsmeSessionBuilder {
        EsmeSessionBuilder {
            credentials,
            config: SessionConfig::default(),
            handler: Arc::new(NullDeliveryHandler),
            listener: None,
        }
    }

    /// Start the loops, send the bind and wait for its response through the
    /// pending table, exactly like any later request. On success the state
    /// moves to the bound flavour; on failure the session is torn down.
    async fn bind_handshake(
        core: Arc<SessionCore>,
        reader: FrameReader,
        credentials: BindCredentials,
    ) -> SmppResult<EsmeSession> {
        // The reader must be running before the bind goes out so the
        // response has somewhere to land
        core.spawn_loops(reader);

        let bind_type = credentials.bind_type;
        let pending = core.pending.add(bind_type.response_command_id());
        let sequence = pending.sequence();
        let bind = credentials.into_bind(sequence);

        if let Err(e) = core.send(&Pdu::Bind(bind)).await {
            core.pending.remove(sequence);
            core.close().await;
            return Err(SmppError::Connection(e));
        }

        let resolved = match core
            .pending
            .wait(pending, core.config.bind_timer, WaitMode::Strict)
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                core.close().await;
                return Err(e);
            }
        };

        let bind_resp = match resolved {
            Pdu::BindResp(resp) => resp,
            other => {
                core.close().await;
                return Err(SmppError::InvalidResponse(format!(
                    "expected bind response, got {:?}",
                    other.command_id()
                )));
            }
        };

        info!(
            system_id = %bind_resp.system_id,
            ?bind_type,
            "bound to SMSC"
        );
        // Normally a no-op: the reader already moved to the bound state when
        // it matched the response
        core.state.transition(SessionState::bound_for(bind_type));

        Ok(EsmeSession {
            core,
            peer_system_id: bind_resp.system_id,
        })
    }

    /// The system_id the SMSC identified itself with in its bind response.
    pub fn peer_system_id(&self) -> &str {
        &self.peer_system_id
    }

    pub fn state(&self) -> SessionState {
        self.core.state.current()
    }

    fn require_transmit(&self, operation: &'static str) -> SmppResult<()> {
        let state = self.core.state.current();
        match state {
            SessionState::BoundTx | SessionState::BoundTrx => Ok(()),
            _ => Err(SmppError::ProtocolState { state, operation }),
        }
    }

    /// Submit a short message. Returns the message_id the SMSC assigned.
    pub async fn submit_sm(&self, mut submit: SubmitSm) -> SmppResult<String> {
        self.require_transmit("submit_sm")?;
        submit.validate()?;

        let pending = self.core.pending.add(CommandId::SubmitSmResp);
        submit.sequence_number = pending.sequence();

        let response = self
            .core
            .request(Pdu::SubmitSm(Box::new(submit)), pending, WaitMode::Strict)
            .await?;
        match response {
            Pdu::SubmitSmResp(resp) => Ok(resp.message_id),
            other => Err(SmppError::InvalidResponse(format!(
                "expected submit_sm_resp, got {:?}",
                other.command_id()
            ))),
        }
    }

    /// Query the state of a previously submitted message.
    pub async fn query_sm(&self, mut query: QuerySm) -> SmppResult<MessageStatus> {
        self.require_transmit("query_sm")?;
        query.validate()?;

        let requested_id = query.message_id.clone();
        let pending = self.core.pending.add(CommandId::QuerySmResp);
        query.sequence_number = pending.sequence();

        let response = self
            .core
            .request(Pdu::QuerySm(query), pending, WaitMode::Strict)
            .await?;
        match response {
            Pdu::QuerySmResp(resp) => {
                if resp.message_id != requested_id {
                    return Err(SmppError::InvalidResponse(format!(
                        "query_sm_resp names message '{}', queried '{}'",
                        resp.message_id, requested_id
                    )));
                }
                Ok(MessageStatus {
                    message_id: resp.message_id,
                    final_date: resp.final_date,
                    message_state: resp.message_state,
                    error_code: resp.error_code,
                })
            }
            other => Err(SmppError::InvalidResponse(format!(
                "expected query_sm_resp, got {:?}",
                other.command_id()
            ))),
        }
    }

    /// Cancel one or more previously submitted messages.
    pub async fn cancel_sm(&self, mut cancel: CancelSm) -> SmppResult<()> {
        self.require_transmit("cancel_sm")?;
        cancel.validate()?;

        let pending = self.core.pending.add(CommandId::CancelSmResp);
        cancel.sequence_number = pending.sequence();

        self.core
            .request(Pdu::CancelSm(cancel), pending, WaitMode::Strict)
            .await?;
        Ok(())
    }

    /// Replace a previously submitted message.
    pub async fn replace_sm(&self, mut replace: ReplaceSm) -> SmppResult<()> {
        self.require_transmit("replace_sm")?;
        replace.validate()?;

        let pending = self.core.pending.add(CommandId::ReplaceSmResp);
        replace.sequence_number = pending.sequence();

        self.core
            .request(Pdu::ReplaceSm(replace), pending, WaitMode::Strict)
            .await?;
        Ok(())
    }

    /// Send a data_sm. Returns the message_id from the response.
    pub async fn data_sm(&self, mut data: DataSm) -> SmppResult<String> {
        self.require_transmit("data_sm")?;
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

    /// Probe the link with an enquire_link and wait for the answer.
    pub async fn enquire_link(&self) -> SmppResult<()> {
        self.core.ping(WaitMode::Strict).await
    }

    /// Unbind gracefully, then close the connection.
    ///
    /// The transition to `Unbound` happens whether or not the peer answers
    /// the unbind: a missing or negative unbind_resp is logged, never an
    /// error, because local teardown must not depend on the peer's manners.
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
        let unbind = Pdu::Unbind(crate::datatypes::Unbind::new(pending.sequence()));

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

fn read_error(e: ReadError) -> SmppError {
    match e {
        ReadError::Framing(c) => SmppError::Framing(c),
        ReadError::Malformed { source, .. } => SmppError::Framing(source),
        ReadError::Io(e) => SmppError::Connection(e),
    }
}

impl Drop for EsmeSession {
    fn drop(&mut self) {
        // Stops the loops if the session is dropped without an explicit
        // unbind_and_close/close; the writer is flushed only on the async
        // paths
        self.core.close_sync();
    }
}
