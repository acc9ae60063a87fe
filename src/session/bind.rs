// ABOUTME: The single-shot rendezvous handing an inbound bind request to user code
// ABOUTME: BindRequest consumes itself on accept/reject, making a second decision unrepresentable

use crate::codec::Pdu;
use crate::datatypes::{Bind, BindResponse, CommandStatus, InterfaceVersion};
use crate::session::error::{SmppError, SmppResult};
use crate::session::state::SessionState;
use crate::session::SessionCore;
use std::sync::Arc;
use tracing::info;

/// An inbound bind request awaiting the server's decision.
///
/// Produced by the reader loop when a bind PDU arrives in a state that
/// accepts one, and handed to user code via
/// [`SmscSession::wait_for_bind`](crate::session::SmscSession::wait_for_bind).
/// `accept` and `reject` take the request by value: exactly one of them can
/// ever run, exactly once.
pub struct BindRequest {
    pub(crate) core: Arc<SessionCore>,
    pub(crate) bind: Bind,
}

impl BindRequest {
    /// The decoded bind parameters: credentials, bind flavour, addressing.
    pub fn bind(&self) -> &Bind {
        &self.bind
    }

    /// Accept the bind: send a successful response carrying `system_id` and
    /// drive the session into the corresponding bound state.
    ///
    /// For a session that initiated the reversed handshake the transition
    /// passes through `Open` on its way to the bound state, so a state
    /// listener observes the canonical path.
    pub async fn accept(self, system_id: &str) -> SmppResult<()> {
        let response = BindResponse::new(self.bind.bind_type, self.bind.sequence_number, system_id)
            .with_sc_interface_version(InterfaceVersion::SmppV34);
        response.validate()?;

        if let Err(e) = self.core.send(&Pdu::BindResp(response)).await {
            self.core.close().await;
            return Err(SmppError::Connection(e));
        }

        if self.core.state.current() == SessionState::Outbound {
            self.core.state.transition(SessionState::Open);
        }
        self.core
            .state
            .transition(SessionState::bound_for(self.bind.bind_type));

        info!(
            system_id = %self.bind.system_id,
            bind_type = ?self.bind.bind_type,
            "bind accepted"
        );
        Ok(())
    }

    /// Reject the bind with the given status. The session state is left
    /// unchanged; the peer may retry until its bind timer expires.
    pub async fn reject(self, status: CommandStatus) -> SmppResult<()> {
        let response = BindResponse::error(self.bind.bind_type, self.bind.sequence_number, status);

        if let Err(e) = self.core.send(&Pdu::BindResp(response)).await {
            self.core.close().await;
            return Err(SmppError::Connection(e));
        }

        info!(
            system_id = %self.bind.system_id,
            ?status,
            "bind rejected"
        );
        Ok(())
    }
}
