// ABOUTME: The session state machine: states, the receive-legality table, and serialized transitions
// ABOUTME: One table-driven dispatch shared by every role instead of per-state strategy objects

use crate::datatypes::{BindType, CommandId, CommandStatus};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::info;

/// The states an SMPP session moves through.
///
/// `Open → Bound* → Unbound → Closed` is the canonical path; outbound
/// sessions additionally begin at `Outbound` and reach `Open` once the
/// reversed handshake completes. `Closed` is terminal and reachable from
/// every state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Outbound session awaiting the reversed handshake: the ESME side waits
    /// for `outbind`, the SMSC side has sent it and waits for `bind`.
    Outbound,
    /// TCP connected, bind handshake not yet complete.
    Open,
    /// Bound as transmitter.
    BoundTx,
    /// Bound as receiver.
    BoundRx,
    /// Bound as transceiver.
    BoundTrx,
    /// Unbind handshake completed; only teardown remains.
    Unbound,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Whether the bind handshake has completed and message traffic may flow.
    pub fn is_bound(self) -> bool {
        matches!(
            self,
            SessionState::BoundTx | SessionState::BoundRx | SessionState::BoundTrx
        )
    }

    /// Whether this state accepts no further PDUs at all.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Unbound | SessionState::Closed)
    }

    /// The bound state a successful bind of the given flavour selects.
    pub fn bound_for(bind_type: BindType) -> SessionState {
        match bind_type {
            BindType::Transmitter => SessionState::BoundTx,
            BindType::Receiver => SessionState::BoundRx,
            BindType::Transceiver => SessionState::BoundTrx,
        }
    }
}

/// Which end of the protocol this session plays.
///
/// The receive-legality table is parameterized by role: the same command is
/// a request from one side and an impossibility from the other.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionRole {
    /// Client: submits messages, receives deliveries.
    Esme,
    /// Server: receives submissions, pushes deliveries.
    Smsc,
}

/// Identifies a session to observers without handing them the session itself.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub role: SessionRole,
    pub peer: SocketAddr,
}

/// Observer of session state transitions.
///
/// Invoked synchronously inside the serialized transition section, so
/// callbacks observe transitions in their true total order. Keep them quick.
pub trait SessionStateListener: Send + Sync {
    fn on_state_change(&self, new: SessionState, old: SessionState, session: &SessionIdentity);
}

/// What the reader loop must do with an inbound PDU, given the current state.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InboundAction {
    /// Legal: decode-and-process, answering requests and resolving the
    /// pending table for responses.
    Handle,
    /// Illegal here: answer the request with this negative status. Never
    /// used for responses.
    Reject(CommandStatus),
    /// Receiving anything in a terminal state is a connection-fatal
    /// condition; tear the session down.
    Fatal,
}

/// The receive-legality table, the heart of the state machine.
///
/// One pure function over (state, role, command_id) replaces the per-state
/// handler classes of classic SMPP stacks: every (state, command) cell of
/// the protocol's legality matrix is a `match` arm here.
pub(crate) fn inbound_action(
    state: SessionState,
    role: SessionRole,
    id: CommandId,
) -> InboundAction {
    use CommandId::*;
    use InboundAction::*;
    use SessionRole::*;
    use SessionState::*;

    // Terminal states reject everything, responses included
    if state.is_terminal() {
        return Fatal;
    }

    // Unlisted command ids are always answered generic_nack
    if let Other(_) = id {
        return Reject(CommandStatus::InvalidCommandId);
    }

    // Responses (generic_nack included) are routed to the pending table in
    // every live state; a stray one is the resolver's problem, not a
    // state-machine violation.
    if id.is_response() {
        return Handle;
    }

    match id {
        BindTransmitter | BindReceiver | BindTransceiver => match (role, state) {
            // A server accepts a bind while open, or while awaiting the
            // reversed handshake it initiated with outbind
            (Smsc, Open) | (Smsc, Outbound) => Handle,
            (Smsc, _) => Reject(CommandStatus::AlreadyBound),
            (Esme, _) => Reject(CommandStatus::IncorrectBindStatus),
        },

        Outbind => match (role, state) {
            (Esme, Outbound) => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        Unbind => match state {
            BoundTx | BoundRx | BoundTrx => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        EnquireLink => match state {
            BoundTx | BoundRx | BoundTrx => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        SubmitSm => match (role, state) {
            (Smsc, BoundTx) | (Smsc, BoundTrx) => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        DeliverSm => match (role, state) {
            (Esme, BoundRx) | (Esme, BoundTrx) => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        DataSm => match (role, state) {
            (Smsc, BoundTx) | (Smsc, BoundTrx) => Handle,
            (Esme, BoundRx) | (Esme, BoundTrx) => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        QuerySm | CancelSm | ReplaceSm => match (role, state) {
            (Smsc, BoundTx) | (Smsc, BoundTrx) => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        AlertNotification => match (role, state) {
            (Esme, BoundRx) | (Esme, BoundTrx) => Handle,
            _ => Reject(CommandStatus::IncorrectBindStatus),
        },

        // Requests covered above; remaining ids are all responses
        _ => Handle,
    }
}

/// Holder of the one active state, with serialized transitions.
///
/// Transitions take a lock, swap the state, and invoke the listener before
/// releasing it, so concurrent transition attempts observe a consistent
/// total order. `Closed` is terminal: once reached, further transitions are
/// ignored.
pub(crate) struct StateCell {
    state: Mutex<SessionState>,
    listener: Option<Arc<dyn SessionStateListener>>,
    identity: SessionIdentity,
}

impl StateCell {
    pub(crate) fn new(
        initial: SessionState,
        identity: SessionIdentity,
        listener: Option<Arc<dyn SessionStateListener>>,
    ) -> Self {
        Self {
            state: Mutex::new(initial),
            listener,
            identity,
        }
    }

    pub(crate) fn current(&self) -> SessionState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Move to `new`, returning the previous state. A no-op once `Closed`,
    /// and when `new` equals the current state.
    pub(crate) fn transition(&self, new: SessionState) -> SessionState {
        let mut guard = self.state.lock().expect("state lock poisoned");
        let old = *guard;
        if old == SessionState::Closed || old == new {
            return old;
        }
        *guard = new;
        info!(?old, ?new, role = ?self.identity.role, peer = %self.identity.peer, "session state change");
        if let Some(ref listener) = self.listener {
            listener.on_state_change(new, old, &self.identity);
        }
        old
    }
}
