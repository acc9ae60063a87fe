// ABOUTME: The session-layer error taxonomy surfaced by every public operation
// ABOUTME: Distinguishes recoverable per-request failures from connection-fatal conditions

use crate::codec::CodecError;
use crate::datatypes::CommandStatus;
use crate::session::state::SessionState;
use std::io;
use thiserror::Error;

/// Errors surfaced by session operations.
///
/// `Timeout`, `NegativeResponse` and `InvalidResponse` are per-request and
/// recoverable; the session stays usable. `Connection`, `Framing` and
/// `Closed` are fatal to the session.
#[derive(Debug, Error)]
pub enum SmppError {
    /// No response arrived within the transaction timer. The pending entry
    /// has been cleanly removed; the session itself is still healthy.
    #[error("no response within the transaction timer")]
    Timeout,

    /// The peer answered with a non-zero command_status.
    #[error("peer rejected the request: {0:?}")]
    NegativeResponse(CommandStatus),

    /// A response arrived and decoded, but is not what the request expects:
    /// wrong command kind, mismatched message_id, or similar.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A local operation was attempted in a state that forbids it, e.g.
    /// submitting while bound receiver-only or binding twice.
    #[error("{operation} is not permitted in state {state:?}")]
    ProtocolState {
        state: SessionState,
        operation: &'static str,
    },

    /// The peer sent a frame whose length prefix cannot be trusted; byte
    /// boundaries are lost and the connection has been torn down.
    #[error("unrecoverable framing violation: {0}")]
    Framing(CodecError),

    /// A locally constructed PDU failed field validation before it was sent.
    #[error("invalid request field: {0}")]
    InvalidRequest(#[from] CodecError),

    /// Transport-level failure; the session has been closed.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The session was closed while the operation was in flight.
    #[error("session closed")]
    Closed,
}

/// Result alias used throughout the session layer.
pub type SmppResult<T> = Result<T, SmppError>;
