// ABOUTME: User-supplied callbacks invoked from the reader loop for unsolicited inbound requests
// ABOUTME: One trait per role, plus the error type that maps a rejection to a negative response

use crate::datatypes::{
    AlertNotification, CancelSm, CommandStatus, DataSm, DeliverSm, MessageState, QuerySm,
    ReplaceSm, SubmitSm,
};
use async_trait::async_trait;
use thiserror::Error;

/// Signals that a request callback rejects the request. The session answers
/// the peer with a negative response carrying this status; the error never
/// reaches the wire as anything else and never crashes the reader loop.
#[derive(Debug, Error)]
#[error("request rejected with status {status:?}")]
pub struct ProcessRequestError {
    pub status: CommandStatus,
}

impl ProcessRequestError {
    pub fn new(status: CommandStatus) -> Self {
        Self { status }
    }
}

/// The state of a message as reported by query_sm.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageStatus {
    pub message_id: String,
    /// Absolute time the message reached a final state, SMPP time format.
    /// `None` while the message is still in flight.
    pub final_date: Option<String>,
    pub message_state: MessageState,
    /// Network-specific error code; 0 when not applicable.
    pub error_code: u8,
}

/// Client-side callbacks for traffic the SMSC pushes to a bound receiver.
///
/// Invoked synchronously from the reader loop; the matching response is sent
/// as soon as the callback returns. Long-running work belongs in a task of
/// the implementor's own.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    /// A deliver_sm arrived: a mobile-originated message or a delivery
    /// receipt. The default accepts silently, for transmitter-only sessions
    /// that never see one.
    async fn on_deliver_sm(&self, _deliver: DeliverSm) -> Result<(), ProcessRequestError> {
        Ok(())
    }

    /// A data_sm arrived. Returns the message_id to acknowledge with.
    async fn on_data_sm(&self, _data: DataSm) -> Result<String, ProcessRequestError> {
        Ok(String::new())
    }

    /// An alert_notification arrived. The protocol defines no response for
    /// it, so there is nothing to return.
    async fn on_alert_notification(&self, _alert: AlertNotification) {}
}

/// A handler that accepts and discards everything. Suitable for
/// transmitter-only clients.
pub struct NullDeliveryHandler;

#[async_trait]
impl DeliveryHandler for NullDeliveryHandler {}

/// Server-side callbacks for requests a bound ESME sends.
///
/// Only [`on_submit_sm`](Self::on_submit_sm) must be implemented; the
/// ancillary operations default to the operation-specific failure status, so
/// a store-less SMSC remains protocol-correct.
#[async_trait]
pub trait SmscHandler: Send + Sync {
    /// A submit_sm arrived. Returns the message_id assigned to the message.
    async fn on_submit_sm(&self, submit: SubmitSm) -> Result<String, ProcessRequestError>;

    /// A data_sm arrived. Returns the message_id to acknowledge with.
    async fn on_data_sm(&self, _data: DataSm) -> Result<String, ProcessRequestError> {
        Ok(String::new())
    }

    /// A query_sm arrived. Returns the current status of the queried
    /// message.
    async fn on_query_sm(&self, _query: QuerySm) -> Result<MessageStatus, ProcessRequestError> {
        Err(ProcessRequestError::new(CommandStatus::QueryFailed))
    }

    /// A cancel_sm arrived.
    async fn on_cancel_sm(&self, _cancel: CancelSm) -> Result<(), ProcessRequestError> {
        Err(ProcessRequestError::new(CommandStatus::CancelSmFailed))
    }

    /// A replace_sm arrived.
    async fn on_replace_sm(&self, _replace: ReplaceSm) -> Result<(), ProcessRequestError> {
        Err(ProcessRequestError::new(CommandStatus::ReplaceSmFailed))
    }
}
