// ABOUTME: This module gathers the SMPP v3.4 domain types shared by the codec and session layers
// ABOUTME: Each submodule covers one operation family or a cross-cutting wire concept

mod address;
mod alert_notification;
mod bind;
mod cancel_sm;
mod command_id;
mod command_status;
mod data_sm;
mod deliver_sm;
mod query_sm;
mod replace_sm;
mod simple;
mod submit_sm;
mod tlv;

pub use address::{InterfaceVersion, NumericPlanIndicator, TypeOfNumber};
pub use alert_notification::{AlertNotification, MsAvailabilityStatus};
pub use bind::{Bind, BindResponse, BindType, Outbind};
pub use cancel_sm::{CancelSm, CancelSmResponse};
pub use command_id::{CommandId, RESPONSE_BIT};
pub use command_status::CommandStatus;
pub use data_sm::{DataSm, DataSmBuilder, DataSmResponse};
pub use deliver_sm::{DeliverSm, DeliverSmBuilder, DeliverSmResponse};
pub use query_sm::{MessageState, QuerySm, QuerySmResponse};
pub use replace_sm::{ReplaceSm, ReplaceSmResponse};
pub use simple::{EnquireLink, EnquireLinkResponse, GenericNack, Unbind, UnbindResponse};
pub use submit_sm::{SubmitSm, SubmitSmBuilder, SubmitSmResponse, MAX_SHORT_MESSAGE_LEN};
pub use tlv::{tags, Tlv};
