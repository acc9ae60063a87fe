// ABOUTME: This module implements the header-only link management PDUs
// ABOUTME: Covers enquire_link, unbind, their responses, and generic_nack

use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_complete_header_only_pdu;

/// Liveness probe sent by either peer on an otherwise idle link.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLink, CommandId::EnquireLink);

/// Reply to an enquire_link probe.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);

/// Graceful teardown request. Either peer may initiate it from any bound
/// state.
#[derive(Clone, Debug, PartialEq)]
pub struct Unbind {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(Unbind, CommandId::Unbind);

/// Reply to an unbind request.
#[derive(Clone, Debug, PartialEq)]
pub struct UnbindResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(UnbindResponse, CommandId::UnbindResp);

/// Catch-all negative acknowledgement for frames whose command_id is
/// unrecognized or whose header cannot be parsed.
///
/// When the offending sequence number cannot be recovered, the reserved
/// value 0 is sent in its place.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(GenericNack, CommandId::GenericNack);
