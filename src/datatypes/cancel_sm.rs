// ABOUTME: Implements SMPP v3.4 cancel_sm and cancel_sm_resp PDUs for message cancellation
// ABOUTME: Cancels a previously submitted message that is still pending delivery

use crate::codec::{
    check_cstring, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber};
use crate::macros::impl_complete_header_only_pdu;
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.9.1)
const SERVICE_TYPE_LEN: usize = 6;
const MESSAGE_ID_LEN: usize = 65;
const ADDR_LEN: usize = 21;

/// The cancel_sm operation cancels one or more previously submitted messages
/// that are still pending delivery. A specific message is addressed by
/// message_id; when message_id is NULL, all messages matching source,
/// destination and service_type are cancelled.
#[derive(Clone, Debug, PartialEq)]
pub struct CancelSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.9.1 service_type: Set to match the original message when cancelling
    ///       by address.
    pub service_type: String,

    /// 4.9.1 message_id: The message to cancel, or NULL to cancel by
    ///       address match.
    pub message_id: String,

    /// 4.9.1 source_addr_ton: Must match the original submit_sm.
    pub source_addr_ton: TypeOfNumber,

    /// 4.9.1 source_addr_npi: Must match the original submit_sm.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.9.1 source_addr: Must match the original submit_sm.
    pub source_addr: String,

    /// 4.9.1 dest_addr_ton: Destination of the message(s) to cancel.
    pub dest_addr_ton: TypeOfNumber,

    /// 4.9.1 dest_addr_npi: Destination of the message(s) to cancel.
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.9.1 destination_addr: Destination of the message(s) to cancel.
    pub destination_addr: String,
}

impl CancelSm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence_number: u32,
        service_type: impl Into<String>,
        message_id: impl Into<String>,
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        source_addr: impl Into<String>,
        dest_addr_ton: TypeOfNumber,
        dest_addr_npi: NumericPlanIndicator,
        destination_addr: impl Into<String>,
    ) -> Result<Self, CodecError> {
        let pdu = CancelSm {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: service_type.into(),
            message_id: message_id.into(),
            source_addr_ton,
            source_addr_npi,
            source_addr: source_addr.into(),
            dest_addr_ton,
            dest_addr_npi,
            destination_addr: destination_addr.into(),
        };

        pdu.validate()?;
        Ok(pdu)
    }

    /// Cancel one specific message by its message_id.
    pub fn by_message_id(
        sequence_number: u32,
        message_id: impl Into<String>,
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        source_addr: impl Into<String>,
    ) -> Result<Self, CodecError> {
        Self::new(
            sequence_number,
            "",
            message_id,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            TypeOfNumber::Unknown,
            NumericPlanIndicator::Unknown,
            "",
        )
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        check_cstring(&self.message_id, MESSAGE_ID_LEN, "message_id")?;
        check_cstring(&self.source_addr, ADDR_LEN, "source_addr")?;
        check_cstring(&self.destination_addr, ADDR_LEN, "destination_addr")?;
        Ok(())
    }
}

impl Decodable for CancelSm {
    fn command_id() -> CommandId {
        CommandId::CancelSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let service_type = decode_cstring(buf, SERVICE_TYPE_LEN, "service_type")?;
        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let source_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, ADDR_LEN, "source_addr")?;
        let dest_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let dest_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let destination_addr = decode_cstring(buf, ADDR_LEN, "destination_addr")?;

        Ok(CancelSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type,
            message_id,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
        })
    }
}

impl Encodable for CancelSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::CancelSm,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.service_type);
        encode_cstring(buf, &self.message_id);
        buf.put_u8(u8::from(self.source_addr_ton));
        buf.put_u8(u8::from(self.source_addr_npi));
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(u8::from(self.dest_addr_ton));
        buf.put_u8(u8::from(self.dest_addr_npi));
        encode_cstring(buf, &self.destination_addr);

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.service_type.len()
            + 1
            + self.message_id.len()
            + 1
            + 2
            + self.source_addr.len()
            + 1
            + 2
            + self.destination_addr.len()
            + 1
    }
}

/// Acknowledgement of a cancel_sm request. The body is empty; success or
/// failure travels in command_status.
#[derive(Clone, Debug, PartialEq)]
pub struct CancelSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(CancelSmResponse, CommandId::CancelSmResp);
