// ABOUTME: Implements SMPP v3.4 query_sm and query_sm_resp PDUs for message status queries
// ABOUTME: Provides status query functionality per specification Section 4.8

use crate::codec::{
    check_cstring, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber};
use bytes::{Buf, BufMut, BytesMut};
use num_enum::{FromPrimitive, IntoPrimitive};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.8.1)
const MESSAGE_ID_LEN: usize = 65;
const ADDR_LEN: usize = 21;
const FINAL_DATE_LEN: usize = 17;

/// The query_sm operation is used by an ESME to query the state of a
/// previously submitted short message. Messages are matched on the
/// message_id and source_addr of the original submit_sm.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.8.1 message_id: The message_id returned by the original
    ///       submit_sm_resp.
    pub message_id: String,

    /// 4.8.1 source_addr_ton: Must match the original submit_sm.
    pub source_addr_ton: TypeOfNumber,

    /// 4.8.1 source_addr_npi: Must match the original submit_sm.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.8.1 source_addr: Must match the original submit_sm, NULL included.
    pub source_addr: String,
}

impl QuerySm {
    pub fn new(
        sequence_number: u32,
        message_id: impl Into<String>,
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        source_addr: impl Into<String>,
    ) -> Result<Self, CodecError> {
        let pdu = QuerySm {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
            source_addr_ton,
            source_addr_npi,
            source_addr: source_addr.into(),
        };

        pdu.validate()?;
        Ok(pdu)
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.message_id, MESSAGE_ID_LEN, "message_id")?;
        check_cstring(&self.source_addr, ADDR_LEN, "source_addr")?;
        Ok(())
    }
}

impl Decodable for QuerySm {
    fn command_id() -> CommandId {
        CommandId::QuerySm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let source_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, ADDR_LEN, "source_addr")?;

        Ok(QuerySm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            source_addr_ton,
            source_addr_npi,
            source_addr,
        })
    }
}

impl Encodable for QuerySm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::QuerySm,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.message_id);
        buf.put_u8(u8::from(self.source_addr_ton));
        buf.put_u8(u8::from(self.source_addr_npi));
        encode_cstring(buf, &self.source_addr);

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE + self.message_id.len() + 1 + 2 + self.source_addr.len() + 1
    }
}

/// Message state values for query_sm_resp (section 4.8.2, Table 4-20)
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageState {
    /// The message is in enroute state
    Enroute = 0x01,
    /// Message is delivered to destination
    Delivered = 0x02,
    /// Message validity period has expired
    Expired = 0x03,
    /// Message has been deleted
    Deleted = 0x04,
    /// Message is undeliverable
    Undeliverable = 0x05,
    /// Message is in accepted state
    Accepted = 0x06,
    /// Message is in unknown state
    Unknown = 0x07,
    /// Message was rejected
    Rejected = 0x08,

    #[num_enum(catch_all)]
    Other(u8),
}

impl MessageState {
    /// Whether the message can no longer change state.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            MessageState::Delivered
                | MessageState::Expired
                | MessageState::Deleted
                | MessageState::Undeliverable
                | MessageState::Rejected
        )
    }
}

/// The query_sm_resp PDU returns the current state of a queried message.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.8.2 message_id: Echoes the message_id of the original query_sm.
    pub message_id: String,

    /// 4.8.2 final_date: Date and time the message reached a final state, in
    ///       YYMMDDhhmm format. NULL while the message is still in transit.
    pub final_date: Option<String>,

    /// 4.8.2 message_state: Current state of the queried message.
    pub message_state: MessageState,

    /// 4.8.2 error_code: Network-specific error code, 0 if not applicable.
    pub error_code: u8,
}

impl QuerySmResponse {
    pub fn new(
        sequence_number: u32,
        message_id: impl Into<String>,
        final_date: Option<String>,
        message_state: MessageState,
        error_code: u8,
    ) -> Result<Self, CodecError> {
        let pdu = QuerySmResponse {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
            final_date,
            message_state,
            error_code,
        };

        pdu.validate()?;
        Ok(pdu)
    }

    /// Create a rejection carrying only the error status.
    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
            final_date: None,
            message_state: MessageState::Unknown,
            error_code: 0,
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.message_id, MESSAGE_ID_LEN, "message_id")?;
        if let Some(ref final_date) = self.final_date {
            check_cstring(final_date, FINAL_DATE_LEN, "final_date")?;
        }
        Ok(())
    }
}

impl Decodable for QuerySmResponse {
    fn command_id() -> CommandId {
        CommandId::QuerySmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        if !buf.has_remaining() && !header.command_status.is_ok() {
            return Ok(Self::error(header.sequence_number, header.command_status));
        }

        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let final_date = match decode_cstring(buf, FINAL_DATE_LEN, "final_date")? {
            d if d.is_empty() => None,
            d => Some(d),
        };
        let message_state = MessageState::from(decode_u8(buf)?);
        let error_code = decode_u8(buf)?;

        Ok(QuerySmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            final_date,
            message_state,
            error_code,
        })
    }
}

impl Encodable for QuerySmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::QuerySmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.message_id);
        encode_cstring(buf, self.final_date.as_deref().unwrap_or(""));
        buf.put_u8(u8::from(self.message_state));
        buf.put_u8(self.error_code);

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.message_id.len()
            + 1
            + self.final_date.as_ref().map_or(0, String::len)
            + 1
            + 2
    }
}
