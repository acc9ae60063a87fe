// ABOUTME: Implements SMPP v3.4 replace_sm and replace_sm_resp PDUs
// ABOUTME: Replaces the text and delivery parameters of a previously submitted message

use crate::codec::{
    check_cstring, decode_bytes, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable,
    Encodable, PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber, MAX_SHORT_MESSAGE_LEN,
};
use crate::macros::impl_complete_header_only_pdu;
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.10.1)
const MESSAGE_ID_LEN: usize = 65;
const ADDR_LEN: usize = 21;
const TIME_LEN: usize = 17;

/// The replace_sm operation replaces a previously submitted message that is
/// still pending delivery. The message is matched on message_id and
/// source_addr.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplaceSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.10.1 message_id: The message to replace, as returned by the
    ///        original submit_sm_resp.
    pub message_id: String,

    /// 4.10.1 source_addr_ton: Must match the original submit_sm.
    pub source_addr_ton: TypeOfNumber,

    /// 4.10.1 source_addr_npi: Must match the original submit_sm.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.10.1 source_addr: Must match the original submit_sm.
    pub source_addr: String,

    /// 4.10.1 schedule_delivery_time: New delivery time, NULL to keep the
    ///        original.
    pub schedule_delivery_time: String,

    /// 4.10.1 validity_period: New expiry time, NULL to keep the original.
    pub validity_period: String,

    /// 4.10.1 registered_delivery: New receipt request bits.
    pub registered_delivery: u8,

    /// 4.10.1 sm_default_msg_id: New canned-message index, or 0.
    pub sm_default_msg_id: u8,

    /// 4.10.1 short_message: Replacement user data. The sm_length octet is
    ///        derived from this field at encode time.
    pub short_message: Bytes,
}

impl ReplaceSm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence_number: u32,
        message_id: impl Into<String>,
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        source_addr: impl Into<String>,
        registered_delivery: u8,
        short_message: impl Into<Bytes>,
    ) -> Result<Self, CodecError> {
        let pdu = ReplaceSm {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
            source_addr_ton,
            source_addr_npi,
            source_addr: source_addr.into(),
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery,
            sm_default_msg_id: 0,
            short_message: short_message.into(),
        };

        pdu.validate()?;
        Ok(pdu)
    }

    /// The value of the sm_length octet on the wire.
    pub fn sm_length(&self) -> u8 {
        self.short_message.len() as u8
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.message_id, MESSAGE_ID_LEN, "message_id")?;
        check_cstring(&self.source_addr, ADDR_LEN, "source_addr")?;
        check_cstring(
            &self.schedule_delivery_time,
            TIME_LEN,
            "schedule_delivery_time",
        )?;
        check_cstring(&self.validity_period, TIME_LEN, "validity_period")?;

        if self.short_message.len() > MAX_SHORT_MESSAGE_LEN {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!(
                    "{} octets exceeds maximum of {MAX_SHORT_MESSAGE_LEN}",
                    self.short_message.len()
                ),
            });
        }

        Ok(())
    }
}

impl Decodable for ReplaceSm {
    fn command_id() -> CommandId {
        CommandId::ReplaceSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let source_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, ADDR_LEN, "source_addr")?;
        let schedule_delivery_time = decode_cstring(buf, TIME_LEN, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, TIME_LEN, "validity_period")?;
        let registered_delivery = decode_u8(buf)?;
        let sm_default_msg_id = decode_u8(buf)?;
        let sm_length = decode_u8(buf)? as usize;
        let short_message = decode_bytes(buf, sm_length)?;

        Ok(ReplaceSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            sm_default_msg_id,
            short_message,
        })
    }
}

impl Encodable for ReplaceSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::ReplaceSm,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.message_id);
        buf.put_u8(u8::from(self.source_addr_ton));
        buf.put_u8(u8::from(self.source_addr_npi));
        encode_cstring(buf, &self.source_addr);
        encode_cstring(buf, &self.schedule_delivery_time);
        encode_cstring(buf, &self.validity_period);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.sm_default_msg_id);
        buf.put_u8(self.sm_length());
        buf.put_slice(&self.short_message);

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.message_id.len()
            + 1
            + 2
            + self.source_addr.len()
            + 1
            + self.schedule_delivery_time.len()
            + 1
            + self.validity_period.len()
            + 1
            + 3
            + self.short_message.len()
    }
}

/// Acknowledgement of a replace_sm request. The body is empty; success or
/// failure travels in command_status.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplaceSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(ReplaceSmResponse, CommandId::ReplaceSmResp);
