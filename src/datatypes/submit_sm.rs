// ABOUTME: This module implements the submit_sm operation for ESME-originated messages
// ABOUTME: Includes the SubmitSm request with builder, and the SubmitSmResponse carrying the message_id

use crate::codec::{
    check_cstring, decode_bytes, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable,
    Encodable, PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.4.1)
const SERVICE_TYPE_LEN: usize = 6;
const ADDR_LEN: usize = 21;
const TIME_LEN: usize = 17;
const MESSAGE_ID_LEN: usize = 65;

/// Longest short_message the sm_length octet can describe.
pub const MAX_SHORT_MESSAGE_LEN: usize = 254;

/// This operation is used by an ESME to submit a short message to the SMSC
/// for onward transmission to a specified short message entity.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.4.1 service_type: Indicates the SMS Application service associated
    ///       with the message. Set to NULL if not applicable.
    pub service_type: String,

    /// 4.4.1 source_addr_ton: Type of Number for the source address.
    pub source_addr_ton: TypeOfNumber,

    /// 4.4.1 source_addr_npi: Numbering Plan Indicator for the source address.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.4.1 source_addr: Address of the SME which originated this message.
    pub source_addr: String,

    /// 4.4.1 dest_addr_ton: Type of Number for the destination address.
    pub dest_addr_ton: TypeOfNumber,

    /// 4.4.1 dest_addr_npi: Numbering Plan Indicator for the destination.
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.4.1 destination_addr: Destination address of this short message.
    pub destination_addr: String,

    /// 4.4.1 esm_class: Message Mode (bits 1..0) and Message Type (bits 5..2).
    pub esm_class: u8,

    /// 4.4.1 protocol_id: Network-specific protocol identifier.
    pub protocol_id: u8,

    /// 4.4.1 priority_flag: Priority level 0 (lowest) to 3 (highest).
    pub priority_flag: u8,

    /// 4.4.1 schedule_delivery_time: Absolute or relative delivery time in
    ///       YYMMDDhhmmsstnnp format. NULL requests immediate delivery.
    pub schedule_delivery_time: String,

    /// 4.4.1 validity_period: Expiry time of this message, same format as
    ///       schedule_delivery_time. NULL requests the SMSC default.
    pub validity_period: String,

    /// 4.4.1 registered_delivery: Delivery receipt / acknowledgement request
    ///       bits.
    pub registered_delivery: u8,

    /// 4.4.1 replace_if_present_flag: Replace an existing message with the
    ///       same source, destination and service_type when set to 1.
    pub replace_if_present_flag: u8,

    /// 4.4.1 data_coding: Encoding scheme of the short message user data.
    pub data_coding: u8,

    /// 4.4.1 sm_default_msg_id: Index of a pre-defined ('canned') message on
    ///       the SMSC, or 0.
    pub sm_default_msg_id: u8,

    /// 4.4.1 short_message: Up to 254 octets of user data. The sm_length
    ///       octet is derived from this field at encode time. Messages longer
    ///       than 254 octets travel in the message_payload optional parameter
    ///       with an empty short_message.
    pub short_message: Bytes,

    /// Optional parameters in wire order. Unknown tags are preserved.
    pub tlvs: Vec<Tlv>,
}

impl SubmitSm {
    pub fn builder() -> SubmitSmBuilder {
        SubmitSmBuilder::new()
    }

    /// The value of the sm_length octet on the wire.
    pub fn sm_length(&self) -> u8 {
        self.short_message.len() as u8
    }

    /// Validate field constraints per SMPP v3.4 section 4.4.1.
    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        check_cstring(&self.source_addr, ADDR_LEN, "source_addr")?;
        check_cstring(&self.destination_addr, ADDR_LEN, "destination_addr")?;
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

        if !self.short_message.is_empty() && Tlv::find(&self.tlvs, tags::MESSAGE_PAYLOAD).is_some()
        {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: "short_message and message_payload are mutually exclusive".to_string(),
            });
        }

        Ok(())
    }
}

impl Decodable for SubmitSm {
    fn command_id() -> CommandId {
        CommandId::SubmitSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let service_type = decode_cstring(buf, SERVICE_TYPE_LEN, "service_type")?;
        let source_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, ADDR_LEN, "source_addr")?;
        let dest_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let dest_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let destination_addr = decode_cstring(buf, ADDR_LEN, "destination_addr")?;
        let esm_class = decode_u8(buf)?;
        let protocol_id = decode_u8(buf)?;
        let priority_flag = decode_u8(buf)?;
        let schedule_delivery_time = decode_cstring(buf, TIME_LEN, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, TIME_LEN, "validity_period")?;
        let registered_delivery = decode_u8(buf)?;
        let replace_if_present_flag = decode_u8(buf)?;
        let data_coding = decode_u8(buf)?;
        let sm_default_msg_id = decode_u8(buf)?;
        let sm_length = decode_u8(buf)? as usize;
        let short_message = decode_bytes(buf, sm_length)?;
        let tlvs = Tlv::decode_all(buf)?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
            tlvs,
        })
    }
}

impl Encodable for SubmitSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::SubmitSm,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.service_type);
        buf.put_u8(u8::from(self.source_addr_ton));
        buf.put_u8(u8::from(self.source_addr_npi));
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(u8::from(self.dest_addr_ton));
        buf.put_u8(u8::from(self.dest_addr_npi));
        encode_cstring(buf, &self.destination_addr);
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        encode_cstring(buf, &self.schedule_delivery_time);
        encode_cstring(buf, &self.validity_period);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present_flag);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        buf.put_u8(self.sm_length());
        buf.put_slice(&self.short_message);
        Tlv::encode_all(&self.tlvs, buf)?;

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.service_type.len()
            + 1
            + 2
            + self.source_addr.len()
            + 1
            + 2
            + self.destination_addr.len()
            + 1
            + 3
            + self.schedule_delivery_time.len()
            + 1
            + self.validity_period.len()
            + 1
            + 4
            + 1
            + self.short_message.len()
            + Tlv::size_of_all(&self.tlvs)
    }
}

/// Builder for creating SubmitSm PDUs with validation and sensible defaults
pub struct SubmitSmBuilder {
    sequence_number: u32,
    service_type: String,
    source_addr_ton: TypeOfNumber,
    source_addr_npi: NumericPlanIndicator,
    source_addr: String,
    dest_addr_ton: TypeOfNumber,
    dest_addr_npi: NumericPlanIndicator,
    destination_addr: String,
    esm_class: u8,
    protocol_id: u8,
    priority_flag: u8,
    schedule_delivery_time: String,
    validity_period: String,
    registered_delivery: u8,
    replace_if_present_flag: u8,
    data_coding: u8,
    sm_default_msg_id: u8,
    short_message: Bytes,
    tlvs: Vec<Tlv>,
}

impl Default for SubmitSmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitSmBuilder {
    pub fn new() -> Self {
        Self {
            sequence_number: 1,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: String::new(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: String::new(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: Bytes::new(),
            tlvs: Vec::new(),
        }
    }

    builder_setters! {
        sequence_number: u32,
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        dest_addr_ton: TypeOfNumber,
        dest_addr_npi: NumericPlanIndicator,
        esm_class: u8,
        protocol_id: u8,
        priority_flag: u8,
        registered_delivery: u8,
        replace_if_present_flag: u8,
        data_coding: u8,
        sm_default_msg_id: u8,
    }

    pub fn service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    pub fn source_addr(mut self, addr: impl Into<String>) -> Self {
        self.source_addr = addr.into();
        self
    }

    pub fn destination_addr(mut self, addr: impl Into<String>) -> Self {
        self.destination_addr = addr.into();
        self
    }

    pub fn schedule_delivery_time(mut self, time: impl Into<String>) -> Self {
        self.schedule_delivery_time = time.into();
        self
    }

    pub fn validity_period(mut self, period: impl Into<String>) -> Self {
        self.validity_period = period.into();
        self
    }

    pub fn short_message(mut self, message: impl Into<Bytes>) -> Self {
        self.short_message = message.into();
        self
    }

    pub fn tlv(mut self, tlv: Tlv) -> Self {
        self.tlvs.push(tlv);
        self
    }

    /// Build the SubmitSm, performing validation
    pub fn build(self) -> Result<SubmitSm, CodecError> {
        let submit_sm = SubmitSm {
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
            service_type: self.service_type,
            source_addr_ton: self.source_addr_ton,
            source_addr_npi: self.source_addr_npi,
            source_addr: self.source_addr,
            dest_addr_ton: self.dest_addr_ton,
            dest_addr_npi: self.dest_addr_npi,
            destination_addr: self.destination_addr,
            esm_class: self.esm_class,
            protocol_id: self.protocol_id,
            priority_flag: self.priority_flag,
            schedule_delivery_time: self.schedule_delivery_time,
            validity_period: self.validity_period,
            registered_delivery: self.registered_delivery,
            replace_if_present_flag: self.replace_if_present_flag,
            data_coding: self.data_coding,
            sm_default_msg_id: self.sm_default_msg_id,
            short_message: self.short_message,
            tlvs: self.tlvs,
        };

        submit_sm.validate()?;
        Ok(submit_sm)
    }
}

/// Response to submit_sm carrying the SMSC-assigned message_id.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 4.4.2 message_id: SMSC identifier of the submitted message, used in
    ///       later query_sm, cancel_sm and replace_sm operations.
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.message_id, MESSAGE_ID_LEN, "message_id")
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        // Rejections may arrive as a bare header
        if !buf.has_remaining() && !header.command_status.is_ok() {
            return Ok(Self::error(header.sequence_number, header.command_status));
        }

        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::SubmitSmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.message_id);

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE + self.message_id.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_submit() -> SubmitSm {
        SubmitSm::builder()
            .sequence_number(1)
            .source_addr_ton(TypeOfNumber::International)
            .source_addr_npi(NumericPlanIndicator::Isdn)
            .source_addr("15551234567")
            .dest_addr_ton(TypeOfNumber::International)
            .dest_addr_npi(NumericPlanIndicator::Isdn)
            .destination_addr("15557654321")
            .registered_delivery(1)
            .short_message(&b"hello"[..])
            .build()
            .unwrap()
    }

    #[test]
    fn submit_sm_to_bytes() {
        let bytes = sample_submit().to_bytes();

        let expected: Vec<u8> = vec![
            // Header:
            0x00, 0x00, 0x00, 0x3C, // command_length = 60
            0x00, 0x00, 0x00, 0x04, // command_id = submit_sm
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
            // Body:
            0x00, // service_type (empty)
            0x01, // source_addr_ton
            0x01, // source_addr_npi
            0x31, 0x35, 0x35, 0x35, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
            0x00, // source_addr
            0x01, // dest_addr_ton
            0x01, // dest_addr_npi
            0x31, 0x35, 0x35, 0x35, 0x37, 0x36, 0x35, 0x34, 0x33, 0x32, 0x31,
            0x00, // destination_addr
            0x00, // esm_class
            0x00, // protocol_id
            0x00, // priority_flag
            0x00, // schedule_delivery_time (empty)
            0x00, // validity_period (empty)
            0x01, // registered_delivery
            0x00, // replace_if_present_flag
            0x00, // data_coding
            0x00, // sm_default_msg_id
            0x05, // sm_length
            0x68, 0x65, 0x6C, 0x6C, 0x6F, // short_message "hello"
        ];

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn submit_sm_round_trip() {
        let original = sample_submit();
        let bytes = original.to_bytes();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.sm_length(), 5);
    }

    #[test]
    fn submit_sm_round_trip_with_tlvs() {
        let original = SubmitSm::builder()
            .destination_addr("15557654321")
            .tlv(Tlv::new(tags::MESSAGE_PAYLOAD, &b"long message body"[..]))
            .tlv(Tlv::single_octet(tags::MORE_MESSAGES_TO_SEND, 1))
            .build()
            .unwrap();
        let bytes = original.to_bytes();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded.tlvs.len(), 2);
        assert_eq!(decoded, original);
    }

    #[test]
    fn submit_sm_rejects_oversized_message() {
        let result = SubmitSm::builder()
            .destination_addr("15557654321")
            .short_message(vec![0x41u8; 255])
            .build();

        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "short_message",
                ..
            })
        ));
    }

    #[test]
    fn submit_sm_rejects_payload_and_inline_message() {
        let result = SubmitSm::builder()
            .destination_addr("15557654321")
            .short_message(&b"inline"[..])
            .tlv(Tlv::new(tags::MESSAGE_PAYLOAD, &b"payload"[..]))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn submit_sm_rejects_long_address() {
        let result = SubmitSm::builder().destination_addr("1".repeat(21)).build();

        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "destination_addr",
                ..
            })
        ));
    }

    #[test]
    fn submit_sm_resp_to_bytes() {
        let resp = SubmitSmResponse::new(42, "msg-001");
        let bytes = resp.to_bytes();

        let expected: Vec<u8> = vec![
            // Header:
            0x00, 0x00, 0x00, 0x18, // command_length = 24
            0x80, 0x00, 0x00, 0x04, // command_id = submit_sm_resp
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x2A, // sequence_number = 42
            // Body:
            0x6D, 0x73, 0x67, 0x2D, 0x30, 0x30, 0x31, 0x00, // message_id
        ];

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn submit_sm_resp_error_with_empty_body() {
        let raw: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x10, //
            0x80, 0x00, 0x00, 0x04, //
            0x00, 0x00, 0x00, 0x58, // ESME_RTHROTTLED
            0x00, 0x00, 0x00, 0x07, //
        ];

        let mut cursor = Cursor::new(raw.as_slice());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = SubmitSmResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded.command_status, CommandStatus::ThrottlingError);
        assert_eq!(decoded.message_id, "");
    }
}
