// ABOUTME: This module implements the deliver_sm operation for SMSC-originated messages
// ABOUTME: Covers mobile-originated messages and delivery receipts plus the DeliverSmResponse ack

use crate::codec::{
    check_cstring, decode_bytes, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable,
    Encodable, PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, NumericPlanIndicator, Tlv, TypeOfNumber, MAX_SHORT_MESSAGE_LEN,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.6.1)
const SERVICE_TYPE_LEN: usize = 6;
const ADDR_LEN: usize = 21;
const TIME_LEN: usize = 17;
const MESSAGE_ID_LEN: usize = 65;

// esm_class bit 2 marks an SMSC delivery receipt
const ESM_DELIVERY_RECEIPT: u8 = 0x04;

/// This operation is issued by the SMSC to send a message to an ESME. It is
/// used both for mobile-originated messages and for delivery receipts.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters, same layout as submit_sm
    /// 4.6.1 service_type: SMS Application service associated with the
    ///       message.
    pub service_type: String,

    /// 4.6.1 source_addr_ton: Type of Number for the originating SME.
    pub source_addr_ton: TypeOfNumber,

    /// 4.6.1 source_addr_npi: Numbering Plan Indicator for the originator.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.6.1 source_addr: Address of the SME which originated this message.
    pub source_addr: String,

    /// 4.6.1 dest_addr_ton: Type of Number for the destination.
    pub dest_addr_ton: TypeOfNumber,

    /// 4.6.1 dest_addr_npi: Numbering Plan Indicator for the destination.
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.6.1 destination_addr: Destination address, typically the bound
    ///       ESME's own address.
    pub destination_addr: String,

    /// 4.6.1 esm_class: Message Type bits distinguish ordinary messages from
    ///       delivery receipts and acknowledgements.
    pub esm_class: u8,

    /// 4.6.1 protocol_id: Network-specific protocol identifier.
    pub protocol_id: u8,

    /// 4.6.1 priority_flag: Priority level of the message.
    pub priority_flag: u8,

    /// 4.6.1 schedule_delivery_time: Not used for deliver_sm, set to NULL.
    pub schedule_delivery_time: String,

    /// 4.6.1 validity_period: Not used for deliver_sm, set to NULL.
    pub validity_period: String,

    /// 4.6.1 registered_delivery: Receipt request bits.
    pub registered_delivery: u8,

    /// 4.6.1 replace_if_present_flag: Not used for deliver_sm, set to 0.
    pub replace_if_present_flag: u8,

    /// 4.6.1 data_coding: Encoding scheme of the short message user data.
    pub data_coding: u8,

    /// 4.6.1 sm_default_msg_id: Not used for deliver_sm, set to 0.
    pub sm_default_msg_id: u8,

    /// 4.6.1 short_message: Up to 254 octets of user data. The sm_length
    ///       octet is derived from this field at encode time.
    pub short_message: Bytes,

    /// Optional parameters in wire order. receipted_message_id and
    /// message_state are the usual companions of a delivery receipt.
    pub tlvs: Vec<Tlv>,
}

impl DeliverSm {
    pub fn builder() -> DeliverSmBuilder {
        DeliverSmBuilder::new()
    }

    /// The value of the sm_length octet on the wire.
    pub fn sm_length(&self) -> u8 {
        self.short_message.len() as u8
    }

    /// Whether the esm_class marks this message as an SMSC delivery receipt.
    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class & ESM_DELIVERY_RECEIPT != 0
    }

    /// The receipted_message_id optional parameter, without its terminator.
    pub fn receipted_message_id(&self) -> Option<String> {
        Tlv::find(&self.tlvs, tags::RECEIPTED_MESSAGE_ID).map(|tlv| {
            let octets = tlv.value.strip_suffix(&[0u8]).unwrap_or(&tlv.value);
            String::from_utf8_lossy(octets).into_owned()
        })
    }

    /// Validate field constraints per SMPP v3.4 section 4.6.1.
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

        Ok(())
    }
}

impl Decodable for DeliverSm {
    fn command_id() -> CommandId {
        CommandId::DeliverSm
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

impl Encodable for DeliverSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::DeliverSm,
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

/// Builder for creating DeliverSm PDUs with validation and sensible defaults
pub struct DeliverSmBuilder {
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
    registered_delivery: u8,
    data_coding: u8,
    short_message: Bytes,
    tlvs: Vec<Tlv>,
}

impl Default for DeliverSmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliverSmBuilder {
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
            registered_delivery: 0,
            data_coding: 0,
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
        data_coding: u8,
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

    pub fn short_message(mut self, message: impl Into<Bytes>) -> Self {
        self.short_message = message.into();
        self
    }

    pub fn tlv(mut self, tlv: Tlv) -> Self {
        self.tlvs.push(tlv);
        self
    }

    /// Mark this deliver_sm as a delivery receipt for the given message_id.
    pub fn delivery_receipt(mut self, message_id: &str) -> Self {
        self.esm_class |= ESM_DELIVERY_RECEIPT;
        let mut value = message_id.as_bytes().to_vec();
        value.push(0);
        self.tlvs.push(Tlv::new(tags::RECEIPTED_MESSAGE_ID, value));
        self
    }

    /// Build the DeliverSm, performing validation
    pub fn build(self) -> Result<DeliverSm, CodecError> {
        let deliver_sm = DeliverSm {
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
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: self.registered_delivery,
            replace_if_present_flag: 0,
            data_coding: self.data_coding,
            sm_default_msg_id: 0,
            short_message: self.short_message,
            tlvs: self.tlvs,
        };

        deliver_sm.validate()?;
        Ok(deliver_sm)
    }
}

/// Acknowledgement of a deliver_sm. The message_id field is unused and
/// encodes as an empty C-octet string.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 4.6.2 message_id: Unused, set to NULL.
    pub message_id: String,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: String::new(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        if !buf.has_remaining() {
            return Ok(Self {
                command_status: header.command_status,
                sequence_number: header.sequence_number,
                message_id: String::new(),
            });
        }

        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::DeliverSmResp,
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
