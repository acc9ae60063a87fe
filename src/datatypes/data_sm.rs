// ABOUTME: This module implements the data_sm operation used by interactive applications
// ABOUTME: The message content travels in the message_payload optional parameter rather than inline

use crate::codec::{
    check_cstring, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.7.1).
// data_sm allows longer addresses than submit_sm.
const SERVICE_TYPE_LEN: usize = 6;
const ADDR_LEN: usize = 65;
const MESSAGE_ID_LEN: usize = 65;

/// This command transfers data between the SMSC and the ESME in either
/// direction. It may be used by interactive applications such as USSD in
/// place of submit_sm and deliver_sm.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.7.1 service_type: SMS Application service associated with the
    ///       message.
    pub service_type: String,

    /// 4.7.1 source_addr_ton: Type of Number for the source address.
    pub source_addr_ton: TypeOfNumber,

    /// 4.7.1 source_addr_npi: Numbering Plan Indicator for the source.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.7.1 source_addr: Address of the SME which originated this message.
    pub source_addr: String,

    /// 4.7.1 dest_addr_ton: Type of Number for the destination.
    pub dest_addr_ton: TypeOfNumber,

    /// 4.7.1 dest_addr_npi: Numbering Plan Indicator for the destination.
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.7.1 destination_addr: Destination address of this message.
    pub destination_addr: String,

    /// 4.7.1 esm_class: Message Mode and Message Type bits.
    pub esm_class: u8,

    /// 4.7.1 registered_delivery: Receipt request bits.
    pub registered_delivery: u8,

    /// 4.7.1 data_coding: Encoding scheme of the message user data.
    pub data_coding: u8,

    /// Optional parameters in wire order. The message content, if any,
    /// travels in message_payload.
    pub tlvs: Vec<Tlv>,
}

impl DataSm {
    pub fn builder() -> DataSmBuilder {
        DataSmBuilder::new()
    }

    /// The message_payload optional parameter, if present.
    pub fn message_payload(&self) -> Option<&Bytes> {
        Tlv::find(&self.tlvs, tags::MESSAGE_PAYLOAD).map(|tlv| &tlv.value)
    }

    /// Validate field constraints per SMPP v3.4 section 4.7.1.
    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        check_cstring(&self.source_addr, ADDR_LEN, "source_addr")?;
        check_cstring(&self.destination_addr, ADDR_LEN, "destination_addr")?;
        Ok(())
    }
}

impl Decodable for DataSm {
    fn command_id() -> CommandId {
        CommandId::DataSm
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
        let registered_delivery = decode_u8(buf)?;
        let data_coding = decode_u8(buf)?;
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
            registered_delivery,
            data_coding,
            tlvs,
        })
    }
}

impl Encodable for DataSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::DataSm,
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
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.data_coding);
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
            + Tlv::size_of_all(&self.tlvs)
    }
}

/// Builder for creating DataSm PDUs with validation and sensible defaults
pub struct DataSmBuilder {
    sequence_number: u32,
    service_type: String,
    source_addr_ton: TypeOfNumber,
    source_addr_npi: NumericPlanIndicator,
    source_addr: String,
    dest_addr_ton: TypeOfNumber,
    dest_addr_npi: NumericPlanIndicator,
    destination_addr: String,
    esm_class: u8,
    registered_delivery: u8,
    data_coding: u8,
    tlvs: Vec<Tlv>,
}

impl Default for DataSmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSmBuilder {
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
            registered_delivery: 0,
            data_coding: 0,
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

    pub fn message_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.tlvs.push(Tlv::new(tags::MESSAGE_PAYLOAD, payload));
        self
    }

    pub fn tlv(mut self, tlv: Tlv) -> Self {
        self.tlvs.push(tlv);
        self
    }

    /// Build the DataSm, performing validation
    pub fn build(self) -> Result<DataSm, CodecError> {
        let data_sm = DataSm {
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
            registered_delivery: self.registered_delivery,
            data_coding: self.data_coding,
            tlvs: self.tlvs,
        };

        data_sm.validate()?;
        Ok(data_sm)
    }
}

/// Response to data_sm carrying the SMSC-assigned message_id.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 4.7.2 message_id: SMSC identifier of the message.
    pub message_id: String,

    /// Optional parameters: delivery_failure_reason, network_error_code and
    /// friends.
    pub tlvs: Vec<Tlv>,
}

impl DataSmResponse {
    pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
            tlvs: Vec::new(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
            tlvs: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.message_id, MESSAGE_ID_LEN, "message_id")
    }
}

impl Decodable for DataSmResponse {
    fn command_id() -> CommandId {
        CommandId::DataSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        if !buf.has_remaining() && !header.command_status.is_ok() {
            return Ok(Self::error(header.sequence_number, header.command_status));
        }

        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let tlvs = Tlv::decode_all(buf)?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            tlvs,
        })
    }
}

impl Encodable for DataSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::DataSmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.message_id);
        Tlv::encode_all(&self.tlvs, buf)?;

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE + self.message_id.len() + 1 + Tlv::size_of_all(&self.tlvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_sm_round_trip() {
        let original = DataSm::builder()
            .sequence_number(5)
            .source_addr_ton(TypeOfNumber::International)
            .source_addr("15551234567")
            .destination_addr("*100#")
            .message_payload(&b"balance query"[..])
            .build()
            .unwrap();
        let bytes = original.to_bytes();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = DataSm::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(
            decoded.message_payload().map(|b| b.as_ref()),
            Some(&b"balance query"[..])
        );
    }

    #[test]
    fn data_sm_accepts_long_addresses() {
        // data_sm fields allow 64 octets where submit_sm stops at 20
        let addr = "a".repeat(64);
        let data_sm = DataSm::builder()
            .source_addr(addr.clone())
            .destination_addr(addr)
            .build()
            .unwrap();

        assert!(data_sm.validate().is_ok());

        let too_long = DataSm::builder().source_addr("b".repeat(65)).build();
        assert!(too_long.is_err());
    }

    #[test]
    fn data_sm_resp_round_trip() {
        let original = DataSmResponse::new(6, "msg-007");
        let bytes = original.to_bytes();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = DataSmResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn data_sm_resp_failure_tlvs_preserved() {
        let mut resp = DataSmResponse::error(8, CommandStatus::DeliveryFailure);
        resp.tlvs
            .push(Tlv::single_octet(tags::DELIVERY_FAILURE_REASON, 0x02));
        let bytes = resp.to_bytes();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = DataSmResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded.command_status, CommandStatus::DeliveryFailure);
        assert_eq!(decoded.tlvs.len(), 1);
        assert_eq!(decoded.tlvs[0].tag, tags::DELIVERY_FAILURE_REASON);
    }
}
