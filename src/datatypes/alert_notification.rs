// ABOUTME: Implements the SMPP v3.4 alert_notification PDU
// ABOUTME: Sent by the SMSC when a mobile subscriber becomes available; has no response PDU

use crate::codec::{
    check_cstring, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use num_enum::{FromPrimitive, IntoPrimitive};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.12.1)
const ADDR_LEN: usize = 65;

/// ms_availability_status values (section 5.3.2.30)
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsAvailabilityStatus {
    Available = 0x00,
    Denied = 0x01,
    Unavailable = 0x02,

    #[num_enum(catch_all)]
    Other(u8),
}

/// The alert_notification PDU is sent by the SMSC to an ESME when the SMSC
/// has detected that a particular mobile subscriber has become available.
/// There is no response PDU; delivery is best effort.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertNotification {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.12.1 source_addr_ton: Type of Number for the mobile subscriber.
    pub source_addr_ton: TypeOfNumber,

    /// 4.12.1 source_addr_npi: Numbering Plan Indicator for the subscriber.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.12.1 source_addr: Address of the mobile subscriber that became
    ///        available.
    pub source_addr: String,

    /// 4.12.1 esme_addr_ton: Type of Number for the destination ESME.
    pub esme_addr_ton: TypeOfNumber,

    /// 4.12.1 esme_addr_npi: Numbering Plan Indicator for the ESME.
    pub esme_addr_npi: NumericPlanIndicator,

    /// 4.12.1 esme_addr: Address of the ESME being alerted.
    pub esme_addr: String,

    /// Optional parameters; ms_availability_status is the only one defined.
    pub tlvs: Vec<Tlv>,
}

impl AlertNotification {
    pub fn new(
        sequence_number: u32,
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        source_addr: impl Into<String>,
        esme_addr_ton: TypeOfNumber,
        esme_addr_npi: NumericPlanIndicator,
        esme_addr: impl Into<String>,
    ) -> Result<Self, CodecError> {
        let pdu = AlertNotification {
            command_status: CommandStatus::Ok,
            sequence_number,
            source_addr_ton,
            source_addr_npi,
            source_addr: source_addr.into(),
            esme_addr_ton,
            esme_addr_npi,
            esme_addr: esme_addr.into(),
            tlvs: Vec::new(),
        };

        pdu.validate()?;
        Ok(pdu)
    }

    /// Attach the ms_availability_status optional parameter.
    pub fn with_ms_availability_status(mut self, status: MsAvailabilityStatus) -> Self {
        self.tlvs.push(Tlv::single_octet(
            tags::MS_AVAILABILITY_STATUS,
            u8::from(status),
        ));
        self
    }

    /// The subscriber's availability, if the optional parameter is present.
    pub fn ms_availability_status(&self) -> Option<MsAvailabilityStatus> {
        Tlv::find(&self.tlvs, tags::MS_AVAILABILITY_STATUS)
            .and_then(|tlv| tlv.value.first())
            .map(|&octet| MsAvailabilityStatus::from(octet))
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.source_addr, ADDR_LEN, "source_addr")?;
        check_cstring(&self.esme_addr, ADDR_LEN, "esme_addr")?;
        Ok(())
    }
}

impl Decodable for AlertNotification {
    fn command_id() -> CommandId {
        CommandId::AlertNotification
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let source_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, ADDR_LEN, "source_addr")?;
        let esme_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let esme_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let esme_addr = decode_cstring(buf, ADDR_LEN, "esme_addr")?;
        let tlvs = Tlv::decode_all(buf)?;

        Ok(AlertNotification {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            esme_addr_ton,
            esme_addr_npi,
            esme_addr,
            tlvs,
        })
    }
}

impl Encodable for AlertNotification {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::AlertNotification,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        buf.put_u8(u8::from(self.source_addr_ton));
        buf.put_u8(u8::from(self.source_addr_npi));
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(u8::from(self.esme_addr_ton));
        buf.put_u8(u8::from(self.esme_addr_npi));
        encode_cstring(buf, &self.esme_addr);
        Tlv::encode_all(&self.tlvs, buf)?;

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + 2
            + self.source_addr.len()
            + 1
            + 2
            + self.esme_addr.len()
            + 1
            + Tlv::size_of_all(&self.tlvs)
    }
}
