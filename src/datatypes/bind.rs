//! The bind operation family: bind_transmitter, bind_receiver and
//! bind_transceiver share an identical body layout and differ only in
//! command_id and in the traffic directions they authorize. They are
//! modelled here as a single `Bind` parameterized by `BindType`.
//!
//! outbind is the reverse handshake: the SMSC connects out to an ESME and
//! invites it to send a bind_receiver on the same connection.

use crate::codec::{
    check_cstring, decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

// Field lengths on the wire, NUL terminator included (SMPP v3.4 section 4.1)
const SYSTEM_ID_LEN: usize = 16;
const PASSWORD_LEN: usize = 9;
const SYSTEM_TYPE_LEN: usize = 13;
const ADDRESS_RANGE_LEN: usize = 41;

/// Which of the three bind flavours a `Bind` represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindType {
    Transmitter,
    Receiver,
    Transceiver,
}

impl BindType {
    /// The request command_id for this bind flavour.
    pub fn command_id(self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    /// The response command_id for this bind flavour.
    pub fn response_command_id(self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    pub fn from_request_id(id: CommandId) -> Option<Self> {
        match id {
            CommandId::BindTransmitter => Some(BindType::Transmitter),
            CommandId::BindReceiver => Some(BindType::Receiver),
            CommandId::BindTransceiver => Some(BindType::Transceiver),
            _ => None,
        }
    }

    pub fn from_response_id(id: CommandId) -> Option<Self> {
        match id {
            CommandId::BindTransmitterResp => Some(BindType::Transmitter),
            CommandId::BindReceiverResp => Some(BindType::Receiver),
            CommandId::BindTransceiverResp => Some(BindType::Transceiver),
            _ => None,
        }
    }
}

/// A bind request of any flavour.
#[derive(Clone, Debug, PartialEq)]
pub struct Bind {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub bind_type: BindType,

    // Body
    /// 5.2.1 system_id: Identifies the ESME requesting to bind. Up to 15
    ///       characters plus the NUL terminator.
    pub system_id: String,

    /// 5.2.2 password: Used by the SMSC to authenticate the ESME. `None`
    ///       encodes as an empty C-octet string.
    pub password: Option<String>,

    /// 5.2.3 system_type: Categorizes the type of ESME binding to the SMSC,
    ///       e.g. "VMS" or "OTA". May be left empty.
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number of the ESME address(es) served via
    ///       this session.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es).
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: The SME address range serviced by the ESME.
    pub address_range: String,
}

impl Bind {
    /// Create a bind request with empty credentials.
    pub fn new(bind_type: BindType, sequence_number: u32) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            bind_type,
            system_id: String::new(),
            password: None,
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    /// Validate field constraints per SMPP v3.4 section 4.1.
    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.system_id, SYSTEM_ID_LEN, "system_id")?;
        if let Some(ref password) = self.password {
            check_cstring(password, PASSWORD_LEN, "password")?;
        }
        check_cstring(&self.system_type, SYSTEM_TYPE_LEN, "system_type")?;
        check_cstring(&self.address_range, ADDRESS_RANGE_LEN, "address_range")?;
        Ok(())
    }

    /// Decode the body of any of the three bind request flavours.
    pub fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let bind_type = BindType::from_request_id(header.command_id).ok_or(
            CodecError::UnexpectedCommandId {
                expected: CommandId::BindTransceiver,
                actual: header.command_id,
            },
        )?;

        let system_id = decode_cstring(buf, SYSTEM_ID_LEN, "system_id")?;
        let password = match decode_cstring(buf, PASSWORD_LEN, "password")? {
            p if p.is_empty() => None,
            p => Some(p),
        };
        let system_type = decode_cstring(buf, SYSTEM_TYPE_LEN, "system_type")?;
        let interface_version = InterfaceVersion::from(decode_u8(buf)?);
        let addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let address_range = decode_cstring(buf, ADDRESS_RANGE_LEN, "address_range")?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            bind_type,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for Bind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: self.bind_type.command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id);
        encode_cstring(buf, self.password.as_deref().unwrap_or(""));
        encode_cstring(buf, &self.system_type);
        buf.put_u8(u8::from(self.interface_version));
        buf.put_u8(u8::from(self.addr_ton));
        buf.put_u8(u8::from(self.addr_npi));
        encode_cstring(buf, &self.address_range);

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.system_id.len()
            + 1
            + self.password.as_ref().map_or(0, String::len)
            + 1
            + self.system_type.len()
            + 1
            + 3
            + self.address_range.len()
            + 1
    }
}

/// Response to a bind request of any flavour.
#[derive(Clone, Debug, PartialEq)]
pub struct BindResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub bind_type: BindType,

    /// 5.2.1 system_id: Identifies the SMSC the ESME has bound to.
    pub system_id: String,

    /// Optional parameters. sc_interface_version is the only one SMPP v3.4
    /// defines for bind responses, but unknown tags are preserved.
    pub tlvs: Vec<Tlv>,
}

impl BindResponse {
    /// Create a successful bind response.
    pub fn new(bind_type: BindType, sequence_number: u32, system_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            bind_type,
            system_id: system_id.into(),
            tlvs: Vec::new(),
        }
    }

    /// Create a rejection with the given status and an empty system_id.
    pub fn error(bind_type: BindType, sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            bind_type,
            system_id: String::new(),
            tlvs: Vec::new(),
        }
    }

    /// Attach the sc_interface_version optional parameter.
    pub fn with_sc_interface_version(mut self, version: InterfaceVersion) -> Self {
        self.tlvs.push(Tlv::single_octet(
            tags::SC_INTERFACE_VERSION,
            u8::from(version),
        ));
        self
    }

    /// The SMSC's advertised interface version, if present.
    pub fn sc_interface_version(&self) -> Option<InterfaceVersion> {
        Tlv::find(&self.tlvs, tags::SC_INTERFACE_VERSION)
            .and_then(|tlv| tlv.value.first())
            .map(|&octet| InterfaceVersion::from(octet))
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.system_id, SYSTEM_ID_LEN, "system_id")
    }

    /// Decode the body of any of the three bind response flavours.
    ///
    /// Some SMSCs omit the body entirely on rejection; an empty body is
    /// accepted when the status is non-zero.
    pub fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        use bytes::Buf;

        let bind_type = BindType::from_response_id(header.command_id).ok_or(
            CodecError::UnexpectedCommandId {
                expected: CommandId::BindTransceiverResp,
                actual: header.command_id,
            },
        )?;

        if !buf.has_remaining() && !header.command_status.is_ok() {
            return Ok(Self::error(
                bind_type,
                header.sequence_number,
                header.command_status,
            ));
        }

        let system_id = decode_cstring(buf, SYSTEM_ID_LEN, "system_id")?;
        let tlvs = Tlv::decode_all(buf)?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            bind_type,
            system_id,
            tlvs,
        })
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: self.bind_type.response_command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id);
        Tlv::encode_all(&self.tlvs, buf)?;

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE + self.system_id.len() + 1 + Tlv::size_of_all(&self.tlvs)
    }
}

/// outbind request sent by an SMSC that has connected out to an ESME.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbind {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.1 system_id: Identifies the SMSC issuing the invitation.
    pub system_id: String,

    /// 5.2.2 password: Used by the ESME to authenticate the SMSC. `None`
    ///       encodes as an empty C-octet string.
    pub password: Option<String>,
}

impl Outbind {
    pub fn new(
        sequence_number: u32,
        system_id: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            password,
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        check_cstring(&self.system_id, SYSTEM_ID_LEN, "system_id")?;
        if let Some(ref password) = self.password {
            check_cstring(password, PASSWORD_LEN, "password")?;
        }
        Ok(())
    }
}

impl Decodable for Outbind {
    fn command_id() -> CommandId {
        CommandId::Outbind
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = decode_cstring(buf, SYSTEM_ID_LEN, "system_id")?;
        let password = match decode_cstring(buf, PASSWORD_LEN, "password")? {
            p if p.is_empty() => None,
            p => Some(p),
        };

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
        })
    }
}

impl Encodable for Outbind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: CommandId::Outbind,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id);
        encode_cstring(buf, self.password.as_deref().unwrap_or(""));

        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.system_id.len()
            + 1
            + self.password.as_ref().map_or(0, String::len)
            + 1
    }
}
