// ABOUTME: This module provides the extensible codec architecture for SMPP PDU encoding/decoding
// ABOUTME: Defines the header model, codec traits, error types, and the typed Pdu dispatch enum

use crate::datatypes::{CommandId, CommandStatus};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode a PDU header from the buffer with validation.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id = CommandId::from(buf.get_u32());
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if command_length < Self::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        // SMPP v3.4 rule: requests must carry command_status = 0
        if !command_id.is_response() && !command_status.is_ok() {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status,
            });
        }

        // 0 and 0xFFFFFFFF are reserved. generic_nack is exempt: peers that
        // cannot recover a sequence number from a corrupt frame send it with
        // sequence 0, and rejecting that would hide the nack.
        if (sequence_number == 0 || sequence_number == 0xFFFF_FFFF)
            && command_id != CommandId::GenericNack
        {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode this header to the buffer.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u32(self.command_length);
        buf.put_u32(u32::from(self.command_id));
        buf.put_u32(u32::from(self.command_status));
        buf.put_u32(self.sequence_number);
        Ok(())
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size without actually encoding
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }

    /// Convert this PDU to wire bytes, fixing up the command_length field.
    ///
    /// Encoding a locally constructed PDU cannot fail (fields are validated
    /// at construction), so a failure here is a programming error.
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)
            .expect("encoding a validated PDU must not fail");

        if buf.len() >= 4 {
            let length = buf.len() as u32;
            buf[0..4].copy_from_slice(&length.to_be_bytes());
        }

        buf.freeze()
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after the header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// The command_id this PDU type answers to
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status:?}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: CommandStatus,
    },

    #[error("Reserved sequence number: {0} (0 and 0xFFFFFFFF are reserved)")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// The SMPP command_status a peer should see for this decode failure.
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::UnexpectedCommandId { .. } => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" | "esme_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" | "sm_length" => CommandStatus::InvalidMsgLength,
                "message_id" => CommandStatus::InvalidMessageId,
                "system_id" => CommandStatus::InvalidSystemId,
                "password" => CommandStatus::InvalidPassword,
                "system_type" => CommandStatus::InvalidSystemType,
                "service_type" => CommandStatus::InvalidServiceType,
                "schedule_delivery_time" => CommandStatus::InvalidScheduledDeliveryTime,
                "validity_period" => CommandStatus::InvalidExpiryTime,
                _ => CommandStatus::SystemError,
            },
            CodecError::TlvError(_) => CommandStatus::InvalidOptionalPartStream,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a null-terminated C-octet string of at most `max_len` octets
/// (terminator included), advancing past the terminator.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let start = buf.position() as usize;
    let remaining = &buf.get_ref()[start..];
    if remaining.is_empty() {
        return Err(CodecError::Incomplete);
    }

    match remaining.iter().take(max_len).position(|&b| b == 0) {
        Some(end) => {
            let value = String::from_utf8(remaining[..end].to_vec())
                .map_err(|e| CodecError::Utf8Error { field, source: e })?;
            buf.set_position((start + end + 1) as u64);
            Ok(value)
        }
        None if remaining.len() < max_len => Err(CodecError::Incomplete),
        None => Err(CodecError::FieldValidation {
            field,
            reason: format!("missing NUL terminator within {max_len} octets"),
        }),
    }
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Decode exactly `len` raw octets
pub fn decode_bytes(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Encode a C-octet string: the value followed by a NUL terminator.
pub fn encode_cstring(buf: &mut BytesMut, value: &str) {
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}

/// Check a C-octet string fits its field before encoding: at most
/// `max_len - 1` value octets (the terminator takes the last), no interior NUL.
pub fn check_cstring(value: &str, max_len: usize, field: &'static str) -> Result<(), CodecError> {
    if value.len() > max_len - 1 {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("{} octets exceeds maximum of {}", value.len(), max_len - 1),
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(CodecError::FieldValidation {
            field,
            reason: "contains an interior NUL octet".to_string(),
        });
    }
    Ok(())
}

/// Typed sum of every PDU the session layer dispatches on.
///
/// The message-carrying PDUs are boxed to keep the enum small; everything
/// else is inline. `Unknown` preserves the raw body of unrecognized ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    Bind(crate::datatypes::Bind),
    BindResp(crate::datatypes::BindResponse),
    Outbind(crate::datatypes::Outbind),

    SubmitSm(Box<crate::datatypes::SubmitSm>),
    SubmitSmResp(crate::datatypes::SubmitSmResponse),
    DeliverSm(Box<crate::datatypes::DeliverSm>),
    DeliverSmResp(crate::datatypes::DeliverSmResponse),
    DataSm(Box<crate::datatypes::DataSm>),
    DataSmResp(crate::datatypes::DataSmResponse),

    QuerySm(crate::datatypes::QuerySm),
    QuerySmResp(crate::datatypes::QuerySmResponse),
    CancelSm(crate::datatypes::CancelSm),
    CancelSmResp(crate::datatypes::CancelSmResponse),
    ReplaceSm(crate::datatypes::ReplaceSm),
    ReplaceSmResp(crate::datatypes::ReplaceSmResponse),

    EnquireLink(crate::datatypes::EnquireLink),
    EnquireLinkResp(crate::datatypes::EnquireLinkResponse),
    Unbind(crate::datatypes::Unbind),
    UnbindResp(crate::datatypes::UnbindResponse),
    GenericNack(crate::datatypes::GenericNack),

    AlertNotification(crate::datatypes::AlertNotification),

    Unknown { header: PduHeader, body: Bytes },
}

impl Pdu {
    /// Decode the body following an already-decoded header.
    pub fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Pdu, CodecError> {
        use crate::datatypes::*;

        match header.command_id {
            CommandId::BindTransmitter | CommandId::BindReceiver | CommandId::BindTransceiver => {
                Bind::decode(header, buf).map(Pdu::Bind)
            }
            CommandId::BindTransmitterResp
            | CommandId::BindReceiverResp
            | CommandId::BindTransceiverResp => {
                BindResponse::decode(header, buf).map(Pdu::BindResp)
            }
            CommandId::Outbind => Outbind::decode(header, buf).map(Pdu::Outbind),
            CommandId::SubmitSm => {
                SubmitSm::decode(header, buf).map(|p| Pdu::SubmitSm(Box::new(p)))
            }
            CommandId::SubmitSmResp => SubmitSmResponse::decode(header, buf).map(Pdu::SubmitSmResp),
            CommandId::DeliverSm => {
                DeliverSm::decode(header, buf).map(|p| Pdu::DeliverSm(Box::new(p)))
            }
            CommandId::DeliverSmResp => {
                DeliverSmResponse::decode(header, buf).map(Pdu::DeliverSmResp)
            }
            CommandId::DataSm => DataSm::decode(header, buf).map(|p| Pdu::DataSm(Box::new(p))),
            CommandId::DataSmResp => DataSmResponse::decode(header, buf).map(Pdu::DataSmResp),
            CommandId::QuerySm => QuerySm::decode(header, buf).map(Pdu::QuerySm),
            CommandId::QuerySmResp => QuerySmResponse::decode(header, buf).map(Pdu::QuerySmResp),
            CommandId::CancelSm => CancelSm::decode(header, buf).map(Pdu::CancelSm),
            CommandId::CancelSmResp => CancelSmResponse::decode(header, buf).map(Pdu::CancelSmResp),
            CommandId::ReplaceSm => ReplaceSm::decode(header, buf).map(Pdu::ReplaceSm),
            CommandId::ReplaceSmResp => {
                ReplaceSmResponse::decode(header, buf).map(Pdu::ReplaceSmResp)
            }
            CommandId::EnquireLink => EnquireLink::decode(header, buf).map(Pdu::EnquireLink),
            CommandId::EnquireLinkResp => {
                EnquireLinkResponse::decode(header, buf).map(Pdu::EnquireLinkResp)
            }
            CommandId::Unbind => Unbind::decode(header, buf).map(Pdu::Unbind),
            CommandId::UnbindResp => UnbindResponse::decode(header, buf).map(Pdu::UnbindResp),
            CommandId::GenericNack => GenericNack::decode(header, buf).map(Pdu::GenericNack),
            CommandId::AlertNotification => {
                AlertNotification::decode(header, buf).map(Pdu::AlertNotification)
            }
            CommandId::Other(raw) => {
                let body_size = header.command_length as usize - PduHeader::SIZE;
                if buf.remaining() < body_size {
                    return Err(CodecError::Incomplete);
                }
                let body = buf.copy_to_bytes(body_size);
                tracing::warn!(
                    command_id = format_args!("{raw:#010x}"),
                    "unknown command_id, treating body as opaque"
                );
                Ok(Pdu::Unknown { header, body })
            }
        }
    }

    /// Encode this PDU to wire bytes.
    ///
    /// `Unknown` frames cannot be re-encoded; they exist only on the inbound
    /// path so the session can nack them.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        match self {
            Pdu::Bind(p) => Ok(p.to_bytes()),
            Pdu::BindResp(p) => Ok(p.to_bytes()),
            Pdu::Outbind(p) => Ok(p.to_bytes()),
            Pdu::SubmitSm(p) => Ok(p.to_bytes()),
            Pdu::SubmitSmResp(p) => Ok(p.to_bytes()),
            Pdu::DeliverSm(p) => Ok(p.to_bytes()),
            Pdu::DeliverSmResp(p) => Ok(p.to_bytes()),
            Pdu::DataSm(p) => Ok(p.to_bytes()),
            Pdu::DataSmResp(p) => Ok(p.to_bytes()),
            Pdu::QuerySm(p) => Ok(p.to_bytes()),
            Pdu::QuerySmResp(p) => Ok(p.to_bytes()),
            Pdu::CancelSm(p) => Ok(p.to_bytes()),
            Pdu::CancelSmResp(p) => Ok(p.to_bytes()),
            Pdu::ReplaceSm(p) => Ok(p.to_bytes()),
            Pdu::ReplaceSmResp(p) => Ok(p.to_bytes()),
            Pdu::EnquireLink(p) => Ok(p.to_bytes()),
            Pdu::EnquireLinkResp(p) => Ok(p.to_bytes()),
            Pdu::Unbind(p) => Ok(p.to_bytes()),
            Pdu::UnbindResp(p) => Ok(p.to_bytes()),
            Pdu::GenericNack(p) => Ok(p.to_bytes()),
            Pdu::AlertNotification(p) => Ok(p.to_bytes()),
            Pdu::Unknown { header, .. } => Err(CodecError::UnexpectedCommandId {
                expected: header.command_id,
                actual: header.command_id,
            }),
        }
    }

    /// The command_id of this PDU.
    pub fn command_id(&self) -> CommandId {
        match self {
            Pdu::Bind(p) => p.bind_type.command_id(),
            Pdu::BindResp(p) => p.bind_type.response_command_id(),
            Pdu::Outbind(_) => CommandId::Outbind,
            Pdu::SubmitSm(_) => CommandId::SubmitSm,
            Pdu::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Pdu::DeliverSm(_) => CommandId::DeliverSm,
            Pdu::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Pdu::DataSm(_) => CommandId::DataSm,
            Pdu::DataSmResp(_) => CommandId::DataSmResp,
            Pdu::QuerySm(_) => CommandId::QuerySm,
            Pdu::QuerySmResp(_) => CommandId::QuerySmResp,
            Pdu::CancelSm(_) => CommandId::CancelSm,
            Pdu::CancelSmResp(_) => CommandId::CancelSmResp,
            Pdu::ReplaceSm(_) => CommandId::ReplaceSm,
            Pdu::ReplaceSmResp(_) => CommandId::ReplaceSmResp,
            Pdu::EnquireLink(_) => CommandId::EnquireLink,
            Pdu::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Pdu::Unbind(_) => CommandId::Unbind,
            Pdu::UnbindResp(_) => CommandId::UnbindResp,
            Pdu::GenericNack(_) => CommandId::GenericNack,
            Pdu::AlertNotification(_) => CommandId::AlertNotification,
            Pdu::Unknown { header, .. } => header.command_id,
        }
    }

    /// The sequence number of this PDU.
    pub fn sequence_number(&self) -> u32 {
        match self {
            Pdu::Bind(p) => p.sequence_number,
            Pdu::BindResp(p) => p.sequence_number,
            Pdu::Outbind(p) => p.sequence_number,
            Pdu::SubmitSm(p) => p.sequence_number,
            Pdu::SubmitSmResp(p) => p.sequence_number,
            Pdu::DeliverSm(p) => p.sequence_number,
            Pdu::DeliverSmResp(p) => p.sequence_number,
            Pdu::DataSm(p) => p.sequence_number,
            Pdu::DataSmResp(p) => p.sequence_number,
            Pdu::QuerySm(p) => p.sequence_number,
            Pdu::QuerySmResp(p) => p.sequence_number,
            Pdu::CancelSm(p) => p.sequence_number,
            Pdu::CancelSmResp(p) => p.sequence_number,
            Pdu::ReplaceSm(p) => p.sequence_number,
            Pdu::ReplaceSmResp(p) => p.sequence_number,
            Pdu::EnquireLink(p) => p.sequence_number,
            Pdu::EnquireLinkResp(p) => p.sequence_number,
            Pdu::Unbind(p) => p.sequence_number,
            Pdu::UnbindResp(p) => p.sequence_number,
            Pdu::GenericNack(p) => p.sequence_number,
            Pdu::AlertNotification(p) => p.sequence_number,
            Pdu::Unknown { header, .. } => header.sequence_number,
        }
    }

    /// The command_status of this PDU (always `Ok` for requests).
    pub fn command_status(&self) -> CommandStatus {
        match self {
            Pdu::BindResp(p) => p.command_status,
            Pdu::SubmitSmResp(p) => p.command_status,
            Pdu::DeliverSmResp(p) => p.command_status,
            Pdu::DataSmResp(p) => p.command_status,
            Pdu::QuerySmResp(p) => p.command_status,
            Pdu::CancelSmResp(p) => p.command_status,
            Pdu::ReplaceSmResp(p) => p.command_status,
            Pdu::EnquireLinkResp(p) => p.command_status,
            Pdu::UnbindResp(p) => p.command_status,
            Pdu::GenericNack(p) => p.command_status,
            Pdu::Unknown { header, .. } => header.command_status,
            _ => CommandStatus::Ok,
        }
    }

    /// Whether this PDU is a response.
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{EnquireLink, EnquireLinkResponse, GenericNack, Unbind};

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            command_length: 16,
            command_id: CommandId::EnquireLink,
            command_status: CommandStatus::Ok,
            sequence_number: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
    }

    #[test]
    fn pdu_header_length_bounds() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // command_length too small
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));

        let data: &[u8] = &[
            0xFF, 0xFF, 0xFF, 0xFF, // command_length far too large
            0x00, 0x00, 0x00, 0x15, //
            0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x01, //
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));
    }

    #[test]
    fn pdu_header_reserved_sequence() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, //
            0x00, 0x00, 0x00, 0x15, //
            0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, // sequence_number 0 is reserved
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::ReservedSequenceNumber(0))));
    }

    #[test]
    fn generic_nack_may_carry_sequence_zero() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, //
            0x80, 0x00, 0x00, 0x00, // generic_nack
            0x00, 0x00, 0x00, 0x02, // InvalidCommandLength
            0x00, 0x00, 0x00, 0x00, // sequence unknown
        ];
        let mut cursor = Cursor::new(data);
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(header.command_id, CommandId::GenericNack);
        assert_eq!(header.sequence_number, 0);
    }

    #[test]
    fn pdu_header_request_status_must_be_zero() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, //
            0x00, 0x00, 0x00, 0x15, // enquire_link (request)
            0x00, 0x00, 0x00, 0x08, // SystemError on a request
            0x00, 0x00, 0x00, 0x07, //
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(
            result,
            Err(CodecError::InvalidRequestStatus { .. })
        ));
    }

    #[test]
    fn decode_cstring_stops_at_terminator() {
        let data = b"hello\0world";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 16, "test").unwrap();
        assert_eq!(result, "hello");
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn decode_cstring_empty() {
        let data = b"\0rest";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 16, "test").unwrap();
        assert_eq!(result, "");
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn decode_cstring_unterminated() {
        let data = b"0123456789ABCDEF!!";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 16, "test");
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation { field: "test", .. })
        ));
    }

    #[test]
    fn encode_cstring_appends_terminator() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "hello");
        assert_eq!(buf.as_ref(), b"hello\0");
    }

    #[test]
    fn check_cstring_limits() {
        assert!(check_cstring("123456789012345", 16, "system_id").is_ok());
        assert!(check_cstring("1234567890123456", 16, "system_id").is_err());
        assert!(check_cstring("a\0b", 16, "system_id").is_err());
    }

    #[test]
    fn decode_dispatch_enquire_link() {
        let bytes = EnquireLink::new(42).to_bytes();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let pdu = Pdu::decode(header, &mut cursor).unwrap();

        match pdu {
            Pdu::EnquireLink(decoded) => {
                assert_eq!(decoded.sequence_number, 42);
                assert_eq!(decoded.command_status, CommandStatus::Ok);
            }
            other => panic!("expected EnquireLink, got {other:?}"),
        }
    }

    #[test]
    fn decode_dispatch_unknown_id() {
        // submit_multi (0x21) is defined by the protocol but not dispatched
        let mut raw = Vec::new();
        raw.extend_from_slice(&20u32.to_be_bytes());
        raw.extend_from_slice(&0x0000_0021u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&9u32.to_be_bytes());
        raw.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut cursor = Cursor::new(raw.as_slice());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let pdu = Pdu::decode(header, &mut cursor).unwrap();

        match pdu {
            Pdu::Unknown { header, body } => {
                assert_eq!(header.command_id, CommandId::Other(0x21));
                assert_eq!(header.sequence_number, 9);
                assert_eq!(body.as_ref(), &[0xDE, 0xAD, 0xBE, 0xEF]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn unknown_pdu_cannot_be_encoded() {
        let pdu = Pdu::Unknown {
            header: PduHeader {
                command_length: 16,
                command_id: CommandId::Other(0x21),
                command_status: CommandStatus::Ok,
                sequence_number: 1,
            },
            body: Bytes::new(),
        };
        assert!(pdu.to_bytes().is_err());
    }

    #[test]
    fn pdu_accessors() {
        let pdu = Pdu::EnquireLink(EnquireLink::new(42));
        assert_eq!(pdu.command_id(), CommandId::EnquireLink);
        assert_eq!(pdu.sequence_number(), 42);
        assert!(!pdu.is_response());

        let pdu = Pdu::EnquireLinkResp(EnquireLinkResponse::new(43));
        assert_eq!(pdu.command_id(), CommandId::EnquireLinkResp);
        assert_eq!(pdu.sequence_number(), 43);
        assert!(pdu.is_response());

        let pdu = Pdu::GenericNack(GenericNack::error(7, CommandStatus::InvalidCommandId));
        assert_eq!(pdu.command_status(), CommandStatus::InvalidCommandId);

        let pdu = Pdu::Unbind(Unbind::new(5));
        assert_eq!(pdu.command_status(), CommandStatus::Ok);
    }

    #[test]
    fn header_round_trip_across_dispatch_ids() {
        // encode(decode(bytes)) must preserve the header fields bit-exactly
        let ids = [
            CommandId::BindTransmitter,
            CommandId::BindTransmitterResp,
            CommandId::BindReceiver,
            CommandId::BindTransceiver,
            CommandId::SubmitSm,
            CommandId::SubmitSmResp,
            CommandId::DeliverSm,
            CommandId::DeliverSmResp,
            CommandId::QuerySm,
            CommandId::QuerySmResp,
            CommandId::CancelSm,
            CommandId::ReplaceSm,
            CommandId::DataSm,
            CommandId::EnquireLink,
            CommandId::EnquireLinkResp,
            CommandId::Unbind,
            CommandId::UnbindResp,
            CommandId::GenericNack,
            CommandId::Outbind,
            CommandId::AlertNotification,
        ];

        for id in ids {
            let status = if id.is_response() {
                CommandStatus::SystemError
            } else {
                CommandStatus::Ok
            };
            let header = PduHeader {
                command_length: 16,
                command_id: id,
                command_status: status,
                sequence_number: 0x0102_0304,
            };

            let mut buf = BytesMut::new();
            header.encode(&mut buf).unwrap();
            assert_eq!(&buf[4..8], &u32::from(id).to_be_bytes());
            assert_eq!(&buf[12..16], &[0x01, 0x02, 0x03, 0x04]);

            let mut cursor = Cursor::new(buf.as_ref());
            let decoded = PduHeader::decode(&mut cursor).unwrap();
            assert_eq!(decoded, header);

            let mut again = BytesMut::new();
            decoded.encode(&mut again).unwrap();
            assert_eq!(buf, again);
        }
    }
}
