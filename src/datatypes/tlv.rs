// ABOUTME: This module implements SMPP v3.4 optional parameters (TLV-encoded fields)
// ABOUTME: Provides the Tlv type, batch encode/decode helpers, and well-known tag constants

use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Well-known optional parameter tags (SMPP v3.4 section 5.3.2)
pub mod tags {
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const MS_AVAILABILITY_STATUS: u16 = 0x0422;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const DELIVERY_FAILURE_REASON: u16 = 0x0425;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
}

/// An SMPP optional parameter: tag, length, then `length` value octets.
///
/// The length field is derived from the value at encode time so the two can
/// never disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    pub tag: u16,
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Convenience constructor for single-octet parameters.
    pub fn single_octet(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    /// The value of the length field on the wire.
    pub fn len(&self) -> u16 {
        self.value.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.value.len() > u16::MAX as usize {
            return Err(CodecError::TlvError(format!(
                "value of tag {:#06x} is {} octets, exceeds u16 length field",
                self.tag,
                self.value.len()
            )));
        }
        buf.put_u16(self.tag);
        buf.put_u16(self.value.len() as u16);
        buf.put_slice(&self.value);
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::TlvError(format!(
                "truncated TLV header: {} octets remaining",
                buf.remaining()
            )));
        }
        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvError(format!(
                "TLV {tag:#06x} declares {length} value octets, only {} remain",
                buf.remaining()
            )));
        }
        let value = buf.copy_to_bytes(length);
        Ok(Self { tag, value })
    }

    /// Decode optional parameters until the buffer is exhausted.
    pub fn decode_all(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
        let mut tlvs = Vec::new();
        while buf.has_remaining() {
            tlvs.push(Tlv::decode(buf)?);
        }
        Ok(tlvs)
    }

    /// Encode a slice of optional parameters in order.
    pub fn encode_all(tlvs: &[Tlv], buf: &mut BytesMut) -> Result<(), CodecError> {
        for tlv in tlvs {
            tlv.encode(buf)?;
        }
        Ok(())
    }

    /// Total encoded size of a slice of optional parameters.
    pub fn size_of_all(tlvs: &[Tlv]) -> usize {
        tlvs.iter().map(Tlv::encoded_size).sum()
    }

    /// Find the first parameter with the given tag.
    pub fn find(tlvs: &[Tlv], tag: u16) -> Option<&Tlv> {
        tlvs.iter().find(|tlv| tlv.tag == tag)
    }
}
