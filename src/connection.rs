// ABOUTME: Frame-level transport for SMPP connections over TCP
// ABOUTME: Splits the stream into an owned reader and buffered writer so independent tasks can drive each half

use crate::codec::{CodecError, Pdu, PduHeader, MAX_PDU_SIZE};
use bytes::BytesMut;
use std::io::{self, Cursor};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Errors surfaced by [`FrameReader::read_pdu`].
///
/// The distinction matters to the caller: a `Malformed` PDU arrived inside a
/// well-delimited frame, so the stream is still synchronized and the session
/// can reply with a negative acknowledgement and keep reading. A `Framing`
/// error means the length prefix itself cannot be trusted and the connection
/// has to go.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The length prefix is outside protocol bounds; frame boundaries are lost.
    #[error("unrecoverable framing violation: {0}")]
    Framing(CodecError),

    /// A complete frame arrived but its contents failed validation.
    #[error("malformed PDU (command_id {command_id:#010x}, sequence {sequence_number}): {source}")]
    Malformed {
        command_id: u32,
        sequence_number: u32,
        #[source]
        source: CodecError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Reads length-delimited SMPP frames from the read half of a connection.
///
/// Incoming bytes are accumulated in an internal buffer; a PDU is parsed out
/// as soon as its declared command_length worth of bytes has arrived. Data
/// beyond the frame stays buffered for the next call.
#[derive(Debug)]
pub struct FrameReader {
    io: OwnedReadHalf,
    buffer: BytesMut,
}

impl FrameReader {
    pub fn new(io: OwnedReadHalf) -> Self {
        Self {
            io,
            // 4KB default; most PDUs fit in a fraction of this
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single PDU from the underlying stream.
    ///
    /// Returns `Ok(None)` when the peer closes the connection on a frame
    /// boundary. A close mid-frame is reported as an IO error, because data
    /// was lost.
    ///
    /// Cancel safety: the only await point is `read_buf`, which either
    /// appends whole reads to the buffer or does nothing, so this future can
    /// be raced inside `select!` or wrapped in a timeout without losing
    /// partial frames.
    pub async fn read_pdu(&mut self) -> Result<Option<Pdu>, ReadError> {
        loop {
            if let Some(pdu) = self.parse_pdu()? {
                return Ok(Some(pdu));
            }

            // Not enough buffered data for a full frame; pull more from the
            // socket. Zero bytes read means end of stream.
            if 0 == self.io.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ReadError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer mid-frame",
                )));
            }
        }
    }

    /// Try to parse one PDU out of the buffer. `Ok(None)` means more data is
    /// needed.
    fn parse_pdu(&mut self) -> Result<Option<Pdu>, ReadError> {
        if self.buffer.len() < PduHeader::SIZE {
            return Ok(None);
        }

        // Gate on the declared length before trusting it to delimit a frame
        let declared = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);
        if declared < PduHeader::SIZE as u32 || declared > MAX_PDU_SIZE {
            return Err(ReadError::Framing(CodecError::InvalidPduLength {
                length: declared,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            }));
        }

        let len = declared as usize;
        if self.buffer.len() < len {
            return Ok(None);
        }

        let frame = self.buffer.split_to(len).freeze();

        // Keep the raw id and sequence so a decode failure can still be
        // nacked at the right sequence number
        let raw_id = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
        let raw_seq = u32::from_be_bytes([frame[12], frame[13], frame[14], frame[15]]);

        let mut cursor = Cursor::new(frame.as_ref());
        let header = PduHeader::decode(&mut cursor).map_err(|e| match e {
            CodecError::InvalidPduLength { .. } | CodecError::Incomplete => ReadError::Framing(e),
            e => ReadError::Malformed {
                command_id: raw_id,
                sequence_number: raw_seq,
                source: e,
            },
        })?;

        let pdu = Pdu::decode(header, &mut cursor).map_err(|e| ReadError::Malformed {
            command_id: raw_id,
            sequence_number: raw_seq,
            source: e,
        })?;

        Ok(Some(pdu))
    }
}

/// Writes SMPP frames to the write half of a connection.
///
/// The half is decorated with a `BufWriter`; every `write_pdu` flushes, so
/// request/response latency is never traded for batching.
#[derive(Debug)]
pub struct FrameWriter {
    io: BufWriter<OwnedWriteHalf>,
}

impl FrameWriter {
    pub fn new(io: OwnedWriteHalf) -> Self {
        Self {
            io: BufWriter::new(io),
        }
    }

    /// Encode and write a single PDU, then flush.
    pub async fn write_pdu(&mut self, pdu: &Pdu) -> io::Result<()> {
        let bytes = pdu
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.io.write_all(&bytes).await?;
        self.io.flush().await
    }

    /// Flush buffered data and shut down the write direction.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.io.shutdown().await
    }
}

/// Split a connected stream into an SMPP frame reader and writer pair.
pub fn split(stream: TcpStream) -> (FrameReader, FrameWriter) {
    let (read_half, write_half) = stream.into_split();
    (FrameReader::new(read_half), FrameWriter::new(write_half))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::{CommandId, EnquireLink, SubmitSm};
    use tokio::net::TcpListener;

    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn round_trip_over_tcp() {
        let (client, server) = tcp_pair().await;
        let (_, mut writer) = split(client);
        let (mut reader, _) = split(server);

        writer
            .write_pdu(&Pdu::EnquireLink(EnquireLink::new(7)))
            .await
            .unwrap();

        let pdu = reader.read_pdu().await.unwrap().unwrap();
        assert_eq!(pdu.command_id(), CommandId::EnquireLink);
        assert_eq!(pdu.sequence_number(), 7);
    }

    #[tokio::test]
    async fn reassembles_partial_frames() {
        let (client, server) = tcp_pair().await;
        let (mut client_read, _client_write) = client.into_split();
        let _ = &mut client_read; // read half unused, keep the socket alive
        let (mut reader, _) = split(server);

        let submit = SubmitSm::builder()
            .sequence_number(3)
            .destination_addr("15557654321")
            .short_message(&b"split across writes"[..])
            .build()
            .unwrap();
        let bytes = Pdu::SubmitSm(Box::new(submit)).to_bytes().unwrap();

        let (mut a, b) = {
            let mid = bytes.len() / 2;
            (bytes.slice(..mid), bytes.slice(mid..))
        };

        let handle = tokio::spawn(async move { reader.read_pdu().await });

        let mut raw = _client_write;
        use tokio::io::AsyncWriteExt as _;
        raw.write_all_buf(&mut a).await.unwrap();
        tokio::task::yield_now().await;
        raw.write_all(&b).await.unwrap();

        let pdu = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(pdu.command_id(), CommandId::SubmitSm);
        assert_eq!(pdu.sequence_number(), 3);
    }

    #[tokio::test]
    async fn clean_close_yields_none() {
        let (client, server) = tcp_pair().await;
        drop(client);

        let (mut reader, _) = split(server);
        assert!(reader.read_pdu().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undersized_length_prefix_is_framing_error() {
        let (mut client, server) = tcp_pair().await;
        let (mut reader, _) = split(server);

        // command_length 8 cannot even cover the header
        client
            .write_all(&[
                0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x15, //
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            ])
            .await
            .unwrap();

        match reader.read_pdu().await {
            Err(ReadError::Framing(CodecError::InvalidPduLength { length: 8, .. })) => {}
            other => panic!("expected framing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_recovers_sequence_number() {
        let (mut client, server) = tcp_pair().await;
        let (mut reader, _) = split(server);

        // submit_sm frame whose body is a single stray octet
        client
            .write_all(&[
                0x00, 0x00, 0x00, 0x11, // command_length = 17
                0x00, 0x00, 0x00, 0x04, // submit_sm
                0x00, 0x00, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x2A, // sequence 42
                0xFF,
            ])
            .await
            .unwrap();

        match reader.read_pdu().await {
            Err(ReadError::Malformed {
                command_id: 4,
                sequence_number: 42,
                ..
            }) => {}
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_does_not_desynchronize_stream() {
        let (mut client, server) = tcp_pair().await;
        let (mut reader, _) = split(server);

        let mut bytes = Vec::new();
        // reserved sequence number zero on a request
        bytes.extend_from_slice(&[
            0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x15, //
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        bytes.extend_from_slice(&EnquireLink::new(9).to_bytes());
        client.write_all(&bytes).await.unwrap();

        assert!(matches!(
            reader.read_pdu().await,
            Err(ReadError::Malformed {
                sequence_number: 0,
                ..
            })
        ));

        // next frame parses cleanly
        let pdu = reader.read_pdu().await.unwrap().unwrap();
        assert_eq!(pdu.sequence_number(), 9);
    }

    #[tokio::test]
    async fn unknown_command_id_passes_through() {
        let (mut client, server) = tcp_pair().await;
        let (mut reader, _) = split(server);

        client
            .write_all(&[
                0x00, 0x00, 0x00, 0x12, // command_length = 18
                0x00, 0x00, 0x00, 0x21, // submit_multi, not dispatched
                0x00, 0x00, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x05, //
                0xAB, 0xCD,
            ])
            .await
            .unwrap();

        match reader.read_pdu().await.unwrap().unwrap() {
            Pdu::Unknown { header, body } => {
                assert_eq!(header.command_id, CommandId::Other(0x21));
                assert_eq!(body.as_ref(), &[0xAB, 0xCD]);
            }
            other => panic!("expected unknown PDU, got {other:?}"),
        }
    }
}
