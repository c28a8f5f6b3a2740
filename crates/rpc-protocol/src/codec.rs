//! Frame codec: encodes/decodes [`Packet`]s on the wire.
//!
//! Wire format, big-endian throughout:
//!
//! ```text
//! offset  size  field
//! 0       4     total_length   (u32, counts bytes that follow)
//! 4       2     api_name_len   (u16)
//! 6       N     api_name       (UTF-8, N = api_name_len)
//! 6+N     4     packet_id      (u32)
//! 10+N    1     is_from_client (0|1)
//! 11+N    1     is_exception   (0|1)
//! 12+N    rest  body
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::packet::{MAX_API_NAME_BYTES, Packet};

/// Default cap on `total_length` before a frame is rejected as malformed.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Fixed header cost (everything counted by `total_length` besides the
/// variable-length api name and body): `api_name_len(2) + packet_id(4) +
/// is_from_client(1) + is_exception(1)`.
const FIXED_HEADER_LEN: usize = 8;
const LENGTH_PREFIX_LEN: usize = 4;

/// Malformed frame — fatal to the connection.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ProtocolError {
    #[error("frame length {0} exceeds configured maximum {1}")]
    FrameTooLarge(usize, usize),
    #[error("api_name_len {api_name_len} exceeds remaining frame bytes {remaining}")]
    ApiNameOverflow { api_name_len: usize, remaining: usize },
    #[error("api_name is empty")]
    EmptyApiName,
    #[error("api_name is not valid UTF-8")]
    InvalidApiNameUtf8,
    #[error("boolean flag byte {0:#04x} is neither 0 nor 1")]
    InvalidBooleanByte(u8),
    #[error("api_name {0} bytes exceeds the maximum of {MAX_API_NAME_BYTES}")]
    ApiNameTooLong(usize),
}

/// Stateless `tokio_util` codec for [`Packet`]s over any byte stream.
///
/// Implements the accumulate/peek/consume and encode/decode halves as
/// the `Decoder`/`Encoder` trait pair: `BytesMut` already gives
/// append, peek-without-consuming, and prefix-consume, so there is no
/// separate buffer type to hand-roll.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    max_frame_bytes: usize,
}

impl PacketCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        PacketCodec { max_frame_bytes }
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        PacketCodec::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, ProtocolError> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let total_length = u32::from_be_bytes(src[0..4].try_into().unwrap()) as usize;
        if total_length > self.max_frame_bytes {
            return Err(ProtocolError::FrameTooLarge(total_length, self.max_frame_bytes));
        }

        let frame_len = LENGTH_PREFIX_LEN + total_length;
        if src.len() < frame_len {
            // Reserve the rest of the frame up front to avoid repeated
            // reallocation while more bytes trickle in.
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        if total_length < FIXED_HEADER_LEN {
            return Err(ProtocolError::ApiNameOverflow {
                api_name_len: 0,
                remaining: total_length,
            });
        }

        let api_name_len = u16::from_be_bytes(src[4..6].try_into().unwrap()) as usize;
        if api_name_len == 0 {
            return Err(ProtocolError::EmptyApiName);
        }
        let remaining_after_len = total_length - 2;
        if api_name_len + (FIXED_HEADER_LEN - 2) > remaining_after_len {
            return Err(ProtocolError::ApiNameOverflow {
                api_name_len,
                remaining: remaining_after_len,
            });
        }

        let name_start = 6;
        let name_end = name_start + api_name_len;
        let api_name = std::str::from_utf8(&src[name_start..name_end])
            .map_err(|_| ProtocolError::InvalidApiNameUtf8)?
            .to_owned();

        let id_start = name_end;
        let packet_id = u32::from_be_bytes(src[id_start..id_start + 4].try_into().unwrap());

        let from_client_byte = src[id_start + 4];
        let is_from_client = parse_bool(from_client_byte)?;
        let exception_byte = src[id_start + 5];
        let is_exception = parse_bool(exception_byte)?;

        let body_start = id_start + 6;
        let body = src[body_start..LENGTH_PREFIX_LEN + total_length].to_vec();

        src.advance(frame_len);

        Ok(Some(Packet {
            api_name,
            packet_id,
            is_from_client,
            is_exception,
            body,
        }))
    }
}

fn parse_bool(byte: u8) -> Result<bool, ProtocolError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProtocolError::InvalidBooleanByte(other)),
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if packet.api_name.is_empty() {
            return Err(ProtocolError::EmptyApiName);
        }
        if packet.api_name.len() > MAX_API_NAME_BYTES {
            return Err(ProtocolError::ApiNameTooLong(packet.api_name.len()));
        }

        let name_bytes = packet.api_name.as_bytes();
        let total_length = FIXED_HEADER_LEN + name_bytes.len() + packet.body.len();

        dst.reserve(LENGTH_PREFIX_LEN + total_length);
        dst.put_u32(total_length as u32);
        dst.put_u16(name_bytes.len() as u16);
        dst.put_slice(name_bytes);
        dst.put_u32(packet.packet_id);
        dst.put_u8(packet.is_from_client as u8);
        dst.put_u8(packet.is_exception as u8);
        dst.put_slice(&packet.body);

        Ok(())
    }
}
