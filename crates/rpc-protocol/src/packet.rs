//! The atomic wire unit exchanged between two Fast RPC endpoints.

/// Maximum length of an `api_name`, constrained by the 2-byte length prefix
/// on the wire (see [`crate::codec`]).
pub const MAX_API_NAME_BYTES: usize = u16::MAX as usize;

/// A single framed packet: either an outgoing call/one-way, an incoming
/// request, or a reply/exception to a call this endpoint issued.
///
/// Fields mirror the wire layout exactly; see [`crate::codec::PacketCodec`]
/// for the byte-level encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Non-empty, UTF-8, at most [`MAX_API_NAME_BYTES`] bytes.
    pub api_name: String,
    pub packet_id: u32,
    /// Set by the originator on a request; echoed verbatim on the reply.
    pub is_from_client: bool,
    /// When true, `body` is a UTF-8 error message rather than a value.
    pub is_exception: bool,
    pub body: Vec<u8>,
}

impl Packet {
    /// Build a request/one-way packet.
    pub fn request(api_name: impl Into<String>, packet_id: u32, is_from_client: bool, body: Vec<u8>) -> Self {
        Packet {
            api_name: api_name.into(),
            packet_id,
            is_from_client,
            is_exception: false,
            body,
        }
    }

    /// Build a reply that echoes `request`'s id and direction flag, per the
    /// echo rule.
    pub fn reply_to(request: &Packet, body: Vec<u8>) -> Self {
        Packet {
            api_name: request.api_name.clone(),
            packet_id: request.packet_id,
            is_from_client: request.is_from_client,
            is_exception: false,
            body,
        }
    }

    /// Build an exception reply that echoes `request`'s id and direction
    /// flag, carrying `message` as its UTF-8 body.
    pub fn exception_reply_to(request: &Packet, message: &str) -> Self {
        Packet {
            api_name: request.api_name.clone(),
            packet_id: request.packet_id,
            is_from_client: request.is_from_client,
            is_exception: true,
            body: message.as_bytes().to_vec(),
        }
    }

    /// True when this packet is a reply/exception to a call `self_is_client`
    /// originated.
    pub fn is_reply_for(&self, self_is_client: bool) -> bool {
        self.is_from_client == self_is_client
    }
}
