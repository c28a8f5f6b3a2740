//! rpc-protocol: wire framing, packet ids, and pluggable serialization for
//! the Fast RPC runtime.
//!
//! This crate owns the parts of the system that are pure data and codec —
//! no sockets, no scheduling, no handler dispatch. See `rpc-core` for the
//! invocation engine and concurrency fabric built on top of it.

pub mod codec;
pub mod id;
pub mod packet;
pub mod serializer;

pub use codec::{DEFAULT_MAX_FRAME_BYTES, PacketCodec, ProtocolError};
pub use id::PacketIdSource;
pub use packet::{MAX_API_NAME_BYTES, Packet};
pub use serializer::{JsonSerializer, Serializer, SerializerError, decode_case_insensitive, encode_typed, lower_case_keys};
