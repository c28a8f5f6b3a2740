//! fast-rpc: a framed, bidirectional RPC runtime over a reliable byte
//! stream (TCP). Either peer may serve named procedures and invoke the
//! other peer's, with many calls in flight on one connection at once.
//!
//! This crate is a thin umbrella re-exporting `rpc-protocol` (wire framing,
//! packet ids, the pluggable [`Serializer`]) and `rpc-core` (the API
//! registry, pending-call table, dispatcher, and [`Session`] façade) —
//! see each crate's own docs for the pieces that live there.

pub use rpc_core::{
    ApiDescriptor, ApiExecutionError, ApiNotFoundError, ApiRegistry, ApiRegistryBuilder, Completion, DispatchError,
    Dispatcher, DuplicateIdError, ExceptionHook, Handler, HandlerFuture, InvokeError, OutboundSender, ParamType,
    PendingCallTable, RpcConfig, ReturnType, Session, handler0, handler1, handler2,
};
pub use rpc_protocol::{
    DEFAULT_MAX_FRAME_BYTES, JsonSerializer, MAX_API_NAME_BYTES, Packet, PacketCodec, PacketIdSource, ProtocolError,
    Serializer, SerializerError, decode_case_insensitive, encode_typed, lower_case_keys,
};
