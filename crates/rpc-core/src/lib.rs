//! rpc-core: the invocation engine and concurrency fabric for the Fast RPC
//! runtime.
//!
//! Built on top of `rpc-protocol`'s framing, packet ids, and serializer —
//! this crate owns API registration, the pending-call table, routing, and
//! the `Session` façade that exposes `invoke`/`invoke_one_way` to embedding
//! code.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pending;
pub mod registry;
pub mod session;

pub use config::{DEFAULT_TIMEOUT, RpcConfig};
pub use dispatcher::{Dispatcher, ExceptionHook, OutboundSender};
pub use error::{ApiExecutionError, ApiNotFoundError, DispatchError, DuplicateIdError, InvokeError};
pub use pending::{Completion, PendingCallTable};
pub use registry::{
    ApiDescriptor, ApiRegistry, ApiRegistryBuilder, Handler, HandlerFuture, ParamType, ReturnType, handler0,
    handler1, handler2,
};
pub use session::Session;
