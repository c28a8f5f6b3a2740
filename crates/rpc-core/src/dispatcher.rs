//! Routes a decoded packet to either the pending-call table or the API
//! registry.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use rpc_protocol::{Packet, Serializer};

use crate::error::{ApiExecutionError, ApiNotFoundError, DispatchError};
use crate::pending::PendingCallTable;
use crate::registry::{ApiRegistry, ReturnType, check_arg_types};

/// Cheap, cloneable handle for enqueueing an outgoing packet onto a
/// session's writer task. Sending after the writer has gone away is a
/// silent no-op — the connection is already tearing down.
#[derive(Clone)]
pub struct OutboundSender(mpsc::UnboundedSender<Packet>);

impl OutboundSender {
    pub fn new(sender: mpsc::UnboundedSender<Packet>) -> Self {
        Self(sender)
    }

    pub fn send(&self, packet: Packet) {
        if self.0.send(packet).is_err() {
            debug!("dropped outgoing packet: writer task is gone");
        }
    }
}

/// Called once per dispatch exception, in registration order for aggregate
/// errors. Returning `true` means "handled"; a `false`/default hook just
/// logs and continues — dispatch never aborts the connection because a
/// single request failed.
pub type ExceptionHook = Arc<dyn Fn(&Packet, &DispatchError) -> bool + Send + Sync>;

pub struct Dispatcher {
    registry: Arc<ApiRegistry>,
    pending: Arc<PendingCallTable>,
    serializer: Arc<dyn Serializer>,
    on_exception: ExceptionHook,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ApiRegistry>,
        pending: Arc<PendingCallTable>,
        serializer: Arc<dyn Serializer>,
        on_exception: ExceptionHook,
    ) -> Self {
        Self {
            registry,
            pending,
            serializer,
            on_exception,
        }
    }

    /// Route one decoded packet. `self_is_client` is this endpoint's own
    /// role; a packet is a reply exactly when `packet.is_from_client ==
    /// self_is_client`.
    pub async fn dispatch(&self, self_is_client: bool, packet: Packet, outbound: &OutboundSender) {
        if packet.is_reply_for(self_is_client) {
            self.route_reply(packet);
        } else {
            self.route_request(packet, outbound).await;
        }
    }

    fn route_reply(&self, packet: Packet) {
        if packet.is_exception {
            let message = String::from_utf8_lossy(&packet.body).into_owned();
            self.pending.complete_remote_error(packet.packet_id, message);
        } else {
            self.pending.complete_value(packet.packet_id, packet.body);
        }
    }

    async fn route_request(&self, packet: Packet, outbound: &OutboundSender) {
        let Some(descriptor) = self.registry.try_get(&packet.api_name) else {
            let error = ApiNotFoundError(packet.api_name.clone());
            outbound.send(Packet::exception_reply_to(&packet, &error.to_string()));
            self.report(&packet, DispatchError::from(error));
            return;
        };

        let args = match self.decode_args(&packet) {
            Ok(args) => args,
            Err(decode_err) => {
                let error = ApiExecutionError::new(decode_err.to_string());
                outbound.send(Packet::exception_reply_to(&packet, &error.to_string()));
                self.report(&packet, DispatchError::from(error));
                return;
            }
        };

        if let Err(error) = check_arg_types(&args, &descriptor.parameter_types) {
            outbound.send(Packet::exception_reply_to(&packet, &error.to_string()));
            self.report(&packet, DispatchError::from(error));
            return;
        }

        match descriptor.invoke.invoke(args).await {
            Ok(result) => self.reply_with_result(&packet, descriptor.return_type, result, outbound),
            Err(error) => {
                outbound.send(Packet::exception_reply_to(&packet, &error.message));
                for cause in error.all_causes() {
                    self.report(&packet, DispatchError::ApiExecution(cause.clone()));
                }
            }
        }
    }

    fn reply_with_result(
        &self,
        packet: &Packet,
        return_type: ReturnType,
        result: Option<Value>,
        outbound: &OutboundSender,
    ) {
        if matches!(return_type, ReturnType::Void) {
            return;
        }
        let Some(value) = result else { return };
        match self.serializer.encode_value(&value) {
            Ok(body) => outbound.send(Packet::reply_to(packet, body)),
            Err(encode_err) => {
                let error = ApiExecutionError::new(encode_err.to_string());
                outbound.send(Packet::exception_reply_to(packet, &error.to_string()));
                self.report(packet, DispatchError::from(error));
            }
        }
    }

    fn decode_args(&self, packet: &Packet) -> Result<Vec<Value>, rpc_protocol::SerializerError> {
        let value = self.serializer.decode_value(&packet.body)?;
        match value {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }

    fn report(&self, packet: &Packet, error: DispatchError) {
        if !(self.on_exception)(packet, &error) {
            warn!(api = %packet.api_name, packet_id = packet.packet_id, %error, "unhandled dispatch exception (continuing)");
        }
    }
}
