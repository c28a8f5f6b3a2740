//! Session endpoint: the public façade a caller uses to invoke the peer's
//! APIs and that the connection's own reader/writer loops run behind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, error, warn};

use rpc_protocol::{Packet, PacketCodec, PacketIdSource, SerializerError, decode_case_insensitive};

use crate::config::RpcConfig;
use crate::dispatcher::{Dispatcher, ExceptionHook, OutboundSender};
use crate::error::InvokeError;
use crate::pending::{Completion, PendingCallTable, spawn_timeout_sweep};
use crate::registry::ApiRegistry;

/// One live RPC endpoint over a single TCP connection.
///
/// Cloning is cheap — every clone shares the same reader loop, writer task,
/// packet-id source, and pending-call table; the transport's send side is
/// serialized by routing every clone's writes through one task that owns
/// the sink.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    self_is_client: bool,
    config: RpcConfig,
    id_source: PacketIdSource,
    pending: Arc<PendingCallTable>,
    outbound: OutboundSender,
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    sweep: JoinHandle<()>,
}

impl Session {
    /// Take ownership of an already-connected `TcpStream` and start serving
    /// it: `self_is_client` is this endpoint's own role and is stamped onto
    /// every request this side originates. `registry` must be fully built
    /// before this call — registration is frozen before the endpoint
    /// starts accepting packets.
    pub fn connect(
        stream: TcpStream,
        self_is_client: bool,
        config: RpcConfig,
        registry: Arc<ApiRegistry>,
        on_exception: ExceptionHook,
    ) -> Session {
        let framed = Framed::new(stream, PacketCodec::new(config.max_frame_bytes));
        let (mut sink, mut incoming) = framed.split();

        let pending = PendingCallTable::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<Packet>();
        let outbound = OutboundSender::new(tx);
        let connected = Arc::new(AtomicBool::new(true));

        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            pending.clone(),
            config.serializer.clone(),
            on_exception,
        ));

        let writer = tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                if let Err(err) = sink.send(packet).await {
                    warn!(%err, "failed to write packet; writer task stopping");
                    break;
                }
            }
            debug!("writer task stopped");
        });

        let sweep = spawn_timeout_sweep(pending.clone(), config.timeout);

        let reader_pending = pending.clone();
        let reader_connected = connected.clone();
        let reader_outbound = outbound.clone();
        let reader = tokio::spawn(async move {
            loop {
                match incoming.next().await {
                    Some(Ok(packet)) => {
                        // Decode order is preserved by this loop; each
                        // packet's handling is spawned independently so
                        // handler execution may run in parallel.
                        let dispatcher = dispatcher.clone();
                        let outbound = reader_outbound.clone();
                        tokio::spawn(async move {
                            dispatcher.dispatch(self_is_client, packet, &outbound).await;
                        });
                    }
                    Some(Err(err)) => {
                        error!(%err, "fatal protocol error, closing connection");
                        break;
                    }
                    None => {
                        debug!("peer closed the connection");
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            let cancelled = reader_pending.take_all();
            if cancelled > 0 {
                debug!(cancelled, "resolved pending calls as shutdown");
            }
        });

        Session {
            inner: Arc::new(Inner {
                self_is_client,
                config,
                id_source: PacketIdSource::new(),
                pending,
                outbound,
                connected,
                reader,
                writer,
                sweep,
            }),
        }
    }

    /// Whether the underlying connection is still believed to be up.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Invoke `api_name` without waiting for (or expecting) a reply. `args`
    /// encodes as a JSON array — pass a tuple or a `Vec`.
    pub async fn invoke_one_way<A>(&self, api_name: &str, args: A) -> Result<(), InvokeError>
    where
        A: Serialize,
    {
        if !self.is_connected() {
            return Err(InvokeError::Disconnected);
        }
        let packet_id = self.inner.id_source.next();
        let body = self.encode_args(args)?;
        let packet = Packet::request(api_name, packet_id, self.inner.self_is_client, body);
        self.inner.outbound.send(packet);
        Ok(())
    }

    /// Invoke `api_name` and await its typed reply, subject to the
    /// configured per-call timeout.
    pub async fn invoke<T, A>(&self, api_name: &str, args: A) -> Result<T, InvokeError>
    where
        T: DeserializeOwned,
        A: Serialize,
    {
        if !self.is_connected() {
            return Err(InvokeError::Disconnected);
        }

        let packet_id = self.inner.id_source.next();
        let body = self.encode_args(args)?;
        let deadline = Instant::now() + self.inner.config.timeout;
        let receiver = self.inner.pending.park(packet_id, deadline)?;

        let packet = Packet::request(api_name, packet_id, self.inner.self_is_client, body);
        self.inner.outbound.send(packet);

        match receiver.await {
            Ok(Completion::Value(bytes)) => {
                let value = self
                    .inner
                    .config
                    .serializer
                    .decode_value(&bytes)
                    .map_err(InvokeError::Decode)?;
                decode_case_insensitive(value).map_err(InvokeError::Decode)
            }
            Ok(Completion::RemoteError(message)) => Err(InvokeError::Remote(message)),
            Ok(Completion::Timeout) => Err(InvokeError::Timeout),
            Ok(Completion::Shutdown) => Err(InvokeError::Shutdown),
            // The sender half is only ever dropped by the pending table
            // itself completing it, so a recv error means the slot was
            // dropped without resolution — treat it the same as shutdown.
            Err(_) => Err(InvokeError::Shutdown),
        }
    }

    /// Tear the connection down immediately: aborts the reader, writer, and
    /// timeout-sweep tasks and resolves every still-pending call as
    /// `Shutdown`.
    pub fn shutdown(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.reader.abort();
        self.inner.writer.abort();
        self.inner.sweep.abort();
        self.inner.pending.take_all();
    }

    /// Encode `args` as the ordered argument vector a request body carries.
    /// `()` (zero arguments) serializes to `null` under plain `serde_json`,
    /// but the wire contract wants an empty array there, not a bare null —
    /// normalize that one case before handing off to the serializer.
    fn encode_args<A: Serialize>(&self, args: A) -> Result<Vec<u8>, InvokeError> {
        let mut value = serde_json::to_value(&args).map_err(|e| InvokeError::Encode(SerializerError::Encode(e.to_string())))?;
        if value.is_null() {
            value = Value::Array(Vec::new());
        }
        self.inner
            .config
            .serializer
            .encode_value(&value)
            .map_err(InvokeError::Encode)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        self.sweep.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiExecutionError;
    use crate::registry::{ApiRegistryBuilder, ParamType, ReturnType, handler1};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn no_op_hook() -> ExceptionHook {
        Arc::new(|_packet, _error| false)
    }

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let accept = listener.accept();
        let (client, (server, _)) = tokio::join!(connect, accept);
        (client.unwrap(), server)
    }

    #[tokio::test]
    async fn invoke_round_trips_through_a_real_tcp_connection() {
        let (client_stream, server_stream) = loopback_pair().await;

        let echo = handler1(|s: String| async move { Ok::<_, ApiExecutionError>(s) });
        let server_registry = Arc::new(
            ApiRegistryBuilder::new()
                .register("echo", vec![ParamType::String], ReturnType::Value(ParamType::String), echo)
                .build(),
        );
        let _server = Session::connect(server_stream, false, RpcConfig::new(), server_registry, no_op_hook());

        let client_registry = Arc::new(ApiRegistryBuilder::new().build());
        let client = Session::connect(client_stream, true, RpcConfig::new(), client_registry, no_op_hook());

        let reply: String = client.invoke("echo", ("hi",)).await.unwrap();
        assert_eq!(reply, "hi");
    }

    #[tokio::test]
    async fn a_zero_argument_call_encodes_its_body_as_an_empty_array() {
        let (client_stream, server_stream) = loopback_pair().await;
        let _server_stream = server_stream;

        let client_registry = Arc::new(ApiRegistryBuilder::new().build());
        let client = Session::connect(client_stream, true, RpcConfig::new(), client_registry, no_op_hook());

        let body = client.encode_args(()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!([]));
    }

    #[tokio::test]
    async fn invoking_an_unregistered_api_yields_a_remote_error() {
        let (client_stream, server_stream) = loopback_pair().await;

        let server_registry = Arc::new(ApiRegistryBuilder::new().build());
        let _server = Session::connect(server_stream, false, RpcConfig::new(), server_registry, no_op_hook());

        let client_registry = Arc::new(ApiRegistryBuilder::new().build());
        let client = Session::connect(client_stream, true, RpcConfig::new(), client_registry, no_op_hook());

        let err = client.invoke::<String, _>("nope", ()).await.unwrap_err();
        assert!(matches!(err, InvokeError::Remote(msg) if msg.contains("nope")));
    }

    #[tokio::test]
    async fn timeout_resolves_when_the_peer_never_replies() {
        let (client_stream, server_stream) = loopback_pair().await;
        // Hold the server stream open but never drive a Session on it, so
        // the request is read off the wire by nobody and never replied to.
        let _server_stream = server_stream;

        let client_registry = Arc::new(ApiRegistryBuilder::new().build());
        let config = RpcConfig::new().with_timeout(Duration::from_millis(50));
        let client = Session::connect(client_stream, true, config, client_registry, no_op_hook());

        let err = client.invoke::<String, _>("slow", ()).await.unwrap_err();
        assert!(matches!(err, InvokeError::Timeout));
    }

    #[tokio::test]
    async fn shutdown_resolves_pending_calls_and_marks_the_session_disconnected() {
        let (client_stream, server_stream) = loopback_pair().await;
        let _server_stream = server_stream;

        let client_registry = Arc::new(ApiRegistryBuilder::new().build());
        let config = RpcConfig::new().with_timeout(Duration::from_secs(30));
        let client = Session::connect(client_stream, true, config, client_registry, no_op_hook());

        let client_for_call = client.clone();
        let call = tokio::spawn(async move { client_for_call.invoke::<String, _>("slow", ()).await });

        // Give the invoke call a moment to park before shutting down.
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.shutdown();

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, InvokeError::Shutdown));
        assert!(!client.is_connected());
    }
}
