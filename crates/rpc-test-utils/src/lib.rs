//! rpc-test-utils: shared loopback TCP harness for the Fast RPC runtime's
//! cross-crate integration suite.
//!
//! Every scenario needs a real connected pair of sockets rather than a
//! mocked transport, since the thing under test is the framing and
//! concurrency behavior over an actual stream.

use std::sync::Arc;
use std::time::Duration;

use rpc_core::{
    ApiExecutionError, ApiRegistry, ApiRegistryBuilder, ExceptionHook, ParamType, ReturnType, RpcConfig, Session,
    handler1, handler2,
};
use tokio::net::{TcpListener, TcpStream};

/// Bind a random local port and return one connected `(client, server)` pair
/// of raw TCP streams — the building block every fixture here is made of.
pub async fn tcp_loopback() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback listener");
    let addr = listener.local_addr().expect("read loopback addr");
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    let (server, _peer_addr) = accepted.expect("accept loopback connection");
    (client.expect("connect loopback stream"), server)
}

/// An exception hook that never claims to have handled anything — the
/// default a test reaches for unless it's specifically asserting on the
/// hook's behavior.
pub fn no_op_exception_hook() -> ExceptionHook {
    Arc::new(|_packet, _error| false)
}

/// The registry every scenario fixture below registers server-side:
/// `echo(s) -> s`, `add(a, b) -> a + b`, `inc(n) -> n + 1`.
pub fn echo_suite_registry() -> Arc<ApiRegistry> {
    let echo = handler1(|s: String| async move { Ok::<_, ApiExecutionError>(s) });
    let add = handler2(|a: i64, b: i64| async move { Ok::<_, ApiExecutionError>(a + b) });
    let inc = handler1(|n: i64| async move { Ok::<_, ApiExecutionError>(n + 1) });

    Arc::new(
        ApiRegistryBuilder::new()
            .register("echo", vec![ParamType::String], ReturnType::Value(ParamType::String), echo)
            .register(
                "add",
                vec![ParamType::I64, ParamType::I64],
                ReturnType::Value(ParamType::I64),
                add,
            )
            .register("inc", vec![ParamType::I64], ReturnType::Value(ParamType::I64), inc)
            .build(),
    )
}

/// A client `Session` and a server `Session` joined over a real loopback
/// TCP connection, with [`echo_suite_registry`] registered server-side.
pub async fn connected_echo_pair(config: RpcConfig) -> (Session, Session) {
    let (client_stream, server_stream) = tcp_loopback().await;

    let server = Session::connect(
        server_stream,
        false,
        config.clone(),
        echo_suite_registry(),
        no_op_exception_hook(),
    );
    let client_registry = Arc::new(ApiRegistryBuilder::new().build());
    let client = Session::connect(client_stream, true, config, client_registry, no_op_exception_hook());

    (client, server)
}

/// A client `Session` joined to a raw, un-wrapped peer `TcpStream` — for
/// scenarios that need to read/write bytes by hand on the "server" side
/// instead of going through a second `Session` (timeouts where nothing ever
/// replies, and malformed/injected frames).
pub async fn client_with_raw_peer(config: RpcConfig) -> (Session, TcpStream) {
    let (client_stream, peer_stream) = tcp_loopback().await;
    let client_registry = Arc::new(ApiRegistryBuilder::new().build());
    let client = Session::connect(client_stream, true, config, client_registry, no_op_exception_hook());
    (client, peer_stream)
}

/// Convenience default: [`RpcConfig`] with a short timeout, for tests that
/// want a deadline to elapse in well under a second of wall-clock time.
pub fn short_timeout_config(timeout: Duration) -> RpcConfig {
    RpcConfig::new().with_timeout(timeout)
}
