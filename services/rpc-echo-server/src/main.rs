//! Demo Fast RPC server: binds a `TcpListener` and serves `echo`/`add` to
//! any number of concurrently connected clients.

use std::env;
use std::sync::Arc;

use clap::Parser;
use rpc_core::{
    ApiExecutionError, ApiRegistry, ApiRegistryBuilder, DispatchError, ParamType, ReturnType, RpcConfig, Session,
    handler1, handler2,
};
use rpc_protocol::Packet;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rpc-echo-server", version, about = "Fast RPC demo server")]
struct Args {
    /// Address to bind and accept connections on.
    #[arg(short, long, default_value = "0.0.0.0:7878")]
    bind: String,
}

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let args = Args::parse();
    let registry = Arc::new(
        ApiRegistryBuilder::new()
            .register(
                "echo",
                vec![ParamType::String],
                ReturnType::Value(ParamType::String),
                handler1(|s: String| async move { Ok::<_, ApiExecutionError>(s) }),
            )
            .register(
                "add",
                vec![ParamType::I64, ParamType::I64],
                ReturnType::Value(ParamType::I64),
                handler2(|a: i64, b: i64| async move { Ok::<_, ApiExecutionError>(a + b) }),
            )
            .build(),
    );

    let listener = TcpListener::bind(&args.bind).await.expect("failed to bind");
    info!(addr = %args.bind, "rpc-echo-server listening");

    tokio::select! {
        () = accept_loop(listener, registry) => {},
        () = shutdown_signal() => { info!("received shutdown signal"); },
    }
    info!("rpc-echo-server shut down");
}

async fn accept_loop(listener: TcpListener, registry: Arc<ApiRegistry>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!(%peer, "accepted connection");
                let registry = registry.clone();
                let hook: rpc_core::ExceptionHook = Arc::new(|_packet: &Packet, error: &DispatchError| {
                    warn!(%error, "unhandled dispatch exception");
                    true
                });
                tokio::spawn(async move {
                    // The session's reader/writer tasks run independently;
                    // there is nothing more for this spawned task to do
                    // once the connection is wired up.
                    let _session = Session::connect(stream, false, RpcConfig::new(), registry, hook);
                    std::future::pending::<()>().await;
                });
            }
            Err(err) => {
                warn!(%err, "accept failed; continuing");
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
