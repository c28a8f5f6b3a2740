//! Demo Fast RPC client: dials `rpc-echo-server` and invokes `echo`/`add`
//! from the command line.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rpc_core::{ApiRegistryBuilder, DispatchError, RpcConfig, Session};
use rpc_protocol::Packet;
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rpc-echo-client", version, about = "Fast RPC demo client")]
struct Args {
    /// Address of the `rpc-echo-server` to connect to.
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    connect: String,

    /// Per-call timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: ApiCall,
}

#[derive(Subcommand, Debug)]
enum ApiCall {
    /// Invoke `echo(s: String) -> String`.
    Echo { text: String },
    /// Invoke `add(a: i64, b: i64) -> i64`.
    Add { a: i64, b: i64 },
}

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let args = Args::parse();
    let stream = match TcpStream::connect(&args.connect).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("failed to connect to {}: {e}", args.connect);
            std::process::exit(1);
        }
    };
    info!(addr = %args.connect, "connected");

    let config = RpcConfig::new().with_timeout(Duration::from_millis(args.timeout_ms));
    let registry = Arc::new(ApiRegistryBuilder::new().build());
    let hook: rpc_core::ExceptionHook = Arc::new(|_packet: &Packet, _error: &DispatchError| true);
    let session = Session::connect(stream, true, config, registry, hook);

    match args.command {
        ApiCall::Echo { text } => match session.invoke::<String, _>("echo", (text.as_str(),)).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => {
                eprintln!("echo failed: {e}");
                std::process::exit(1);
            }
        },
        ApiCall::Add { a, b } => match session.invoke::<i64, _>("add", (a, b)).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => {
                eprintln!("add failed: {e}");
                std::process::exit(1);
            }
        },
    }
}
