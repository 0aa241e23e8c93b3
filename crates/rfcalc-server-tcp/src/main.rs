// rfcalc JSON-lines-over-TCP サーバ起動バイナリ

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rfcalc_core::{LayerStack, DEFAULT_INPUT_CHANNELS};
use rfcalc_server_tcp::server;

#[derive(Parser, Debug)]
#[command(author, version, about = "Receptive-field calculator JSON-lines-over-TCP server")]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:4081")]
    bind: SocketAddr,

    /// Log filter (RUST_LOG が設定されていればそちらを優先)
    #[arg(long, default_value = "info")]
    log: String,

    /// 起動時の入力チャネル数
    #[arg(long, default_value_t = DEFAULT_INPUT_CHANNELS)]
    input_channels: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log)?;

    let engine = Arc::new(Mutex::new(LayerStack::with_input_channels(
        args.input_channels,
    )?));
    let listener = TcpListener::bind(args.bind).await?;
    info!(bind = %args.bind, input_channels = args.input_channels, "rfcalc server listening");

    tokio::select! {
        result = server::serve(listener, engine) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}

/// subscriber 初期化。`tracing-log` feature 有効の fmt が `log` facade
/// （rfcalc-core 側の debug! 等）も bridge する。
fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;
    Ok(())
}
