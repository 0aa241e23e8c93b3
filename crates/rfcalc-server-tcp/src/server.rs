//! TCP accept ループ
//!
//! 接続ごとに tokio task を1本 spawn する。共有エンジンは
//! `Arc<Mutex<LayerStack>>` で、直列化はセッション側の dispatch が担う。

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use rfcalc_core::LayerStack;

use crate::session;

/// bind 済み listener で接続を受け続ける。accept 失敗時のみ戻る。
pub async fn serve(listener: TcpListener, engine: Arc<Mutex<LayerStack>>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        info!(%addr, "client connected");
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            match session::handle_connection(stream, addr, engine).await {
                Ok(()) => info!(%addr, "client disconnected"),
                Err(e) => warn!(%addr, error = %e, "connection terminated"),
            }
        });
    }
}
