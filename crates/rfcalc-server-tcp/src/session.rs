//! 1接続分のセッション処理とリクエスト dispatch
//!
//! エンジンは接続間で共有される単一インスタンスで、変異・読み取りの全操作を
//! 1つの Mutex で直列化する（エンジン自体は並行変異の順序を定義しない）。
//! ロック保持中に await しないため、1操作 = 1クリティカルセクションで完結する。

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use rfcalc_core::LayerStack;

use crate::protocol::{
    AddLayerRequest, AddLayerResponse, ClearLayersResponse, ErrorResponse, Request,
    SetInputChannelsResponse,
};

/// set_input_channels の `channels` 省略時の既定値（RGB）
const DEFAULT_CHANNELS: u32 = 3;

/// conv の kernel_size 省略時の既定値
const DEFAULT_CONV_KERNEL: u32 = 3;

/// pool の kernel_size 省略時の既定値
const DEFAULT_POOL_KERNEL: u32 = 2;

/// 接続1本分のループ。行単位で読み、1行ごとに応答を書く。
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    engine: Arc<Mutex<LayerStack>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(%addr, request = line, "request received");
        let response = dispatch(line, &engine).await;
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

/// 1リクエスト行を処理して応答の JSON 文字列を返す
///
/// parse 失敗・未知 op・エンジンエラーはすべて `{"error": ...}` へ写像する。
/// エンジンの失敗メッセージはそのまま保存する。
pub async fn dispatch(line: &str, engine: &Mutex<LayerStack>) -> String {
    let request = match serde_json::from_str::<Request>(line) {
        Ok(request) => request,
        Err(e) => return error_json(format!("Invalid request: {e}")),
    };

    let mut engine = engine.lock().await;
    match request {
        Request::AddLayer(add) => add_layer(add, &mut engine),
        Request::ClearLayers => {
            engine.reset();
            to_json(&ClearLayersResponse {
                success: true,
                message: "All layers cleared",
            })
        }
        Request::SetInputChannels { channels } => {
            match engine.set_input_channels(channels.unwrap_or(DEFAULT_CHANNELS)) {
                Ok(()) => to_json(&SetInputChannelsResponse {
                    success: true,
                    summary: engine.summary(),
                }),
                Err(e) => error_json(e.to_string()),
            }
        }
        Request::GetSummary => to_json(&engine.summary()),
    }
}

fn add_layer(add: AddLayerRequest, engine: &mut LayerStack) -> String {
    let result = match add.layer_type.as_str() {
        "conv" => engine.append_conv(
            add.kernel_size.unwrap_or(DEFAULT_CONV_KERNEL),
            add.stride.unwrap_or(1),
            add.padding.unwrap_or(0),
            add.out_channels,
        ),
        "pool" => engine.append_pool(
            add.kernel_size.unwrap_or(DEFAULT_POOL_KERNEL),
            add.stride,
            add.padding.unwrap_or(0),
        ),
        _ => return error_json("Invalid layer type".to_string()),
    };
    match result {
        Ok(layer) => to_json(&AddLayerResponse {
            success: true,
            layer,
            summary: engine.summary(),
        }),
        Err(e) => error_json(e.to_string()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => error_json(format!("Serialization failed: {e}")),
    }
}

fn error_json(message: String) -> String {
    // ErrorResponse の serialize は失敗しない
    serde_json::to_string(&ErrorResponse { error: message })
        .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
}
