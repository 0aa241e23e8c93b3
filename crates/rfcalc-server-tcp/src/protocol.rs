//! JSON lines プロトコル定義
//!
//! 1行 = 1リクエスト（JSON object）、1行 = 1レスポンス。request / response の
//! body は既存 HTTP クライアントの JSON 契約（`type`, `kernel_size`,
//! `success`, `error` 等）をそのまま踏襲する。

use serde::{Deserialize, Serialize};

use rfcalc_core::{LayerSpec, StackSummary};

/// クライアントからの1リクエスト
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    AddLayer(AddLayerRequest),
    ClearLayers,
    SetInputChannels {
        /// 省略時は 3（RGB）
        channels: Option<u32>,
    },
    GetSummary,
}

/// add_layer リクエストの body
///
/// `type` は文字列のまま受けて adapter 層で判別する。未知の値は
/// クライアントエラー（`Invalid layer type`）であり、deserialize 失敗には
/// しない。
#[derive(Debug, Deserialize)]
pub struct AddLayerRequest {
    #[serde(rename = "type")]
    pub layer_type: String,
    /// 省略時: conv は 3、pool は 2
    pub kernel_size: Option<u32>,
    /// 省略時: conv は 1、pool は kernel_size（エンジン側で解決）
    pub stride: Option<u32>,
    /// 省略時: 0
    pub padding: Option<u32>,
    /// conv のみ。省略時は直前のチャネル数
    pub out_channels: Option<u32>,
}

/// add_layer 成功レスポンス
#[derive(Debug, Serialize)]
pub struct AddLayerResponse {
    pub success: bool,
    pub layer: LayerSpec,
    pub summary: StackSummary,
}

/// clear_layers 成功レスポンス
#[derive(Debug, Serialize)]
pub struct ClearLayersResponse {
    pub success: bool,
    pub message: &'static str,
}

/// set_input_channels 成功レスポンス
#[derive(Debug, Serialize)]
pub struct SetInputChannelsResponse {
    pub success: bool,
    pub summary: StackSummary,
}

/// エラーレスポンス（クライアントエラー・エンジンエラー共通の形）
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
