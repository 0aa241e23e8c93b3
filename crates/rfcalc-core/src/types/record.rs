//! 派生レコード（受容野・パラメータ数）
//!
//! どちらもレイヤースタックとインデックスが揃った派生列で、変異のたびに
//! 全再計算される。レコード i はレコード i-1（または基底条件）と
//! レイヤー i の仕様のみから決まる。

use serde::{Deserialize, Serialize};

use super::{LayerKind, LayerSpec};

/// レイヤー1つ分の受容野情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceptiveFieldRecord {
    pub layer_index: usize,
    #[serde(rename = "layer_type")]
    pub layer_kind: LayerKind,
    /// 対応するレイヤー仕様（API 互換のためレコードに埋め込む）
    pub layer_params: LayerSpec,
    /// このレイヤーの1出力ユニットに影響する元入力のピクセル数（n）
    pub receptive_field_size: u64,
    /// 元入力ピクセル単位での実効サンプリング間隔（j）
    pub jump: u64,
    /// 最初の出力ユニットの受容野中心の入力座標（r）
    pub center: f64,
    /// このレイヤー適用前の n
    pub input_size: u64,
    /// このレイヤー適用後の n（receptive_field_size と同値）
    pub output_size: u64,
}

/// レイヤー1つ分の学習パラメータ数
///
/// Conv: `weights = kernel_size² × in_channels × out_channels`,
/// `biases = out_channels`。Pool は全て 0。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub layer_index: usize,
    #[serde(rename = "layer_type")]
    pub layer_kind: LayerKind,
    pub weights: u64,
    pub biases: u64,
    pub total_params: u64,
    /// 表示用の計算式（例: `(3² × 3 × 16) + 16`）
    pub formula: String,
}
