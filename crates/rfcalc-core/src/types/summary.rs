//! スタック全体のサマリ

use serde::{Deserialize, Serialize};

use super::{LayerSpec, ParameterRecord, ReceptiveFieldRecord};

/// `LayerStack::summary` が返す現在状態のスナップショット
///
/// 読み取り専用のコピーで、以後のスタック変異の影響を受けない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSummary {
    pub layers: Vec<LayerSpec>,
    pub receptive_fields: Vec<ReceptiveFieldRecord>,
    pub parameter_counts: Vec<ParameterRecord>,
    pub total_layers: usize,
    pub total_network_params: u64,
    pub input_channels: u32,
    pub layer_channels: Vec<u32>,
}
