//! レイヤー種別とレイヤー仕様

use serde::{Deserialize, Serialize};

/// レイヤー種別（畳み込み / プーリング）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Conv,
    Pool,
}

impl LayerKind {
    /// 学習パラメータを持つか
    #[inline]
    pub const fn has_parameters(self) -> bool {
        matches!(self, LayerKind::Conv)
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Conv => write!(f, "conv"),
            LayerKind::Pool => write!(f, "pool"),
        }
    }
}

/// スタック中の1レイヤーの仕様
///
/// 不変条件: レイヤー i の `in_channels` はレイヤー i-1 の `out_channels`
/// （i = 0 のときはネットワークの入力チャネル数）と一致する。
/// Pool は常に `out_channels == in_channels`（チャネル保存）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// "conv" | "pool"
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub kernel_size: u32,
    pub stride: u32,
    pub padding: u32,
    pub in_channels: u32,
    pub out_channels: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_kind_wire_form() {
        assert_eq!(serde_json::to_string(&LayerKind::Conv).unwrap(), "\"conv\"");
        assert_eq!(serde_json::to_string(&LayerKind::Pool).unwrap(), "\"pool\"");
    }

    #[test]
    fn test_layer_spec_serializes_kind_as_type() {
        let spec = LayerSpec {
            kind: LayerKind::Conv,
            kernel_size: 3,
            stride: 1,
            padding: 1,
            in_channels: 3,
            out_channels: 16,
        };
        let v: serde_json::Value = serde_json::to_value(&spec).unwrap();
        assert_eq!(v["type"], "conv");
        assert_eq!(v["kernel_size"], 3);
        assert_eq!(v["out_channels"], 16);
    }

    #[test]
    fn test_has_parameters() {
        assert!(LayerKind::Conv.has_parameters());
        assert!(!LayerKind::Pool.has_parameters());
    }
}
