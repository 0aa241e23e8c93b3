//! LayerStack エンジン
//!
//! 順序付きレイヤー列を所有し、変異のたびに受容野列とパラメータ列を
//! 左から右への1パスで全再計算する。漸化式（基底: n=1, j=1, r=0.5）:
//!
//! ```text
//! n_out = (n_in - 1) * stride + kernel_size
//! j_out = j_in * stride
//! r_out = r_in + (kernel_size - 1) / 2 - padding * j_in
//! ```
//!
//! 変異は all-or-nothing: 検証・再計算が成功してから初めて状態を commit
//! する。失敗した変異は以前の状態を一切変更しない。
//!
//! 内部並行性なし。複数クライアントへ公開する場合は adapter 側が
//! 単一 Mutex 等で全操作を直列化すること。

use log::debug;

use crate::error::{EngineError, EngineResult};
use crate::types::{LayerKind, LayerSpec, ParameterRecord, ReceptiveFieldRecord, StackSummary};

/// 既定の入力チャネル数（RGB）
pub const DEFAULT_INPUT_CHANNELS: u32 = 3;

/// レイヤー数の上限
pub const MAX_LAYERS: usize = 256;

/// kernel_size / stride / padding の上限
pub const MAX_KERNEL_SIZE: u32 = 4096;

/// チャネル数の上限
pub const MAX_CHANNELS: u32 = 65_536;

/// 受容野・パラメータ数計算エンジン
///
/// 観測可能な状態は Empty（レイヤー数 0）と Populated（1以上）の2つ。
/// Empty → Populated 遷移は `append_conv` / `append_pool` のみ、
/// 逆遷移は `reset` のみ。
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<LayerSpec>,
    receptive_fields: Vec<ReceptiveFieldRecord>,
    parameter_counts: Vec<ParameterRecord>,
    input_channels: u32,
    /// チャネル数の列。要素 0 が入力チャネル数、要素 i+1 がレイヤー i の
    /// out_channels。
    layer_channels: Vec<u32>,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// 既定の入力チャネル数（RGB）で空のエンジンを作る
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            receptive_fields: Vec::new(),
            parameter_counts: Vec::new(),
            input_channels: DEFAULT_INPUT_CHANNELS,
            layer_channels: vec![DEFAULT_INPUT_CHANNELS],
        }
    }

    /// 入力チャネル数を指定して空のエンジンを作る
    pub fn with_input_channels(channels: u32) -> EngineResult<Self> {
        let mut stack = Self::new();
        stack.set_input_channels(channels)?;
        Ok(stack)
    }

    /// 畳み込みレイヤーを追加する
    ///
    /// `out_channels` 省略時は直前のチャネル数を引き継ぐ
    /// （チャネル保存射影）。呼び出し側の既定値は stride=1, padding=0。
    pub fn append_conv(
        &mut self,
        kernel_size: u32,
        stride: u32,
        padding: u32,
        out_channels: Option<u32>,
    ) -> EngineResult<LayerSpec> {
        validate_geometry(kernel_size, stride, padding)?;
        if let Some(c) = out_channels {
            validate_channels("out_channels", c)?;
        }
        let in_channels = self.last_channels();
        let spec = LayerSpec {
            kind: LayerKind::Conv,
            kernel_size,
            stride,
            padding,
            in_channels,
            out_channels: out_channels.unwrap_or(in_channels),
        };
        self.append(spec)
    }

    /// プーリングレイヤーを追加する
    ///
    /// `stride` 省略時は `kernel_size` に解決される（非重複プーリングが
    /// 慣例のため、1 ではない）。out_channels は常に in_channels と同値。
    pub fn append_pool(
        &mut self,
        kernel_size: u32,
        stride: Option<u32>,
        padding: u32,
    ) -> EngineResult<LayerSpec> {
        let stride = stride.unwrap_or(kernel_size);
        validate_geometry(kernel_size, stride, padding)?;
        let in_channels = self.last_channels();
        let spec = LayerSpec {
            kind: LayerKind::Pool,
            kernel_size,
            stride,
            padding,
            in_channels,
            out_channels: in_channels,
        };
        self.append(spec)
    }

    /// レイヤー列と派生列を空にし、layer_channels を入力チャネル数のみに戻す
    pub fn reset(&mut self) {
        self.layers.clear();
        self.receptive_fields.clear();
        self.parameter_counts.clear();
        self.layer_channels = vec![self.input_channels];
        debug!("stack reset: input_channels={}", self.input_channels);
    }

    /// 入力チャネル数を設定する
    ///
    /// layer_channels は `[channels]` に作り直す。レイヤーが存在する場合は
    /// パラメータ列のみ再計算し、受容野列（チャネル非依存）と既存レイヤーに
    /// 保存済みの in/out_channels は書き換えない。既存クライアント互換の
    /// ための仕様であり、意図的な非対称（DESIGN.md 参照）。
    pub fn set_input_channels(&mut self, channels: u32) -> EngineResult<()> {
        validate_channels("channels", channels)?;
        let parameter_counts = if self.layers.is_empty() {
            None
        } else {
            Some(compute_parameters(&self.layers)?)
        };
        self.input_channels = channels;
        self.layer_channels = vec![channels];
        if let Some(counts) = parameter_counts {
            self.parameter_counts = counts;
        }
        Ok(())
    }

    /// 現在状態のスナップショットを返す（変異しない）
    pub fn summary(&self) -> StackSummary {
        StackSummary {
            layers: self.layers.clone(),
            receptive_fields: self.receptive_fields.clone(),
            parameter_counts: self.parameter_counts.clone(),
            total_layers: self.layers.len(),
            // 各 total_params は再計算時に checked 加算で検証済み
            total_network_params: self.parameter_counts.iter().map(|p| p.total_params).sum(),
            input_channels: self.input_channels,
            layer_channels: self.layer_channels.clone(),
        }
    }

    /// レイヤー数
    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 設定済みの入力チャネル数
    #[inline]
    pub fn input_channels(&self) -> u32 {
        self.input_channels
    }

    /// レイヤー仕様列
    #[inline]
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// 次に追加されるレイヤーの in_channels
    #[inline]
    fn last_channels(&self) -> u32 {
        // layer_channels は常に非空（構築時・reset 時に先頭要素を入れる）
        *self.layer_channels.last().unwrap_or(&self.input_channels)
    }

    /// 検証済み spec を追加し、両派生列を再計算してから commit する
    fn append(&mut self, spec: LayerSpec) -> EngineResult<LayerSpec> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(EngineError::InvalidArgument {
                name: "layer_count",
                value: (self.layers.len() + 1) as u64,
                constraint: "at most MAX_LAYERS layers",
            });
        }
        let mut layers = self.layers.clone();
        layers.push(spec.clone());
        let receptive_fields = compute_receptive_fields(&layers)?;
        let parameter_counts = compute_parameters(&layers)?;

        // ここから先は失敗しない
        self.layers = layers;
        self.layer_channels.push(spec.out_channels);
        self.receptive_fields = receptive_fields;
        self.parameter_counts = parameter_counts;
        debug!(
            "appended {} layer: k={} s={} p={} ({} layers total)",
            spec.kind,
            spec.kernel_size,
            spec.stride,
            spec.padding,
            self.layers.len()
        );
        Ok(spec)
    }
}

/// kernel_size / stride / padding の範囲検証
fn validate_geometry(kernel_size: u32, stride: u32, padding: u32) -> EngineResult<()> {
    if kernel_size == 0 || kernel_size > MAX_KERNEL_SIZE {
        return Err(EngineError::InvalidArgument {
            name: "kernel_size",
            value: u64::from(kernel_size),
            constraint: "1 <= kernel_size <= MAX_KERNEL_SIZE",
        });
    }
    if stride == 0 || stride > MAX_KERNEL_SIZE {
        return Err(EngineError::InvalidArgument {
            name: "stride",
            value: u64::from(stride),
            constraint: "1 <= stride <= MAX_KERNEL_SIZE",
        });
    }
    if padding > MAX_KERNEL_SIZE {
        return Err(EngineError::InvalidArgument {
            name: "padding",
            value: u64::from(padding),
            constraint: "padding <= MAX_KERNEL_SIZE",
        });
    }
    Ok(())
}

/// チャネル数の範囲検証
fn validate_channels(name: &'static str, channels: u32) -> EngineResult<()> {
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(EngineError::InvalidArgument {
            name,
            value: u64::from(channels),
            constraint: "1 <= channels <= MAX_CHANNELS",
        });
    }
    Ok(())
}

/// 受容野列の全再計算
///
/// O(1) の状態（n, j, r）を左から右へ持ち回る線形スキャン。
fn compute_receptive_fields(layers: &[LayerSpec]) -> EngineResult<Vec<ReceptiveFieldRecord>> {
    let mut records = Vec::with_capacity(layers.len());
    // 基底条件: 入力1ピクセル、ジャンプ1、中心は半ピクセル
    let mut n_in: u64 = 1;
    let mut j_in: u64 = 1;
    let mut r_in: f64 = 0.5;

    for (i, layer) in layers.iter().enumerate() {
        let k = u64::from(layer.kernel_size);
        let s = u64::from(layer.stride);

        // n_in >= 1 は不変条件（基底 1、k >= 1 で単調非減少）
        let n_out = (n_in - 1)
            .checked_mul(s)
            .and_then(|v| v.checked_add(k))
            .ok_or(EngineError::ArithmeticFault {
                context: "receptive_field_size",
            })?;
        let j_out = j_in.checked_mul(s).ok_or(EngineError::ArithmeticFault {
            context: "jump",
        })?;
        let r_out = r_in + (k - 1) as f64 / 2.0 - f64::from(layer.padding) * j_in as f64;

        records.push(ReceptiveFieldRecord {
            layer_index: i,
            layer_kind: layer.kind,
            layer_params: layer.clone(),
            receptive_field_size: n_out,
            jump: j_out,
            center: r_out,
            input_size: n_in,
            output_size: n_out,
        });

        n_in = n_out;
        j_in = j_out;
        r_in = r_out;
    }
    Ok(records)
}

/// パラメータ列の全再計算（受容野状態には依存しない）
fn compute_parameters(layers: &[LayerSpec]) -> EngineResult<Vec<ParameterRecord>> {
    let mut records = Vec::with_capacity(layers.len());

    for (i, layer) in layers.iter().enumerate() {
        let record = if layer.kind.has_parameters() {
            let k = u64::from(layer.kernel_size);
            let weights = k
                .checked_mul(k)
                .and_then(|v| v.checked_mul(u64::from(layer.in_channels)))
                .and_then(|v| v.checked_mul(u64::from(layer.out_channels)))
                .ok_or(EngineError::ArithmeticFault { context: "weights" })?;
            let biases = u64::from(layer.out_channels);
            let total_params = weights
                .checked_add(biases)
                .ok_or(EngineError::ArithmeticFault {
                    context: "total_params",
                })?;
            ParameterRecord {
                layer_index: i,
                layer_kind: layer.kind,
                weights,
                biases,
                total_params,
                formula: format!(
                    "({}² × {} × {}) + {}",
                    layer.kernel_size, layer.in_channels, layer.out_channels, layer.out_channels
                ),
            }
        } else {
            // Pool は学習パラメータを持たない
            ParameterRecord {
                layer_index: i,
                layer_kind: layer.kind,
                weights: 0,
                biases: 0,
                total_params: 0,
                formula: "No learnable parameters".to_string(),
            }
        };

        records.push(record);
    }

    // 合計が u64 に収まることをここで検証する（summary 側は素朴に合算する）
    records
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.total_params))
        .ok_or(EngineError::ArithmeticFault {
            context: "total_network_params",
        })?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_conv_defaults_out_channels_to_in_channels() {
        let mut stack = LayerStack::new();
        let spec = stack.append_conv(3, 1, 0, None).unwrap();
        assert_eq!(spec.in_channels, DEFAULT_INPUT_CHANNELS);
        assert_eq!(spec.out_channels, DEFAULT_INPUT_CHANNELS);
    }

    #[test]
    fn test_append_pool_stride_defaults_to_kernel_size() {
        let mut stack = LayerStack::new();
        let spec = stack.append_pool(2, None, 0).unwrap();
        assert_eq!(spec.stride, 2);
        assert_eq!(spec.out_channels, spec.in_channels);
    }

    #[test]
    fn test_zero_kernel_size_is_rejected() {
        let mut stack = LayerStack::new();
        let err = stack.append_conv(0, 1, 0, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "kernel_size", .. }
        ));
        // 拒否された変異は状態を変えない
        assert!(stack.is_empty());
        assert_eq!(stack.summary().layer_channels, vec![DEFAULT_INPUT_CHANNELS]);
    }

    #[test]
    fn test_zero_stride_is_rejected() {
        let mut stack = LayerStack::new();
        let err = stack.append_conv(3, 0, 0, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "stride", .. }
        ));
    }

    #[test]
    fn test_zero_channels_is_rejected() {
        let mut stack = LayerStack::new();
        let err = stack.set_input_channels(0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "channels", .. }
        ));
        assert_eq!(stack.input_channels(), DEFAULT_INPUT_CHANNELS);
    }

    #[test]
    fn test_jump_overflow_is_all_or_nothing() {
        let mut stack = LayerStack::new();
        // stride 4096 ごとに jump は 4096 倍: 6回で 2^72 相当となり u64 を超える
        for _ in 0..5 {
            stack.append_pool(MAX_KERNEL_SIZE, None, 0).unwrap();
        }
        let before = stack.summary();
        let err = stack.append_pool(MAX_KERNEL_SIZE, None, 0).unwrap_err();
        assert!(matches!(err, EngineError::ArithmeticFault { .. }));
        assert_eq!(stack.summary(), before);
    }

    #[test]
    fn test_layer_count_ceiling() {
        let mut stack = LayerStack::new();
        for _ in 0..MAX_LAYERS {
            stack.append_conv(1, 1, 0, None).unwrap();
        }
        let err = stack.append_conv(1, 1, 0, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "layer_count", .. }
        ));
    }

    #[test]
    fn test_kernel_size_ceiling() {
        let mut stack = LayerStack::new();
        let err = stack.append_conv(MAX_KERNEL_SIZE + 1, 1, 0, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "kernel_size", .. }
        ));
        assert!(stack.is_empty());
        assert_eq!(stack.summary(), LayerStack::new().summary());
    }

    #[test]
    fn test_stride_ceiling() {
        let mut stack = LayerStack::new();
        let err = stack
            .append_pool(2, Some(MAX_KERNEL_SIZE + 1), 0)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "stride", .. }
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_padding_ceiling() {
        let mut stack = LayerStack::new();
        let err = stack
            .append_conv(3, 1, MAX_KERNEL_SIZE + 1, None)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "padding", .. }
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_channels_ceiling() {
        let mut stack = LayerStack::new();
        let err = stack.set_input_channels(MAX_CHANNELS + 1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "channels", .. }
        ));
        assert_eq!(stack.input_channels(), DEFAULT_INPUT_CHANNELS);

        let err = stack
            .append_conv(3, 1, 0, Some(MAX_CHANNELS + 1))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { name: "out_channels", .. }
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_conv_formula_string() {
        let mut stack = LayerStack::new();
        stack.append_conv(3, 1, 1, Some(16)).unwrap();
        let summary = stack.summary();
        assert_eq!(summary.parameter_counts[0].formula, "(3² × 3 × 16) + 16");
    }

    #[test]
    fn test_pool_formula_string() {
        let mut stack = LayerStack::new();
        stack.append_pool(2, None, 0).unwrap();
        let summary = stack.summary();
        assert_eq!(
            summary.parameter_counts[0].formula,
            "No learnable parameters"
        );
    }

    #[test]
    fn test_with_input_channels() {
        let stack = LayerStack::with_input_channels(1).unwrap();
        assert_eq!(stack.input_channels(), 1);
        assert_eq!(stack.summary().layer_channels, vec![1]);
        assert!(LayerStack::with_input_channels(0).is_err());
    }
}
