//! # rfcalc-core
//!
//! CNN レイヤースタックの受容野・パラメータ数計算エンジン。
//!
//! ## モジュール構成
//!
//! - `types`: 基本型（LayerKind, LayerSpec, 派生レコード, StackSummary）
//! - `stack`: LayerStack エンジン（追加・リセット・再計算・サマリ）
//! - `error`: 型付きエラー（EngineError）
//!
//! transport は持たない。adapter 側（`rfcalc-server-tcp` 等）が検証済みの
//! プリミティブ引数で呼び出し、戻り値を serialize する。

pub mod error;
pub mod stack;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use stack::{LayerStack, DEFAULT_INPUT_CHANNELS, MAX_CHANNELS, MAX_KERNEL_SIZE, MAX_LAYERS};
pub use types::{LayerKind, LayerSpec, ParameterRecord, ReceptiveFieldRecord, StackSummary};
