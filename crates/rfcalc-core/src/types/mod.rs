//! 基本型モジュール
//!
//! エンジンで使用する型を定義する。
//!
//! # 型の依存関係
//!
//! ```text
//! LayerKind
//!   ↓
//! LayerSpec
//!   ↓
//! ReceptiveFieldRecord, ParameterRecord
//!   ↓
//! StackSummary
//! ```
//!
//! serialize 時のフィールド名は既存クライアントとの互換のため JSON API の
//! キー名（`type`, `layer_type` 等）に合わせる。

mod layer;
mod record;
mod summary;

pub use layer::{LayerKind, LayerSpec};
pub use record::{ParameterRecord, ReceptiveFieldRecord};
pub use summary::StackSummary;
