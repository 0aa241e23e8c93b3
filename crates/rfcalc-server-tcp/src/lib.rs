//! rfcalc JSON-lines-over-TCP サーバライブラリ
//!
//! `rfcalc-core` の LayerStack エンジンを TCP 越しに公開する boundary
//! adapter。プロトコルは1行1 JSON。binary（`main.rs`）は subscriber 初期化と
//! 起動引数の処理のみを担う。

pub mod protocol;
pub mod server;
pub mod session;
