//! エンジンの型付きエラー
//!
//! 変異操作は例外伝播ではなく `EngineResult` を返す。adapter 側はこれを
//! transport 固有のエラー応答へ写像する。

/// LayerStack エンジンのエラー
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 引数検証エラー（kernel_size = 0 等）
    #[error("Invalid argument: {name}={value} ({constraint})")]
    InvalidArgument {
        name: &'static str,
        value: u64,
        constraint: &'static str,
    },

    /// 算術オーバーフロー（パラメータ数・受容野サイズの u64 超過）
    #[error("Arithmetic overflow while computing {context}")]
    ArithmeticFault { context: &'static str },
}

/// エンジン操作の Result 型
pub type EngineResult<T> = Result<T, EngineError>;
