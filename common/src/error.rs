//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// タクソノミ不正など、実行全体を中断すべきデータ不備
    #[error("Data error: {0}")]
    Data(String),

    #[error("Data error: {table} is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
