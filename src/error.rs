use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0} (use .csv, .xlsx, .xls or .ods)")]
    UnsupportedFormat(String),

    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error(transparent)]
    Domain(#[from] taxonomy_common::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel generation error: {0}")]
    ExcelGeneration(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
