//! Excel生成（CLI版）
//!
//! 共通ライブラリの excel_core でバッファを作り、ファイルに書き出す。

use super::TableView;
use crate::error::{ReconcileError, Result};
use std::path::Path;
use taxonomy_common::export::excel_core::{generate_excel_buffer, SheetData};
use taxonomy_common::{CONFORMANCE_COLUMN, REASON_COLUMN};

/// 表をXLSXに書き出す（不適合行の注釈セルを強調表示）
pub fn generate_excel(view: &TableView, output_path: &Path, sheet_name: &str) -> Result<()> {
    let sheet = SheetData {
        name: sheet_name,
        headers: view.headers.clone(),
        rows: view.rows.clone(),
        highlight_columns: vec![CONFORMANCE_COLUMN.to_string(), REASON_COLUMN.to_string()],
        highlight_rows: view.flagged.clone(),
    };

    let buffer = generate_excel_buffer(&[sheet]).map_err(ReconcileError::ExcelGeneration)?;
    std::fs::write(output_path, buffer)?;
    Ok(())
}
