//! 表ファイルの読み込み
//!
//! CSV はテキストとしてパースし、スプレッドシート（xlsx/xls/ods）は
//! calamine で読む。いずれも先頭行をヘッダーとする。

use crate::error::{ReconcileError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use taxonomy_common::{SourceTable, TaxonomyIndex};

/// 対応する拡張子
const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// 表ファイルを読み込む
///
/// `sheet` はスプレッドシートのみ有効（省略時は先頭シート）。
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<SourceTable> {
    if !path.exists() {
        return Err(ReconcileError::FileNotFound(path.display().to_string()));
    }

    let ext = extension_of(path);
    if ext == "csv" {
        let content = std::fs::read_to_string(path)?;
        return Ok(SourceTable::from_csv_str(&content)?);
    }
    if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        return load_spreadsheet(path, sheet);
    }

    Err(ReconcileError::UnsupportedFormat(path.display().to_string()))
}

/// タクソノミを読み込む
pub fn load_taxonomy(path: &Path, sheet: &str) -> Result<TaxonomyIndex> {
    // CSV にはシートが無いので sheet は無視される
    let source = load_table(path, Some(sheet))?;
    let index = TaxonomyIndex::from_source(&source)?;
    tracing::info!(
        path = %path.display(),
        labels = index.len(),
        vocabulary = index.vocabulary().len(),
        "taxonomy loaded"
    );
    Ok(index)
}

fn load_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<SourceTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReconcileError::Workbook(format!("{}: {}", path.display(), e)))?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(ReconcileError::SheetNotFound(format!(
                    "'{}' in {}",
                    name,
                    path.display()
                )));
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReconcileError::Workbook(format!("{}: workbook has no sheets", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReconcileError::Workbook(format!("{}: {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| cell_to_string(c).unwrap_or_default()).collect())
        .ok_or_else(|| ReconcileError::Workbook(format!("{}: sheet '{}' is empty", path.display(), sheet_name)))?;
    let body: Vec<Vec<Option<String>>> = rows
        .map(|r| r.iter().map(cell_to_string).collect())
        .filter(|r: &Vec<Option<String>>| r.iter().any(|c| c.is_some()))
        .collect();

    tracing::debug!(sheet = %sheet_name, rows = body.len(), "spreadsheet loaded");
    Ok(SourceTable::new(headers, body))
}

/// セル値を文字列化（整数値の浮動小数は `.0` を付けない）
pub fn cell_to_string(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
