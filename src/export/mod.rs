//! 出力（XLSX/CSV・Use Case抽出・ダッシュボード用の分割表・実行レポート）

pub mod csv;
pub mod dashboard;
pub mod excel;
pub mod report;

use crate::cli::ExportFormat;
use crate::error::Result;
use std::path::{Path, PathBuf};
use taxonomy_common::{Conformance, LabelColumn, RecordTable, CONFORMANCE_COLUMN, REASON_COLUMN};

/// Use Case抽出ファイルの接尾辞
pub const USE_CASES_SUFFIX: &str = "use_cases";
pub const ORGANISATIONS_SUFFIX: &str = "organisations";
pub const PRODUCTS_SUFFIX: &str = "products";

/// 出力用に文字列化した表
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 不適合（`No`）の行
    pub flagged: Vec<bool>,
}

impl TableView {
    /// 注釈付きの全列
    pub fn full(table: &RecordTable) -> Self {
        Self {
            headers: table.output_headers(),
            rows: table.output_rows(),
            flagged: flagged_rows(table),
        }
    }

    /// ID・ラベル3列・利用者区分（列があれば）・注釈
    pub fn use_cases(table: &RecordTable, id_header: &str, user_column: &str) -> Self {
        let users = table.column_values(user_column);

        let mut headers = vec![id_header.to_string()];
        headers.extend(LabelColumn::ALL.iter().map(|c| c.to_string()));
        if users.is_some() {
            headers.push(user_column.to_string());
        }
        headers.push(CONFORMANCE_COLUMN.to_string());
        headers.push(REASON_COLUMN.to_string());

        let rows = table
            .records()
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut row = vec![r.product_id.clone().unwrap_or_default()];
                row.extend(LabelColumn::ALL.iter().map(|&c| r.get(c).unwrap_or_default().to_string()));
                if let Some(users) = &users {
                    row.push(users[i].unwrap_or_default().to_string());
                }
                row.push(r.conformance.map(|c| c.to_string()).unwrap_or_default());
                row.push(r.reason.map(|r| r.to_string()).unwrap_or_default());
                row
            })
            .collect();

        Self {
            headers,
            rows,
            flagged: flagged_rows(table),
        }
    }
}

fn flagged_rows(table: &RecordTable) -> Vec<bool> {
    table
        .records()
        .iter()
        .map(|r| r.conformance == Some(Conformance::No))
        .collect()
}

/// 出力パスの決定（省略時: 入力と同じ場所に `<入力名>_reconciled.<拡張子>`）
pub fn output_path_for(input: &Path, output: Option<&Path>, format: ExportFormat) -> PathBuf {
    match output {
        Some(path) if path.is_dir() || path.extension().is_none() => {
            path.join(format!("{}_reconciled.{}", file_stem(input), format.extension()))
        }
        Some(path) => path.to_path_buf(),
        None => {
            let parent = input.parent().unwrap_or_else(|| Path::new("."));
            parent.join(format!("{}_reconciled.{}", file_stem(input), format.extension()))
        }
    }
}

/// 付随ファイルのパス（`<出力名>_<接尾辞>.<拡張子>`）
pub fn companion_path_for(output: &Path, suffix: &str, format: ExportFormat) -> PathBuf {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}_{}.{}", file_stem(output), suffix, format.extension()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// 表を指定形式で書き出す
pub fn export_table(view: &TableView, format: ExportFormat, output_path: &Path, sheet_name: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match format {
        ExportFormat::Excel => excel::generate_excel(view, output_path, sheet_name)?,
        ExportFormat::Csv => csv::generate_csv(view, output_path)?,
    }
    tracing::info!(path = %output_path.display(), rows = view.rows.len(), %format, "table exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxonomy_common::{MismatchReason, ProductRecord};

    fn table() -> RecordTable {
        let mut yes = ProductRecord::labels(Some("Learning"), Some("Assessment Tools"), Some("Automated Grading"));
        yes.product_id = Some("1".into());
        yes.conformance = Some(Conformance::Yes);
        let mut no = ProductRecord::labels(Some("Other"), Some("X"), Some("Y"));
        no.product_id = Some("2".into());
        no.conformance = Some(Conformance::No);
        no.reason = Some(MismatchReason::ProductSubtypeNotFound);
        RecordTable::from_records(vec![yes, no])
    }

    #[test]
    fn test_use_cases_view() {
        let view = TableView::use_cases(&table(), "product_id", "User");
        assert_eq!(
            view.headers,
            vec!["product_id", "Product types", "Product Subtype", "Use Cases", "Present in taxonomy", "Reason"]
        );
        assert_eq!(view.rows[1], vec!["2", "Other", "X", "Y", "No", "Product subtype not found"]);
        assert_eq!(view.flagged, vec![false, true]);
    }

    #[test]
    fn test_output_path_defaults_next_to_input() {
        let path = output_path_for(Path::new("data/products.csv"), None, ExportFormat::Excel);
        assert_eq!(path, PathBuf::from("data/products_reconciled.xlsx"));

        let path = output_path_for(Path::new("products.csv"), Some(Path::new("out/result.csv")), ExportFormat::Csv);
        assert_eq!(path, PathBuf::from("out/result.csv"));
    }

    #[test]
    fn test_use_cases_view_includes_user_column() {
        let mut table = table();
        table.push_column("User", vec![Some("Students".into()), None]);
        let view = TableView::use_cases(&table, "product_id", "User");
        assert_eq!(view.headers[4], "User");
        assert_eq!(view.rows[0][4], "Students");
        assert_eq!(view.rows[1][4], "");
        assert_eq!(view.rows[0][5], "Yes");
    }

    #[test]
    fn test_companion_paths() {
        let path = companion_path_for(Path::new("out/result.xlsx"), USE_CASES_SUFFIX, ExportFormat::Excel);
        assert_eq!(path, PathBuf::from("out/result_use_cases.xlsx"));
        let path = companion_path_for(Path::new("result.csv"), PRODUCTS_SUFFIX, ExportFormat::Csv);
        assert_eq!(path, PathBuf::from("result_products.csv"));
    }
}
