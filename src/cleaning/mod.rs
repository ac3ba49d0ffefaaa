//! ラベル以外の列の整形
//!
//! ## 処理フロー
//! 1. ユーザー数列の数値化
//! 2. 国名列の正式名称への統一
//! 3. 国名列から地域列を追加
//!
//! 出力直前に全セルの制御文字を除去する（`sanitize_table`）。

pub mod countries;
pub mod sanitize;
pub mod users;

use crate::config::Config;
use serde::Serialize;
use taxonomy_common::RecordTable;

pub use countries::{CountryLookup, RegionLookup};

/// 地域列の列名
pub const REGION_COLUMN: &str = "region";

/// 統計情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    /// 値が変わったユーザー数セル
    pub user_count_cells: usize,
    /// 値が変わった国名セル
    pub country_cells: usize,
    /// 地域が付いた行
    pub region_rows: usize,
    /// 設定にあるが表に無かった列
    pub missing_columns: Vec<String>,
}

/// 設定に従って列を整形
pub fn clean_columns(
    table: &mut RecordTable,
    config: &Config,
    countries: Option<&CountryLookup>,
    regions: Option<&RegionLookup>,
) -> CleaningStats {
    let mut stats = CleaningStats::default();

    for entry in &config.user_count_columns {
        let mut changed = 0;
        let found = table.map_column(&entry.column, |value| {
            let value = value?;
            let normalized = users::normalize_user_count(&value, &entry.keywords);
            if normalized.as_deref() != Some(value.as_str()) {
                changed += 1;
            }
            normalized
        });
        if found {
            stats.user_count_cells += changed;
        } else {
            stats.missing_columns.push(entry.column.clone());
        }
    }

    if let Some(lookup) = countries {
        for column in &config.country_columns {
            let mut changed = 0;
            let found = table.map_column(column, |value| {
                let value = value?;
                let normalized = lookup.normalize(&value);
                if normalized != value {
                    changed += 1;
                }
                Some(normalized).filter(|v| !v.is_empty())
            });
            if found {
                stats.country_cells += changed;
            } else {
                stats.missing_columns.push(column.clone());
            }
        }
    }

    if let (Some(lookup), Some(source)) = (regions, config.region_source_column.as_deref()) {
        match table.column_values(source) {
            Some(values) => {
                let derived: Vec<Option<String>> = values
                    .into_iter()
                    .map(|v| v.and_then(|v| lookup.region_for(v)))
                    .collect();
                stats.region_rows = derived.iter().filter(|r| r.is_some()).count();
                table.push_column(REGION_COLUMN, derived);
            }
            None => stats.missing_columns.push(source.to_string()),
        }
    }

    for column in &stats.missing_columns {
        tracing::warn!(%column, "configured column not found in input; skipped");
    }

    stats
}

/// 全セルから制御文字を除去
pub fn sanitize_table(table: &mut RecordTable) {
    table.map_all_cells(sanitize::strip_control_chars);
}
