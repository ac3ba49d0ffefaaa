//! 実行レポート（JSON）
//!
//! 1回の実行で行ったすべての書き換えと集計を記録する。

use crate::cleaning::CleaningStats;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use taxonomy_common::conformance::ConformanceStats;
use taxonomy_common::resolver::ResolutionStats;
use taxonomy_common::{AliasHit, Correction, LabelColumn, LabelFailure, ReconcileReport};

/// 実行のメタデータ
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// 実行時刻（ISO 8601）
    pub timestamp: String,
    pub input: String,
    pub taxonomy: String,
    pub output: Option<String>,
    pub dry_run: bool,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub records: usize,
    pub taxonomy_labels: usize,
    pub cleaning: CleaningStats,
    pub resolution: ResolutionStats,
    pub conformance: ConformanceStats,
}

/// 解決できなかった値
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedValue {
    pub column: LabelColumn,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session: SessionInfo,
    pub statistics: Statistics,
    pub aliases: Vec<AliasHit>,
    pub corrections: Vec<Correction>,
    pub repairs: Vec<Correction>,
    pub unresolved: Vec<UnresolvedValue>,
    pub failures: Vec<LabelFailure>,
}

impl RunReport {
    pub fn new(
        session: SessionInfo,
        records: usize,
        taxonomy_labels: usize,
        cleaning: CleaningStats,
        report: &ReconcileReport,
    ) -> Self {
        Self {
            session,
            statistics: Statistics {
                records,
                taxonomy_labels,
                cleaning,
                resolution: report.resolution.stats.clone(),
                conformance: report.conformance.stats.clone(),
            },
            aliases: report.alias_hits.clone(),
            corrections: report.resolution.corrections.clone(),
            repairs: report.conformance.repairs.clone(),
            unresolved: report
                .resolution
                .unresolved
                .iter()
                .map(|(column, value)| UnresolvedValue {
                    column: *column,
                    value: value.clone(),
                })
                .collect(),
            failures: report.conformance.failures.clone(),
        }
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// 画面表示用の集計行
    pub fn summary_lines(&self) -> Vec<String> {
        let stats = &self.statistics;
        let mut lines = vec![
            format!("  レコード数: {}", stats.records),
            format!("  エイリアス置換: {}件", self.aliases.len()),
            format!(
                "  ラベル修正: {}件（{}行）",
                self.corrections.len(),
                stats.resolution.rewritten_rows
            ),
            format!("  適合検証での修復: {}件", self.repairs.len()),
            format!(
                "  適合: Yes {}行 / No {}行 / 判定外 {}行",
                stats.conformance.yes_rows, stats.conformance.no_rows, stats.conformance.skipped_rows
            ),
        ];
        if stats.resolution.blank_subtypes > 0 {
            lines.push(format!("  Product Subtype 空欄: {}行", stats.resolution.blank_subtypes));
        }
        if !self.unresolved.is_empty() {
            lines.push(format!("  未解決の値: {}件", self.unresolved.len()));
        }
        lines
    }
}

/// 実行時刻
pub fn timestamp_now() -> String {
    chrono::Local::now().to_rfc3339()
}
