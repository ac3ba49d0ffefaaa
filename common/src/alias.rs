//! エイリアス変換モジュール
//!
//! 既知の言い換え表記を正規表記へ置き換える固定の対応表。
//! あいまい照合より前に、完全一致（大文字小文字を区別）でのみ適用する。

use crate::error::Result;
use crate::record::{LabelColumn, RecordTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// エイリアス定義
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralAliases {
    #[serde(default)]
    pub product_type: BTreeMap<String, String>,
    #[serde(default)]
    pub product_subtype: BTreeMap<String, String>,
    #[serde(default)]
    pub use_case: BTreeMap<String, String>,
}

/// 適用結果（1置換 = 1件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasHit {
    pub column: LabelColumn,
    pub original: String,
    pub corrected: String,
    pub rows: usize,
}

impl LiteralAliases {
    /// 組み込みの対応表（データ入力で頻出する Use Case の言い換え）
    pub fn builtin() -> Self {
        let mut aliases = Self::default();

        aliases.use_case.insert(
            "Track student attendance throughout the school term from the comfort of your phone.".into(),
            "Automated attendance Tracking".into(),
        );
        aliases.use_case.insert(
            "Generate detailed spreadsheets and PDF report forms (report cards, transcripts, etc.).".into(),
            "Report Card Generation".into(),
        );
        aliases
            .use_case
            .insert("Inclusive  education".into(), "Special education".into());
        aliases
            .use_case
            .insert("AI Grading Tool".into(), "Automated Grading".into());

        aliases
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let aliases: Self = serde_json::from_str(json)?;
        Ok(aliases)
    }

    pub fn for_column(&self, column: LabelColumn) -> &BTreeMap<String, String> {
        match column {
            LabelColumn::ProductType => &self.product_type,
            LabelColumn::ProductSubtype => &self.product_subtype,
            LabelColumn::UseCase => &self.use_case,
        }
    }

    pub fn len(&self) -> usize {
        self.product_type.len() + self.product_subtype.len() + self.use_case.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 設定をマージ（後から追加した設定が優先）
    pub fn merge(&mut self, other: &LiteralAliases) {
        self.product_type.extend(other.product_type.clone());
        self.product_subtype.extend(other.product_subtype.clone());
        self.use_case.extend(other.use_case.clone());
    }

    /// 表全体に対応表を適用
    pub fn apply(&self, table: &mut RecordTable) -> Vec<AliasHit> {
        let mut hits = Vec::new();

        for column in LabelColumn::ALL {
            for (original, corrected) in self.for_column(column) {
                let rows = table.rewrite_all(column, original, corrected);
                if rows > 0 {
                    tracing::debug!(%column, %original, %corrected, rows, "literal alias applied");
                    hits.push(AliasHit {
                        column,
                        original: original.clone(),
                        corrected: corrected.clone(),
                        rows,
                    });
                }
            }
        }

        hits
    }
}
