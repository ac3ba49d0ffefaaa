//! タクソノミ索引モジュール
//!
//! Product Type → Product Subtype → Use Case の3階層からなる統制語彙を管理する。
//! 実行開始時に一度だけ構築し、以後は読み取り専用。

use crate::error::{Error, Result};
use crate::record::SourceTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// タクソノミ表の列名
pub const TAXONOMY_COLUMNS: [&str; 3] = ["Product types", "Product Subtype", "Use Cases"];

/// タクソノミの1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub product_type: String,
    pub product_subtype: String,
    pub use_case: String,
}

impl TaxonomyEntry {
    pub fn new(
        product_type: impl Into<String>,
        product_subtype: impl Into<String>,
        use_case: impl Into<String>,
    ) -> Self {
        Self {
            product_type: product_type.into(),
            product_subtype: product_subtype.into(),
            use_case: use_case.into(),
        }
    }

    /// 合成ラベル `Type.Subtype.UseCase`
    pub fn label(&self) -> String {
        composite_label(&self.product_type, &self.product_subtype, &self.use_case)
    }
}

/// 合成ラベルを生成
pub fn composite_label(product_type: &str, product_subtype: &str, use_case: &str) -> String {
    format!("{}.{}.{}", product_type, product_subtype, use_case)
}

/// 前後の空白・改行を除去
pub fn clean_label(value: &str) -> &str {
    value.trim()
}

/// タクソノミ索引
#[derive(Debug, Clone, Default)]
pub struct TaxonomyIndex {
    /// 全エントリ（入力順、重複ラベル除去済み）
    entries: Vec<TaxonomyEntry>,
    product_types: BTreeSet<String>,
    product_subtypes: BTreeSet<String>,
    use_cases: BTreeSet<String>,
    /// Subtype ∪ UseCase（ソート済み・重複なし）
    vocabulary: Vec<String>,
    vocabulary_set: HashSet<String>,
    /// Subtype → Product Type（先勝ち）
    subtype_parent: HashMap<String, String>,
    /// UseCase → (Product Type, Product Subtype)（先勝ち）
    use_case_parent: HashMap<String, (String, String)>,
    labels: HashSet<String>,
}

impl TaxonomyIndex {
    /// エントリ列から索引を構築
    ///
    /// 各フィールドは前後の空白を除去してから使う。空のフィールドを含む行は
    /// `Error::Data`。合成ラベルが重複する行は最初の1行のみ残す。
    pub fn build<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = TaxonomyEntry>,
    {
        let mut index = Self::default();

        for (i, raw) in rows.into_iter().enumerate() {
            let entry = TaxonomyEntry::new(
                clean_label(&raw.product_type),
                clean_label(&raw.product_subtype),
                clean_label(&raw.use_case),
            );

            for (name, value) in TAXONOMY_COLUMNS.iter().zip([
                &entry.product_type,
                &entry.product_subtype,
                &entry.use_case,
            ]) {
                if value.is_empty() {
                    return Err(Error::Data(format!(
                        "taxonomy row {} has an empty {} field",
                        i + 1,
                        name
                    )));
                }
            }

            if !index.labels.insert(entry.label()) {
                tracing::warn!(label = %entry.label(), "duplicate taxonomy label ignored");
                continue;
            }

            index.product_types.insert(entry.product_type.clone());
            index.product_subtypes.insert(entry.product_subtype.clone());
            index.use_cases.insert(entry.use_case.clone());
            index
                .subtype_parent
                .entry(entry.product_subtype.clone())
                .or_insert_with(|| entry.product_type.clone());
            index
                .use_case_parent
                .entry(entry.use_case.clone())
                .or_insert_with(|| (entry.product_type.clone(), entry.product_subtype.clone()));

            index.entries.push(entry);
        }

        let vocabulary: BTreeSet<String> = index
            .product_subtypes
            .iter()
            .chain(index.use_cases.iter())
            .cloned()
            .collect();
        index.vocabulary_set = vocabulary.iter().cloned().collect();
        index.vocabulary = vocabulary.into_iter().collect();

        Ok(index)
    }

    /// 読み込んだ表から構築
    ///
    /// 完全に空の行（表計算ソフトの末尾行など）は無視する。
    pub fn from_source(source: &SourceTable) -> Result<Self> {
        let columns = TAXONOMY_COLUMNS
            .iter()
            .map(|name| source.require_column("taxonomy", name))
            .collect::<Result<Vec<usize>>>()?;

        let entries: Vec<TaxonomyEntry> = source
            .rows()
            .iter()
            .filter(|row| columns.iter().any(|&c| cell_text(row, c).is_some()))
            .map(|row| {
                TaxonomyEntry::new(
                    cell_text(row, columns[0]).unwrap_or_default(),
                    cell_text(row, columns[1]).unwrap_or_default(),
                    cell_text(row, columns[2]).unwrap_or_default(),
                )
            })
            .collect();

        Self::build(entries)
    }

    /// CSV文字列から構築
    pub fn from_csv_str(content: &str) -> Result<Self> {
        Self::from_source(&SourceTable::from_csv_str(content)?)
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn product_types(&self) -> impl Iterator<Item = &str> {
        self.product_types.iter().map(|s| s.as_str())
    }

    pub fn product_subtypes(&self) -> impl Iterator<Item = &str> {
        self.product_subtypes.iter().map(|s| s.as_str())
    }

    pub fn use_cases(&self) -> impl Iterator<Item = &str> {
        self.use_cases.iter().map(|s| s.as_str())
    }

    pub fn is_product_type(&self, value: &str) -> bool {
        self.product_types.contains(value)
    }

    pub fn is_subtype(&self, value: &str) -> bool {
        self.product_subtypes.contains(value)
    }

    pub fn is_use_case(&self, value: &str) -> bool {
        self.use_cases.contains(value)
    }

    /// 正規語彙（Subtype ∪ UseCase）。ソート済みで、照合時の列挙順を決める。
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn in_vocabulary(&self, value: &str) -> bool {
        self.vocabulary_set.contains(value)
    }

    pub fn subtype_parent(&self, subtype: &str) -> Option<&str> {
        self.subtype_parent.get(subtype).map(|s| s.as_str())
    }

    /// UseCase → (Product Type, Product Subtype)
    pub fn use_case_parent(&self, use_case: &str) -> Option<(&str, &str)> {
        self.use_case_parent
            .get(use_case)
            .map(|(t, s)| (t.as_str(), s.as_str()))
    }

    /// 語彙中の値が属する Product Type（Subtype の親を優先）
    pub fn parent_type(&self, value: &str) -> Option<&str> {
        self.subtype_parent(value)
            .or_else(|| self.use_case_parent(value).map(|(t, _)| t))
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Product Type ごとの (Subtype数, UseCase数)
    pub fn summary_by_type(&self) -> Vec<(String, usize, usize)> {
        self.product_types
            .iter()
            .map(|t| {
                let rows: Vec<&TaxonomyEntry> =
                    self.entries.iter().filter(|e| &e.product_type == t).collect();
                let subtypes: HashSet<&str> =
                    rows.iter().map(|e| e.product_subtype.as_str()).collect();
                (t.clone(), subtypes.len(), rows.len())
            })
            .collect()
    }
}

fn cell_text(row: &[Option<String>], index: usize) -> Option<String> {
    row.get(index)
        .and_then(|c| c.as_deref())
        .map(clean_label)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
