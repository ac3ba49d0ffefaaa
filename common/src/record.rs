//! レコード表
//!
//! 正規化対象の表を保持する。ラベル3列（Product types / Product Subtype /
//! Use Cases）は型付きフィールド、それ以外の列は元の順序のまま素通しする。
//! 値の一括修正は `rewrite_all` / `set_where` のみで行う。

use crate::csv_text::parse_csv;
use crate::error::{Error, Result};
use crate::taxonomy::{clean_label, composite_label};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 出力列: タクソノミ適合フラグ
pub const CONFORMANCE_COLUMN: &str = "Present in taxonomy";
/// 出力列: 不適合理由
pub const REASON_COLUMN: &str = "Reason";

/// 読み込んだままの表（ヘッダー + セル）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl SourceTable {
    /// 空白のみのセルは `None` として保持する
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row.into_iter()
                    .map(|cell| cell.filter(|c| !c.trim().is_empty()))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut records = parse_csv(content).into_iter();
        let headers = records
            .next()
            .ok_or_else(|| Error::Data("CSV has no header row".into()))?;
        let rows = records
            .map(|r| r.into_iter().map(Some).collect())
            .collect();
        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, table: &str, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            table: table.to_string(),
            column: name.to_string(),
        })
    }
}

/// 入力表の列名設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub product_id: String,
    pub product_type: String,
    pub product_subtype: String,
    pub use_case: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            product_id: "product_id".into(),
            product_type: "Product types".into(),
            product_subtype: "Product Subtype".into(),
            use_case: "Use Cases".into(),
        }
    }
}

impl ColumnNames {
    pub fn label(&self, column: LabelColumn) -> &str {
        match column {
            LabelColumn::ProductType => &self.product_type,
            LabelColumn::ProductSubtype => &self.product_subtype,
            LabelColumn::UseCase => &self.use_case,
        }
    }
}

/// ラベル列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelColumn {
    ProductType,
    ProductSubtype,
    UseCase,
}

impl LabelColumn {
    pub const ALL: [LabelColumn; 3] = [
        LabelColumn::ProductType,
        LabelColumn::ProductSubtype,
        LabelColumn::UseCase,
    ];
}

impl fmt::Display for LabelColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelColumn::ProductType => write!(f, "Product types"),
            LabelColumn::ProductSubtype => write!(f, "Product Subtype"),
            LabelColumn::UseCase => write!(f, "Use Cases"),
        }
    }
}

/// タクソノミ適合フラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conformance {
    Yes,
    No,
}

impl fmt::Display for Conformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conformance::Yes => write!(f, "Yes"),
            Conformance::No => write!(f, "No"),
        }
    }
}

/// 不適合理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchReason {
    UseCaseNotFound,
    ProductSubtypeNotFound,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::UseCaseNotFound => write!(f, "use case not found"),
            MismatchReason::ProductSubtypeNotFound => write!(f, "Product subtype not found"),
        }
    }
}

/// 正規化対象の1行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductRecord {
    pub product_id: Option<String>,
    pub product_type: Option<String>,
    pub product_subtype: Option<String>,
    pub use_case: Option<String>,
    pub conformance: Option<Conformance>,
    pub reason: Option<MismatchReason>,
    /// ラベル列・ID列以外のセル（`RecordTable::passthrough_headers` と同順）
    pub extra: Vec<Option<String>>,
}

impl ProductRecord {
    pub fn labels(
        product_type: Option<&str>,
        product_subtype: Option<&str>,
        use_case: Option<&str>,
    ) -> Self {
        Self {
            product_type: product_type.map(String::from),
            product_subtype: product_subtype.map(String::from),
            use_case: use_case.map(String::from),
            ..Default::default()
        }
    }

    pub fn get(&self, column: LabelColumn) -> Option<&str> {
        match column {
            LabelColumn::ProductType => self.product_type.as_deref(),
            LabelColumn::ProductSubtype => self.product_subtype.as_deref(),
            LabelColumn::UseCase => self.use_case.as_deref(),
        }
    }

    pub fn set(&mut self, column: LabelColumn, value: Option<String>) {
        match column {
            LabelColumn::ProductType => self.product_type = value,
            LabelColumn::ProductSubtype => self.product_subtype = value,
            LabelColumn::UseCase => self.use_case = value,
        }
    }

    /// 合成ラベル（いずれかが欠けていれば `None`）
    pub fn composite_label(&self) -> Option<String> {
        Some(composite_label(
            self.product_type.as_deref()?,
            self.product_subtype.as_deref()?,
            self.use_case.as_deref()?,
        ))
    }
}

/// 出力列の並び
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSlot {
    ProductId,
    Label(LabelColumn),
    Extra(usize),
}

/// レコード表
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    headers: Vec<String>,
    slots: Vec<ColumnSlot>,
    passthrough_headers: Vec<String>,
    records: Vec<ProductRecord>,
}

impl RecordTable {
    /// 読み込んだ表から構築
    ///
    /// 必須列（ID・ラベル3列）が無ければ `Error::MissingColumn`。
    /// 既存の注釈列は破棄し、出力時に作り直す。
    pub fn from_source(source: SourceTable, columns: &ColumnNames) -> Result<Self> {
        let id_idx = source.require_column("input", &columns.product_id)?;
        let label_idx = [
            source.require_column("input", &columns.product_type)?,
            source.require_column("input", &columns.product_subtype)?,
            source.require_column("input", &columns.use_case)?,
        ];

        let mut headers = Vec::new();
        let mut slots = Vec::new();
        let mut passthrough_headers = Vec::new();
        let mut extra_idx = Vec::new();

        for (i, header) in source.headers.iter().enumerate() {
            let slot = if i == id_idx {
                ColumnSlot::ProductId
            } else if let Some(pos) = label_idx.iter().position(|&l| l == i) {
                ColumnSlot::Label(LabelColumn::ALL[pos])
            } else if header == CONFORMANCE_COLUMN || header == REASON_COLUMN {
                continue;
            } else {
                extra_idx.push(i);
                passthrough_headers.push(header.clone());
                ColumnSlot::Extra(extra_idx.len() - 1)
            };
            headers.push(header.clone());
            slots.push(slot);
        }

        let records = source
            .rows
            .into_iter()
            .map(|mut row| {
                let label = |row: &mut Vec<Option<String>>, idx: usize| {
                    row[idx]
                        .take()
                        .map(|v| clean_label(&v).to_string())
                        .filter(|v| !v.is_empty())
                };
                ProductRecord {
                    product_id: row[id_idx].take(),
                    product_type: label(&mut row, label_idx[0]),
                    product_subtype: label(&mut row, label_idx[1]),
                    use_case: label(&mut row, label_idx[2]),
                    conformance: None,
                    reason: None,
                    extra: extra_idx.iter().map(|&i| row[i].take()).collect(),
                }
            })
            .collect();

        Ok(Self {
            headers,
            slots,
            passthrough_headers,
            records,
        })
    }

    /// ラベル3列のみの表（テスト・小規模利用向け）
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        let columns = ColumnNames::default();
        Self {
            headers: vec![
                columns.product_id.clone(),
                columns.product_type.clone(),
                columns.product_subtype.clone(),
                columns.use_case.clone(),
            ],
            slots: vec![
                ColumnSlot::ProductId,
                ColumnSlot::Label(LabelColumn::ProductType),
                ColumnSlot::Label(LabelColumn::ProductSubtype),
                ColumnSlot::Label(LabelColumn::UseCase),
            ],
            passthrough_headers: Vec::new(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ProductRecord] {
        &mut self.records
    }

    pub fn passthrough_headers(&self) -> &[String] {
        &self.passthrough_headers
    }

    /// 列の空でない値を初出順に重複なしで返す
    pub fn distinct_values(&self, column: LabelColumn) -> Vec<String> {
        self.value_counts(column).into_iter().map(|(v, _)| v).collect()
    }

    /// 列の値と出現行数（初出順）
    pub fn value_counts(&self, column: LabelColumn) -> Vec<(String, usize)> {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            if let Some(value) = record.get(column) {
                match positions.get(value) {
                    Some(&pos) => order[pos].1 += 1,
                    None => {
                        positions.insert(value, order.len());
                        order.push((value.to_string(), 1));
                    }
                }
            }
        }
        order
    }

    /// 列中の `old` と等しい値をすべて `new` に置換（表全体で一括）
    ///
    /// 置換した行数を返す。
    pub fn rewrite_all(&mut self, column: LabelColumn, old: &str, new: &str) -> usize {
        if old == new {
            return 0;
        }
        let mut changed = 0;
        for record in &mut self.records {
            if record.get(column) == Some(old) {
                record.set(column, Some(new.to_string()));
                changed += 1;
            }
        }
        changed
    }

    /// `filter` 列が `value` の行の `target` 列を `new` に設定
    ///
    /// 実際に変わった行を元の値ごとに集計して返す（元の値の初出順）。
    pub fn set_where(
        &mut self,
        filter: LabelColumn,
        value: &str,
        target: LabelColumn,
        new: &str,
    ) -> Vec<(Option<String>, usize)> {
        let mut replaced: Vec<(Option<String>, usize)> = Vec::new();
        for record in &mut self.records {
            if record.get(filter) != Some(value) || record.get(target) == Some(new) {
                continue;
            }
            let old = record.get(target).map(String::from);
            match replaced.iter_mut().find(|(o, _)| *o == old) {
                Some((_, count)) => *count += 1,
                None => replaced.push((old, 1)),
            }
            record.set(target, Some(new.to_string()));
        }
        replaced
    }

    /// 素通し列の値を変換する。列が無ければ `false`。
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(Option<String>) -> Option<String>,
    {
        let Some(idx) = self.passthrough_headers.iter().position(|h| h == name) else {
            return false;
        };
        for record in &mut self.records {
            let value = record.extra[idx].take();
            record.extra[idx] = f(value);
        }
        true
    }

    /// 素通し列の値を参照
    pub fn column_values(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.passthrough_headers.iter().position(|h| h == name)?;
        Some(self.records.iter().map(|r| r.extra[idx].as_deref()).collect())
    }

    /// 素通し列を末尾に追加（同名があれば置換）
    pub fn push_column(&mut self, name: &str, values: Vec<Option<String>>) {
        if let Some(idx) = self.passthrough_headers.iter().position(|h| h == name) {
            for (record, value) in self.records.iter_mut().zip(values) {
                record.extra[idx] = value;
            }
            return;
        }

        let idx = self.passthrough_headers.len();
        self.passthrough_headers.push(name.to_string());
        self.headers.push(name.to_string());
        self.slots.push(ColumnSlot::Extra(idx));
        let mut values = values.into_iter();
        for record in &mut self.records {
            record.extra.push(values.next().flatten());
        }
    }

    /// 全セル（注釈列以外）に変換を適用
    pub fn map_all_cells<F>(&mut self, f: F)
    where
        F: Fn(&str) -> String,
    {
        let apply = |cell: &mut Option<String>| {
            if let Some(value) = cell.as_mut() {
                *value = f(value);
            }
        };
        for record in &mut self.records {
            apply(&mut record.product_id);
            apply(&mut record.product_type);
            apply(&mut record.product_subtype);
            apply(&mut record.use_case);
            record.extra.iter_mut().for_each(apply);
        }
    }

    /// 注釈を消去
    pub fn clear_annotations(&mut self) {
        for record in &mut self.records {
            record.conformance = None;
            record.reason = None;
        }
    }

    /// 出力ヘッダー（元の列順 + 注釈2列）
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        headers.push(CONFORMANCE_COLUMN.to_string());
        headers.push(REASON_COLUMN.to_string());
        headers
    }

    /// 出力行（`output_headers` と同順）
    pub fn output_rows(&self) -> Vec<Vec<String>> {
        self.records.iter().map(|r| self.output_row(r)).collect()
    }

    fn output_row(&self, record: &ProductRecord) -> Vec<String> {
        let mut row: Vec<String> = self
            .slots
            .iter()
            .map(|slot| {
                let value = match slot {
                    ColumnSlot::ProductId => record.product_id.as_deref(),
                    ColumnSlot::Label(column) => record.get(*column),
                    ColumnSlot::Extra(i) => record.extra[*i].as_deref(),
                };
                value.unwrap_or_default().to_string()
            })
            .collect();
        row.push(record.conformance.map(|c| c.to_string()).unwrap_or_default());
        row.push(record.reason.map(|r| r.to_string()).unwrap_or_default());
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT_CSV: &str = "product_id,Organisation Name,Product types,Product Subtype,Use Cases,Present in taxonomy\n\
1,Acme,Learning,Adaptve Learning,Quizzes,Yes\n\
2,Acme,Learning ,Adaptve Learning,Quizzes\n\
3,Beta,,  ,Quizzes\n";

    fn table() -> RecordTable {
        let source = SourceTable::from_csv_str(INPUT_CSV).unwrap();
        RecordTable::from_source(source, &ColumnNames::default()).unwrap()
    }

    #[test]
    fn test_from_source_splits_columns() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.passthrough_headers(), &["Organisation Name".to_string()]);
        let r = &table.records()[1];
        assert_eq!(r.product_id.as_deref(), Some("2"));
        assert_eq!(r.product_type.as_deref(), Some("Learning"));
        assert_eq!(r.extra, vec![Some("Acme".to_string())]);
    }

    #[test]
    fn test_blank_labels_are_absent() {
        let table = table();
        let r = &table.records()[2];
        assert_eq!(r.product_type, None);
        assert_eq!(r.product_subtype, None);
        assert_eq!(r.composite_label(), None);
    }

    #[test]
    fn test_missing_column() {
        let source = SourceTable::from_csv_str("product_id,Product types,Use Cases\n1,a,b\n").unwrap();
        let err = RecordTable::from_source(source, &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "Product Subtype"));
    }

    #[test]
    fn test_existing_annotation_columns_are_dropped() {
        let table = table();
        let headers = table.output_headers();
        assert_eq!(
            headers,
            vec![
                "product_id",
                "Organisation Name",
                "Product types",
                "Product Subtype",
                "Use Cases",
                "Present in taxonomy",
                "Reason",
            ]
        );
    }

    #[test]
    fn test_rewrite_all_is_dataset_wide() {
        let mut table = table();
        let changed = table.rewrite_all(LabelColumn::ProductSubtype, "Adaptve Learning", "Adaptive Learning");
        assert_eq!(changed, 2);
        assert!(table
            .records()
            .iter()
            .filter_map(|r| r.product_subtype.as_deref())
            .all(|v| v == "Adaptive Learning"));
    }

    #[test]
    fn test_value_counts_in_first_appearance_order() {
        let table = table();
        assert_eq!(
            table.value_counts(LabelColumn::ProductSubtype),
            vec![("Adaptve Learning".to_string(), 2)]
        );
        assert_eq!(table.distinct_values(LabelColumn::UseCase), vec!["Quizzes".to_string()]);
    }

    #[test]
    fn test_set_where_groups_old_values() {
        let mut table = table();
        let replaced = table.set_where(LabelColumn::UseCase, "Quizzes", LabelColumn::ProductType, "Learning");
        // 1,2行目はすでに "Learning"
        assert_eq!(replaced, vec![(None, 1)]);
        assert!(table.records().iter().all(|r| r.product_type.as_deref() == Some("Learning")));
    }

    #[test]
    fn test_push_and_map_column() {
        let mut table = table();
        table.push_column("region", vec![Some("Asia".into()), None, Some("Europe".into())]);
        assert!(table.map_column("region", |v| v.map(|s| s.to_uppercase())));
        assert_eq!(
            table.column_values("region").unwrap(),
            vec![Some("ASIA"), None, Some("EUROPE")]
        );
        assert!(!table.map_column("missing", |v| v));
        assert_eq!(table.output_headers()[5], "region");
    }

    #[test]
    fn test_output_rows_include_annotations() {
        let mut table = table();
        table.records_mut()[0].conformance = Some(Conformance::No);
        table.records_mut()[0].reason = Some(MismatchReason::UseCaseNotFound);
        let rows = table.output_rows();
        assert_eq!(rows[0][5], "No");
        assert_eq!(rows[0][6], "use case not found");
        assert_eq!(rows[1][5], "");
    }
}
