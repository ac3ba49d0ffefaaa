//! 適合検証
//!
//! 正規化後の各行の合成ラベルがタクソノミに存在するかを判定し、
//! 存在しない場合は Use Case → Product Subtype の順に1回だけ修復を試みる。
//!
//! 判定はラベル単位（同じ初期ラベルを持つ行はまとめて1回）で行い、
//! 修復は `rewrite_all` により表全体へ反映する。
//! フラグと理由は全ラベルの修復が終わった後の最終状態から付与する。
//!
//! ## 理由
//! - Use Case の修復に失敗: `use case not found`
//! - Product Subtype の修復に失敗: `Product subtype not found`
//! - 3つとも語彙内だが組み合わせがタクソノミに無い: `use case not found`

use crate::fuzzy::{self, Scorer};
use crate::record::{Conformance, LabelColumn, MismatchReason, RecordTable};
use crate::resolver::{Correction, CorrectionRule, HierarchyRules};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 修復の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformanceOptions {
    pub repair_threshold: u8,
    pub repair_scorer: Scorer,
}

impl Default for ConformanceOptions {
    fn default() -> Self {
        Self {
            repair_threshold: 85,
            repair_scorer: Scorer::TokenSet,
        }
    }
}

/// 統計情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConformanceStats {
    pub labels_checked: usize,
    pub labels_repaired: usize,
    pub yes_rows: usize,
    pub no_rows: usize,
    /// ラベルが欠けていて判定しなかった行
    pub skipped_rows: usize,
}

/// 修復できなかったラベル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelFailure {
    pub label: String,
    pub reason: MismatchReason,
    pub rows: usize,
}

/// 検証結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConformanceReport {
    pub repairs: Vec<Correction>,
    pub failures: Vec<LabelFailure>,
    pub stats: ConformanceStats,
}

/// 適合検証器
pub struct ConformanceValidator<'a> {
    rules: HierarchyRules<'a>,
    options: ConformanceOptions,
}

impl<'a> ConformanceValidator<'a> {
    pub fn new(rules: HierarchyRules<'a>, options: ConformanceOptions) -> Self {
        Self { rules, options }
    }

    pub fn validate(&self, table: &mut RecordTable) -> ConformanceReport {
        let mut report = ConformanceReport::default();
        table.clear_annotations();

        // 初期ラベルごとに行をまとめる（初出順）
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (i, record) in table.records().iter().enumerate() {
            let Some(label) = record.composite_label() else {
                continue;
            };
            match positions.get(&label) {
                Some(&pos) => groups[pos].1.push(i),
                None => {
                    positions.insert(label.clone(), groups.len());
                    groups.push((label, vec![i]));
                }
            }
        }
        report.stats.labels_checked = groups.len();

        let mut failures: Vec<Option<MismatchReason>> = vec![None; table.len()];

        for (_, rows) in &groups {
            let first = rows[0];
            let Some(current) = table.records()[first].composite_label() else {
                continue;
            };
            if self.rules.index().contains_label(&current) {
                continue;
            }

            let mut failure = None;
            if !self.repair(table, first, LabelColumn::UseCase, &mut report) {
                failure = Some(MismatchReason::UseCaseNotFound);
            }
            if !self.repair(table, first, LabelColumn::ProductSubtype, &mut report) && failure.is_none() {
                failure = Some(MismatchReason::ProductSubtypeNotFound);
            }

            let repaired = table.records()[first].composite_label();
            if failure.is_none() {
                if repaired.as_deref() != Some(current.as_str()) {
                    report.stats.labels_repaired += 1;
                }
                if !repaired.is_some_and(|l| self.rules.index().contains_label(&l)) {
                    failure = Some(MismatchReason::UseCaseNotFound);
                }
            }
            for &row in rows {
                failures[row] = failure;
            }
        }

        // 修復による補完後もラベルが欠けている行のみ判定外
        for (record, failure) in table.records_mut().iter_mut().zip(failures) {
            let Some(label) = record.composite_label() else {
                report.stats.skipped_rows += 1;
                continue;
            };
            if self.rules.index().contains_label(&label) {
                record.conformance = Some(Conformance::Yes);
                report.stats.yes_rows += 1;
            } else {
                record.conformance = Some(Conformance::No);
                record.reason = Some(failure.unwrap_or(MismatchReason::UseCaseNotFound));
                report.stats.no_rows += 1;
            }
        }

        for (label, rows) in &groups {
            if let Some(reason) = table.records()[rows[0]].reason {
                tracing::warn!(%label, %reason, rows = rows.len(), "label not present in taxonomy");
                report.failures.push(LabelFailure {
                    label: label.clone(),
                    reason,
                    rows: rows.len(),
                });
            }
        }

        report
    }

    /// 行 `row` の `column` の値が語彙外なら最良一致へ書き換える
    ///
    /// 語彙内であるか修復できた場合は `true`。
    fn repair(&self, table: &mut RecordTable, row: usize, column: LabelColumn, report: &mut ConformanceReport) -> bool {
        let Some(value) = table.records()[row].get(column).map(String::from) else {
            return false;
        };
        let index = self.rules.index();
        if index.in_vocabulary(&value) {
            return true;
        }

        let Some(found) = fuzzy::best_match(&value, index.vocabulary(), self.options.repair_scorer)
            .filter(|m| m.score >= self.options.repair_threshold)
        else {
            return false;
        };

        let rows = table.rewrite_all(column, &value, &found.label);
        tracing::debug!(%column, from = %value, to = %found.label, score = found.score, rows, "label segment repaired");
        report.repairs.push(Correction {
            column,
            original: Some(value),
            corrected: found.label.clone(),
            rows,
            rule: CorrectionRule::ConformanceRepair,
            score: Some(found.score),
        });
        report.repairs.extend(self.rules.apply(table, column, &found.label));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProductRecord;
    use crate::resolver::TOP_LEVEL_CATEGORIES;
    use crate::taxonomy::{TaxonomyEntry, TaxonomyIndex};

    fn index() -> TaxonomyIndex {
        TaxonomyIndex::build(vec![
            TaxonomyEntry::new("Learning", "Self-Directed Learning", "Homework & Assignment Support"),
            TaxonomyEntry::new("Learning", "Assessment Tools", "Automated Grading"),
            TaxonomyEntry::new("Teaching", "Classroom Management", "Automated attendance Tracking"),
        ])
        .unwrap()
    }

    fn validate(records: Vec<ProductRecord>) -> (RecordTable, ConformanceReport) {
        let index = index();
        let top: Vec<String> = TOP_LEVEL_CATEGORIES.iter().map(|s| s.to_string()).collect();
        let rules = HierarchyRules::new(&index, &top);
        let mut table = RecordTable::from_records(records);
        let report = ConformanceValidator::new(rules, ConformanceOptions::default()).validate(&mut table);
        (table, report)
    }

    #[test]
    fn test_present_label_is_yes() {
        let (table, report) = validate(vec![ProductRecord::labels(
            Some("Learning"),
            Some("Assessment Tools"),
            Some("Automated Grading"),
        )]);
        assert_eq!(table.records()[0].conformance, Some(Conformance::Yes));
        assert_eq!(table.records()[0].reason, None);
        assert!(report.repairs.is_empty());
    }

    #[test]
    fn test_use_case_repair_with_token_set() {
        let (table, report) = validate(vec![
            ProductRecord::labels(Some("Learning"), Some("Self-Directed Learning"), Some("Homework Support")),
            ProductRecord::labels(Some("Teaching"), Some("Classroom Management"), Some("Homework Support")),
        ]);

        for r in table.records() {
            assert_eq!(r.use_case.as_deref(), Some("Homework & Assignment Support"));
            assert_eq!(r.product_type.as_deref(), Some("Learning"));
            assert_eq!(r.conformance, Some(Conformance::Yes));
        }
        assert_eq!(report.repairs[0].rule, CorrectionRule::ConformanceRepair);
        assert_eq!(report.repairs[0].rows, 2);
    }

    #[test]
    fn test_unknown_use_case_reason() {
        let (table, report) = validate(vec![ProductRecord::labels(
            Some("Learning"),
            Some("Assessment Tools"),
            Some("Blockchain Credentials"),
        )]);
        let r = &table.records()[0];
        assert_eq!(r.conformance, Some(Conformance::No));
        assert_eq!(r.reason, Some(MismatchReason::UseCaseNotFound));
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_unknown_subtype_reason() {
        let (table, _) = validate(vec![ProductRecord::labels(
            Some("Learning"),
            Some("Quantum Tutors"),
            Some("Automated Grading"),
        )]);
        let r = &table.records()[0];
        assert_eq!(r.conformance, Some(Conformance::No));
        assert_eq!(r.reason, Some(MismatchReason::ProductSubtypeNotFound));
    }

    #[test]
    fn test_use_case_failure_takes_precedence() {
        let (table, _) = validate(vec![ProductRecord::labels(
            Some("Learning"),
            Some("Quantum Tutors"),
            Some("Blockchain Credentials"),
        )]);
        assert_eq!(table.records()[0].reason, Some(MismatchReason::UseCaseNotFound));
    }

    #[test]
    fn test_valid_segments_wrong_combination() {
        let (table, _) = validate(vec![ProductRecord::labels(
            Some("Other"),
            Some("Classroom Management"),
            Some("Automated attendance Tracking"),
        )]);
        let r = &table.records()[0];
        assert_eq!(r.conformance, Some(Conformance::No));
        assert_eq!(r.reason, Some(MismatchReason::UseCaseNotFound));
    }

    #[test]
    fn test_missing_part_is_skipped() {
        let (table, report) = validate(vec![ProductRecord::labels(Some("Learning"), None, Some("Automated Grading"))]);
        assert_eq!(table.records()[0].conformance, None);
        assert_eq!(report.stats.skipped_rows, 1);
    }

    #[test]
    fn test_back_filled_row_is_not_counted_as_skipped() {
        let (table, report) = validate(vec![
            ProductRecord::labels(Some("Learning"), Some("Self-Directed Learning"), Some("Homework Support")),
            ProductRecord::labels(None, None, Some("Homework Support")),
        ]);
        assert_eq!(table.records()[1].conformance, Some(Conformance::Yes));
        assert_eq!(report.stats.yes_rows, 2);
        assert_eq!(report.stats.skipped_rows, 0);
        assert_eq!(
            report.stats.yes_rows + report.stats.no_rows + report.stats.skipped_rows,
            table.len()
        );
    }

    #[test]
    fn test_previous_annotations_are_cleared() {
        let mut record = ProductRecord::labels(Some("Learning"), None, None);
        record.conformance = Some(Conformance::No);
        record.reason = Some(MismatchReason::UseCaseNotFound);
        let (table, _) = validate(vec![record]);
        assert_eq!(table.records()[0].conformance, None);
        assert_eq!(table.records()[0].reason, None);
    }

    #[test]
    fn test_yes_rows_are_always_in_taxonomy() {
        let index = index();
        let (table, _) = validate(vec![
            ProductRecord::labels(Some("Learning"), Some("Self-Directed Learning"), Some("Homework Support")),
            ProductRecord::labels(Some("Other"), Some("Assessment Tools"), Some("Automated Grading")),
            ProductRecord::labels(Some("Learning"), Some("Assessment Tools"), Some("Automated Grading")),
        ]);
        for r in table.records() {
            if r.conformance == Some(Conformance::Yes) {
                assert!(index.contains_label(&r.composite_label().unwrap()));
            }
        }
    }
}
