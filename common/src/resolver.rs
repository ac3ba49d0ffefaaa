//! 階層リゾルバ
//!
//! ラベル3列をタクソノミに照らして正規化する。後段の列が前段の列を
//! 修復できるため、処理順は固定。
//!
//! ## 処理フロー
//! 1. Product types の兄弟値クラスタリング（同一列内の表記揺れを統合）
//! 2. Product types を正規語彙と照合し、Subtype/UseCase なら親の Type へ
//! 3. Product Subtype を正規語彙と照合し、UseCase 名なら親の Type を上書き
//! 4. Use Cases を正規語彙と照合し、UseCase から Type/Subtype を補完
//!
//! すべての書き換えは列全体の値単位（`RecordTable::rewrite_all`）で行う。

use crate::fuzzy::{self, Scorer};
use crate::record::{LabelColumn, RecordTable};
use crate::taxonomy::TaxonomyIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 最上位カテゴリ（タクソノミに無くても Product types として有効）
pub const TOP_LEVEL_CATEGORIES: [&str; 4] = [
    "Learning",
    "Teaching",
    "Administration & Governance",
    "Other",
];

/// リゾルバの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// 兄弟値クラスタリングの閾値
    pub cluster_threshold: u8,
    /// 正規語彙照合の閾値
    pub fallback_threshold: u8,
    /// 正規語彙照合のスコア方式
    pub fallback_scorer: Scorer,
    pub top_level_categories: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cluster_threshold: 80,
            fallback_threshold: 80,
            fallback_scorer: Scorer::TokenSort,
            top_level_categories: TOP_LEVEL_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 修正の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionRule {
    LiteralAlias,
    SiblingCluster,
    Vocabulary,
    ParentType,
    BackFill,
    ConformanceRepair,
}

impl fmt::Display for CorrectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorrectionRule::LiteralAlias => "alias",
            CorrectionRule::SiblingCluster => "sibling",
            CorrectionRule::Vocabulary => "vocabulary",
            CorrectionRule::ParentType => "parent",
            CorrectionRule::BackFill => "back-fill",
            CorrectionRule::ConformanceRepair => "repair",
        };
        write!(f, "{}", name)
    }
}

/// 列全体に適用した1件の修正
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correction {
    pub column: LabelColumn,
    /// 修正前の値（空欄だった行は `None`）
    pub original: Option<String>,
    pub corrected: String,
    pub rows: usize,
    pub rule: CorrectionRule,
    pub score: Option<u8>,
}

/// 統計情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub total_records: usize,
    /// 書き換えた延べ行数
    pub rewritten_rows: usize,
    /// 空欄のためスキップした Subtype の行数
    pub blank_subtypes: usize,
}

/// 正規化結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub corrections: Vec<Correction>,
    /// 最終的に語彙へ解決できなかった値
    pub unresolved: Vec<(LabelColumn, String)>,
    pub stats: ResolutionStats,
}

impl ResolutionReport {
    fn push(&mut self, correction: Correction) {
        self.stats.rewritten_rows += correction.rows;
        self.corrections.push(correction);
    }
}

/// 語彙中の値から親階層を導く規則
///
/// リゾルバと適合検証の修復の両方で使う。
#[derive(Debug, Clone, Copy)]
pub struct HierarchyRules<'a> {
    index: &'a TaxonomyIndex,
    top_level: &'a [String],
}

impl<'a> HierarchyRules<'a> {
    pub fn new(index: &'a TaxonomyIndex, top_level: &'a [String]) -> Self {
        Self { index, top_level }
    }

    pub fn index(&self) -> &'a TaxonomyIndex {
        self.index
    }

    pub fn is_top_level(&self, value: &str) -> bool {
        self.top_level.iter().any(|c| c == value)
    }

    /// 列の値としてそのまま受け入れられるか
    pub fn is_valid(&self, column: LabelColumn, value: &str) -> bool {
        match column {
            LabelColumn::ProductType => {
                self.is_top_level(value)
                    || self.index.is_product_type(value)
                    || self.index.in_vocabulary(value)
            }
            LabelColumn::ProductSubtype | LabelColumn::UseCase => self.index.in_vocabulary(value),
        }
    }

    /// 値 `value` を持つ行に親階層を反映
    ///
    /// - Product types: Subtype/UseCase 名なら親の Type に置換
    /// - Product Subtype: UseCase 名（Subtype ではない）なら Type を上書き
    /// - Use Cases: UseCase なら Type と Subtype を補完
    pub fn apply(&self, table: &mut RecordTable, column: LabelColumn, value: &str) -> Vec<Correction> {
        let mut corrections = Vec::new();

        match column {
            LabelColumn::ProductType => {
                if self.is_top_level(value) || self.index.is_product_type(value) {
                    return corrections;
                }
                if let Some(parent) = self.index.parent_type(value) {
                    let rows = table.rewrite_all(LabelColumn::ProductType, value, parent);
                    if rows > 0 {
                        corrections.push(Correction {
                            column: LabelColumn::ProductType,
                            original: Some(value.to_string()),
                            corrected: parent.to_string(),
                            rows,
                            rule: CorrectionRule::ParentType,
                            score: None,
                        });
                    }
                }
            }
            LabelColumn::ProductSubtype => {
                if self.index.is_subtype(value) {
                    return corrections;
                }
                if let Some((parent_type, _)) = self.index.use_case_parent(value) {
                    corrections.extend(self.set_where(
                        table,
                        column,
                        value,
                        LabelColumn::ProductType,
                        parent_type,
                        CorrectionRule::ParentType,
                    ));
                }
            }
            LabelColumn::UseCase => {
                if let Some((parent_type, parent_subtype)) = self.index.use_case_parent(value) {
                    corrections.extend(self.set_where(
                        table,
                        column,
                        value,
                        LabelColumn::ProductType,
                        parent_type,
                        CorrectionRule::BackFill,
                    ));
                    corrections.extend(self.set_where(
                        table,
                        column,
                        value,
                        LabelColumn::ProductSubtype,
                        parent_subtype,
                        CorrectionRule::BackFill,
                    ));
                }
            }
        }

        corrections
    }

    fn set_where(
        &self,
        table: &mut RecordTable,
        filter: LabelColumn,
        value: &str,
        target: LabelColumn,
        new: &str,
        rule: CorrectionRule,
    ) -> Vec<Correction> {
        table
            .set_where(filter, value, target, new)
            .into_iter()
            .map(|(original, rows)| Correction {
                column: target,
                original,
                corrected: new.to_string(),
                rows,
                rule,
                score: None,
            })
            .collect()
    }
}

/// 階層リゾルバ
pub struct HierarchyResolver<'a> {
    rules: HierarchyRules<'a>,
    options: &'a ResolverOptions,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(index: &'a TaxonomyIndex, options: &'a ResolverOptions) -> Self {
        Self {
            rules: HierarchyRules::new(index, &options.top_level_categories),
            options,
        }
    }

    pub fn rules(&self) -> HierarchyRules<'a> {
        self.rules
    }

    /// 4段階の正規化を順に実行
    pub fn resolve(&self, table: &mut RecordTable) -> ResolutionReport {
        let mut report = ResolutionReport {
            stats: ResolutionStats {
                total_records: table.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        // 1. Product types の兄弟値クラスタリング
        self.cluster_siblings(table, LabelColumn::ProductType, &mut report);
        self.apply_parent_rules(table, LabelColumn::ProductType, &mut report);

        // 2. Product types の語彙照合
        self.reconcile_column(table, LabelColumn::ProductType, &mut report);
        self.apply_parent_rules(table, LabelColumn::ProductType, &mut report);

        // 3. Product Subtype
        report.stats.blank_subtypes = table
            .records()
            .iter()
            .filter(|r| r.product_subtype.is_none())
            .count();
        if report.stats.blank_subtypes > 0 {
            tracing::debug!(rows = report.stats.blank_subtypes, "blank Product Subtype values skipped");
        }
        self.reconcile_column(table, LabelColumn::ProductSubtype, &mut report);
        self.apply_parent_rules(table, LabelColumn::ProductSubtype, &mut report);

        // 4. Use Cases（UseCase から親階層を補完）
        self.reconcile_column(table, LabelColumn::UseCase, &mut report);
        self.apply_parent_rules(table, LabelColumn::UseCase, &mut report);

        for column in LabelColumn::ALL {
            for value in table.distinct_values(column) {
                if !self.rules.is_valid(column, &value) {
                    tracing::warn!(%column, %value, "label could not be resolved against the taxonomy");
                    report.unresolved.push((column, value));
                }
            }
        }

        report
    }

    /// 同一列内の表記揺れを統合
    ///
    /// 候補の並び: 有効な値 → 出現行数の多い順 → 初出順。
    /// 各値は自分より前に並ぶ値とのみ比較するため、統合は循環しない。
    /// 正規語彙に一致する値は統合せず、語彙照合に任せる。
    fn cluster_siblings(&self, table: &mut RecordTable, column: LabelColumn, report: &mut ResolutionReport) {
        let universe = self.fallback_universe(column);
        let mut ranked: Vec<(usize, String, usize, bool)> = table
            .value_counts(column)
            .into_iter()
            .enumerate()
            .map(|(first_seen, (value, count))| {
                let valid = self.rules.is_valid(column, &value);
                (first_seen, value, count, valid)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.3.cmp(&a.3)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        let order: Vec<String> = ranked.into_iter().map(|(_, value, _, _)| value).collect();

        let mut merged: HashMap<String, String> = HashMap::new();

        for (pos, value) in order.iter().enumerate() {
            if self.rules.is_valid(column, value) || self.authoritative_match(value, &universe).is_some() {
                continue;
            }

            let Some(found) = fuzzy::best_match(value, &order[..pos], Scorer::TokenSort)
                .filter(|m| m.score >= self.options.cluster_threshold)
            else {
                continue;
            };

            let mut target = found.label;
            while let Some(next) = merged.get(&target) {
                target = next.clone();
            }

            let rows = table.rewrite_all(column, value, &target);
            tracing::debug!(%column, from = %value, to = %target, score = found.score, rows, "sibling values merged");
            merged.insert(value.clone(), target.clone());
            report.push(Correction {
                column,
                original: Some(value.clone()),
                corrected: target,
                rows,
                rule: CorrectionRule::SiblingCluster,
                score: Some(found.score),
            });
        }
    }

    /// 照合対象の語彙
    ///
    /// Product types は最上位カテゴリとタクソノミの Type を先頭に置く。
    fn fallback_universe(&self, column: LabelColumn) -> Vec<String> {
        let index = self.rules.index();
        let mut universe: Vec<String> = Vec::new();
        if column == LabelColumn::ProductType {
            universe.extend(self.options.top_level_categories.iter().cloned());
            for product_type in index.product_types() {
                if !universe.iter().any(|u| u == product_type) {
                    universe.push(product_type.to_string());
                }
            }
        }
        universe.extend(index.vocabulary().iter().cloned());
        universe
    }

    fn authoritative_match(&self, value: &str, universe: &[String]) -> Option<fuzzy::MatchResult> {
        fuzzy::resolve(
            value,
            universe,
            self.options.fallback_threshold,
            self.options.fallback_scorer,
        )
    }

    /// 列の無効な値を正規語彙の最良一致へ書き換え
    fn reconcile_column(&self, table: &mut RecordTable, column: LabelColumn, report: &mut ResolutionReport) {
        let universe = self.fallback_universe(column);

        for value in table.distinct_values(column) {
            if self.rules.is_valid(column, &value) {
                continue;
            }

            let Some(found) = self.authoritative_match(&value, &universe) else {
                continue;
            };

            let rows = table.rewrite_all(column, &value, &found.label);
            tracing::debug!(%column, from = %value, to = %found.label, score = found.score, rows, "value matched to taxonomy vocabulary");
            report.push(Correction {
                column,
                original: Some(value),
                corrected: found.label,
                rows,
                rule: CorrectionRule::Vocabulary,
                score: Some(found.score),
            });
        }
    }

    fn apply_parent_rules(&self, table: &mut RecordTable, column: LabelColumn, report: &mut ResolutionReport) {
        for value in table.distinct_values(column) {
            for correction in self.rules.apply(table, column, &value) {
                tracing::debug!(
                    column = %correction.column,
                    from = ?correction.original,
                    to = %correction.corrected,
                    rows = correction.rows,
                    rule = %correction.rule,
                    "hierarchy rule applied"
                );
                report.push(correction);
            }
        }
    }
}
