//! 正規化パイプライン
//!
//! エイリアス置換 → 階層リゾルバ → 適合検証 を順に実行する。

use crate::alias::{AliasHit, LiteralAliases};
use crate::conformance::{ConformanceOptions, ConformanceReport, ConformanceValidator};
use crate::record::RecordTable;
use crate::resolver::{HierarchyResolver, ResolutionReport, ResolverOptions};
use crate::taxonomy::TaxonomyIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    pub resolver: ResolverOptions,
    pub conformance: ConformanceOptions,
}

/// パイプライン全体の結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub alias_hits: Vec<AliasHit>,
    pub resolution: ResolutionReport,
    pub conformance: ConformanceReport,
}

impl ReconcileReport {
    /// 書き換え件数（エイリアス + リゾルバ + 修復）
    pub fn correction_count(&self) -> usize {
        self.alias_hits.len() + self.resolution.corrections.len() + self.conformance.repairs.len()
    }
}

/// 表を正規化し、注釈を付与する
pub fn reconcile(
    table: &mut RecordTable,
    index: &TaxonomyIndex,
    aliases: &LiteralAliases,
    options: &ReconcileOptions,
) -> ReconcileReport {
    let alias_hits = aliases.apply(table);
    tracing::info!(hits = alias_hits.len(), "literal aliases applied");

    let resolver = HierarchyResolver::new(index, &options.resolver);
    let resolution = resolver.resolve(table);
    tracing::info!(
        corrections = resolution.corrections.len(),
        unresolved = resolution.unresolved.len(),
        "hierarchy resolved"
    );

    let validator = ConformanceValidator::new(resolver.rules(), options.conformance);
    let conformance = validator.validate(table);
    tracing::info!(
        yes = conformance.stats.yes_rows,
        no = conformance.stats.no_rows,
        skipped = conformance.stats.skipped_rows,
        "conformance checked"
    );

    ReconcileReport {
        alias_hits,
        resolution,
        conformance,
    }
}
