//! Taxonomy Reconcile Common Library
//!
//! ラベル正規化の中核（タクソノミ索引・あいまい照合・階層リゾルバ・適合検証）

pub mod alias;
pub mod conformance;
pub mod csv_text;
pub mod error;
pub mod export;
pub mod fuzzy;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod taxonomy;

pub use alias::{AliasHit, LiteralAliases};
pub use conformance::{ConformanceOptions, ConformanceReport, ConformanceValidator, LabelFailure};
pub use error::{Error, Result};
pub use fuzzy::{best_match, resolve, MatchResult, Scorer};
pub use pipeline::{reconcile, ReconcileOptions, ReconcileReport};
pub use record::{
    ColumnNames, Conformance, LabelColumn, MismatchReason, ProductRecord, RecordTable, SourceTable,
    CONFORMANCE_COLUMN, REASON_COLUMN,
};
pub use resolver::{
    Correction, CorrectionRule, HierarchyResolver, HierarchyRules, ResolutionReport, ResolverOptions,
    TOP_LEVEL_CATEGORIES,
};
pub use taxonomy::{composite_label, TaxonomyEntry, TaxonomyIndex};
