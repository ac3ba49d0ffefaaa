//! 正規化ジョブ
//!
//! ## 処理フロー
//! 1. タクソノミと入力表を読み込む
//! 2. ラベル以外の列を整形（ユーザー数・国名・地域）
//! 3. エイリアス置換 → 階層リゾルバ → 適合検証
//! 4. 注釈付きの表・Use Case抽出・ダッシュボード用の分割表・実行レポートを書き出す

use crate::cleaning::{self, CountryLookup, RegionLookup};
use crate::cli::ExportFormat;
use crate::config::Config;
use crate::error::{ReconcileError, Result};
use crate::export::dashboard::assign_organisation_ids;
use crate::export::report::{timestamp_now, RunReport, SessionInfo};
use crate::export::{self, TableView, ORGANISATIONS_SUFFIX, PRODUCTS_SUFFIX, USE_CASES_SUFFIX};
use crate::loader;
use std::path::{Path, PathBuf};
use taxonomy_common::{reconcile, LiteralAliases, RecordTable};

/// 出力シート名
const OUTPUT_SHEET: &str = "Products";
const USE_CASES_SHEET: &str = "use_cases";
const ORGANISATIONS_SHEET: &str = "organisations";
const PRODUCTS_SHEET: &str = "products";

/// ジョブの入力
#[derive(Debug, Clone, Default)]
pub struct ReconcileJob {
    pub input: PathBuf,
    pub taxonomy: PathBuf,
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
    /// 入力のシート名
    pub sheet: Option<String>,
    pub countries: Option<PathBuf>,
    pub regions: Option<PathBuf>,
    pub use_cases: bool,
    /// 組織表・プロダクト表を出力
    pub dashboard: bool,
    pub report: Option<PathBuf>,
    pub dry_run: bool,
}

/// ジョブの結果
#[derive(Debug)]
pub struct JobOutcome {
    pub table: RecordTable,
    pub report: RunReport,
    /// 書き出したファイル（ドライラン時は空）
    pub written: Vec<PathBuf>,
}

/// 組み込みのエイリアスに設定ファイルの定義を重ねる
pub fn load_aliases(alias_file: Option<&Path>) -> Result<LiteralAliases> {
    let mut aliases = LiteralAliases::builtin();
    if let Some(path) = alias_file {
        if !path.exists() {
            return Err(ReconcileError::FileNotFound(path.display().to_string()));
        }
        let custom = LiteralAliases::from_file(path)?;
        tracing::info!(path = %path.display(), entries = custom.len(), "custom aliases loaded");
        aliases.merge(&custom);
    }
    Ok(aliases)
}

/// ジョブを実行
pub fn run_job(job: &ReconcileJob, config: &Config) -> Result<JobOutcome> {
    // 1. 読み込み
    println!("[1/4] タクソノミと入力を読み込み中...");
    let index = loader::load_taxonomy(&job.taxonomy, &config.taxonomy_sheet)?;
    let source = loader::load_table(&job.input, job.sheet.as_deref())?;
    let mut table = RecordTable::from_source(source, &config.columns)?;
    let aliases = load_aliases(config.alias_file.as_deref())?;
    println!(
        "✔ タクソノミ {}ラベル / 入力 {}行\n",
        index.len(),
        table.len()
    );

    // 2. 列の整形
    println!("[2/4] 列を整形中...");
    let countries = job.countries.as_deref().map(CountryLookup::from_file).transpose()?;
    let regions = job.regions.as_deref().map(RegionLookup::from_file).transpose()?;
    let cleaning_stats = cleaning::clean_columns(&mut table, config, countries.as_ref(), regions.as_ref());
    println!(
        "✔ ユーザー数 {}セル / 国名 {}セル / 地域 {}行\n",
        cleaning_stats.user_count_cells, cleaning_stats.country_cells, cleaning_stats.region_rows
    );

    // 3. 正規化と適合検証
    println!("[3/4] ラベルを正規化中...");
    let reconcile_report = reconcile(&mut table, &index, &aliases, &config.reconcile_options());
    println!("✔ 修正 {}件\n", reconcile_report.correction_count());

    // 4. 出力
    let output_path = export::output_path_for(&job.input, job.output.as_deref(), job.format);
    let session = SessionInfo {
        timestamp: timestamp_now(),
        input: job.input.display().to_string(),
        taxonomy: job.taxonomy.display().to_string(),
        output: (!job.dry_run).then(|| output_path.display().to_string()),
        dry_run: job.dry_run,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let report = RunReport::new(session, table.len(), index.len(), cleaning_stats, &reconcile_report);

    let mut written = Vec::new();
    if job.dry_run {
        println!("[4/4] ドライランのため出力をスキップ");
    } else {
        println!("[4/4] 出力中...");
        cleaning::sanitize_table(&mut table);

        let organisations = if job.dashboard {
            let count = assign_organisation_ids(&mut table, &config.dashboard.organisation_name);
            if count.is_none() {
                tracing::warn!(
                    column = %config.dashboard.organisation_name,
                    "organisation column not found; organisations table skipped"
                );
            }
            count
        } else {
            None
        };

        export::export_table(&TableView::full(&table), job.format, &output_path, OUTPUT_SHEET)?;
        println!("✔ 出力: {}", output_path.display());
        written.push(output_path.clone());

        if job.use_cases {
            let path = export::companion_path_for(&output_path, USE_CASES_SUFFIX, job.format);
            let view = TableView::use_cases(&table, &config.columns.product_id, &config.dashboard.user);
            export::export_table(&view, job.format, &path, USE_CASES_SHEET)?;
            println!("✔ Use Case抽出: {}", path.display());
            written.push(path);
        }

        if job.dashboard {
            if let Some(count) = organisations {
                let path = export::companion_path_for(&output_path, ORGANISATIONS_SUFFIX, job.format);
                let view = TableView::organisations(&table, &config.dashboard);
                export::export_table(&view, job.format, &path, ORGANISATIONS_SHEET)?;
                println!("✔ 組織表: {} ({}組織)", path.display(), count);
                written.push(path);
            }

            let path = export::companion_path_for(&output_path, PRODUCTS_SUFFIX, job.format);
            let view = TableView::products(&table, &config.columns.product_id, &config.dashboard);
            export::export_table(&view, job.format, &path, PRODUCTS_SHEET)?;
            println!("✔ プロダクト表: {} ({}件)", path.display(), view.rows.len());
            written.push(path);
        }

        if let Some(path) = &job.report {
            report.export_json(path)?;
            println!("✔ レポート: {}", path.display());
            written.push(path.clone());
        }
    }

    Ok(JobOutcome {
        table,
        report,
        written,
    })
}
