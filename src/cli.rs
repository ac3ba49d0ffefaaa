use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taxonomy_common::Scorer;

#[derive(Parser)]
#[command(name = "taxonomy-reconcile")]
#[command(about = "Ed-techプロダクトのラベルをタクソノミに照らして正規化・検証", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 表のラベルを正規化し、タクソノミ適合を注釈して出力
    Reconcile {
        /// 入力ファイル（csv/xlsx/xls/ods）
        #[arg(required = true)]
        input: PathBuf,

        /// タクソノミファイル（csv/xlsx/xls/ods）
        #[arg(short, long, required = true)]
        taxonomy: PathBuf,

        /// 出力ファイル（省略時: 入力と同じ場所に <入力名>_reconciled.<拡張子>）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (excel/csv)
        #[arg(short, long, default_value = "excel")]
        format: ExportFormat,

        /// 入力のシート名（省略時は先頭シート）
        #[arg(long)]
        sheet: Option<String>,

        /// タクソノミのシート名（省略時は設定値）
        #[arg(long)]
        taxonomy_sheet: Option<String>,

        /// カスタムエイリアスファイル（JSON）
        #[arg(long)]
        alias: Option<PathBuf>,

        /// 兄弟値クラスタリングの閾値 (0-100)
        #[arg(long)]
        cluster_threshold: Option<u8>,

        /// 正規語彙照合の閾値 (0-100)
        #[arg(long)]
        fallback_threshold: Option<u8>,

        /// 適合検証での修復の閾値 (0-100)
        #[arg(long)]
        repair_threshold: Option<u8>,

        /// 正規語彙照合のスコア方式 (token_sort/token_set)
        #[arg(long)]
        scorer: Option<Scorer>,

        /// 国名の対応表CSV（alias,name）
        #[arg(long)]
        countries: Option<PathBuf>,

        /// 国→地域の対応表CSV（country,region）
        #[arg(long)]
        regions: Option<PathBuf>,

        /// Use Case抽出ファイルも出力
        #[arg(long)]
        use_cases: bool,

        /// ダッシュボード用の組織表・プロダクト表も出力（組織IDを付与）
        #[arg(long)]
        dashboard: bool,

        /// 実行レポート（JSON）の出力先
        #[arg(long)]
        report: Option<PathBuf>,

        /// ドライラン（ファイルを書き出さずに集計のみ表示）
        #[arg(long)]
        dry_run: bool,
    },

    /// タクソノミファイルの内容を表示
    Taxonomy {
        /// タクソノミファイル
        #[arg(required = true)]
        file: PathBuf,

        /// シート名（省略時は設定値）
        #[arg(long)]
        sheet: Option<String>,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// デフォルト設定を書き出す
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use excel or csv", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Excel => write!(f, "excel"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}
