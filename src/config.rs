use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taxonomy_common::{
    ColumnNames, ConformanceOptions, ReconcileOptions, ResolverOptions, Scorer, TOP_LEVEL_CATEGORIES,
};

/// 照合閾値（0〜100）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// 兄弟値クラスタリング
    pub cluster: u8,
    /// 正規語彙照合
    pub fallback: u8,
    /// 適合検証での修復
    pub repair: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cluster: 80,
            fallback: 80,
            repair: 85,
        }
    }
}

/// ユーザー数列の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCountColumn {
    pub column: String,
    /// いずれかの語を含む値は先頭の数値トークンのみ残す（例: "student", "pupil"）
    pub keywords: Vec<String>,
}

/// ダッシュボード用の分割表の列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardColumns {
    /// 組織IDを振る元の列
    pub organisation_name: String,
    /// 組織表に含める列（組織IDの後に並ぶ）
    pub organisation_columns: Vec<String>,
    /// Use Case抽出に含める利用者区分の列
    pub user: String,
}

impl Default for DashboardColumns {
    fn default() -> Self {
        Self {
            organisation_name: "Organisation Name".into(),
            organisation_columns: vec!["Organisation Name".into()],
            user: "User".into(),
        }
    }
}

/// 実行ごとの上書き設定
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cluster_threshold: Option<u8>,
    pub fallback_threshold: Option<u8>,
    pub repair_threshold: Option<u8>,
    pub scorer: Option<Scorer>,
    pub taxonomy_sheet: Option<String>,
    pub alias_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub columns: ColumnNames,
    pub thresholds: Thresholds,
    pub fallback_scorer: Scorer,
    pub top_level_categories: Vec<String>,
    /// スプレッドシート形式のタクソノミのシート名
    pub taxonomy_sheet: String,
    /// 国名を正規化する列
    pub country_columns: Vec<String>,
    /// 地域列の元になる国名列
    pub region_source_column: Option<String>,
    pub user_count_columns: Vec<UserCountColumn>,
    /// 追加のエイリアス定義（JSON）
    pub alias_file: Option<PathBuf>,
    pub dashboard: DashboardColumns,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// 指定パスから読み込み（ファイルが無ければデフォルト）
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// デフォルト設定を書き出す（既存ファイルは読まずに上書き）
    pub fn init() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::init_at(&config_path)
    }

    pub fn init_at(config_path: &Path) -> Result<Self> {
        let config = Self::default_config();
        config.save_to(config_path)?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ReconcileError::Config("Home directory not found".into()))?;
        Ok(home.join(".config").join("taxonomy-reconcile").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            columns: ColumnNames::default(),
            thresholds: Thresholds::default(),
            fallback_scorer: Scorer::TokenSort,
            top_level_categories: TOP_LEVEL_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            taxonomy_sheet: "Taxonomy".into(),
            country_columns: Vec::new(),
            region_source_column: None,
            user_count_columns: Vec::new(),
            alias_file: None,
            dashboard: DashboardColumns::default(),
        }
    }

    /// 閾値の範囲を検証
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cluster", self.thresholds.cluster),
            ("fallback", self.thresholds.fallback),
            ("repair", self.thresholds.repair),
        ] {
            if value > 100 {
                return Err(ReconcileError::Config(format!(
                    "threshold '{}' must be between 0 and 100 (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// コマンドライン引数で上書き
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(v) = overrides.cluster_threshold {
            self.thresholds.cluster = v;
        }
        if let Some(v) = overrides.fallback_threshold {
            self.thresholds.fallback = v;
        }
        if let Some(v) = overrides.repair_threshold {
            self.thresholds.repair = v;
        }
        if let Some(scorer) = overrides.scorer {
            self.fallback_scorer = scorer;
        }
        if let Some(sheet) = &overrides.taxonomy_sheet {
            self.taxonomy_sheet = sheet.clone();
        }
        if let Some(path) = &overrides.alias_file {
            self.alias_file = Some(path.clone());
        }
        self.validate()
    }

    /// パイプラインの設定に変換
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            resolver: ResolverOptions {
                cluster_threshold: self.thresholds.cluster,
                fallback_threshold: self.thresholds.fallback,
                fallback_scorer: self.fallback_scorer,
                top_level_categories: self.top_level_categories.clone(),
            },
            conformance: ConformanceOptions {
                repair_threshold: self.thresholds.repair,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.thresholds, Thresholds { cluster: 80, fallback: 80, repair: 85 });
        assert_eq!(config.taxonomy_sheet, "Taxonomy");
        assert_eq!(config.top_level_categories.len(), 4);

        let options = config.reconcile_options();
        assert_eq!(options, ReconcileOptions::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"thresholds": {"fallback": 90}, "fallback_scorer": "token_set"}"#,
        )
        .unwrap();
        assert_eq!(config.thresholds.fallback, 90);
        assert_eq!(config.thresholds.repair, 85);
        assert_eq!(config.fallback_scorer, Scorer::TokenSet);
        assert_eq!(config.columns.use_case, "Use Cases");
        assert_eq!(config.dashboard, DashboardColumns::default());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(&Overrides {
                repair_threshold: Some(90),
                scorer: Some(Scorer::TokenSet),
                taxonomy_sheet: Some("Sheet2".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.thresholds.repair, 90);
        assert_eq!(config.thresholds.cluster, 80);
        assert_eq!(config.fallback_scorer, Scorer::TokenSet);
        assert_eq!(config.taxonomy_sheet, "Sheet2");

        let err = config.apply_overrides(&Overrides {
            cluster_threshold: Some(101),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = std::env::temp_dir().join(format!("taxonomy-config-{}", std::process::id()));
        let path = dir.join("config.json");
        let mut config = Config::default();
        config.country_columns = vec!["Countries Implementing in".into()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let loaded = Config::load_from(Path::new("/nonexistent/taxonomy/config.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_init_overwrites_malformed_file() {
        let dir = std::env::temp_dir().join(format!("taxonomy-config-init-{}", std::process::id()));
        let path = dir.join("config.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());

        let config = Config::init_at(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_range_threshold_is_error() {
        let mut config = Config::default();
        config.thresholds.repair = 120;
        assert!(matches!(config.validate(), Err(ReconcileError::Config(_))));
    }
}
