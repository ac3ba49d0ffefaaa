//! 国名・地域の正規化
//!
//! カンマ区切りの国名リストを対応表で正式名称にそろえ、
//! 必要に応じて国名から地域を導く。

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use taxonomy_common::SourceTable;

/// 国名の対応表（別名 → 正式名称）
#[derive(Debug, Clone, Default)]
pub struct CountryLookup {
    names: HashMap<String, String>,
}

impl CountryLookup {
    /// `alias,name` 形式のCSVから構築
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let source = SourceTable::from_csv_str(content)?;
        let alias_idx = source.require_column("countries", "alias")?;
        let name_idx = source.require_column("countries", "name")?;

        let names = source
            .rows()
            .iter()
            .filter_map(|row| {
                let alias = row[alias_idx].as_deref()?.trim();
                let name = row[name_idx].as_deref()?.trim();
                Some((alias.to_string(), name.to_string()))
            })
            .collect();
        Ok(Self { names })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_csv_str(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 国名リストを正規化（未登録の名前は前後の空白のみ除去）
    pub fn normalize(&self, value: &str) -> String {
        split_countries(value)
            .map(|c| self.names.get(c).map(String::as_str).unwrap_or(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// 国 → 地域の対応表
#[derive(Debug, Clone, Default)]
pub struct RegionLookup {
    regions: HashMap<String, String>,
}

impl RegionLookup {
    /// `country,region` 形式のCSVから構築
    ///
    /// 国名の引用符・カンマは除去する。地域が空の行は無視。
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let source = SourceTable::from_csv_str(content)?;
        let country_idx = source.require_column("regions", "country")?;
        let region_idx = source.require_column("regions", "region")?;

        let regions = source
            .rows()
            .iter()
            .filter_map(|row| {
                let country = row[country_idx].as_deref()?.replace(['\'', ',', '"'], "");
                let region = row[region_idx].as_deref()?.trim();
                Some((country.trim().to_string(), region.to_string()))
            })
            .collect();
        Ok(Self { regions })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_csv_str(&std::fs::read_to_string(path)?)
    }

    /// 国名リストに対応する地域（カンマ連結、重複はそのまま）
    pub fn region_for(&self, value: &str) -> Option<String> {
        let regions: Vec<&str> = split_countries(value)
            .filter_map(|c| self.regions.get(c).map(String::as_str))
            .collect();
        if regions.is_empty() {
            None
        } else {
            Some(regions.join(","))
        }
    }
}

fn split_countries(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|c| !c.is_empty())
}
