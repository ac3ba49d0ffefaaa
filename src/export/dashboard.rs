//! ダッシュボード用の分割表
//!
//! 注釈付きの全体表から、組織表（組織IDで重複除去）とプロダクト表
//! （product_idで重複除去）を切り出す。どちらも最初に現れた行を残す。

use super::TableView;
use crate::config::DashboardColumns;
use std::collections::{HashMap, HashSet};
use taxonomy_common::{RecordTable, CONFORMANCE_COLUMN, REASON_COLUMN};

pub const ORGANISATION_ID_COLUMN: &str = "Organisation ID";

/// 組織名の初出順に1から組織IDを振り、`Organisation ID` 列として追加
///
/// 組織名が空の行のIDは空欄。振った組織数を返す。組織名の列が無ければ `None`。
pub fn assign_organisation_ids(table: &mut RecordTable, name_column: &str) -> Option<usize> {
    let (values, count) = {
        let names = table.column_values(name_column)?;
        let mut ids: HashMap<&str, usize> = HashMap::new();
        let values: Vec<Option<String>> = names
            .iter()
            .map(|name| {
                let name = (*name)?;
                let next = ids.len() + 1;
                Some(ids.entry(name).or_insert(next).to_string())
            })
            .collect();
        (values, ids.len())
    };

    table.push_column(ORGANISATION_ID_COLUMN, values);
    tracing::debug!(column = %name_column, organisations = count, "organisation ids assigned");
    Some(count)
}

impl TableView {
    /// 組織表: 組織ID + 組織の列
    pub fn organisations(table: &RecordTable, columns: &DashboardColumns) -> Self {
        let mut selected = vec![ORGANISATION_ID_COLUMN.to_string()];
        selected.extend(
            columns
                .organisation_columns
                .iter()
                .filter(|c| c.as_str() != ORGANISATION_ID_COLUMN)
                .cloned(),
        );
        select_unique(table, &selected, ORGANISATION_ID_COLUMN)
    }

    /// プロダクト表: 組織の列・利用者区分・ラベル列・注釈を除いた列 + 組織ID
    pub fn products(table: &RecordTable, id_header: &str, columns: &DashboardColumns) -> Self {
        let excluded: HashSet<&str> = columns
            .organisation_columns
            .iter()
            .map(String::as_str)
            .chain([
                columns.organisation_name.as_str(),
                columns.user.as_str(),
                ORGANISATION_ID_COLUMN,
            ])
            .collect();

        let mut selected = vec![id_header.to_string()];
        selected.extend(
            table
                .passthrough_headers()
                .iter()
                .filter(|h| !excluded.contains(h.as_str()))
                .cloned(),
        );
        selected.push(ORGANISATION_ID_COLUMN.to_string());
        select_unique(table, &selected, id_header)
    }
}

/// 全体表から列を選び、`key` 列の値で重複を除いた表
///
/// 表に無い列は除外する。`key` が空の行は含めない。
fn select_unique(table: &RecordTable, columns: &[String], key: &str) -> TableView {
    let headers = table.output_headers();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name && h != CONFORMANCE_COLUMN && h != REASON_COLUMN)
    };

    let picked: Vec<(String, usize)> = columns
        .iter()
        .filter_map(|c| position(c).map(|i| (c.clone(), i)))
        .collect();
    let Some(key_idx) = position(key) else {
        tracing::warn!(%key, "key column not found; table left empty");
        return TableView {
            headers: picked.into_iter().map(|(c, _)| c).collect(),
            rows: Vec::new(),
            flagged: Vec::new(),
        };
    };

    let mut seen: HashSet<String> = HashSet::new();
    let rows: Vec<Vec<String>> = table
        .output_rows()
        .into_iter()
        .filter(|row| !row[key_idx].is_empty() && seen.insert(row[key_idx].clone()))
        .map(|row| picked.iter().map(|(_, i)| row[*i].clone()).collect())
        .collect();

    TableView {
        headers: picked.into_iter().map(|(c, _)| c).collect(),
        flagged: vec![false; rows.len()],
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxonomy_common::{ColumnNames, SourceTable};

    fn table() -> RecordTable {
        let csv = "product_id,Organisation Name,User,Product types,Product Subtype,Use Cases,Price\n\
1,Acme,Students,Learning,Assessment Tools,Automated Grading,Free\n\
1,Acme,Teachers,Learning,Assessment Tools,Automated Grading,Free\n\
2,Beta,Students,Learning,Assessment Tools,Automated Grading,Paid\n\
3,Acme,Parents,Learning,Assessment Tools,Automated Grading,Paid\n\
4,,Students,Learning,Assessment Tools,Automated Grading,Free\n";
        let source = SourceTable::from_csv_str(csv).unwrap();
        RecordTable::from_source(source, &ColumnNames::default()).unwrap()
    }

    #[test]
    fn test_organisation_ids_follow_first_appearance() {
        let mut table = table();
        assert_eq!(assign_organisation_ids(&mut table, "Organisation Name"), Some(2));
        assert_eq!(
            table.column_values(ORGANISATION_ID_COLUMN).unwrap(),
            vec![Some("1"), Some("1"), Some("2"), Some("1"), None]
        );
    }

    #[test]
    fn test_organisation_ids_missing_column() {
        let mut table = table();
        assert_eq!(assign_organisation_ids(&mut table, "Company"), None);
        assert!(table.column_values(ORGANISATION_ID_COLUMN).is_none());
    }

    #[test]
    fn test_assign_twice_keeps_single_column() {
        let mut table = table();
        assign_organisation_ids(&mut table, "Organisation Name");
        assign_organisation_ids(&mut table, "Organisation Name");
        let count = table
            .passthrough_headers()
            .iter()
            .filter(|h| h.as_str() == ORGANISATION_ID_COLUMN)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_organisations_table_is_unique_by_id() {
        let mut table = table();
        assign_organisation_ids(&mut table, "Organisation Name");
        let view = TableView::organisations(&table, &DashboardColumns::default());

        assert_eq!(view.headers, vec!["Organisation ID", "Organisation Name"]);
        assert_eq!(view.rows, vec![vec!["1", "Acme"], vec!["2", "Beta"]]);
        assert_eq!(view.flagged, vec![false, false]);
    }

    #[test]
    fn test_products_table_is_unique_by_product_id() {
        let mut table = table();
        assign_organisation_ids(&mut table, "Organisation Name");
        let view = TableView::products(&table, "product_id", &DashboardColumns::default());

        assert_eq!(view.headers, vec!["product_id", "Price", "Organisation ID"]);
        assert_eq!(
            view.rows,
            vec![
                vec!["1", "Free", "1"],
                vec!["2", "Paid", "2"],
                vec!["3", "Paid", "1"],
                vec!["4", "Free", ""],
            ]
        );
    }

    #[test]
    fn test_organisations_without_ids_is_empty() {
        let view = TableView::organisations(&table(), &DashboardColumns::default());
        assert!(view.rows.is_empty());
        assert_eq!(view.headers, vec!["Organisation Name"]);
    }
}
