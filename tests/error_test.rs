//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use taxonomy_reconcile::cli::ExportFormat;
use taxonomy_reconcile::config::Config;
use taxonomy_reconcile::error::ReconcileError;
use taxonomy_reconcile::job::{load_aliases, run_job, ReconcileJob};
use taxonomy_reconcile::loader;
use std::path::Path;
use tempfile::tempdir;

const TAXONOMY_CSV: &str = "Product types,Product Subtype,Use Cases\nLearning,Assessment Tools,Automated Grading\n";

/// 存在しないファイルを読み込んだ場合
#[test]
fn test_load_nonexistent_file() {
    let result = loader::load_table(Path::new("/nonexistent/path/12345.csv"), None);
    assert!(matches!(result, Err(ReconcileError::FileNotFound(_))));
}

/// 未対応の拡張子
#[test]
fn test_unsupported_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("products.json");
    std::fs::write(&path, "{}").unwrap();

    let result = loader::load_table(&path, None);
    assert!(matches!(result, Err(ReconcileError::UnsupportedFormat(_))));
}

/// 壊れたスプレッドシート
#[test]
fn test_corrupt_workbook() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("products.xlsx");
    std::fs::write(&path, "not a zip").unwrap();

    let result = loader::load_table(&path, None);
    assert!(matches!(result, Err(ReconcileError::Workbook(_))));
}

/// タクソノミの必須列が無い場合は実行全体を中断
#[test]
fn test_taxonomy_missing_column() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("taxonomy.csv");
    std::fs::write(&path, "Product types,Use Cases\nLearning,Automated Grading\n").unwrap();

    let err = loader::load_taxonomy(&path, "Taxonomy").unwrap_err();
    match err {
        ReconcileError::Domain(taxonomy_common::Error::MissingColumn { column, .. }) => {
            assert_eq!(column, "Product Subtype");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// タクソノミの空フィールド
#[test]
fn test_taxonomy_empty_field() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("taxonomy.csv");
    std::fs::write(&path, "Product types,Product Subtype,Use Cases\nLearning,,Automated Grading\n").unwrap();

    let err = loader::load_taxonomy(&path, "Taxonomy").unwrap_err();
    assert!(matches!(err, ReconcileError::Domain(taxonomy_common::Error::Data(_))));
}

/// 入力の必須列が無い場合は出力を書かない
#[test]
fn test_input_missing_column_writes_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("taxonomy.csv"), TAXONOMY_CSV).unwrap();
    std::fs::write(
        dir.path().join("products.csv"),
        "product_id,Product types,Use Cases\n1,Learning,Automated Grading\n",
    )
    .unwrap();

    let job = ReconcileJob {
        input: dir.path().join("products.csv"),
        taxonomy: dir.path().join("taxonomy.csv"),
        output: Some(dir.path().join("out.csv")),
        format: ExportFormat::Csv,
        ..Default::default()
    };
    let err = run_job(&job, &Config::default()).unwrap_err();
    assert!(matches!(err, ReconcileError::Domain(taxonomy_common::Error::MissingColumn { .. })));
    assert!(!dir.path().join("out.csv").exists());
}

/// 存在しないエイリアスファイル
#[test]
fn test_missing_alias_file() {
    let result = load_aliases(Some(Path::new("/nonexistent/aliases.json")));
    assert!(matches!(result, Err(ReconcileError::FileNotFound(_))));
}

/// 不正なエイリアスJSON
#[test]
fn test_invalid_alias_json() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("aliases.json");
    std::fs::write(&path, "{ invalid }").unwrap();

    let result = load_aliases(Some(&path));
    assert!(matches!(result, Err(ReconcileError::Domain(taxonomy_common::Error::Json(_)))));
}

/// ReconcileErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        ReconcileError::Config("bad threshold".to_string()),
        ReconcileError::FileNotFound("products.csv".to_string()),
        ReconcileError::UnsupportedFormat("products.json".to_string()),
        ReconcileError::Workbook("corrupt".to_string()),
        ReconcileError::SheetNotFound("Taxonomy".to_string()),
        ReconcileError::ExcelGeneration("save failed".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: ReconcileError = io_err.into();

    assert!(matches!(err, ReconcileError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_conversion() {
    let common_err = taxonomy_common::Error::Data("taxonomy row 3 has an empty Use Cases field".to_string());
    let err: ReconcileError = common_err.into();

    assert!(matches!(err, ReconcileError::Domain(_)));
    assert!(format!("{}", err).contains("taxonomy row 3"));
}
