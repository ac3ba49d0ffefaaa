//! CSV出力

use super::TableView;
use crate::error::Result;
use std::io::Write;
use std::path::Path;
use taxonomy_common::csv_text::format_csv_line;

/// 表をCSV（UTF-8、LF改行）に書き出す
pub fn generate_csv(view: &TableView, output_path: &Path) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
    writeln!(file, "{}", format_csv_line(&view.headers))?;
    for row in &view.rows {
        writeln!(file, "{}", format_csv_line(row))?;
    }
    file.flush()?;
    Ok(())
}
