//! Excel生成（共通ライブラリ）
//!
//! 注釈付きの表をシート単位でXLSXに書き出す。

use rust_xlsxwriter::*;

/// 列幅の上限（文字数換算）
const MAX_COLUMN_WIDTH: f64 = 60.0;
const MIN_COLUMN_WIDTH: f64 = 8.0;

/// 1シート分のデータ
pub struct SheetData<'a> {
    pub name: &'a str,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 強調表示する列（ヘッダー名）
    pub highlight_columns: Vec<String>,
    /// 強調表示する行（`rows` と同じ長さ、`true` の行のみ強調）
    pub highlight_rows: Vec<bool>,
}

/// Excelをバッファに生成
pub fn generate_excel_buffer(sheets: &[SheetData<'_>]) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));

    let highlight_format = Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0x9C0006))
        .set_background_color(Color::RGB(0xFFC7CE));

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet.name)
            .map_err(|e| format!("Failed to set sheet name: {}", e))?;

        let highlight_cols: Vec<usize> = sheet
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| sheet.highlight_columns.iter().any(|c| c == *h))
            .map(|(i, _)| i)
            .collect();

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header, &header_format)
                .map_err(|e| format!("Failed to write header: {}", e))?;
        }

        for (i, row) in sheet.rows.iter().enumerate() {
            let row_num = (i + 1) as u32;
            let highlight = sheet.highlight_rows.get(i).copied().unwrap_or(false);
            for (col, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let result = if highlight && highlight_cols.contains(&col) {
                    worksheet.write_string_with_format(row_num, col as u16, value, &highlight_format)
                } else {
                    worksheet.write_string(row_num, col as u16, value)
                };
                result.map_err(|e| format!("Failed to write cell ({}, {}): {}", row_num, col, e))?;
            }
        }

        // 列幅は内容の最大文字数から決める
        for (col, header) in sheet.headers.iter().enumerate() {
            let longest = sheet
                .rows
                .iter()
                .filter_map(|r| r.get(col))
                .map(|v| v.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            let width = (longest as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            worksheet
                .set_column_width(col as u16, width)
                .map_err(|e| format!("Failed to set column width: {}", e))?;
        }

        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| format!("Failed to freeze header row: {}", e))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to save workbook: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_buffer_is_zip() {
        let sheet = SheetData {
            name: "Products",
            headers: vec!["product_id".into(), "Present in taxonomy".into()],
            rows: vec![
                vec!["1".into(), "Yes".into()],
                vec!["2".into(), "No".into()],
            ],
            highlight_columns: vec!["Present in taxonomy".into()],
            highlight_rows: vec![false, true],
        };
        let buffer = generate_excel_buffer(&[sheet]).unwrap();
        assert!(buffer.starts_with(b"PK"));
    }

    #[test]
    fn test_invalid_sheet_name_is_error() {
        let sheet = SheetData {
            name: "bad[name]",
            headers: vec!["a".into()],
            rows: Vec::new(),
            highlight_columns: Vec::new(),
            highlight_rows: Vec::new(),
        };
        assert!(generate_excel_buffer(&[sheet]).is_err());
    }
}
