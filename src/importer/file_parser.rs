// ==========================================
// 系统初始化导入中心 - 文件解析器实现
// ==========================================
// 输入: 上传文件字节（HTTP 层负责拆 multipart）
// 支持: Excel (.xlsx，首个工作表) / CSV (UTF-8，可带 BOM)
// 约定: 表头去首尾空白；单元格值保持原样交给行校验处理
//       模板说明行（## 前缀）、全空行跳过；其余 # 开头的行按数据处理
//       行号为数据行序号（1 起）
// ==========================================

use crate::domain::types::FileType;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{Reader, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 模板说明行前缀（模板生成器写出，解析时跳过）
pub const NOTE_PREFIX: &str = "## ";

/// 原始数据行（表头 -> 单元格原值）
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize,
    pub values: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(|s| s.as_str())
    }
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl ParsedSheet {
    fn push_row(&mut self, cells: Vec<String>) {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return;
        }
        if cells.first().is_some_and(|c| c.starts_with(NOTE_PREFIX)) {
            tracing::trace!(row = self.rows.len() + 1, "跳过模板说明行");
            return;
        }
        let values = self
            .headers
            .iter()
            .zip(cells)
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v))
            .collect();
        let row_number = self.rows.len() + 1;
        self.rows.push(RawRow { row_number, values });
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<ParsedSheet>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<ParsedSheet> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(csv::Trim::None)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile("CSV 缺少表头".to_string()));
        }

        let mut sheet = ParsedSheet {
            headers,
            rows: Vec::new(),
        };
        for result in reader.records() {
            let record = result?;
            sheet.push_row(record.iter().map(|v| v.to_string()).collect());
        }
        Ok(sheet)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<ParsedSheet> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::EmptyFile(format!("工作表 {} 无表头", sheet_name)))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile(format!("工作表 {} 无表头", sheet_name)));
        }

        let mut sheet = ParsedSheet {
            headers,
            rows: Vec::new(),
        };
        for data_row in rows {
            sheet.push_row(data_row.iter().map(|c| c.to_string()).collect());
        }
        Ok(sheet)
    }
}

// ==========================================
// 通用文件解析器（按文件类型选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse(&self, bytes: &[u8], file_type: FileType) -> ImportResult<ParsedSheet> {
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile("文件内容为空".to_string()));
        }
        match file_type {
            FileType::Csv => CsvParser.parse_bytes(bytes),
            FileType::Excel => ExcelParser.parse_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_skips_note_lines_blank_rows_and_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(
            b"drug_code, trade_name \nD-1, Aspirin \n\n,\n## Required fields marked with *\nD-2,Ibuprofen\n",
        );

        let sheet = CsvParser.parse_bytes(&bytes).unwrap();
        assert_eq!(sheet.headers, vec!["drug_code", "trade_name"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].row_number, 1);
        // 值保持原样（首尾空白交给校验器处理）
        assert_eq!(sheet.rows[0].get("trade_name"), Some(" Aspirin "));
        assert_eq!(sheet.rows[1].row_number, 2);
        assert_eq!(sheet.rows[1].get("drug_code"), Some("D-2"));
    }

    #[test]
    fn test_csv_hash_prefixed_values_are_data() {
        let sheet = CsvParser
            .parse_bytes(b"drug_code,trade_name\nA1,Trade\n#B2,Trade\n# C3,Trade\nD4,Trade\n")
            .unwrap();
        assert_eq!(sheet.rows.len(), 4);
        assert_eq!(sheet.rows[1].get("drug_code"), Some("#B2"));
        assert_eq!(sheet.rows[1].row_number, 2);
        assert_eq!(sheet.rows[2].get("drug_code"), Some("# C3"));
        assert_eq!(sheet.rows[3].row_number, 4);
    }

    #[test]
    fn test_excel_hash_prefixed_cell_is_data() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "drug_code").unwrap();
        sheet.write_string(1, 0, "#B2").unwrap();
        sheet.write_string(2, 0, "## note").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = UniversalFileParser.parse(&bytes, FileType::Excel).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].get("drug_code"), Some("#B2"));
    }

    #[test]
    fn test_csv_short_rows_allowed() {
        let sheet = CsvParser.parse_bytes(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].get("c"), None);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = UniversalFileParser.parse(b"", FileType::Csv).unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile(_)));
    }

    #[test]
    fn test_garbage_excel_rejected() {
        let err = UniversalFileParser
            .parse(b"not a zip archive", FileType::Excel)
            .unwrap_err();
        assert!(matches!(err, ImportError::ExcelParseError(_)));
    }

    #[test]
    fn test_excel_first_sheet_parsed() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "drug_code").unwrap();
        sheet.write_string(0, 1, "pack_size").unwrap();
        sheet.write_string(1, 0, "D-1").unwrap();
        sheet.write_number(1, 1, 30).unwrap();
        sheet.write_string(3, 0, "D-2").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = UniversalFileParser.parse(&bytes, FileType::Excel).unwrap();
        assert_eq!(parsed.headers, vec!["drug_code", "pack_size"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].get("pack_size"), Some("30"));
        assert_eq!(parsed.rows[1].get("drug_code"), Some("D-2"));
    }
}
