// ==========================================
// 系统初始化导入中心 - 导入模板生成器
// ==========================================
// 职责: 按模块列定义生成 CSV / Excel 模板（纯函数，不落盘）
// CSV: 表头 + 示例行 + ## 说明行（解析器只跳过该前缀，模板可直接回传）
// Excel: Data 工作表（粗体表头、斜体示例行）+ Instructions 工作表
// ==========================================

use crate::domain::module::{ColumnType, ModuleDescriptor, TemplateColumn};
use crate::domain::types::TemplateFormat;
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::NOTE_PREFIX;
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

/// Excel 列宽下限
const MIN_COLUMN_WIDTH: usize = 15;

/// 生成的模板文件
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct TemplateGenerator;

impl TemplateGenerator {
    /// 生成模板
    ///
    /// # 参数
    /// - today: 日期列示例值（由调用方注入的时钟提供）
    pub fn generate(
        &self,
        descriptor: &ModuleDescriptor,
        format: TemplateFormat,
        today: NaiveDate,
    ) -> ImportResult<TemplateFile> {
        let bytes = match format {
            TemplateFormat::Csv => self.render_csv(descriptor, today)?,
            TemplateFormat::Excel => self.render_excel(descriptor, today)?,
        };

        tracing::debug!(
            module = %descriptor.module,
            format = format.extension(),
            size = bytes.len(),
            "模板生成完成"
        );

        Ok(TemplateFile {
            file_name: format!("{}_template.{}", descriptor.module, format.extension()),
            content_type: format.content_type(),
            bytes,
        })
    }

    // ==========================================
    // CSV
    // ==========================================
    fn render_csv(&self, descriptor: &ModuleDescriptor, today: NaiveDate) -> ImportResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(descriptor.columns.iter().map(|c| c.header()))?;
        writer.write_record(descriptor.columns.iter().map(|c| example_value(c, today)))?;
        let mut bytes = writer
            .into_inner()
            .map_err(|e| ImportError::TemplateError(e.to_string()))?;

        for line in instruction_lines(descriptor) {
            bytes.extend_from_slice(format!("{}{}\n", NOTE_PREFIX, line).as_bytes());
        }
        Ok(bytes)
    }

    // ==========================================
    // Excel
    // ==========================================
    fn render_excel(&self, descriptor: &ModuleDescriptor, today: NaiveDate) -> ImportResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let example_format = Format::new().set_italic();

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Data")?;
            for (idx, column) in descriptor.columns.iter().enumerate() {
                let col = idx as u16;
                let header = column.header();
                sheet.write_string_with_format(0, col, header, &header_format)?;
                sheet.write_string_with_format(1, col, example_value(column, today), &example_format)?;
                let width = MIN_COLUMN_WIDTH.max(header.chars().count() + 2);
                sheet.set_column_width(col, width as f64)?;
            }
        }

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Instructions")?;
            sheet.set_column_width(0, 100)?;
            for (row, line) in instruction_lines(descriptor).iter().enumerate() {
                sheet.write_string(row as u32, 0, line)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// 示例值: 列 example 优先，否则按类型给默认值
fn example_value(column: &TemplateColumn, today: NaiveDate) -> String {
    if let Some(example) = &column.example {
        return example.clone();
    }
    if let Some(first) = column.enum_values.as_ref().and_then(|v| v.first()) {
        return first.clone();
    }
    match column.column_type {
        ColumnType::String => format!("Example {}", column.header()),
        ColumnType::Number => "100".to_string(),
        ColumnType::Integer => "1".to_string(),
        ColumnType::Boolean => "true".to_string(),
        ColumnType::Date => today.format("%Y-%m-%d").to_string(),
    }
}

/// 说明行: 必填提示 + 每列约束
fn instruction_lines(descriptor: &ModuleDescriptor) -> Vec<String> {
    let mut lines = vec![t("template.required_note")];
    for column in &descriptor.columns {
        let header = if column.required {
            format!("{}*", column.header())
        } else {
            column.header().to_string()
        };
        lines.push(t_with_args(
            "template.column_line",
            &[("header", &header), ("details", &column_details(column))],
        ));
    }
    lines.push(t("template.delete_example"));
    lines
}

fn column_details(column: &TemplateColumn) -> String {
    let mut parts = vec![format!("{:?}", column.column_type).to_lowercase()];
    if column.required {
        parts.push("required".to_string());
    }
    if let Some(max_length) = column.max_length {
        parts.push(format!("max length {}", max_length));
    }
    match (column.min, column.max) {
        (Some(min), Some(max)) => parts.push(format!("range {}..{}", min, max)),
        (Some(min), None) => parts.push(format!(">= {}", min)),
        (None, Some(max)) => parts.push(format!("<= {}", max)),
        (None, None) => {}
    }
    if let Some(pattern) = &column.pattern {
        parts.push(format!("pattern {}", pattern));
    }
    if let Some(values) = &column.enum_values {
        parts.push(format!("one of {}", values.join("/")));
    }
    if let Some(description) = &column.description {
        parts.push(description.clone());
    }
    parts.join("; ")
}
