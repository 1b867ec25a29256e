// ==========================================
// 系统初始化导入中心 - 行级校验器
// ==========================================
// 职责: 按模块列约束校验每个数据行，输出清洗值 + 校验消息
// ERROR: 必填、类型、长度、数值范围、正则、枚举
// WARNING: 首尾空白、枚举大小写规范化、废弃值
// ==========================================

use crate::domain::module::{ColumnType, ModuleDescriptor, TemplateColumn};
use crate::domain::session::ValidationMessage;
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// 校验消息代码
pub mod codes {
    pub const REQUIRED_FIELD: &str = "REQUIRED_FIELD";
    pub const INVALID_TYPE: &str = "INVALID_TYPE";
    pub const INVALID_DATE: &str = "INVALID_DATE";
    pub const MAX_LENGTH: &str = "MAX_LENGTH";
    pub const OUT_OF_RANGE: &str = "OUT_OF_RANGE";
    pub const PATTERN_MISMATCH: &str = "PATTERN_MISMATCH";
    pub const INVALID_ENUM: &str = "INVALID_ENUM";
    pub const TRIMMED_WHITESPACE: &str = "TRIMMED_WHITESPACE";
    pub const CASE_NORMALIZED: &str = "CASE_NORMALIZED";
    pub const DEPRECATED_VALUE: &str = "DEPRECATED_VALUE";
    pub const DUPLICATE_KEY: &str = "DUPLICATE_KEY";
    pub const UNKNOWN_COLUMN: &str = "UNKNOWN_COLUMN";
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

struct CompiledColumn {
    column: TemplateColumn,
    regex: Option<Regex>,
}

/// 单行校验结果
#[derive(Debug, Default)]
pub struct RowCheck {
    pub values: BTreeMap<String, String>,
    pub errors: Vec<ValidationMessage>,
    pub warnings: Vec<ValidationMessage>,
}

/// 表头映射: 列名 -> 上传文件中的表头
#[derive(Debug, Default)]
pub struct HeaderMapping {
    by_column: HashMap<String, String>,
    pub unknown_headers: Vec<String>,
}

pub struct RowValidator {
    columns: Vec<CompiledColumn>,
}

impl RowValidator {
    /// 预编译模块的列约束
    pub fn for_module(descriptor: &ModuleDescriptor) -> ImportResult<Self> {
        let mut columns = Vec::with_capacity(descriptor.columns.len());
        for column in &descriptor.columns {
            let regex = match &column.pattern {
                Some(p) => Some(Regex::new(p).map_err(|e| ImportError::InvalidSchema {
                    module: descriptor.module.clone(),
                    column: column.name.clone(),
                    message: e.to_string(),
                })?),
                None => None,
            };
            columns.push(CompiledColumn {
                column: column.clone(),
                regex,
            });
        }
        Ok(Self { columns })
    }

    /// 将上传文件表头映射到列（name 或 displayName，忽略大小写，允许末尾 *）
    pub fn map_headers(&self, headers: &[String]) -> HeaderMapping {
        let mut mapping = HeaderMapping::default();
        for header in headers.iter().filter(|h| !h.is_empty()) {
            match self.columns.iter().find(|c| c.column.matches_header(header)) {
                Some(c) if !mapping.by_column.contains_key(&c.column.name) => {
                    mapping.by_column.insert(c.column.name.clone(), header.clone());
                }
                Some(_) => {}
                None => mapping.unknown_headers.push(header.clone()),
            }
        }
        mapping
    }

    /// 校验单行
    pub fn validate_row(&self, raw: &RawRow, mapping: &HeaderMapping) -> RowCheck {
        let mut check = RowCheck::default();
        for compiled in &self.columns {
            let column = &compiled.column;
            let raw_value = mapping
                .by_column
                .get(&column.name)
                .and_then(|h| raw.get(h))
                .unwrap_or("");
            self.check_field(raw.row_number, compiled, raw_value, &mut check);
        }
        check
    }

    fn check_field(&self, row: usize, compiled: &CompiledColumn, raw_value: &str, check: &mut RowCheck) {
        let column = &compiled.column;
        let field = column.name.as_str();
        let trimmed = raw_value.trim();

        if trimmed.is_empty() {
            if column.required {
                check.errors.push(ValidationMessage::error(
                    row,
                    field,
                    codes::REQUIRED_FIELD,
                    t_with_args("validation.required", &[("field", column.header())]),
                ));
            }
            return;
        }

        if trimmed.len() != raw_value.len() {
            check.warnings.push(ValidationMessage::warning(
                row,
                field,
                codes::TRIMMED_WHITESPACE,
                t_with_args("validation.trimmed_whitespace", &[]),
            ));
        }

        // ===== 类型 =====
        let (value, numeric) = match parse_typed(column.column_type, trimmed) {
            Ok(parsed) => parsed,
            Err((code, key)) => {
                check
                    .errors
                    .push(ValidationMessage::error(row, field, code, t_with_args(key, &[("value", trimmed)])));
                return;
            }
        };

        // ===== 长度 =====
        if let Some(max) = column.max_length {
            let len = value.chars().count();
            if len > max {
                check.errors.push(ValidationMessage::error(
                    row,
                    field,
                    codes::MAX_LENGTH,
                    t_with_args(
                        "validation.max_length",
                        &[("len", &len.to_string()), ("max", &max.to_string())],
                    ),
                ));
            }
        }

        // ===== 数值范围 =====
        if let Some(n) = numeric {
            if let Some(min) = column.min.filter(|min| n < *min) {
                check.errors.push(ValidationMessage::error(
                    row,
                    field,
                    codes::OUT_OF_RANGE,
                    t_with_args(
                        "validation.below_min",
                        &[("value", &value), ("min", &min.to_string())],
                    ),
                ));
            }
            if let Some(max) = column.max.filter(|max| n > *max) {
                check.errors.push(ValidationMessage::error(
                    row,
                    field,
                    codes::OUT_OF_RANGE,
                    t_with_args(
                        "validation.above_max",
                        &[("value", &value), ("max", &max.to_string())],
                    ),
                ));
            }
        }

        // ===== 正则 =====
        if let Some(regex) = &compiled.regex {
            if !regex.is_match(&value) {
                check.errors.push(ValidationMessage::error(
                    row,
                    field,
                    codes::PATTERN_MISMATCH,
                    t_with_args(
                        "validation.pattern_mismatch",
                        &[("value", &value), ("pattern", regex.as_str())],
                    ),
                ));
            }
        }

        // ===== 枚举 =====
        let mut value = value;
        if let Some(allowed) = &column.enum_values {
            if !allowed.iter().any(|a| a == &value) {
                match allowed.iter().find(|a| a.eq_ignore_ascii_case(&value)) {
                    Some(canonical) => {
                        check.warnings.push(ValidationMessage::warning(
                            row,
                            field,
                            codes::CASE_NORMALIZED,
                            t_with_args(
                                "validation.case_normalized",
                                &[("value", &value), ("normalized", canonical)],
                            ),
                        ));
                        value = canonical.clone();
                    }
                    None => {
                        check.errors.push(ValidationMessage::error(
                            row,
                            field,
                            codes::INVALID_ENUM,
                            t_with_args(
                                "validation.invalid_enum",
                                &[("value", &value), ("allowed", &allowed.join(", "))],
                            ),
                        ));
                    }
                }
            }
        }

        if column
            .deprecated_values
            .iter()
            .any(|d| d.eq_ignore_ascii_case(&value))
        {
            check.warnings.push(ValidationMessage::warning(
                row,
                field,
                codes::DEPRECATED_VALUE,
                t_with_args("validation.deprecated_value", &[("value", &value)]),
            ));
        }

        check.values.insert(column.name.clone(), value);
    }
}

/// 按列类型解析，返回（规范化值, 数值）
fn parse_typed(
    column_type: ColumnType,
    value: &str,
) -> Result<(String, Option<f64>), (&'static str, &'static str)> {
    match column_type {
        ColumnType::String => Ok((value.to_string(), None)),
        ColumnType::Number => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| (value.to_string(), Some(n)))
            .ok_or((codes::INVALID_TYPE, "validation.invalid_number")),
        ColumnType::Integer => parse_integer(value)
            .map(|n| (n.to_string(), Some(n as f64)))
            .ok_or((codes::INVALID_TYPE, "validation.invalid_integer")),
        ColumnType::Boolean => parse_bool(value)
            .map(|b| (b.to_string(), None))
            .ok_or((codes::INVALID_TYPE, "validation.invalid_boolean")),
        ColumnType::Date => DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
            .map(|d| (d.format("%Y-%m-%d").to_string(), None))
            .ok_or((codes::INVALID_DATE, "validation.invalid_date")),
    }
}

/// 整数；Excel 数值单元格可能带 ".0"
fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let f = value.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Severity;

    fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor::new("drugs", "inventory", "Drugs")
            .key_column("drug_code")
            .columns(vec![
                TemplateColumn::new("drug_code", ColumnType::String)
                    .display_name("Drug Code")
                    .required()
                    .max_length(8)
                    .pattern(r"^[A-Z0-9-]+$"),
                TemplateColumn::new("pack_size", ColumnType::Integer).range(Some(1.0), Some(100.0)),
                TemplateColumn::new("price", ColumnType::Number).range(Some(0.0), None),
                TemplateColumn::new("is_active", ColumnType::Boolean),
                TemplateColumn::new("effective_date", ColumnType::Date),
                TemplateColumn::new("unit", ColumnType::String)
                    .one_of(&["TAB", "AMP"])
                    .deprecated(&["AMP"]),
            ])
    }

    fn raw(values: &[(&str, &str)]) -> RawRow {
        RawRow {
            row_number: 7,
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn check(values: &[(&str, &str)]) -> RowCheck {
        let validator = RowValidator::for_module(&descriptor()).unwrap();
        let headers: Vec<String> = values.iter().map(|(k, _)| k.to_string()).collect();
        let mapping = validator.map_headers(&headers);
        validator.validate_row(&raw(values), &mapping)
    }

    fn error_codes(check: &RowCheck) -> Vec<&str> {
        check.errors.iter().map(|m| m.code.as_str()).collect()
    }

    #[test]
    fn test_valid_row_normalizes_values() {
        let result = check(&[
            ("Drug Code", "D-1"),
            ("pack_size", "30.0"),
            ("price", "12.5"),
            ("is_active", "Yes"),
            ("effective_date", "2025/01/31"),
            ("unit", "TAB"),
        ]);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.values["drug_code"], "D-1");
        assert_eq!(result.values["pack_size"], "30");
        assert_eq!(result.values["is_active"], "true");
        assert_eq!(result.values["effective_date"], "2025-01-31");
    }

    #[test]
    fn test_missing_required_is_error_with_row_number() {
        let result = check(&[("drug_code", "  "), ("price", "1")]);
        assert_eq!(error_codes(&result), vec![codes::REQUIRED_FIELD]);
        assert_eq!(result.errors[0].row, 7);
        assert_eq!(result.errors[0].field, "drug_code");
        assert_eq!(result.errors[0].severity, Severity::Error);
    }

    #[test]
    fn test_constraint_violations_are_errors() {
        let result = check(&[
            ("drug_code", "lower-case-too-long"),
            ("pack_size", "0"),
            ("price", "abc"),
            ("is_active", "maybe"),
            ("effective_date", "31.01.2025"),
            ("unit", "BOX"),
        ]);
        let codes_found = error_codes(&result);
        assert!(codes_found.contains(&codes::MAX_LENGTH));
        assert!(codes_found.contains(&codes::PATTERN_MISMATCH));
        assert!(codes_found.contains(&codes::OUT_OF_RANGE));
        assert!(codes_found.contains(&codes::INVALID_TYPE));
        assert!(codes_found.contains(&codes::INVALID_DATE));
        assert!(codes_found.contains(&codes::INVALID_ENUM));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_soft_issues_are_warnings() {
        let result = check(&[("drug_code", " D-1 "), ("unit", "amp")]);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let warning_codes: Vec<_> = result.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(
            warning_codes,
            vec![
                codes::TRIMMED_WHITESPACE,
                codes::CASE_NORMALIZED,
                codes::DEPRECATED_VALUE
            ]
        );
        assert_eq!(result.values["drug_code"], "D-1");
        assert_eq!(result.values["unit"], "AMP");
    }

    #[test]
    fn test_unknown_headers_collected() {
        let validator = RowValidator::for_module(&descriptor()).unwrap();
        let mapping = validator.map_headers(&[
            "Drug Code*".to_string(),
            "colour".to_string(),
            "drug_code".to_string(),
        ]);
        assert_eq!(mapping.unknown_headers, vec!["colour".to_string()]);
        assert_eq!(mapping.by_column["drug_code"], "Drug Code*");
    }
}
