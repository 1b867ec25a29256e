// ==========================================
// 系统初始化导入中心 - 文件校验器
// ==========================================
// 流程: 接收 → 解析 → 逐行校验 → 创建会话
// 红线: 即使校验不通过也要创建会话（有效期受限），错误永远阻断导入
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::job::ImportContext;
use crate::domain::session::{
    ValidatedRow, ValidationMessage, ValidationOutcome, ValidationSession, ValidationStats,
};
use crate::domain::types::FileType;
use crate::i18n::t_with_args;
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::row_validator::{codes, RowValidator};
use crate::importer::runtime::ImportRuntime;
use crate::perf::PerfGuard;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// 上传文件（HTTP 层已拆出字节与文件名）
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// 显式指定时优先于扩展名推断
    pub file_type: Option<FileType>,
}

impl UploadedFile {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            bytes,
            file_type: None,
        }
    }

    pub fn resolved_type(&self) -> FileType {
        self.file_type
            .unwrap_or_else(|| FileType::from_file_name(&self.file_name))
    }
}

pub struct FileValidator {
    runtime: ImportRuntime,
}

impl FileValidator {
    pub fn new(runtime: ImportRuntime) -> Self {
        Self { runtime }
    }

    /// 校验上传文件并创建校验会话
    ///
    /// # 错误
    /// - ModuleNotFound / FileTooLarge / TooManyRows / EmptyFile / CsvParseError / ExcelParseError
    #[instrument(skip(self, file, ctx), fields(module = %module_name, file_name = %file.file_name, size = file.bytes.len()))]
    pub fn validate_file(
        &self,
        module_name: &str,
        file: &UploadedFile,
        skip_warnings: bool,
        ctx: &ImportContext,
    ) -> ImportResult<ValidationOutcome> {
        let _perf = PerfGuard::new("validate_file");
        let rt = &self.runtime;
        let descriptor = rt.registry.require_service(module_name)?;

        // === 步骤 1: 大小检查 ===
        let max = rt.settings.max_file_size_bytes;
        if file.bytes.len() > max {
            return Err(ImportError::FileTooLarge {
                size: file.bytes.len(),
                max,
            });
        }

        // === 步骤 2: 解析 ===
        let file_type = file.resolved_type();
        let sheet = UniversalFileParser.parse(&file.bytes, file_type)?;
        if sheet.rows.len() > rt.settings.max_rows {
            return Err(ImportError::TooManyRows {
                rows: sheet.rows.len(),
                max: rt.settings.max_rows,
            });
        }
        debug!(rows = sheet.rows.len(), headers = sheet.headers.len(), "文件解析完成");

        // === 步骤 3: 逐行校验 ===
        let validator = RowValidator::for_module(descriptor)?;
        let mapping = validator.map_headers(&sheet.headers);

        let mut errors: Vec<ValidationMessage> = Vec::new();
        let mut warnings: Vec<ValidationMessage> = mapping
            .unknown_headers
            .iter()
            .map(|h| {
                ValidationMessage::warning(
                    0,
                    h,
                    codes::UNKNOWN_COLUMN,
                    t_with_args("validation.unknown_column", &[("column", h)]),
                )
            })
            .collect();

        let mut valid_rows: Vec<ValidatedRow> = Vec::with_capacity(sheet.rows.len());
        let mut error_rows = 0usize;
        for raw in &sheet.rows {
            let check = validator.validate_row(raw, &mapping);
            warnings.extend(check.warnings);
            if check.errors.is_empty() {
                valid_rows.push(ValidatedRow {
                    row_number: raw.row_number,
                    values: check.values,
                });
            } else {
                error_rows += 1;
                errors.extend(check.errors);
            }
        }

        // === 步骤 4: 文件内重复主键 ===
        if let Some(key_column) = descriptor.key_column.as_deref() {
            for dup in ConflictHandler.detect_duplicates(&valid_rows, key_column) {
                let first_row = dup.first_row.map(|r| r.to_string()).unwrap_or_default();
                warnings.push(ValidationMessage::warning(
                    dup.row_number,
                    key_column,
                    codes::DUPLICATE_KEY,
                    t_with_args(
                        "validation.duplicate_key",
                        &[("key", &dup.key), ("first_row", &first_row)],
                    ),
                ));
            }
        }
        warnings.sort_by_key(|w| w.row);

        let stats = ValidationStats {
            total_rows: sheet.rows.len(),
            valid_rows: valid_rows.len(),
            error_rows,
        };
        let is_valid = stats.error_rows == 0;
        // 警告不阻断；skipWarnings 只在执行时放宽闸门，不改变错误行的结论
        let can_proceed = is_valid;

        // === 步骤 5: 创建会话 ===
        let now = rt.now();
        match rt.sessions.purge_expired(now) {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "已清理过期会话"),
            Err(e) => warn!(error = %e, "清理过期会话失败"),
        }

        let session = ValidationSession {
            session_id: rt.ids.next_id(),
            module_name: descriptor.module.clone(),
            file_name: file.file_name.clone(),
            file_type,
            file_size_bytes: file.bytes.len(),
            rows: valid_rows,
            errors,
            warnings,
            stats,
            can_proceed,
            created_by: ctx.user_id.clone(),
            created_at: now,
            expires_at: now + rt.settings.session_ttl(),
            consumed_at: None,
        };
        rt.sessions.insert(&session)?;

        info!(
            session_id = %session.session_id,
            total_rows = stats.total_rows,
            valid_rows = stats.valid_rows,
            error_rows = stats.error_rows,
            warnings = session.warnings.len(),
            can_proceed,
            "文件校验完成"
        );

        rt.emit_audit(
            ActionLog::new(rt.ids.next_id(), ActionType::ValidateFile, now, module_name, ctx)
                .with_session(&session.session_id)
                .with_payload(json!({
                    "fileName": session.file_name,
                    "fileType": file_type.as_str(),
                    "totalRows": stats.total_rows,
                    "validRows": stats.valid_rows,
                    "errorRows": stats.error_rows,
                    "warnings": session.warnings.len(),
                    "canProceed": can_proceed,
                    "skipWarnings": skip_warnings,
                })),
        );

        Ok(ValidationOutcome::from(&session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ImportSettings;
    use crate::domain::module::{ColumnType, ModuleDescriptor, TemplateColumn};
    use crate::engine::ModuleRegistry;
    use crate::ids::SequentialIdGenerator;
    use chrono::{Duration, TimeZone, Utc};
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn validator_with(settings: ImportSettings) -> (FileValidator, ImportRuntime) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let registry = ModuleRegistry::with_modules(vec![ModuleDescriptor::new(
            "drugs", "inventory", "Drugs",
        )
        .key_column("drug_code")
        .columns(vec![
            TemplateColumn::new("drug_code", ColumnType::String).required(),
            TemplateColumn::new("pack_size", ColumnType::Integer),
        ])])
        .unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
        ));
        let rt = ImportRuntime::sqlite(Arc::new(Mutex::new(conn)), Arc::new(registry), settings)
            .with_clock(clock)
            .with_ids(Arc::new(SequentialIdGenerator::new("id")));
        (FileValidator::new(rt.clone()), rt)
    }

    fn csv(content: &str) -> UploadedFile {
        UploadedFile::new("drugs.csv", content.as_bytes().to_vec())
    }

    #[test]
    fn test_clean_file_can_proceed() {
        let (validator, rt) = validator_with(ImportSettings::default());
        let outcome = validator
            .validate_file("drugs", &csv("drug_code,pack_size\nA,1\nB,2\n"), false, &ImportContext::system())
            .unwrap();

        assert!(outcome.is_valid);
        assert!(outcome.can_proceed);
        assert_eq!(outcome.stats.total_rows, 2);
        assert_eq!(outcome.expires_at, rt.now() + Duration::minutes(30));

        let session = rt.sessions.find_by_id(&outcome.session_id).unwrap().unwrap();
        assert_eq!(session.rows.len(), 2);
    }

    #[test]
    fn test_warnings_do_not_block() {
        let (validator, _rt) = validator_with(ImportSettings::default());
        let file = csv("drug_code,colour\nA,red\nA,blue\n");

        let outcome = validator
            .validate_file("drugs", &file, false, &ImportContext::system())
            .unwrap();
        assert!(outcome.is_valid);
        assert!(outcome.can_proceed);
        let codes_found: Vec<_> = outcome.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(codes_found, vec![codes::UNKNOWN_COLUMN, codes::DUPLICATE_KEY]);
        assert_eq!(outcome.warnings[0].row, 0);

        let outcome = validator
            .validate_file("drugs", &file, true, &ImportContext::system())
            .unwrap();
        assert!(outcome.can_proceed);
    }

    #[test]
    fn test_hash_prefixed_rows_are_counted() {
        let (validator, rt) = validator_with(ImportSettings::default());
        let outcome = validator
            .validate_file(
                "drugs",
                &csv("drug_code,trade_name\nA1,Trade\n#B2,Trade\nC3,Trade\n"),
                false,
                &ImportContext::system(),
            )
            .unwrap();

        assert_eq!(outcome.stats.total_rows, 3);
        assert_eq!(outcome.stats.valid_rows, 3);
        let session = rt.sessions.find_by_id(&outcome.session_id).unwrap().unwrap();
        assert_eq!(session.rows[1].row_number, 2);
    }

    #[test]
    fn test_errors_always_block_and_session_still_created() {
        let (validator, rt) = validator_with(ImportSettings::default());
        let outcome = validator
            .validate_file("drugs", &csv("drug_code,pack_size\n,1\nB,x\nC,3\n"), true, &ImportContext::system())
            .unwrap();

        assert!(!outcome.is_valid);
        assert!(!outcome.can_proceed);
        assert_eq!(outcome.stats.error_rows, 2);
        assert_eq!(outcome.stats.valid_rows, 1);
        assert!(rt.sessions.find_by_id(&outcome.session_id).unwrap().is_some());
    }

    #[test]
    fn test_limits_and_unknown_module() {
        let settings = ImportSettings {
            max_file_size_bytes: 20,
            max_rows: 1,
            ..ImportSettings::default()
        };
        let (validator, _rt) = validator_with(settings);
        let ctx = ImportContext::system();

        let err = validator
            .validate_file("drugs", &csv("drug_code\nAAAAAAAAAAAAAAAAAAAAAAAAA\n"), false, &ctx)
            .unwrap_err();
        assert!(matches!(err, ImportError::FileTooLarge { max: 20, .. }));

        let err = validator
            .validate_file("drugs", &csv("drug_code\nA\nB\n"), false, &ctx)
            .unwrap_err();
        assert!(matches!(err, ImportError::TooManyRows { rows: 2, max: 1 }));

        let err = validator
            .validate_file("ghost", &csv("a\n1\n"), false, &ctx)
            .unwrap_err();
        assert!(matches!(err, ImportError::ModuleNotFound(_)));
    }
}
