// ==========================================
// 导入链路集成测试（校验 → 执行 → 状态 → 回滚）
// ==========================================
// 测试范围:
// 1. 校验门禁: 错误永远阻断，警告不阻断
// 2. 会话: 一次性使用、过期
// 3. 冲突策略: skip / update / error
// 4. 回滚: 不支持的模块、重复回滚、模块状态回推
// 5. 并发: 同一会话竞争、不同模块并行、后台执行
// ==========================================

mod test_helpers;

use chrono::Duration;
use std::time::Duration as StdDuration;
use system_init_import::api::ApiError;
use system_init_import::config::{ExecutionMode, ImportSettings};
use system_init_import::domain::{ImportContext, ImportOptions, ModuleDescriptor};
use system_init_import::engine::builtin_modules::inventory_modules;
use system_init_import::importer::RecordSink;
use system_init_import::repository::ActionLogRepository;
use system_init_import::{ConflictPolicy, DispatchStatus, JobStatus, ModuleImportStatus};
use test_helpers::{simple_module, TestEnv};

fn ctx() -> ImportContext {
    ImportContext::new("tester")
}

fn options(policy: ConflictPolicy) -> ImportOptions {
    ImportOptions {
        on_conflict: policy,
        ..ImportOptions::default()
    }
}

/// drugs CSV：每个编码一行
fn drugs_csv(codes: &[&str]) -> String {
    let mut csv = String::from("drug_code,trade_name\n");
    for code in codes {
        csv.push_str(&format!("{},Trade {}\n", code, code));
    }
    csv
}

/// 内置 drugs 模块，去掉上游依赖
fn standalone_drugs() -> ModuleDescriptor {
    let mut drugs = inventory_modules()
        .into_iter()
        .find(|m| m.module == "drugs")
        .expect("内置模块缺少 drugs");
    drugs.dependencies.clear();
    drugs
}

fn import_ok(env: &TestEnv, module: &str, csv: &str, policy: ConflictPolicy) -> String {
    let outcome = env.validate_csv(module, csv, false);
    assert!(outcome.can_proceed, "校验未通过: {:?}", outcome.errors);
    env.api
        .import_data(module, &outcome.session_id, options(policy), &ctx())
        .unwrap()
        .job_id
}

// ==========================================
// 端到端: drugs / drug_prices
// ==========================================

#[test]
fn test_drugs_end_to_end_blocked_by_malformed_row() {
    let env = TestEnv::with_modules(
        vec![simple_module("drug_prices", &["drugs"]), standalone_drugs()],
        ImportSettings::default(),
    );
    let order = env.api.get_import_order(true);
    assert_eq!(order.order, vec!["drugs", "drug_prices"]);

    // 第 3 行缺少必填 drug_code
    let csv = "drug_code,trade_name\nD-001,Alpha\nD-002,Beta\n,Gamma\nD-004,Delta\nD-005,Epsilon\n";
    let outcome = env.validate_csv("drugs", csv, false);
    assert_eq!(outcome.stats.total_rows, 5);
    assert_eq!(outcome.stats.valid_rows, 4);
    assert_eq!(outcome.stats.error_rows, 1);
    assert!(!outcome.is_valid);
    assert!(!outcome.can_proceed);

    let err = env
        .api
        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationBlocked { error_rows: 1, .. }));

    // skipWarnings 不能放行错误
    let err = env
        .api
        .import_data(
            "drugs",
            &outcome.session_id,
            ImportOptions {
                skip_warnings: true,
                ..ImportOptions::default()
            },
            &ctx(),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationBlocked { .. }));
}

// ==========================================
// 校验门禁
// ==========================================

#[test]
fn test_errors_block_regardless_of_skip_warnings() {
    let env = TestEnv::new();
    let csv = "drug_code,trade_name,pack_size\nD-1,Alpha,0\n";
    for skip in [false, true] {
        let outcome = env.validate_csv("drugs", csv, skip);
        assert!(!outcome.is_valid);
        assert!(!outcome.can_proceed);
        assert_eq!(outcome.errors[0].code, "OUT_OF_RANGE");
    }
}

#[test]
fn test_warnings_do_not_block_import() {
    let env = TestEnv::new();

    // 前后空白只产生警告
    let outcome = env.validate_csv("drugs", "drug_code,trade_name\n A1 ,Trade\n", false);
    assert!(outcome.is_valid);
    assert!(outcome.can_proceed);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].code, "TRIMMED_WHITESPACE");

    let accepted = env
        .api
        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap();
    assert_eq!(accepted.status, DispatchStatus::Running);
    let view = env.api.get_import_status("drugs", &accepted.job_id).unwrap();
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress.imported_rows, 1);

    // 弃用值同样不阻断，skipWarnings 不改变结论
    for skip in [false, true] {
        let outcome = env.validate_csv("drugs", "drug_code,trade_name,unit\nD-1,Alpha,AMP\n", skip);
        assert!(outcome.can_proceed);
        assert_eq!(outcome.warnings[0].code, "DEPRECATED_VALUE");
    }
}

// ==========================================
// 会话
// ==========================================

#[test]
fn test_session_is_single_use() {
    let env = TestEnv::new();
    let outcome = env.validate_csv("drugs", &drugs_csv(&["D-1", "D-2"]), false);

    env.api
        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap();
    let err = env
        .api
        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionNotFound(_)));
}

#[test]
fn test_expired_session_rejected() {
    let env = TestEnv::new();
    let outcome = env.validate_csv("drugs", &drugs_csv(&["D-1"]), false);
    assert_eq!(outcome.expires_at, test_helpers::base_time() + Duration::minutes(30));

    env.clock.advance(Duration::minutes(31));
    let err = env
        .api
        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired(_)));
    assert_eq!(err.http_status(), 400);
}

#[test]
fn test_session_bound_to_module() {
    let env = TestEnv::new();
    let outcome = env.validate_csv("drugs", &drugs_csv(&["D-1"]), false);
    let err = env
        .api
        .import_data("companies", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionNotFound(_)));
}

// ==========================================
// 冲突策略
// ==========================================

#[test]
fn test_skip_policy_three_duplicates_seven_new() {
    let env = TestEnv::new();
    import_ok(&env, "drugs", &drugs_csv(&["D-1", "D-2", "D-3"]), ConflictPolicy::Skip);

    let codes: Vec<String> = (1..=10).map(|i| format!("D-{}", i)).collect();
    let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
    let job_id = import_ok(&env, "drugs", &drugs_csv(&refs), ConflictPolicy::Skip);

    let view = env.api.get_import_status("drugs", &job_id).unwrap();
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress.total_rows, 10);
    assert_eq!(view.progress.imported_rows, 7);
    assert_eq!(view.progress.skipped_rows, 3);
    assert_eq!(view.progress.error_rows, 0);
    assert_eq!(env.runtime.records.count_records("drugs").unwrap(), 10);
}

#[test]
fn test_update_policy_keeps_original_owner_for_rollback() {
    let env = TestEnv::new();
    let first = import_ok(&env, "drugs", &drugs_csv(&["D-1", "D-2"]), ConflictPolicy::Skip);
    let second = import_ok(&env, "drugs", &drugs_csv(&["D-2", "D-3"]), ConflictPolicy::Update);

    let view = env.api.get_import_status("drugs", &second).unwrap();
    assert_eq!(view.progress.imported_rows, 2);

    // 第二个任务只新增了 D-3
    let outcome = env.api.rollback("drugs", &second, &ctx()).unwrap();
    assert_eq!(outcome.deleted_records, 1);
    let outcome = env.api.rollback("drugs", &first, &ctx()).unwrap();
    assert_eq!(outcome.deleted_records, 2);
    assert_eq!(env.runtime.records.count_records("drugs").unwrap(), 0);
}

#[test]
fn test_error_policy_fails_job_without_partial_writes() {
    let env = TestEnv::new();
    import_ok(&env, "drugs", &drugs_csv(&["D-5"]), ConflictPolicy::Skip);

    let job_id = import_ok(&env, "drugs", &drugs_csv(&["D-1", "D-2", "D-5"]), ConflictPolicy::Error);
    let view = env.api.get_import_status("drugs", &job_id).unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert!(view.error.as_deref().unwrap_or_default().contains("row"));
    assert!(!view.can_rollback);

    assert_eq!(env.runtime.records.count_records("drugs").unwrap(), 1);
    let status = env.runtime.module_status.get_or_default("drugs").unwrap();
    assert_eq!(status.import_status, ModuleImportStatus::Failed);
}

// ==========================================
// 回滚
// ==========================================

#[test]
fn test_rollback_unsupported_module() {
    let env = TestEnv::new();
    let csv = "budget_code,fiscal_year,type_code,dept_code,amount\nB-1,2025,OPEX,PHARM,1000\n";
    let job_id = import_ok(&env, "budgets", csv, ConflictPolicy::Skip);

    let view = env.api.get_import_status("budgets", &job_id).unwrap();
    assert_eq!(view.status, JobStatus::Completed);
    assert!(!view.can_rollback);

    let err = env.api.rollback("budgets", &job_id, &ctx()).unwrap_err();
    assert!(matches!(err, ApiError::RollbackUnsupported(_)));
    assert_eq!(env.runtime.records.count_records("budgets").unwrap(), 1);
}

#[test]
fn test_rollback_twice_not_eligible() {
    let env = TestEnv::new();
    let job_id = import_ok(&env, "drugs", &drugs_csv(&["D-1", "D-2", "D-3"]), ConflictPolicy::Skip);
    assert!(env.api.can_rollback(&job_id).unwrap());

    let outcome = env.api.rollback("drugs", &job_id, &ctx()).unwrap();
    assert_eq!(outcome.deleted_records, 3);
    let status = env.runtime.module_status.get_or_default("drugs").unwrap();
    assert_eq!(status.import_status, ModuleImportStatus::NotStarted);
    assert_eq!(status.record_count, 0);

    let err = env.api.rollback("drugs", &job_id, &ctx()).unwrap_err();
    assert!(matches!(err, ApiError::RollbackNotEligible { .. }));
    let view = env.api.get_import_status("drugs", &job_id).unwrap();
    assert_eq!(view.status, JobStatus::RolledBack);
}

#[test]
fn test_rollback_unknown_job_or_wrong_module() {
    let env = TestEnv::new();
    let job_id = import_ok(&env, "drugs", &drugs_csv(&["D-1"]), ConflictPolicy::Skip);

    let err = env.api.rollback("drugs", "ghost", &ctx()).unwrap_err();
    assert_eq!(err.http_status(), 404);
    let err = env.api.rollback("companies", &job_id, &ctx()).unwrap_err();
    assert!(matches!(err, ApiError::JobNotFound(_)));
}

// ==========================================
// 历史与审计
// ==========================================

#[test]
fn test_history_and_audit_trail() {
    let env = TestEnv::new();
    let job_id = import_ok(&env, "drugs", &drugs_csv(&["D-1", "D-2"]), ConflictPolicy::Skip);

    let history = env.api.get_import_history("drugs", None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].job_id, job_id);
    assert_eq!(history[0].records_imported, 2);
    assert_eq!(history[0].imported_by.id, "tester");

    let status = env.runtime.module_status.get_or_default("drugs").unwrap();
    assert_eq!(status.import_status, ModuleImportStatus::Completed);
    assert_eq!(status.record_count, 2);
    assert_eq!(status.last_import_date, Some(test_helpers::base_time()));

    let logs = ActionLogRepository::new(env.conn.clone())
        .find_by_job_id(&job_id)
        .unwrap();
    let types: Vec<_> = logs.iter().map(|l| l.action_type.as_str()).collect();
    assert_eq!(types, vec!["IMPORT_START", "IMPORT_COMPLETE"]);
}

// ==========================================
// 并发
// ==========================================

#[test]
fn test_concurrent_import_of_same_session_admits_one() {
    let env = TestEnv::new();
    let outcome = env.validate_csv("drugs", &drugs_csv(&["D-1", "D-2"]), false);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    env.api
                        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ApiError::SessionNotFound(_))));
    assert_eq!(env.runtime.records.count_records("drugs").unwrap(), 2);
}

#[test]
fn test_different_modules_import_in_parallel() {
    let env = TestEnv::new();
    let drugs = env.validate_csv("drugs", &drugs_csv(&["D-1", "D-2"]), false);
    let companies = env.validate_csv(
        "companies",
        "company_code,company_name\nC-1,Acme\nC-2,Globex\n",
        false,
    );

    std::thread::scope(|s| {
        let a = s.spawn(|| {
            env.api
                .import_data("drugs", &drugs.session_id, ImportOptions::default(), &ctx())
        });
        let b = s.spawn(|| {
            env.api
                .import_data("companies", &companies.session_id, ImportOptions::default(), &ctx())
        });
        assert!(a.join().unwrap().is_ok());
        assert!(b.join().unwrap().is_ok());
    });

    assert_eq!(env.runtime.records.count_records("drugs").unwrap(), 2);
    assert_eq!(env.runtime.records.count_records("companies").unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_mode_returns_queued_then_completes() {
    let settings = ImportSettings {
        execution_mode: ExecutionMode::Background,
        ..ImportSettings::default()
    };
    let env = TestEnv::with_modules(inventory_modules(), settings);
    let outcome = env.validate_csv("drugs", &drugs_csv(&["D-1", "D-2", "D-3"]), false);

    let accepted = env
        .api
        .import_data("drugs", &outcome.session_id, ImportOptions::default(), &ctx())
        .unwrap();
    assert_eq!(accepted.status, DispatchStatus::Queued);

    let mut status = JobStatus::Pending;
    for _ in 0..100 {
        status = env.api.get_import_status("drugs", &accepted.job_id).unwrap().status;
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(50)).await;
    }
    assert_eq!(status, JobStatus::Completed);
    assert_eq!(env.runtime.records.count_records("drugs").unwrap(), 3);
}
