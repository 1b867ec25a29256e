use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::job::ImportContext;
use crate::importer::audit::AuditSink;
use chrono::{Duration, TimeZone, Utc};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(action_id: &str, action_type: ActionType, minute: i64) -> ActionLog {
    let mut ctx = ImportContext::new("user1");
    ctx.user_name = Some("Jane".to_string());
    ctx.ip_address = Some("10.0.0.5".to_string());
    let ts = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap() + Duration::minutes(minute);
    ActionLog::new(action_id.to_string(), action_type, ts, "drugs", &ctx)
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("log1", ActionType::ValidateFile, 0)
        .with_session("s-1")
        .with_payload(json!({"totalRows": 10}))
        .with_detail("ok".to_string());
    assert_eq!(repo.insert(&log).unwrap(), "log1");

    let found = repo.find_by_id("log1").unwrap().unwrap();
    assert_eq!(found.action_type, "VALIDATE_FILE");
    assert_eq!(found.actor_name.as_deref(), Some("Jane"));
    assert_eq!(found.session_id.as_deref(), Some("s-1"));
    assert_eq!(found.payload_json, Some(json!({"totalRows": 10})));
    assert_eq!(found.action_ts, log.action_ts);

    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_find_by_job_in_order() {
    let repo = ActionLogRepository::new(setup_test_db());
    repo.insert(&make_test_log("a2", ActionType::ImportComplete, 5).with_job("job-1"))
        .unwrap();
    repo.insert(&make_test_log("a1", ActionType::ImportStart, 0).with_job("job-1"))
        .unwrap();
    repo.insert(&make_test_log("a3", ActionType::ImportStart, 1).with_job("job-2"))
        .unwrap();

    let logs = repo.find_by_job_id("job-1").unwrap();
    let ids: Vec<_> = logs.iter().map(|l| l.action_id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
}

#[test]
fn test_find_by_module_and_type() {
    let repo = ActionLogRepository::new(setup_test_db());
    for i in 0..3 {
        repo.insert(&make_test_log(&format!("r{}", i), ActionType::Rollback, i))
            .unwrap();
    }
    repo.insert(&make_test_log("v", ActionType::ValidateFile, 10)).unwrap();

    let recent = repo.find_by_module("drugs", 2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action_id, "v");

    let rollbacks = repo.find_by_action_type("ROLLBACK", 10).unwrap();
    assert_eq!(rollbacks.len(), 3);
}

#[test]
fn test_audit_sink_writes_row() {
    let repo = ActionLogRepository::new(setup_test_db());
    let sink: &dyn AuditSink = &repo;
    sink.record(&make_test_log("x", ActionType::ImportFail, 0)).unwrap();
    assert!(repo.find_by_id("x").unwrap().is_some());
}
