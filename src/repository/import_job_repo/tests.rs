use super::ImportJobRepository;
use crate::domain::job::{ImportJob, ImportOptions, ImportedBy, JobProgress};
use crate::domain::types::{ConflictPolicy, JobStatus};
use crate::repository::error::RepositoryError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_repo() -> ImportJobRepository {
    setup_shared().0
}

fn setup_shared() -> (ImportJobRepository, Arc<Mutex<Connection>>) {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::init_schema(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));
    (ImportJobRepository::new(conn.clone()), conn)
}

fn seed_records(conn: &Arc<Mutex<Connection>>, job_id: &str, keys: &[&str]) {
    let conn = conn.lock().unwrap();
    for key in keys {
        conn.execute(
            "INSERT INTO import_record (module_name, record_key, job_id, payload_json, created_at, updated_at)
             VALUES ('drugs', ?1, ?2, '{}', ?3, ?3)",
            rusqlite::params![key, job_id, t0()],
        )
        .unwrap();
    }
}

fn record_count(conn: &Arc<Mutex<Connection>>) -> i64 {
    conn.lock()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM import_record", [], |row| row.get(0))
        .unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
}

fn pending_job(job_id: &str, started_at: DateTime<Utc>) -> ImportJob {
    ImportJob {
        job_id: job_id.to_string(),
        module_name: "drugs".to_string(),
        session_id: "s-1".to_string(),
        file_name: Some("drugs.csv".to_string()),
        status: JobStatus::Pending,
        progress: JobProgress::new(10),
        options: ImportOptions {
            skip_warnings: true,
            batch_size: Some(5),
            on_conflict: ConflictPolicy::Update,
        },
        batch_size: 5,
        started_at,
        completed_at: None,
        error: None,
        imported_by: ImportedBy {
            id: "u1".to_string(),
            name: Some("Jane".to_string()),
        },
        ip_address: Some("10.0.0.1".to_string()),
        user_agent: None,
        rolled_back_at: None,
        rolled_back_by: None,
        deleted_records: None,
    }
}

#[test]
fn test_insert_and_find_round_trip() {
    let repo = setup_repo();
    repo.insert(&pending_job("job-1", t0())).unwrap();

    let job = repo.find_by_id("job-1").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.options.on_conflict, ConflictPolicy::Update);
    assert_eq!(job.options.batch_size, Some(5));
    assert_eq!(job.imported_by.name.as_deref(), Some("Jane"));
    assert_eq!(job.progress.total_rows, 10);
    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_full_lifecycle() {
    let (repo, conn) = setup_shared();
    repo.insert(&pending_job("job-1", t0())).unwrap();
    seed_records(&conn, "job-1", &["A", "B"]);
    seed_records(&conn, "job-0", &["C"]);

    repo.mark_running("job-1").unwrap();
    let mut progress = JobProgress::new(10);
    progress.imported_rows = 10;
    progress.current_row = 10;
    progress.recompute_percent();
    repo.update_progress("job-1", &progress).unwrap();
    repo.finish("job-1", JobStatus::Running, JobStatus::Completed, t0(), None)
        .unwrap();
    let deleted = repo
        .rollback_completed("job-1", "drugs", t0() + Duration::minutes(1), "admin")
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(record_count(&conn), 1);

    let job = repo.find_by_id("job-1").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::RolledBack);
    assert_eq!(job.progress.percent_complete, 100.0);
    assert_eq!(job.completed_at, Some(t0()));
    assert_eq!(job.rolled_back_by.as_deref(), Some("admin"));
    assert_eq!(job.deleted_records, Some(2));
}

#[test]
fn test_guarded_transition_rejects_stale_status() {
    let repo = setup_repo();
    repo.insert(&pending_job("job-1", t0())).unwrap();

    // pending 不能直接 rolled_back
    let err = repo.rollback_completed("job-1", "drugs", t0(), "admin").unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InvalidStateTransition { ref from, .. } if from == "pending"
    ));

    repo.mark_running("job-1").unwrap();
    let err = repo.mark_running("job-1").unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

    let err = repo
        .finish("job-1", JobStatus::Completed, JobStatus::Failed, t0(), None)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));
}

#[test]
fn test_rejected_rollback_keeps_records() {
    let (repo, conn) = setup_shared();
    repo.insert(&pending_job("job-1", t0())).unwrap();
    repo.mark_running("job-1").unwrap();
    seed_records(&conn, "job-1", &["A", "B"]);

    // 状态不是 completed：删除随事务一起回滚
    let err = repo.rollback_completed("job-1", "drugs", t0(), "admin").unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InvalidStateTransition { ref from, .. } if from == "running"
    ));
    assert_eq!(record_count(&conn), 2);
    let job = repo.find_by_id("job-1").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.deleted_records, None);

    let err = repo.rollback_completed("ghost", "drugs", t0(), "admin").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
    assert_eq!(record_count(&conn), 2);
}

#[test]
fn test_missing_job_is_not_found() {
    let repo = setup_repo();
    let err = repo.mark_running("ghost").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_find_by_module_newest_first() {
    let repo = setup_repo();
    repo.insert(&pending_job("old", t0())).unwrap();
    repo.insert(&pending_job("new", t0() + Duration::hours(1))).unwrap();

    let jobs = repo.find_by_module("drugs", 10).unwrap();
    let ids: Vec<_> = jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert_eq!(repo.count_by_status(JobStatus::Pending).unwrap(), 2);
}
