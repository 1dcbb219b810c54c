#![allow(dead_code)]

use std::path::PathBuf;

use meter_db::{Db, UsageLogRow};
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn insert_logs(db: &mut Db, rows: Vec<UsageLogRow>) {
    db.insert_usage_logs(&rows).expect("insert logs");
}

pub fn make_log(
    id: Option<i64>,
    created_at: i64,
    user_id: i64,
    username: &str,
    model: &str,
    log_type: i64,
    quota: f64,
) -> UsageLogRow {
    UsageLogRow {
        id,
        created_at,
        user_id,
        username: username.to_string(),
        model_name: model.to_string(),
        log_type,
        prompt_tokens: 100,
        completion_tokens: 50,
        quota,
    }
}
