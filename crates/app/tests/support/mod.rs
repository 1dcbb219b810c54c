#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use meter_app::AppState;
use meter_cache::MemoryCache;
use meter_core::{AnalyticsConfig, LOG_TYPE_CONSUME};
use meter_db::UsageLogRow;
use tempfile::TempDir;

pub struct TestApp {
    pub _dir: TempDir,
    pub state: AppState,
}

pub fn setup() -> TestApp {
    setup_with_config(AnalyticsConfig {
        enabled: true,
        ..Default::default()
    })
}

pub fn setup_with_config(analytics: AnalyticsConfig) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("gateway.sqlite");
    let state = AppState::new(db_path, analytics, Arc::new(MemoryCache::new()));
    state.setup_db().expect("setup db");
    TestApp { _dir: dir, state }
}

pub fn seed_logs(state: &AppState, rows: Vec<UsageLogRow>) {
    let mut db = state.open_db().expect("open db");
    db.insert_usage_logs(&rows).expect("insert logs");
}

/// Billable consume row stamped one minute ago so it lands in every
/// trailing window.
pub fn recent_log(id: Option<i64>, user_id: i64, username: &str, quota: f64) -> UsageLogRow {
    UsageLogRow {
        id,
        created_at: Utc::now().timestamp() - 60,
        user_id,
        username: username.to_string(),
        model_name: "gpt-4o".to_string(),
        log_type: LOG_TYPE_CONSUME,
        prompt_tokens: 100,
        completion_tokens: 50,
        quota,
    }
}
