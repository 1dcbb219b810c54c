mod support;

use meter_app::AppError;
use meter_core::{LeaderboardMode, StatPeriod};
use support::{recent_log, seed_logs, setup};

#[test]
fn fresh_tracker_reads_zero_cursor() {
    let app = setup();
    let cursor = app.state.services.progress.read();
    assert_eq!(cursor.last_processed_id, 0);
    assert_eq!(cursor.total_processed, 0);
    assert!(cursor.last_processed_at.is_none());
    assert!(cursor.is_fresh());
}

#[test]
fn advance_keeps_last_id_and_sums_counts() {
    let app = setup();
    let progress = &app.state.services.progress;
    progress.advance(10, 10).expect("advance");
    progress.advance(25, 15).expect("advance");
    progress.advance(25, 0).expect("advance to same id");

    let cursor = progress.read();
    assert_eq!(cursor.last_processed_id, 25);
    assert_eq!(cursor.total_processed, 25);
    assert!(cursor.last_processed_at.is_some());
}

#[test]
fn advance_rejects_regressive_cursor() {
    let app = setup();
    let progress = &app.state.services.progress;
    progress.advance(100, 5).expect("advance");

    let err = progress.advance(50, 5).expect_err("regression must fail");
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(progress.read().last_processed_id, 100);
}

#[test]
fn reset_is_idempotent() {
    let app = setup();
    let progress = &app.state.services.progress;
    progress.advance(42, 42).expect("advance");

    progress.reset().expect("reset");
    progress.reset().expect("reset again");

    let cursor = progress.read();
    assert_eq!(cursor.last_processed_id, 0);
    assert_eq!(cursor.total_processed, 0);
    assert!(cursor.last_processed_at.is_none());
}

#[test]
fn reset_invalidates_cached_aggregates() {
    let app = setup();
    seed_logs(&app.state, vec![recent_log(None, 1, "alice", 1.0)]);

    let first = app
        .state
        .services
        .rankings
        .leaderboard(LeaderboardMode::Requests, StatPeriod::Day, 0)
        .expect("leaderboard");
    assert_eq!(first.len(), 1);

    // New rows are invisible while the cached aggregate is live.
    seed_logs(&app.state, vec![recent_log(None, 2, "bob", 2.0)]);
    let stale = app
        .state
        .services
        .rankings
        .leaderboard(LeaderboardMode::Requests, StatPeriod::Day, 0)
        .expect("leaderboard");
    assert_eq!(stale.len(), 1);

    app.state.services.progress.reset().expect("reset");
    let fresh = app
        .state
        .services
        .rankings
        .leaderboard(LeaderboardMode::Requests, StatPeriod::Day, 0)
        .expect("leaderboard");
    assert_eq!(fresh.len(), 2);
}

#[test]
fn advance_from_source_folds_batches_in_order() {
    let app = setup();
    seed_logs(
        &app.state,
        vec![
            recent_log(Some(1), 1, "alice", 1.0),
            recent_log(Some(2), 1, "alice", 1.0),
            recent_log(Some(3), 2, "bob", 1.0),
        ],
    );
    let progress = &app.state.services.progress;

    let cursor = progress.advance_from_source(2).expect("first batch");
    assert_eq!(cursor.last_processed_id, 2);
    assert_eq!(cursor.total_processed, 2);

    let cursor = progress.advance_from_source(2).expect("second batch");
    assert_eq!(cursor.last_processed_id, 3);
    assert_eq!(cursor.total_processed, 3);

    // Drained log leaves the cursor untouched.
    let cursor = progress.advance_from_source(2).expect("drained");
    assert_eq!(cursor.last_processed_id, 3);
    assert_eq!(cursor.total_processed, 3);
}
