mod support;

use support::{recent_log, seed_logs, setup};

#[test]
fn empty_source_is_trivially_consistent() {
    let app = setup();
    let report = app.state.services.consistency.check(false).expect("check");
    assert!(report.consistent);
    assert!(report.details.is_synced);
    assert!((report.details.progress_percent - 100.0).abs() < 1e-9);
}

#[test]
fn caught_up_cursor_reports_full_progress() {
    let app = setup();
    seed_logs(&app.state, vec![recent_log(Some(1000), 1, "alice", 1.0)]);
    app.state
        .services
        .progress
        .advance(1000, 1)
        .expect("advance");

    let report = app.state.services.consistency.check(false).expect("check");
    assert!(report.consistent);
    assert!(report.details.is_synced);
    assert_eq!(report.details.cursor_id, 1000);
    assert_eq!(report.details.source_max_id, 1000);
    assert_eq!(report.details.remaining, 0);
    assert!((report.details.progress_percent - 100.0).abs() < 1e-9);
}

#[test]
fn lagging_cursor_reports_remaining_rows() {
    let app = setup();
    seed_logs(
        &app.state,
        vec![
            recent_log(Some(400), 1, "alice", 1.0),
            recent_log(Some(1000), 2, "bob", 1.0),
        ],
    );
    app.state.services.progress.advance(400, 1).expect("advance");

    let report = app.state.services.consistency.check(false).expect("check");
    assert!(report.consistent);
    assert!(!report.details.is_synced);
    assert_eq!(report.details.remaining, 600);
    assert!((report.details.progress_percent - 40.0).abs() < 1e-9);
}

#[test]
fn inverted_cursor_is_flagged_without_mutation() {
    let app = setup();
    seed_logs(&app.state, vec![recent_log(Some(1000), 1, "alice", 1.0)]);
    app.state
        .services
        .progress
        .advance(1500, 5)
        .expect("advance");

    let report = app.state.services.consistency.check(false).expect("check");
    assert!(!report.consistent);
    assert!(report.message.contains("reset"));
    assert_eq!(report.details.cursor_id, 1500);
    assert_eq!(report.details.source_max_id, 1000);

    // Without auto_reset the cursor is left as-is.
    assert_eq!(app.state.services.progress.read().last_processed_id, 1500);
}

#[test]
fn inverted_cursor_with_auto_reset_clears_tracker() {
    let app = setup();
    seed_logs(&app.state, vec![recent_log(Some(1000), 1, "alice", 1.0)]);
    app.state
        .services
        .progress
        .advance(1500, 5)
        .expect("advance");

    let report = app.state.services.consistency.check(true).expect("check");
    assert!(!report.consistent);
    assert!(report.message.contains("auto-reset performed"));

    let cursor = app.state.services.progress.read();
    assert_eq!(cursor.last_processed_id, 0);
    assert_eq!(cursor.total_processed, 0);

    // A second check starts from the zero cursor and is merely lagging.
    let report = app.state.services.consistency.check(false).expect("check");
    assert!(report.consistent);
    assert_eq!(report.details.remaining, 1000);
}
