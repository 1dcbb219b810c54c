mod support;

use meter_core::{LOG_TYPE_CONSUME, LOG_TYPE_ERROR, LOG_TYPE_TOPUP, TimeRange};
use meter_db::day_label;
use support::{insert_logs, make_log, setup_db};

const RANGE: TimeRange = TimeRange { start: 0, end: 10_000 };

#[test]
fn top_users_by_requests_orders_descending_with_stable_ties() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    insert_logs(
        db,
        vec![
            make_log(None, 100, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(None, 110, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(None, 120, 2, "bob", "gpt-4o", LOG_TYPE_CONSUME, 9.0),
            make_log(None, 130, 3, "carol", "gpt-4o", LOG_TYPE_ERROR, 0.0),
            make_log(None, 140, 3, "carol", "gpt-4o", LOG_TYPE_TOPUP, 0.0),
        ],
    );

    let entries = db.top_users_by_requests(&RANGE).expect("rankings");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].subject_label, "alice");
    assert_eq!(entries[0].count, 2);
    // bob and carol tie at one request; lower id first.
    assert_eq!(entries[1].subject_label, "bob");
    assert_eq!(entries[2].subject_label, "carol");
}

#[test]
fn top_users_by_quota_ranks_spend_not_requests() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    insert_logs(
        db,
        vec![
            make_log(None, 100, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(None, 110, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(None, 120, 2, "bob", "gpt-4o", LOG_TYPE_CONSUME, 9.0),
        ],
    );

    let entries = db.top_users_by_quota(&RANGE).expect("rankings");
    assert_eq!(entries[0].subject_label, "bob");
    assert!((entries[0].amount - 9.0).abs() < 1e-9);
    assert_eq!(entries[1].subject_label, "alice");
    assert!((entries[1].amount - 2.0).abs() < 1e-9);
}

#[test]
fn model_stats_split_success_and_error_counts() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    insert_logs(
        db,
        vec![
            make_log(None, 100, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 2.0),
            make_log(None, 110, 2, "bob", "gpt-4o", LOG_TYPE_ERROR, 0.0),
            make_log(None, 120, 2, "bob", "gpt-4o-mini", LOG_TYPE_CONSUME, 0.5),
        ],
    );

    let stats = db.model_stats(&RANGE).expect("stats");
    assert_eq!(stats.len(), 2);
    let gpt4o = &stats[0];
    assert_eq!(gpt4o.model, "gpt-4o");
    assert_eq!(gpt4o.request_count, 2);
    assert_eq!(gpt4o.success_count, 1);
    assert_eq!(gpt4o.error_count, 1);
    assert_eq!(gpt4o.prompt_tokens, 200);
    assert_eq!(gpt4o.completion_tokens, 100);
    assert!((gpt4o.quota - 2.0).abs() < 1e-9);
}

#[test]
fn usage_by_day_buckets_in_utc_ascending() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let day0 = 1_700_000_000;
    let day1 = day0 + 86_400;
    insert_logs(
        db,
        vec![
            make_log(None, day1, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(None, day0, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(None, day0 + 60, 2, "bob", "gpt-4o", LOG_TYPE_ERROR, 0.0),
        ],
    );

    let range = TimeRange {
        start: day0,
        end: day1 + 86_400,
    };
    let points = db.usage_by_day(&range).expect("series");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].day, day_label(day0));
    assert_eq!(points[0].requests, 2);
    assert_eq!(points[1].day, day_label(day1));
    assert_eq!(points[1].requests, 1);
}

#[test]
fn billable_batch_walks_the_log_in_id_order() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    insert_logs(
        db,
        vec![
            make_log(Some(1), 100, 1, "alice", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
            make_log(Some(2), 110, 1, "alice", "gpt-4o", LOG_TYPE_TOPUP, 0.0),
            make_log(Some(3), 120, 2, "bob", "gpt-4o", LOG_TYPE_ERROR, 0.0),
            make_log(Some(4), 130, 2, "bob", "gpt-4o", LOG_TYPE_CONSUME, 1.0),
        ],
    );

    let (count, max_id) = db.billable_batch(0, 2).expect("batch");
    assert_eq!((count, max_id), (2, 3));
    let (count, max_id) = db.billable_batch(3, 2).expect("batch");
    assert_eq!((count, max_id), (1, 4));
    let (count, max_id) = db.billable_batch(4, 2).expect("batch");
    assert_eq!((count, max_id), (0, 4));
}
