//! Grouped aggregations behind the ranking cache: user leaderboards,
//! per-model success/failure stats, and the usage-by-day series. Each query
//! returns its full result set in a stable order; truncation to a caller
//! limit happens in the engine, on every read path.

use chrono::{TimeZone, Utc};
use rusqlite::params;

use meter_core::{
    LOG_TYPE_CONSUME, LOG_TYPE_ERROR, ModelStat, RankingEntry, TimeRange, UsagePoint,
};

use crate::Db;
use crate::error::Result;

impl Db {
    /// Users ranked by completed requests over the window.
    pub fn top_users_by_requests(&self, range: &TimeRange) -> Result<Vec<RankingEntry>> {
        self.top_users(range, "cnt DESC, user_id ASC")
    }

    /// Users ranked by quota spend over the window.
    pub fn top_users_by_quota(&self, range: &TimeRange) -> Result<Vec<RankingEntry>> {
        self.top_users(range, "amount DESC, user_id ASC")
    }

    fn top_users(&self, range: &TimeRange, order: &str) -> Result<Vec<RankingEntry>> {
        let sql = format!(
            r#"
            SELECT user_id, username, COUNT(*) AS cnt, COALESCE(SUM(quota), 0.0) AS amount
            FROM usage_log
            WHERE log_type IN (?1, ?2) AND created_at >= ?3 AND created_at < ?4
            GROUP BY user_id, username
            ORDER BY {order}
            "#
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let mut rows = stmt.query(params![
            LOG_TYPE_CONSUME,
            LOG_TYPE_ERROR,
            range.start,
            range.end
        ])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(RankingEntry {
                subject_id: row.get(0)?,
                subject_label: row.get(1)?,
                count: row.get::<_, i64>(2)? as u64,
                amount: row.get(3)?,
            });
        }
        Ok(entries)
    }

    /// Per-model request/success/error counts, token totals, and quota spend.
    pub fn model_stats(&self, range: &TimeRange) -> Result<Vec<ModelStat>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT model_name,
                   COUNT(*) AS request_count,
                   SUM(CASE WHEN log_type = ?1 THEN 1 ELSE 0 END) AS success_count,
                   SUM(CASE WHEN log_type = ?2 THEN 1 ELSE 0 END) AS error_count,
                   COALESCE(SUM(prompt_tokens), 0),
                   COALESCE(SUM(completion_tokens), 0),
                   COALESCE(SUM(quota), 0.0)
            FROM usage_log
            WHERE log_type IN (?1, ?2) AND created_at >= ?3 AND created_at < ?4
            GROUP BY model_name
            ORDER BY request_count DESC, model_name ASC
            "#,
        )?;
        let mut rows = stmt.query(params![
            LOG_TYPE_CONSUME,
            LOG_TYPE_ERROR,
            range.start,
            range.end
        ])?;
        let mut stats = Vec::new();
        while let Some(row) = rows.next()? {
            stats.push(ModelStat {
                model: row.get(0)?,
                request_count: row.get::<_, i64>(1)? as u64,
                success_count: row.get::<_, i64>(2)? as u64,
                error_count: row.get::<_, i64>(3)? as u64,
                prompt_tokens: row.get::<_, i64>(4)? as u64,
                completion_tokens: row.get::<_, i64>(5)? as u64,
                quota: row.get(6)?,
            });
        }
        Ok(stats)
    }

    /// Completed requests bucketed by UTC day, ascending.
    pub fn usage_by_day(&self, range: &TimeRange) -> Result<Vec<UsagePoint>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT strftime('%Y-%m-%d', created_at, 'unixepoch') AS day,
                   COUNT(*) AS cnt,
                   COALESCE(SUM(quota), 0.0) AS amount
            FROM usage_log
            WHERE log_type IN (?1, ?2) AND created_at >= ?3 AND created_at < ?4
            GROUP BY day
            ORDER BY day ASC
            "#,
        )?;
        let mut rows = stmt.query(params![
            LOG_TYPE_CONSUME,
            LOG_TYPE_ERROR,
            range.start,
            range.end
        ])?;
        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            points.push(UsagePoint {
                day: row.get(0)?,
                requests: row.get::<_, i64>(1)? as u64,
                quota: row.get(2)?,
            });
        }
        Ok(points)
    }

    /// Size and upper bound of the next billable batch after `after_id`.
    /// Returns `(count, max_id)`; `(0, after_id)` when the log is drained.
    pub fn billable_batch(&self, after_id: i64, limit: i64) -> Result<(i64, i64)> {
        let (count, max_id): (i64, i64) = self.conn().query_row(
            r#"
            SELECT COUNT(*), COALESCE(MAX(id), ?1)
            FROM (
              SELECT id FROM usage_log
              WHERE log_type IN (?2, ?3) AND id > ?1
              ORDER BY id ASC
              LIMIT ?4
            )
            "#,
            params![after_id, LOG_TYPE_CONSUME, LOG_TYPE_ERROR, limit],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((count, max_id))
    }
}

/// Unix timestamp formatted as a UTC day label, matching `usage_by_day`.
pub fn day_label(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}
