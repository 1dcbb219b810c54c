use chrono::{SecondsFormat, Utc};

use meter_core::ProgressCursor;

use crate::error::{AppError, Result};
use crate::services::rankings::managed_cache_keys;
use crate::services::{SharedCache, SharedConfig, open_db};

/// Cache key holding the cursor as a hash, one field per sub-field.
pub const CURSOR_KEY: &str = "analytics:cursor";

const FIELD_LAST_ID: &str = "last_processed_id";
const FIELD_LAST_AT: &str = "last_processed_at";
const FIELD_TOTAL: &str = "total_processed";

/// Analytics progress tracker. The cursor lives in the external cache store:
/// it survives process restarts with the store, and a store flush resets
/// analytics progress.
#[derive(Clone)]
pub struct ProgressService {
    config: SharedConfig,
    cache: SharedCache,
}

impl ProgressService {
    pub(super) fn new(config: SharedConfig, cache: SharedCache) -> Self {
        Self { config, cache }
    }

    /// Current cursor; zero-valued when none exists. Backend failures read
    /// as the zero cursor rather than an error.
    pub fn read(&self) -> ProgressCursor {
        ProgressCursor {
            last_processed_id: self.read_int(FIELD_LAST_ID),
            last_processed_at: self.read_field(FIELD_LAST_AT),
            total_processed: self.read_int(FIELD_TOTAL),
        }
    }

    /// Moves the cursor forward. Regressive positions are rejected: the
    /// cursor is monotonic across successful advances.
    pub fn advance(&self, new_last_id: i64, processed_count: i64) -> Result<ProgressCursor> {
        if new_last_id < 0 || processed_count < 0 {
            return Err(AppError::InvalidInput(
                "cursor position and batch size must be non-negative".to_string(),
            ));
        }
        let current = self.read();
        if new_last_id < current.last_processed_id {
            return Err(AppError::InvalidInput(format!(
                "cursor may not move backwards: {} < {}",
                new_last_id, current.last_processed_id
            )));
        }
        let cursor = ProgressCursor {
            last_processed_id: new_last_id,
            last_processed_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            total_processed: current.total_processed + processed_count,
        };
        self.write(&cursor)?;
        Ok(cursor)
    }

    /// Clears the cursor, then every cached aggregate it fed. The two steps
    /// are not atomic: a crash in between leaves stale aggregates with a
    /// fresh cursor, which the next consistency check will surface.
    pub fn reset(&self) -> Result<()> {
        self.cache.delete(CURSOR_KEY)?;
        for key in managed_cache_keys() {
            self.cache.delete(&key)?;
        }
        Ok(())
    }

    /// Folds the next batch of billable log rows into the cursor. Returns
    /// the cursor unchanged when the log is drained.
    pub fn advance_from_source(&self, batch_size: i64) -> Result<ProgressCursor> {
        if batch_size <= 0 {
            return Err(AppError::InvalidInput(
                "batch size must be positive".to_string(),
            ));
        }
        let current = self.read();
        let db = open_db(&self.config)?;
        let (count, max_id) = db.billable_batch(current.last_processed_id, batch_size)?;
        if count == 0 {
            return Ok(current);
        }
        self.advance(max_id, count)
    }

    fn write(&self, cursor: &ProgressCursor) -> Result<()> {
        self.cache
            .hash_set(CURSOR_KEY, FIELD_LAST_ID, &cursor.last_processed_id.to_string())?;
        self.cache.hash_set(
            CURSOR_KEY,
            FIELD_LAST_AT,
            cursor.last_processed_at.as_deref().unwrap_or(""),
        )?;
        self.cache
            .hash_set(CURSOR_KEY, FIELD_TOTAL, &cursor.total_processed.to_string())?;
        Ok(())
    }

    fn read_field(&self, field: &str) -> Option<String> {
        match self.cache.hash_get(CURSOR_KEY, field) {
            Ok(value) => value.filter(|raw| !raw.is_empty()),
            Err(err) => {
                log::warn!("cursor field {field} unreadable, treating as unset: {err}");
                None
            }
        }
    }

    fn read_int(&self, field: &str) -> i64 {
        self.read_field(field)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }
}
