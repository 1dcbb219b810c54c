mod error;
mod metrics;
mod rankings;
mod types;

use std::path::Path;

use rusqlite::{Connection, params};

pub use error::{DbError, Result};
pub use rankings::day_label;
pub use types::{Column, Entity, RowFilter, UsageLogRow};

pub const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");
pub const MIGRATION_0002: &str = include_str!("../migrations/0002_add_log_indexes.sql");

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init", MIGRATION_0001),
    ("0002_add_log_indexes", MIGRATION_0002),
];

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "cache_size", -20_000)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (_name, sql) in MIGRATIONS {
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_usage_logs(&mut self, rows: &[UsageLogRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO usage_log (
                  id, created_at, user_id, username, model_name, log_type,
                  prompt_tokens, completion_tokens, quota
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.id,
                    row.created_at,
                    row.user_id,
                    row.username,
                    row.model_name,
                    row.log_type,
                    row.prompt_tokens,
                    row.completion_tokens,
                    row.quota,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_user(&mut self, username: &str, status: i64, created_at: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO user_account (username, status, created_at) VALUES (?1, ?2, ?3)",
            params![username, status, created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn soft_delete_user(&mut self, user_id: i64, deleted_at: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE user_account SET deleted_at = ?2 WHERE id = ?1",
            params![user_id, deleted_at],
        )?;
        Ok(())
    }

    pub fn insert_channel(&mut self, name: &str, status: i64, created_at: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO channel (name, status, created_at) VALUES (?1, ?2, ?3)",
            params![name, status, created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Deletes every log row. Only used to simulate an external source reset.
    pub fn purge_usage_logs(&mut self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM usage_log", [])?;
        Ok(deleted)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
