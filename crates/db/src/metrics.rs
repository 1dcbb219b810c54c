//! Narrow aggregate-query capability exposed to the analytics engine: counts,
//! distinct counts, and maximum ids under simple conjunctive filters. All
//! predicate values are bound as parameters; identifiers come from enums.

use rusqlite::params_from_iter;

use crate::Db;
use crate::error::Result;
use crate::types::{Column, Entity, RowFilter};

impl Db {
    pub fn count(&self, entity: Entity, filter: &RowFilter) -> Result<i64> {
        let (where_sql, values) = build_where(entity, filter);
        let sql = format!("SELECT COUNT(*) FROM {}{}", entity.table(), where_sql);
        let count = self
            .conn()
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count)
    }

    pub fn distinct_count(&self, entity: Entity, column: Column, filter: &RowFilter) -> Result<i64> {
        let (where_sql, values) = build_where(entity, filter);
        let sql = format!(
            "SELECT COUNT(DISTINCT {}) FROM {}{}",
            column.name(),
            entity.table(),
            where_sql
        );
        let count = self
            .conn()
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count)
    }

    /// Maximum id among matching rows, 0 when none match.
    pub fn max_id(&self, entity: Entity, filter: &RowFilter) -> Result<i64> {
        let (where_sql, values) = build_where(entity, filter);
        let sql = format!(
            "SELECT COALESCE(MAX(id), 0) FROM {}{}",
            entity.table(),
            where_sql
        );
        let max = self
            .conn()
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(max)
    }
}

fn build_where(entity: Entity, filter: &RowFilter) -> (String, Vec<i64>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<i64> = Vec::new();

    if !filter.log_types.is_empty() {
        let placeholders = vec!["?"; filter.log_types.len()].join(", ");
        clauses.push(format!("log_type IN ({placeholders})"));
        values.extend(filter.log_types.iter().copied());
    }
    if let Some(from) = filter.created_from {
        clauses.push("created_at >= ?".to_string());
        values.push(from);
    }
    if let Some(to) = filter.created_to {
        clauses.push("created_at < ?".to_string());
        values.push(to);
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?".to_string());
        values.push(status);
    }
    if entity == Entity::UserAccount && !filter.include_deleted {
        clauses.push("deleted_at IS NULL".to_string());
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}
