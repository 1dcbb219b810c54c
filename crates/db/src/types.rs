/// Tables the metric adapter may aggregate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    UsageLog,
    UserAccount,
    Channel,
}

impl Entity {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Entity::UsageLog => "usage_log",
            Entity::UserAccount => "user_account",
            Entity::Channel => "channel",
        }
    }
}

/// Columns addressable by `distinct_count`. An enum keeps identifiers out of
/// the interpolation path; only values are ever bound as parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    UserId,
    ModelName,
}

impl Column {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::UserId => "user_id",
            Column::ModelName => "model_name",
        }
    }
}

/// Conjunction of simple predicates. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    /// Membership test on `log_type` (usage_log only).
    pub log_types: Vec<i64>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<i64>,
    /// Exclusive upper bound on `created_at`.
    pub created_to: Option<i64>,
    /// Equality on `status`.
    pub status: Option<i64>,
    /// When false, soft-deleted user rows are excluded.
    pub include_deleted: bool,
}

impl RowFilter {
    /// Completed requests only (success or failure).
    pub fn billable() -> Self {
        Self {
            log_types: meter_core::BILLABLE_LOG_TYPES.to_vec(),
            ..Default::default()
        }
    }

    pub fn created_between(mut self, from: i64, to: i64) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    pub fn created_after(mut self, from: i64) -> Self {
        self.created_from = Some(from);
        self
    }

    pub fn with_status(mut self, status: i64) -> Self {
        self.status = Some(status);
        self
    }
}

/// One gateway request as appended to `usage_log`. `id` is `None` for
/// autoincrement; tests pin explicit ids to stage cursor scenarios.
#[derive(Debug, Clone, Default)]
pub struct UsageLogRow {
    pub id: Option<i64>,
    pub created_at: i64,
    pub user_id: i64,
    pub username: String,
    pub model_name: String,
    pub log_type: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub quota: f64,
}
