use serde::{Deserialize, Serialize};

/// Log row types written by the relay gateway.
pub const LOG_TYPE_TOPUP: i64 = 1;
pub const LOG_TYPE_CONSUME: i64 = 2;
pub const LOG_TYPE_MANAGE: i64 = 3;
pub const LOG_TYPE_SYSTEM: i64 = 4;
pub const LOG_TYPE_ERROR: i64 = 5;

/// Rows that represent a completed request (success or failure). Only these
/// count toward analytics progress and leaderboards.
pub const BILLABLE_LOG_TYPES: [i64; 2] = [LOG_TYPE_CONSUME, LOG_TYPE_ERROR];

/// Position of the analytics fold over the append-only usage log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressCursor {
    pub last_processed_id: i64,
    pub last_processed_at: Option<String>,
    pub total_processed: i64,
}

impl ProgressCursor {
    pub fn is_fresh(&self) -> bool {
        self.last_processed_id == 0 && self.total_processed == 0
    }
}

/// Derived comparison of the cursor against the source's maximum billable id.
/// Computed fresh on every check, never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub cursor_id: i64,
    pub source_max_id: i64,
    pub progress_percent: f64,
    pub remaining: i64,
    pub is_synced: bool,
}

impl SyncStatus {
    pub fn from_positions(cursor_id: i64, source_max_id: i64) -> Self {
        if source_max_id <= 0 {
            return Self {
                cursor_id,
                source_max_id: source_max_id.max(0),
                progress_percent: 100.0,
                remaining: 0,
                is_synced: true,
            };
        }
        let remaining = (source_max_id - cursor_id).max(0);
        let progress_percent = if cursor_id <= 0 {
            0.0
        } else {
            (cursor_id.min(source_max_id) as f64 / source_max_id as f64) * 100.0
        };
        Self {
            cursor_id,
            source_max_id,
            progress_percent,
            remaining,
            is_synced: remaining == 0,
        }
    }

    /// Cursor beyond the source maximum: the source was reset or rows were
    /// deleted out from under the analytics fold.
    pub fn is_inverted(&self) -> bool {
        self.source_max_id > 0 && self.cursor_id > self.source_max_id
    }
}

/// Half-open window of unix seconds: `start <= created_at < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// Trailing window ending at `now`.
    pub fn trailing(now: i64, seconds: i64) -> Self {
        Self {
            start: now - seconds,
            end: now,
        }
    }
}

/// One row of a leaderboard: a ranked user with its request count and
/// quota spend over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub subject_id: i64,
    pub subject_label: String,
    pub count: u64,
    pub amount: f64,
}

/// Per-model success/failure statistics over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStat {
    pub model: String,
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub quota: f64,
}

/// One bucket of the usage-by-period dashboard series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePoint {
    pub day: String,
    pub requests: u64,
    pub quota: f64,
}

/// Trailing windows the engine caches aggregates for. Keeping the set finite
/// keeps the cached-key space enumerable for group invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatPeriod {
    Day,
    Week,
    Month,
}

impl StatPeriod {
    pub const ALL: [StatPeriod; 3] = [StatPeriod::Day, StatPeriod::Week, StatPeriod::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatPeriod::Day => "day",
            StatPeriod::Week => "week",
            StatPeriod::Month => "month",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            StatPeriod::Day => 86_400,
            StatPeriod::Week => 7 * 86_400,
            StatPeriod::Month => 30 * 86_400,
        }
    }
}

/// Metric ranked by a leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardMode {
    #[default]
    Requests,
    Quota,
}

impl LeaderboardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardMode::Requests => "requests",
            LeaderboardMode::Quota => "quota",
        }
    }
}

/// Lightweight metrics sampled to classify deployment scale. Immutable once
/// captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleMetrics {
    pub total_users: u64,
    pub active_users_24h: u64,
    pub logs_24h: u64,
    pub total_logs: u64,
    pub rpm_avg: f64,
}

/// Ordinal deployment scale. Ordering matters: thresholds are evaluated from
/// the largest tier downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleTier {
    Small,
    Medium,
    Large,
    Xlarge,
}

impl ScaleTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleTier::Small => "small",
            ScaleTier::Medium => "medium",
            ScaleTier::Large => "large",
            ScaleTier::Xlarge => "xlarge",
        }
    }

    /// Classify sampled metrics into a tier. Any single metric exceeding a
    /// tier's threshold qualifies the deployment for that tier or higher.
    pub fn classify(metrics: &ScaleMetrics) -> ScaleTier {
        const THRESHOLDS: [(ScaleTier, u64, u64, f64); 3] = [
            (ScaleTier::Xlarge, 50_000, 10_000_000, 7_000.0),
            (ScaleTier::Large, 10_000, 1_000_000, 700.0),
            (ScaleTier::Medium, 1_000, 100_000, 70.0),
        ];
        for (tier, users, logs, rpm) in THRESHOLDS {
            if metrics.total_users > users || metrics.logs_24h > logs || metrics.rpm_avg > rpm {
                return tier;
            }
        }
        ScaleTier::Small
    }
}

/// Operational parameters resolved from a scale tier. Consumed by the
/// ranking cache and exposed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSettings {
    pub leaderboard_ttl_secs: u64,
    pub ip_cache_ttl_secs: u64,
    pub stats_ttl_secs: u64,
    pub frontend_refresh_secs: u64,
    pub description: String,
}

impl TierSettings {
    /// Pure, exhaustive lookup. Every tier maps to a complete record.
    pub fn for_tier(tier: ScaleTier) -> TierSettings {
        match tier {
            ScaleTier::Small => TierSettings {
                leaderboard_ttl_secs: 120,
                ip_cache_ttl_secs: 900,
                stats_ttl_secs: 60,
                frontend_refresh_secs: 60,
                description: "small deployment (up to ~1k users)".to_string(),
            },
            ScaleTier::Medium => TierSettings {
                leaderboard_ttl_secs: 300,
                ip_cache_ttl_secs: 1_800,
                stats_ttl_secs: 120,
                frontend_refresh_secs: 120,
                description: "medium deployment (1k-10k users)".to_string(),
            },
            ScaleTier::Large => TierSettings {
                leaderboard_ttl_secs: 600,
                ip_cache_ttl_secs: 3_600,
                stats_ttl_secs: 300,
                frontend_refresh_secs: 300,
                description: "large deployment (10k-50k users)".to_string(),
            },
            ScaleTier::Xlarge => TierSettings {
                leaderboard_ttl_secs: 1_800,
                ip_cache_ttl_secs: 7_200,
                stats_ttl_secs: 600,
                frontend_refresh_secs: 600,
                description: "extra-large deployment (50k+ users)".to_string(),
            },
        }
    }
}

/// Result of one scale-detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSnapshot {
    pub tier: ScaleTier,
    pub metrics: ScaleMetrics,
    pub settings: TierSettings,
    pub captured_at: String,
    pub cached: bool,
}

/// Analytics feature configuration, deserialized once at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub leaderboard_mode: LeaderboardMode,
    pub target_tier: Option<ScaleTier>,
    pub model_whitelist: Vec<String>,
}

impl AnalyticsConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Whitelist filter for model stats. Empty whitelist admits everything.
    pub fn admits_model(&self, model: &str) -> bool {
        if self.model_whitelist.is_empty() {
            return true;
        }
        self.model_whitelist
            .iter()
            .any(|pattern| model_matches_pattern(model, pattern))
    }
}

pub fn model_matches_pattern(model: &str, pattern: &str) -> bool {
    let model = model.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return model == pattern;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut remainder = model.as_str();
    let mut first = true;
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if let Some(index) = remainder.find(part) {
            if first && index != 0 {
                return false;
            }
            remainder = &remainder[index + part.len()..];
            first = false;
        } else {
            return false;
        }
    }
    if pattern.ends_with('*') {
        true
    } else {
        remainder.is_empty()
    }
}
