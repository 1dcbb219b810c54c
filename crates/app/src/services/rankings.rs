use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use meter_core::{LeaderboardMode, ModelStat, RankingEntry, StatPeriod, TimeRange, UsagePoint};

use crate::error::Result;
use crate::services::{SharedCache, SharedConfig, open_db};

use super::scale::ScaleService;

/// Ranking cache: memoizes the grouped aggregation queries behind TTL cache
/// entries. Payloads are stored whole; the caller's `limit` is applied after
/// retrieval on every read path, so changing it never forces a miss.
/// Concurrent misses may each recompute; the last writer wins.
#[derive(Clone)]
pub struct RankingService {
    config: SharedConfig,
    cache: SharedCache,
    scale: ScaleService,
}

fn leaderboard_key(mode: LeaderboardMode, period: StatPeriod) -> String {
    format!("analytics:top_users:{}:{}", mode.as_str(), period.as_str())
}

fn model_stats_key(period: StatPeriod) -> String {
    format!("analytics:model_stats:{}", period.as_str())
}

fn usage_series_key(period: StatPeriod) -> String {
    format!("analytics:usage:{}", period.as_str())
}

/// Every key the ranking cache may populate. The key space is finite by
/// construction so that group invalidation (and tracker reset) can cover it.
pub fn managed_cache_keys() -> Vec<String> {
    let mut keys = Vec::new();
    for period in StatPeriod::ALL {
        for mode in [LeaderboardMode::Requests, LeaderboardMode::Quota] {
            keys.push(leaderboard_key(mode, period));
        }
        keys.push(model_stats_key(period));
        keys.push(usage_series_key(period));
    }
    keys
}

impl RankingService {
    pub(super) fn new(config: SharedConfig, cache: SharedCache, scale: ScaleService) -> Self {
        Self {
            config,
            cache,
            scale,
        }
    }

    /// Users ranked by the requested metric over the trailing window.
    /// `limit == 0` returns the full set.
    pub fn leaderboard(
        &self,
        mode: LeaderboardMode,
        period: StatPeriod,
        limit: usize,
    ) -> Result<Vec<RankingEntry>> {
        if !self.config.analytics.enabled {
            return Ok(Vec::new());
        }
        let ttl = self.scale.current_settings().leaderboard_ttl_secs;
        let range = trailing_range(period);
        let config = self.config.clone();
        let entries = self.get_or_compute(&leaderboard_key(mode, period), ttl, move || {
            let db = open_db(&config)?;
            let entries = match mode {
                LeaderboardMode::Requests => db.top_users_by_requests(&range)?,
                LeaderboardMode::Quota => db.top_users_by_quota(&range)?,
            };
            Ok(entries)
        })?;
        Ok(truncated(entries, limit))
    }

    /// Per-model stats over the trailing window, filtered by the configured
    /// model whitelist after retrieval.
    pub fn model_stats(&self, period: StatPeriod, limit: usize) -> Result<Vec<ModelStat>> {
        if !self.config.analytics.enabled {
            return Ok(Vec::new());
        }
        let ttl = self.scale.current_settings().stats_ttl_secs;
        let range = trailing_range(period);
        let config = self.config.clone();
        let stats = self.get_or_compute(&model_stats_key(period), ttl, move || {
            let db = open_db(&config)?;
            Ok(db.model_stats(&range)?)
        })?;
        let stats = stats
            .into_iter()
            .filter(|stat| self.config.analytics.admits_model(&stat.model))
            .collect();
        Ok(truncated(stats, limit))
    }

    /// Completed requests bucketed by day over the trailing window.
    pub fn usage_series(&self, period: StatPeriod) -> Result<Vec<UsagePoint>> {
        if !self.config.analytics.enabled {
            return Ok(Vec::new());
        }
        let ttl = self.scale.current_settings().stats_ttl_secs;
        let range = trailing_range(period);
        let config = self.config.clone();
        self.get_or_compute(&usage_series_key(period), ttl, move || {
            let db = open_db(&config)?;
            Ok(db.usage_by_day(&range)?)
        })
    }

    pub fn invalidate(&self, key: &str) -> Result<()> {
        self.cache.delete(key)?;
        Ok(())
    }

    /// Removes several entries; order-independent and idempotent, absent
    /// keys are a no-op.
    pub fn invalidate_group(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.cache.delete(key)?;
        }
        Ok(())
    }

    pub fn invalidate_all(&self) -> Result<()> {
        self.invalidate_group(&managed_cache_keys())
    }

    /// Serves a live entry if one exists; otherwise runs `compute`, stores
    /// the result under `key` for `ttl_secs`, and returns it. Unreadable or
    /// unparsable entries are treated as misses.
    fn get_or_compute<T>(
        &self,
        key: &str,
        ttl_secs: u64,
        compute: impl FnOnce() -> Result<Vec<T>>,
    ) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.cache.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(payload) => return Ok(payload),
                Err(err) => {
                    log::warn!("discarding unparsable cache entry under {key}: {err}");
                }
            },
            Ok(None) => {}
            Err(err) => {
                log::warn!("cache read for {key} failed, recomputing: {err}");
            }
        }
        let payload = compute()?;
        let raw = serde_json::to_string(&payload)?;
        if let Err(err) = self.cache.set(key, &raw, Duration::from_secs(ttl_secs)) {
            log::warn!("cache write for {key} failed: {err}");
        }
        Ok(payload)
    }
}

fn trailing_range(period: StatPeriod) -> TimeRange {
    TimeRange::trailing(Utc::now().timestamp(), period.seconds())
}

fn truncated<T>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    if limit > 0 && rows.len() > limit {
        rows.truncate(limit);
    }
    rows
}
