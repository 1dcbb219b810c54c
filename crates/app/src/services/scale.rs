use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};

use meter_core::{ScaleMetrics, ScaleSnapshot, ScaleTier, TierSettings};
use meter_db::{Column, Entity, RowFilter};

use crate::error::{AppError, Result};
use crate::services::{SharedConfig, open_db};

const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(3_600);

struct Slot {
    snapshot: ScaleSnapshot,
    captured: Instant,
}

/// Scale detector: samples lightweight metrics, classifies the deployment
/// tier, and caches the result in a single lock-guarded slot for up to an
/// hour. Recomputation is single-flight: callers arriving during a pass
/// block on the write lock and then share the fresh snapshot.
#[derive(Clone)]
pub struct ScaleService {
    config: SharedConfig,
    slot: Arc<RwLock<Option<Slot>>>,
}

impl ScaleService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self {
            config,
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn detect(&self, force_refresh: bool) -> Result<ScaleSnapshot> {
        if !force_refresh {
            let guard = self
                .slot
                .read()
                .map_err(|_| AppError::Message("scale snapshot lock poisoned".to_string()))?;
            if let Some(slot) = guard.as_ref()
                && slot.captured.elapsed() < SNAPSHOT_MAX_AGE
            {
                return Ok(served_from_cache(&slot.snapshot));
            }
        }

        let mut guard = self
            .slot
            .write()
            .map_err(|_| AppError::Message("scale snapshot lock poisoned".to_string()))?;
        // Another caller may have finished a pass while we waited.
        if !force_refresh
            && let Some(slot) = guard.as_ref()
            && slot.captured.elapsed() < SNAPSHOT_MAX_AGE
        {
            return Ok(served_from_cache(&slot.snapshot));
        }

        let metrics = self.sample_metrics()?;
        let tier = match self.config.analytics.target_tier {
            Some(pinned) => pinned,
            None => ScaleTier::classify(&metrics),
        };
        log::info!(
            "scale detection: tier {} ({} users, {} logs/24h, {:.1} rpm)",
            tier.as_str(),
            metrics.total_users,
            metrics.logs_24h,
            metrics.rpm_avg
        );
        let snapshot = ScaleSnapshot {
            tier,
            metrics,
            settings: TierSettings::for_tier(tier),
            captured_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            cached: false,
        };
        *guard = Some(Slot {
            snapshot: snapshot.clone(),
            captured: Instant::now(),
        });
        Ok(snapshot)
    }

    /// Last cached tier without triggering detection. `Medium` before the
    /// first pass, so dependent configuration always has a usable value.
    pub fn current_tier_fast(&self) -> ScaleTier {
        match self.slot.read() {
            Ok(guard) => guard
                .as_ref()
                .map(|slot| slot.snapshot.tier)
                .unwrap_or(ScaleTier::Medium),
            Err(_) => ScaleTier::Medium,
        }
    }

    pub fn current_settings(&self) -> TierSettings {
        TierSettings::for_tier(self.current_tier_fast())
    }

    fn sample_metrics(&self) -> Result<ScaleMetrics> {
        let db = open_db(&self.config)?;
        let now = Utc::now().timestamp();
        let day = RowFilter::billable().created_after(now - 86_400);
        let hour = RowFilter::billable().created_after(now - 3_600);

        let total_users = db.count(Entity::UserAccount, &RowFilter::default())? as u64;
        let active_users_24h = db.distinct_count(Entity::UsageLog, Column::UserId, &day)? as u64;
        let logs_24h = db.count(Entity::UsageLog, &day)? as u64;
        let total_logs = db.count(Entity::UsageLog, &RowFilter::default())? as u64;
        let rpm_avg = db.count(Entity::UsageLog, &hour)? as f64 / 60.0;

        Ok(ScaleMetrics {
            total_users,
            active_users_24h,
            logs_24h,
            total_logs,
            rpm_avg,
        })
    }
}

fn served_from_cache(snapshot: &ScaleSnapshot) -> ScaleSnapshot {
    let mut snapshot = snapshot.clone();
    snapshot.cached = true;
    snapshot
}
