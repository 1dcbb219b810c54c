use serde::Serialize;

use meter_core::{
    ModelStat, RankingEntry, ScaleTier, StatPeriod, SyncStatus, TierSettings, UsagePoint,
};
use meter_db::{Entity, RowFilter};

use crate::error::Result;
use crate::services::consistency::ConsistencyService;
use crate::services::rankings::RankingService;
use crate::services::scale::ScaleService;
use crate::services::{SharedConfig, open_db};

/// Dashboard summary assembled from independent facets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardOverview {
    pub total_users: u64,
    pub active_users_24h: u64,
    pub total_channels: u64,
    pub logs_24h: u64,
    pub rpm_avg: f64,
    pub tier: String,
    pub settings: Option<TierSettings>,
    pub sync: SyncStatus,
    pub top_users: Vec<RankingEntry>,
    pub model_stats: Vec<ModelStat>,
    pub usage_series: Vec<UsagePoint>,
}

/// Assembles the dashboard overview. Each facet is computed independently;
/// a failing facet degrades to its empty value so one broken aggregate never
/// blanks out the rest.
#[derive(Clone)]
pub struct SummaryService {
    config: SharedConfig,
    rankings: RankingService,
    consistency: ConsistencyService,
    scale: ScaleService,
}

impl SummaryService {
    pub(super) fn new(
        config: SharedConfig,
        rankings: RankingService,
        consistency: ConsistencyService,
        scale: ScaleService,
    ) -> Self {
        Self {
            config,
            rankings,
            consistency,
            scale,
        }
    }

    pub fn overview(&self, period: StatPeriod, limit: usize) -> DashboardOverview {
        let mut overview = DashboardOverview::default();

        match self.scale.detect(false) {
            Ok(snapshot) => {
                overview.total_users = snapshot.metrics.total_users;
                overview.active_users_24h = snapshot.metrics.active_users_24h;
                overview.logs_24h = snapshot.metrics.logs_24h;
                overview.rpm_avg = snapshot.metrics.rpm_avg;
                overview.tier = snapshot.tier.as_str().to_string();
                overview.settings = Some(snapshot.settings);
            }
            Err(err) => {
                log::warn!("scale facet unavailable: {err}");
                overview.tier = ScaleTier::Medium.as_str().to_string();
            }
        }

        overview.total_channels = facet("channel count", self.channel_count());
        overview.sync = facet(
            "sync status",
            self.consistency.check(false).map(|report| report.details),
        );

        let mode = self.config.analytics.leaderboard_mode;
        overview.top_users = facet("leaderboard", self.rankings.leaderboard(mode, period, limit));
        overview.model_stats = facet("model stats", self.rankings.model_stats(period, limit));
        overview.usage_series = facet("usage series", self.rankings.usage_series(period));
        overview
    }

    fn channel_count(&self) -> Result<u64> {
        let db = open_db(&self.config)?;
        Ok(db.count(Entity::Channel, &RowFilter::default())? as u64)
    }
}

fn facet<T: Default>(name: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            log::warn!("{name} facet unavailable, serving empty value: {err}");
            T::default()
        }
    }
}
