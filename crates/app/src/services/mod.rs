mod consistency;
mod progress;
mod rankings;
mod scale;
mod summary;

use std::sync::Arc;

use meter_cache::CacheStore;
use meter_db::Db;

use crate::app::AppConfig;
use crate::error::Result;

pub use consistency::{ConsistencyReport, ConsistencyService};
pub use progress::ProgressService;
pub use rankings::{RankingService, managed_cache_keys};
pub use scale::ScaleService;
pub use summary::{DashboardOverview, SummaryService};

type SharedConfig = Arc<AppConfig>;
type SharedCache = Arc<dyn CacheStore>;

/// Service registry for the analytics engine.
#[derive(Clone)]
pub struct AppServices {
    pub rankings: RankingService,
    pub progress: ProgressService,
    pub consistency: ConsistencyService,
    pub scale: ScaleService,
    pub summary: SummaryService,
}

impl AppServices {
    pub fn new(config: &AppConfig, cache: SharedCache) -> Self {
        let shared = Arc::new(config.clone());
        let scale = ScaleService::new(shared.clone());
        let rankings = RankingService::new(shared.clone(), cache.clone(), scale.clone());
        let progress = ProgressService::new(shared.clone(), cache.clone());
        let consistency = ConsistencyService::new(shared.clone(), progress.clone());
        let summary = SummaryService::new(
            shared,
            rankings.clone(),
            consistency.clone(),
            scale.clone(),
        );
        Self {
            rankings,
            progress,
            consistency,
            scale,
            summary,
        }
    }
}

fn open_db(config: &SharedConfig) -> Result<Db> {
    Ok(Db::open(&config.db_path)?)
}
