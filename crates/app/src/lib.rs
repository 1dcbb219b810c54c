pub mod app;
pub mod error;
pub mod services;

pub use app::{AppConfig, AppState, setup_db};
pub use error::{AppError, Result};
pub use services::{
    AppServices, ConsistencyReport, ConsistencyService, DashboardOverview, ProgressService,
    RankingService, ScaleService, SummaryService, managed_cache_keys,
};
