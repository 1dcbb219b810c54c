use std::path::PathBuf;
use std::sync::Arc;

use meter_cache::CacheStore;
use meter_core::AnalyticsConfig;
use meter_db::Db;

use crate::error::Result;
use crate::services::AppServices;

/// Everything needed to run the analytics engine against a gateway database.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub analytics: AnalyticsConfig,
}

/// Engine state shared by embedding hosts (gateway process, admin tooling).
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db_path: PathBuf, analytics: AnalyticsConfig, cache: Arc<dyn CacheStore>) -> Self {
        let config = AppConfig { db_path, analytics };
        let services = AppServices::new(&config, cache);
        Self { config, services }
    }

    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.config.db_path)
    }

    pub fn open_db(&self) -> Result<Db> {
        Ok(Db::open(&self.config.db_path)?)
    }
}

pub fn setup_db(path: &std::path::Path) -> Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}
