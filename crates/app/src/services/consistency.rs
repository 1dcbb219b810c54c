use serde::Serialize;

use meter_core::SyncStatus;
use meter_db::{Entity, RowFilter};

use crate::error::Result;
use crate::services::progress::ProgressService;
use crate::services::{SharedConfig, open_db};

/// Outcome of one audit of the tracker cursor against the source.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub consistent: bool,
    pub message: String,
    pub details: SyncStatus,
}

/// Compares analytics progress against the source's maximum billable id and
/// classifies the pair. Read-mostly and safe on every request; only the
/// auto-reset branch mutates state, through the tracker's own reset.
#[derive(Clone)]
pub struct ConsistencyService {
    config: SharedConfig,
    progress: ProgressService,
}

impl ConsistencyService {
    pub(super) fn new(config: SharedConfig, progress: ProgressService) -> Self {
        Self { config, progress }
    }

    pub fn check(&self, auto_reset: bool) -> Result<ConsistencyReport> {
        let db = open_db(&self.config)?;
        let source_max_id = db.max_id(Entity::UsageLog, &RowFilter::billable())?;
        let cursor = self.progress.read();
        let details = SyncStatus::from_positions(cursor.last_processed_id, source_max_id);

        if details.is_inverted() {
            let mut message = format!(
                "cursor {} is beyond source maximum {}; the usage log was likely reset externally",
                details.cursor_id, details.source_max_id
            );
            if auto_reset {
                self.progress.reset()?;
                log::info!("inverted analytics cursor detected, auto-reset performed");
                message.push_str(" (auto-reset performed)");
            }
            return Ok(ConsistencyReport {
                consistent: false,
                message,
                details,
            });
        }

        let message = if details.source_max_id == 0 {
            "no billable log rows yet".to_string()
        } else if details.is_synced {
            "analytics are in sync with the usage log".to_string()
        } else {
            format!("{} log rows awaiting summarization", details.remaining)
        };
        Ok(ConsistencyReport {
            consistent: true,
            message,
            details,
        })
    }
}
