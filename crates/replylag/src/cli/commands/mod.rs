pub mod ingest;
pub mod report;
pub mod schema;
pub mod trace;
pub mod verify;

use anyhow::Result;

use crate::cli::app::SettingsArgs;
use crate::config::{ReportSettings, resolve_report_settings};

impl SettingsArgs {
    pub fn resolve(&self) -> Result<ReportSettings> {
        resolve_report_settings(self.business_start.as_deref(), self.utc_offset.as_deref())
    }
}
