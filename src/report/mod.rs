//! Invocation reports and their delivery to the collector.

pub mod schema;
pub mod sender;

pub use schema::{
    AwsData, Environment, ErrorDetails, PluginMeta, Report, ReportSeed, LABEL_COLDSTART,
    LABEL_TIMEOUT,
};
pub use sender::{HttpReportSender, MemoryReportSender, ReportSender, StdoutReportSender};

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;

/// Build the sender for a config. `dry_run` prints reports instead of
/// posting them.
pub fn create_report_sender(config: &Config, dry_run: bool) -> Result<Arc<dyn ReportSender>> {
    if dry_run {
        return Ok(Arc::new(StdoutReportSender));
    }
    Ok(Arc::new(HttpReportSender::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_picks_sender() {
        let config = Config::default();
        assert_eq!(create_report_sender(&config, true).unwrap().name(), "stdout");
        assert_eq!(create_report_sender(&config, false).unwrap().name(), "http");
    }
}
