#[allow(clippy::module_inception)]
pub mod agent;
pub mod context;
pub mod metric;
pub mod traits;

pub use context::{InvocationContext, LambdaContext, Marker, Recorded};
pub use agent::{Agent, AgentBuilder, Instrumented};
pub use metric::{CustomMetric, MetricValue, METRIC_NAME_LIMIT};
pub use traits::{ErrorKind, Handler, HandlerError, Outcome, SourceLocation};

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::plugins::create_plugins;
use crate::report::ReportSender;

/// Build an agent with the bundled plugins the config switches on.
pub async fn create_agent(config: Config, sender: Arc<dyn ReportSender>) -> Result<Agent> {
    let plugins = create_plugins(&config);
    Agent::builder(config).plugins(plugins).sender(sender).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReportSender;

    #[tokio::test]
    async fn factory_registers_configured_plugins() {
        let mut config = Config::default();
        config.plugins.trace.enabled = true;
        let agent = create_agent(config, Arc::new(MemoryReportSender::new()))
            .await
            .unwrap();
        assert_eq!(agent.plugins().list_plugins(), vec!["trace"]);
    }

    #[tokio::test]
    async fn factory_rejects_invalid_config() {
        let config = Config {
            timeout_window_secs: -2.0,
            ..Config::default()
        };
        assert!(create_agent(config, Arc::new(MemoryReportSender::new()))
            .await
            .is_err());
    }
}
