//! Trace plugin: per-invocation performance timeline.

pub mod timeline;

pub use timeline::{PerformanceEntry, Timeline};

use anyhow::Result;
use async_trait::async_trait;

use super::traits::Plugin;
use crate::agent::context::InvocationContext;
use crate::report::Report;

pub struct TracePlugin {
    auto_measure: bool,
}

impl TracePlugin {
    pub fn new(auto_measure: bool) -> Self {
        Self { auto_measure }
    }
}

impl Default for TracePlugin {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Plugin for TracePlugin {
    fn name(&self) -> &str {
        "trace"
    }

    fn version(&self) -> &str {
        "1.1.1"
    }

    fn homepage(&self) -> &str {
        "https://github.com/iopipe/iopipe-python#trace-plugin"
    }

    async fn pre_invoke(&self, _event: &serde_json::Value, ctx: &InvocationContext) -> Result<()> {
        ctx.enable_tracing();
        Ok(())
    }

    async fn pre_report(&self, report: &mut Report, ctx: &InvocationContext) -> Result<()> {
        let auto_measure = self.auto_measure;
        let entries = ctx.with_timeline(|timeline| {
            if auto_measure {
                timeline.add_measures();
            }
            timeline.entries().to_vec()
        });
        if let Some(entries) = entries {
            report.performance_entries.extend(entries);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::context::LambdaContext;
    use crate::report::ReportSeed;
    use crate::system::PidStat;
    use std::time::Duration;

    fn report() -> Report {
        Report::new(ReportSeed {
            client_id: "t".into(),
            install_method: "manual".into(),
            coldstart: false,
            load_time_ms: 0,
            process_id: "p".into(),
            plugins: vec![],
            stat_start: PidStat::default(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn marks_end_up_in_report_with_auto_measure() {
        let plugin = TracePlugin::default();
        let ctx = InvocationContext::reporting(LambdaContext::local("fn", Duration::from_secs(3)));

        plugin.pre_invoke(&serde_json::json!({}), &ctx).await.unwrap();
        ctx.mark().start("foobar");
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.mark().end("foobar");

        let mut report = report();
        plugin.pre_report(&mut report, &ctx).await.unwrap();

        let names: Vec<&str> = report
            .performance_entries
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"start:foobar"));
        assert!(names.contains(&"end:foobar"));
        assert!(names.contains(&"measure:foobar"));
    }

    #[tokio::test]
    async fn without_auto_measure_only_marks_are_reported() {
        let plugin = TracePlugin::new(false);
        let ctx = InvocationContext::reporting(LambdaContext::local("fn", Duration::from_secs(3)));

        plugin.pre_invoke(&serde_json::json!({}), &ctx).await.unwrap();
        ctx.mark().start("a");
        ctx.mark().end("a");

        let mut report = report();
        plugin.pre_report(&mut report, &ctx).await.unwrap();
        assert_eq!(report.performance_entries.len(), 2);
    }
}
