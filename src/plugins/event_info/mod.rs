//! Event info plugin: labels the report with the kind of event that
//! triggered the invocation and records its interesting fields as metrics.

pub mod path;
pub mod types;

pub use types::{detect, slugify, EventType, EVENT_TYPES};

use anyhow::Result;
use async_trait::async_trait;

use super::traits::Plugin;
use crate::agent::context::InvocationContext;
use crate::agent::traits::Outcome;

pub const LABEL_PLUGIN: &str = "@iopipe/plugin-event-info";

pub struct EventInfoPlugin {
    enabled: bool,
}

impl EventInfoPlugin {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for EventInfoPlugin {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Plugin for EventInfoPlugin {
    fn name(&self) -> &str {
        "event-info"
    }

    fn version(&self) -> &str {
        "1.3.0"
    }

    fn homepage(&self) -> &str {
        "https://github.com/iopipe/iopipe-python#event-info-plugin"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn post_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext) -> Result<()> {
        let Some(event_type) = detect(event) else {
            return Ok(());
        };
        let slug = event_type.slug();
        tracing::debug!(event_type = event_type.name, "Detected event type");

        ctx.label(LABEL_PLUGIN);
        ctx.label(format!("@iopipe/aws-{slug}"));
        ctx.event_type(format!("aws-{slug}"));
        for (name, value) in event_type.collect(event) {
            ctx.metric(name, value);
        }
        Ok(())
    }

    async fn post_response(
        &self,
        event: &serde_json::Value,
        ctx: &InvocationContext,
        outcome: &Outcome,
    ) -> Result<()> {
        let Some(event_type) = detect(event) else {
            return Ok(());
        };
        for (name, value) in event_type.collect_response(&outcome.to_payload()) {
            ctx.metric(name, value);
        }
        Ok(())
    }
}
