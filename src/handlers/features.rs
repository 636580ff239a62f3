//! Handlers that exercise individual agent features: errors, metrics,
//! timeouts, tracing and event info.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::agent::{Handler, HandlerError, InvocationContext, Outcome};

pub struct Success;

#[async_trait]
impl Handler for Success {
    fn name(&self) -> &str {
        "success"
    }

    fn description(&self) -> &str {
        "Returns a JSON body"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Response(json!({"message": "Invocation successful"})))
    }
}

pub struct CaughtError;

#[async_trait]
impl Handler for CaughtError {
    fn name(&self) -> &str {
        "caught-error"
    }

    fn description(&self) -> &str {
        "Records a caught error on the report, then rethrows it"
    }

    async fn handle(&self, _event: Value, ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        let caught = HandlerError::generic("Caught exception");
        Err(ctx.error(caught))
    }
}

pub struct UncaughtError;

#[async_trait]
impl Handler for UncaughtError {
    fn name(&self) -> &str {
        "uncaught-error"
    }

    fn description(&self) -> &str {
        "Throws without touching the agent"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        Err(HandlerError::generic("Invocation uncaught exception"))
    }
}

pub struct CustomMetrics;

#[async_trait]
impl Handler for CustomMetrics {
    fn name(&self) -> &str {
        "custom-metrics"
    }

    fn description(&self) -> &str {
        "Records a numeric and a string metric plus a label"
    }

    async fn handle(&self, _event: Value, ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        #[allow(clippy::cast_precision_loss)]
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        ctx.metric("time", now);
        ctx.metric("a-metric", "value");
        ctx.label("has-metrics");
        Ok(Outcome::Response(Value::Null))
    }
}

/// Sleeps past short function timeouts.
pub struct Timeout {
    sleep: Duration,
}

impl Timeout {
    pub fn new(sleep: Duration) -> Self {
        Self { sleep }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl Handler for Timeout {
    fn name(&self) -> &str {
        "timeout"
    }

    fn description(&self) -> &str {
        "Sleeps 2 s; times out when the function timeout is shorter"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        tokio::time::sleep(self.sleep).await;
        Ok(Outcome::Response(json!({"message": "Invocation success"})))
    }
}

pub struct Tracing;

#[async_trait]
impl Handler for Tracing {
    fn name(&self) -> &str {
        "tracing"
    }

    fn description(&self) -> &str {
        "Marks a one second span (needs the trace plugin)"
    }

    async fn handle(&self, _event: Value, ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        let mark = ctx.mark();
        mark.start("foobar");
        tokio::time::sleep(Duration::from_secs(1)).await;
        mark.end("foobar");
        Ok(Outcome::Response(Value::Null))
    }
}

pub struct ApiGateway;

#[async_trait]
impl Handler for ApiGateway {
    fn name(&self) -> &str {
        "api-gateway"
    }

    fn description(&self) -> &str {
        "Returns a proxy response (pairs with the event-info plugin)"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Response(json!({
            "statusCode": 200,
            "body": json!({"success": true}).to_string(),
        })))
    }
}
