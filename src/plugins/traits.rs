use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::agent::context::InvocationContext;
use crate::agent::traits::Outcome;
use crate::config::Config;
use crate::report::{PluginMeta, Report};

/// Lifecycle points where plugins are called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    PreSetup,
    PostSetup,
    PreInvoke,
    PostInvoke,
    PostResponse,
    PreReport,
    PostReport,
}

impl HookPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreSetup => "pre:setup",
            Self::PostSetup => "post:setup",
            Self::PreInvoke => "pre:invoke",
            Self::PostInvoke => "post:invoke",
            Self::PostResponse => "post:response",
            Self::PreReport => "pre:report",
            Self::PostReport => "post:report",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension point called at each stage of the agent lifecycle. Every hook
/// has a no-op default so plugins only implement what they need.
///
/// Hook errors are logged by the manager and never fail the invocation.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn homepage(&self) -> &str;

    fn enabled(&self) -> bool {
        true
    }

    fn meta(&self) -> PluginMeta {
        PluginMeta {
            name: self.name().to_string(),
            version: self.version().to_string(),
            homepage: self.homepage().to_string(),
            enabled: self.enabled(),
        }
    }

    async fn pre_setup(&self, config: &mut Config) -> Result<()> {
        let _ = config;
        Ok(())
    }

    async fn post_setup(&self, config: &Config) -> Result<()> {
        let _ = config;
        Ok(())
    }

    async fn pre_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext) -> Result<()> {
        let _ = (event, ctx);
        Ok(())
    }

    async fn post_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext) -> Result<()> {
        let _ = (event, ctx);
        Ok(())
    }

    /// Runs only when the handler returned an outcome.
    async fn post_response(
        &self,
        event: &serde_json::Value,
        ctx: &InvocationContext,
        outcome: &Outcome,
    ) -> Result<()> {
        let _ = (event, ctx, outcome);
        Ok(())
    }

    async fn pre_report(&self, report: &mut Report, ctx: &InvocationContext) -> Result<()> {
        let _ = (report, ctx);
        Ok(())
    }

    async fn post_report(&self, report: &Report) -> Result<()> {
        let _ = report;
        Ok(())
    }
}

/// Holds the registered plugins and runs each hook across the enabled ones.
#[async_trait]
pub trait PluginManager: Send + Sync {
    fn list_plugins(&self) -> Vec<&str>;
    fn meta(&self) -> Vec<PluginMeta>;

    async fn pre_setup(&self, config: &mut Config);
    async fn post_setup(&self, config: &Config);
    async fn pre_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext);
    async fn post_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext);
    async fn post_response(
        &self,
        event: &serde_json::Value,
        ctx: &InvocationContext,
        outcome: &Outcome,
    );
    async fn pre_report(&self, report: &mut Report, ctx: &InvocationContext);
    async fn post_report(&self, report: &Report);
}
