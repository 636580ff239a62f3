use anyhow::Result;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::context::{InvocationContext, LambdaContext};
use super::traits::{Handler, HandlerError, Outcome};
use crate::config::{Config, MAX_EXECUTION_SECS};
use crate::plugins::{create_plugin_manager, Plugin, PluginManager};
use crate::report::{
    AwsData, ErrorDetails, HttpReportSender, Report, ReportSeed, ReportSender,
};
use crate::system::{create_system_probe, SystemProbe};

/// The monitoring agent.
///
/// One instance wraps any number of handlers and is shared by reference; it
/// is created by the host and passed to whoever needs it. Coldstart is
/// tracked per agent: the first invocation through an agent is the cold one.
pub struct Agent {
    config: Config,
    plugins: Box<dyn PluginManager>,
    sender: Arc<dyn ReportSender>,
    system: Arc<dyn SystemProbe>,
    coldstart: AtomicBool,
    load_time_ms: i64,
    process_id: String,
}

pub struct AgentBuilder {
    config: Config,
    plugins: Vec<Arc<dyn Plugin>>,
    sender: Option<Arc<dyn ReportSender>>,
    system: Option<Arc<dyn SystemProbe>>,
}

impl AgentBuilder {
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn sender(mut self, sender: Arc<dyn ReportSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn system(mut self, system: Arc<dyn SystemProbe>) -> Self {
        self.system = Some(system);
        self
    }

    /// Run the setup hooks and assemble the agent. `pre:setup` hooks may
    /// still change the config; it is validated afterwards.
    pub async fn build(self) -> Result<Agent> {
        let plugins = create_plugin_manager(self.plugins);
        let mut config = self.config;
        plugins.pre_setup(&mut config).await;
        config.validate()?;

        let sender = match self.sender {
            Some(sender) => sender,
            None => Arc::new(HttpReportSender::new(&config)?),
        };

        let agent = Agent {
            config,
            plugins,
            sender,
            system: self.system.unwrap_or_else(create_system_probe),
            coldstart: AtomicBool::new(true),
            load_time_ms: chrono::Utc::now().timestamp_millis(),
            process_id: uuid::Uuid::new_v4().to_string(),
        };
        agent.plugins.post_setup(&agent.config).await;

        tracing::debug!(
            plugins = ?agent.plugins.list_plugins(),
            sender = agent.sender.name(),
            system = agent.system.name(),
            "Agent ready"
        );
        Ok(agent)
    }
}

impl Agent {
    pub fn builder(config: Config) -> AgentBuilder {
        AgentBuilder {
            config,
            plugins: Vec::new(),
            sender: None,
            system: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plugins(&self) -> &dyn PluginManager {
        self.plugins.as_ref()
    }

    /// Wrap a handler so every call goes through this agent.
    pub fn instrument(self: &Arc<Self>, handler: Arc<dyn Handler>) -> Instrumented {
        Instrumented {
            agent: Arc::clone(self),
            handler,
        }
    }

    /// Why this invocation is not reported, if it isn't.
    fn skip_reason(&self, lambda: &LambdaContext) -> Option<&'static str> {
        if !self.config.enabled {
            Some("agent disabled")
        } else if self.config.token.trim().is_empty() {
            Some("no project token configured, set FNPIPE_TOKEN to enable reporting")
        } else if !lambda.is_valid() {
            Some("invalid invocation context")
        } else {
            None
        }
    }

    /// Time the handler may run before the agent gives up on it: the
    /// remaining time minus the timeout window, clamped to the platform
    /// maximum. `None` when the window is zero or no time is left past it,
    /// in which case the handler runs untimed.
    pub fn timeout_budget(&self, lambda: &LambdaContext) -> Option<Duration> {
        let window = self.config.timeout_window_secs;
        if window <= 0.0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let remaining = lambda.remaining_time_in_millis() as f64 / 1000.0;
        let secs = (remaining - window).clamp(0.0, MAX_EXECUTION_SECS - window);
        if secs <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(secs))
    }

    /// Run one invocation of `handler` and report it.
    ///
    /// The handler's outcome or error is returned unchanged; reporting never
    /// alters it.
    pub async fn invoke(
        &self,
        handler: &dyn Handler,
        event: serde_json::Value,
        lambda: LambdaContext,
    ) -> Result<Outcome, HandlerError> {
        if let Some(reason) = self.skip_reason(&lambda) {
            if self.config.enabled {
                tracing::warn!(handler = handler.name(), "Not reporting: {reason}");
            } else {
                tracing::debug!(handler = handler.name(), "Not reporting: {reason}");
            }
            let ctx = InvocationContext::unreported(lambda);
            return handler.handle(event, &ctx).await;
        }

        let ctx = InvocationContext::reporting(lambda);
        let started = tokio::time::Instant::now();
        let mut report = Report::new(ReportSeed {
            client_id: self.config.token.clone(),
            install_method: self.config.install_method.clone(),
            coldstart: self.coldstart.swap(false, Ordering::SeqCst),
            load_time_ms: self.load_time_ms,
            process_id: self.process_id.clone(),
            plugins: self.plugins.meta(),
            stat_start: self.system.pid_stat(),
        });

        self.plugins.pre_invoke(&event, &ctx).await;

        let run = guarded(handler.handle(event.clone(), &ctx));
        let result = match self.timeout_budget(ctx.lambda()) {
            Some(budget) => match tokio::time::timeout(budget, run).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        handler = handler.name(),
                        budget_ms = budget.as_millis(),
                        "Invocation timed out"
                    );
                    Err(HandlerError::Timeout)
                }
            },
            None => run.await,
        };

        self.plugins.post_invoke(&event, &ctx).await;
        if let Ok(outcome) = &result {
            self.plugins.post_response(&event, &ctx, outcome).await;
        }

        report.absorb(ctx.take_recorded());
        match &result {
            Err(err) => report.retain_error(ErrorDetails::from_error(err), err.is_timeout()),
            Ok(Outcome::Failure(message)) => {
                report.retain_error(ErrorDetails::failure(message), false);
            }
            Ok(_) => {}
        }
        report.prepare(
            self.system.as_ref(),
            AwsData::from_env(ctx.lambda()),
            started.elapsed(),
        );

        self.plugins.pre_report(&mut report, &ctx).await;

        let report = Arc::new(report);
        let pending = self.submit(Arc::clone(&report)).await;
        self.plugins.post_report(&report).await;
        if let Some(task) = pending {
            if let Err(e) = task.await {
                tracing::warn!("Report task failed: {e}");
            }
        }

        result
    }

    /// Hand the report to the sender, inline or on a background task.
    /// Delivery failures are logged and never surface to the handler.
    async fn submit(&self, report: Arc<Report>) -> Option<JoinHandle<()>> {
        if self.config.debug {
            match serde_json::to_string_pretty(report.as_ref()) {
                Ok(body) => tracing::debug!("Sending report:\n{body}"),
                Err(e) => tracing::debug!("Unable to render report: {e}"),
            }
        }

        if self.config.sync_http {
            if let Err(e) = self.sender.send(&report).await {
                tracing::warn!(sender = self.sender.name(), "Failed to send report: {e:#}");
            }
            return None;
        }

        let sender = Arc::clone(&self.sender);
        Some(tokio::spawn(async move {
            if let Err(e) = sender.send(&report).await {
                tracing::warn!(sender = sender.name(), "Failed to send report: {e:#}");
            }
        }))
    }
}

/// Turn a panic inside the handler into a reported error.
async fn guarded(
    run: impl Future<Output = Result<Outcome, HandlerError>>,
) -> Result<Outcome, HandlerError> {
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Handler panicked: {message}");
            Err(HandlerError::Other(anyhow::anyhow!("handler panicked: {message}")))
        }
    }
}

/// A handler wrapped by an agent. Cheap to clone.
#[derive(Clone)]
pub struct Instrumented {
    agent: Arc<Agent>,
    handler: Arc<dyn Handler>,
}

impl Instrumented {
    pub fn name(&self) -> &str {
        self.handler.name()
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub async fn call(
        &self,
        event: serde_json::Value,
        lambda: LambdaContext,
    ) -> Result<Outcome, HandlerError> {
        self.agent.invoke(self.handler.as_ref(), event, lambda).await
    }
}
