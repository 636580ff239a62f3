pub mod demos;
pub mod features;
pub mod selector;

pub use selector::{Dice, FixedDice, SequenceDice, ThreadDice};

use std::sync::Arc;

use crate::agent::Handler;

/// A handler known to the registry.
#[derive(Debug, Clone)]
pub struct HandlerInfo {
    /// Canonical name (e.g. `"simple-success"`)
    pub name: &'static str,
    /// Alternative names accepted on the command line
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Needs the trace or event-info plugin to show anything extra
    pub plugin: Option<&'static str>,
}

/// Return the list of all demo handlers for display in `fnpipe handlers`.
pub fn list_handlers() -> Vec<HandlerInfo> {
    vec![
        HandlerInfo {
            name: "simple-success",
            aliases: &["simpleSuccess"],
            description: "Always succeeds with a fixed message",
            plugin: None,
        },
        HandlerInfo {
            name: "simple-failure",
            aliases: &["simpleFailure"],
            description: "Always fails with a fixed message",
            plugin: None,
        },
        HandlerInfo {
            name: "random-success-error",
            aliases: &["randomSuccessError"],
            description: "Fails or succeeds on a coin flip",
            plugin: None,
        },
        HandlerInfo {
            name: "long-running-success",
            aliases: &["longRunningSuccess"],
            description: "Waits 900 to 2001 ms, then succeeds",
            plugin: None,
        },
        HandlerInfo {
            name: "custom-events",
            aliases: &["customEvents"],
            description: "Logs a batch of custom events, then succeeds",
            plugin: None,
        },
        HandlerInfo {
            name: "thrown-failure",
            aliases: &["thrownFailure"],
            description: "Throws a TypeError or an Error depending on a draw",
            plugin: None,
        },
        HandlerInfo {
            name: "success",
            aliases: &[],
            description: "Returns a JSON body",
            plugin: None,
        },
        HandlerInfo {
            name: "caught-error",
            aliases: &["caught_error"],
            description: "Records a caught error on the report, then rethrows it",
            plugin: None,
        },
        HandlerInfo {
            name: "uncaught-error",
            aliases: &["uncaught_error"],
            description: "Throws without touching the agent",
            plugin: None,
        },
        HandlerInfo {
            name: "custom-metrics",
            aliases: &["custom_metrics"],
            description: "Records a numeric and a string metric plus a label",
            plugin: None,
        },
        HandlerInfo {
            name: "timeout",
            aliases: &[],
            description: "Sleeps 2 s; times out when the function timeout is shorter",
            plugin: None,
        },
        HandlerInfo {
            name: "tracing",
            aliases: &[],
            description: "Marks a one second span",
            plugin: Some("trace"),
        },
        HandlerInfo {
            name: "api-gateway",
            aliases: &["api_gateway"],
            description: "Returns a proxy response",
            plugin: Some("event-info"),
        },
    ]
}

fn canonical_name(name: &str) -> Option<&'static str> {
    let name = name.trim();
    list_handlers()
        .into_iter()
        .find(|info| info.name == name || info.aliases.contains(&name))
        .map(|info| info.name)
}

/// Factory: create a demo handler by name. Random handlers draw from `dice`.
pub fn create_handler(name: &str, dice: Arc<dyn Dice>) -> anyhow::Result<Arc<dyn Handler>> {
    let Some(canonical) = canonical_name(name) else {
        anyhow::bail!("Unknown handler: {name}. Run `fnpipe handlers` to list the available ones.");
    };

    let handler: Arc<dyn Handler> = match canonical {
        "simple-success" => Arc::new(demos::SimpleSuccess),
        "simple-failure" => Arc::new(demos::SimpleFailure),
        "random-success-error" => Arc::new(demos::RandomSuccessError::new(dice)),
        "long-running-success" => Arc::new(demos::LongRunningSuccess::new(dice)),
        "custom-events" => Arc::new(demos::CustomEvents::new(dice)),
        "thrown-failure" => Arc::new(demos::ThrownFailure::new(dice)),
        "success" => Arc::new(features::Success),
        "caught-error" => Arc::new(features::CaughtError),
        "uncaught-error" => Arc::new(features::UncaughtError),
        "custom-metrics" => Arc::new(features::CustomMetrics),
        "timeout" => Arc::new(features::Timeout::default()),
        "tracing" => Arc::new(features::Tracing),
        "api-gateway" => Arc::new(features::ApiGateway),
        other => anyhow::bail!("Handler {other} is listed but has no implementation"),
    };
    Ok(handler)
}
