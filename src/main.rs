#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::assigning_clones,
    clippy::bool_to_int_with_if,
    clippy::case_sensitive_file_extension_comparisons,
    clippy::cast_possible_wrap,
    clippy::doc_markdown,
    clippy::field_reassign_with_default,
    clippy::float_cmp,
    clippy::implicit_clone,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unused_self,
    clippy::cast_precision_loss,
    clippy::unnecessary_cast,
    clippy::unnecessary_lazy_evaluations,
    clippy::unnecessary_literal_bound,
    clippy::unnecessary_map_or,
    clippy::unnecessary_wraps,
    dead_code
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use fnpipe::handlers::ThreadDice;
use fnpipe::{
    create_agent, create_handler, create_report_sender, list_handlers, Config, Instrumented,
    LambdaContext, Outcome,
};

/// `fnpipe` - demo serverless handlers, instrumented on every invocation.
#[derive(Parser, Debug)]
#[command(name = "fnpipe")]
#[command(version)]
#[command(about = "Run instrumented serverless demo handlers.", long_about = None)]
struct Cli {
    /// Config file (default: $FNPIPE_CONFIG, then ~/.fnpipe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the demo handlers
    Handlers,

    /// Invoke a handler locally through the agent
    #[command(long_about = "\
Invoke a handler locally through the agent.

Each invocation gets a fresh local context whose deadline is --timeout-ms \
from now. The report is posted to the collector unless --dry-run is given, \
in which case it is printed to stdout.

Examples:
  fnpipe invoke simple-success --dry-run
  fnpipe invoke random-success-error --times 20
  fnpipe invoke api-gateway --event '{\"httpMethod\":\"GET\",\"path\":\"/\",\"headers\":{},\"requestContext\":{\"stage\":\"dev\"},\"resource\":\"/\"}'")]
    Invoke {
        /// Handler name or alias (see `fnpipe handlers`)
        handler: String,

        /// Event payload as JSON
        #[arg(long, default_value = "{}")]
        event: String,

        /// Number of invocations
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        times: u32,

        /// Function timeout in milliseconds
        #[arg(long, default_value = "3000")]
        timeout_ms: u64,

        /// Function name reported in the context (default: handler name)
        #[arg(long)]
        function_name: Option<String>,

        /// Print reports instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective configuration (token redacted)
    Config,

    /// Serve a handler through the Lambda runtime API
    #[cfg(feature = "lambda")]
    Lambda {
        /// Handler name or alias
        handler: String,
    },
}

#[derive(Debug, Default)]
struct Summary {
    success: u32,
    failure: u32,
    error: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Listing handlers must not depend on a readable config
    if let Commands::Handlers = cli.command {
        print_handlers();
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref()).await?;

    // Initialize logging - respects RUST_LOG, defaults to INFO (DEBUG in debug mode)
    let default_level = if config.debug { "debug" } else { "info" };
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match cli.command {
        Commands::Handlers => Ok(()),

        Commands::Config => {
            print!("{}", config.redacted().to_toml()?);
            Ok(())
        }

        Commands::Invoke {
            handler,
            event,
            times,
            timeout_ms,
            function_name,
            dry_run,
        } => {
            let event: Value =
                serde_json::from_str(&event).context("--event must be valid JSON")?;
            let instrumented = instrument(config, &handler, dry_run).await?;
            let function_name = function_name.unwrap_or_else(|| instrumented.name().to_string());
            let timeout = Duration::from_millis(timeout_ms);

            let mut summary = Summary::default();
            for n in 1..=times {
                let lambda = LambdaContext::local(&function_name, timeout);
                match instrumented.call(event.clone(), lambda).await {
                    Ok(Outcome::Failure(message)) => {
                        summary.failure += 1;
                        println!("#{n} failure: {message}");
                    }
                    Ok(outcome) => {
                        summary.success += 1;
                        println!("#{n} success: {}", render(&outcome));
                    }
                    Err(err) => {
                        summary.error += 1;
                        println!("#{n} {}: {err}", err.name());
                    }
                }
            }

            println!();
            println!(
                "{} invocation(s): {} succeeded, {} failed, {} errored",
                times, summary.success, summary.failure, summary.error
            );
            Ok(())
        }

        #[cfg(feature = "lambda")]
        Commands::Lambda { handler } => {
            let instrumented = instrument(config, &handler, false).await?;
            tracing::info!(handler = instrumented.name(), "Serving through the Lambda runtime");
            serve_lambda(instrumented).await
        }
    }
}

fn print_handlers() {
    println!("Demo handlers:\n");
    for info in list_handlers() {
        let aliases = if info.aliases.is_empty() {
            String::new()
        } else {
            format!(" (alias: {})", info.aliases.join(", "))
        };
        let plugin = info
            .plugin
            .map(|p| format!(" [{p} plugin]"))
            .unwrap_or_default();
        println!("  {:<22} {}{aliases}{plugin}", info.name, info.description);
    }
}

async fn instrument(mut config: Config, handler: &str, dry_run: bool) -> Result<Instrumented> {
    if dry_run && config.token.is_empty() {
        config.token = "dry-run".into();
    }

    let handler = create_handler(handler, Arc::new(ThreadDice))?;
    let sender = create_report_sender(&config, dry_run)?;
    let agent = create_agent(config, sender).await?;
    Ok(Arc::new(agent).instrument(handler))
}

fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success(message) | Outcome::Failure(message) => message.clone(),
        Outcome::Response(value) => value.to_string(),
    }
}

#[cfg(feature = "lambda")]
async fn serve_lambda(instrumented: Instrumented) -> Result<()> {
    use lambda_runtime::{service_fn, Error, LambdaEvent};

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let instrumented = instrumented.clone();
        async move {
            let lambda = LambdaContext::from(&event.context);
            match instrumented.call(event.payload, lambda).await {
                Ok(Outcome::Failure(message)) => Err(Error::from(message)),
                Ok(outcome) => Ok(outcome.to_payload()),
                Err(err) => Err(Error::from(err)),
            }
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime stopped: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn invoke_defaults() {
        let cli = Cli::try_parse_from(["fnpipe", "invoke", "simple-success"]).unwrap();
        match cli.command {
            Commands::Invoke {
                handler,
                event,
                times,
                timeout_ms,
                function_name,
                dry_run,
            } => {
                assert_eq!(handler, "simple-success");
                assert_eq!(event, "{}");
                assert_eq!(times, 1);
                assert_eq!(timeout_ms, 3000);
                assert!(function_name.is_none());
                assert!(!dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn invoke_rejects_zero_times() {
        assert!(Cli::try_parse_from(["fnpipe", "invoke", "simple-success", "--times", "0"]).is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["fnpipe", "handlers", "--config", "/tmp/x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn render_prefers_plain_messages() {
        assert_eq!(render(&Outcome::success("done")), "done");
        assert_eq!(
            render(&Outcome::Response(serde_json::json!({"statusCode": 200}))),
            "{\"statusCode\":200}"
        );
    }
}
