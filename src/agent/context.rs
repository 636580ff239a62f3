use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use super::metric::{CustomMetric, MetricValue, METRIC_NAME_LIMIT, RESERVED_PREFIX};
use super::traits::HandlerError;
use crate::plugins::trace::timeline::{PerformanceEntry, Timeline};
use crate::report::ErrorDetails;

/// Label added to reports that carry user-defined metrics.
pub const LABEL_METRICS: &str = "@iopipe/metrics";
/// Label added to reports of failed invocations.
pub const LABEL_ERROR: &str = "@iopipe/error";

/// What the platform knows about the current invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaContext {
    pub aws_request_id: String,
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_in_mb: u32,
    pub invoked_function_arn: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    /// Invocation deadline, epoch milliseconds.
    pub deadline_ms: i64,
}

impl LambdaContext {
    /// A context for running a handler outside the platform.
    pub fn local(function_name: &str, timeout: Duration) -> Self {
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let now = chrono::Utc::now();
        Self {
            aws_request_id: uuid::Uuid::new_v4().to_string(),
            function_name: function_name.to_string(),
            function_version: "$LATEST".into(),
            memory_limit_in_mb: 128,
            invoked_function_arn: format!("arn:aws:lambda:local:0:function:{function_name}"),
            log_group_name: format!("/aws/lambda/{function_name}"),
            log_stream_name: format!(
                "{}/[$LATEST]{}",
                now.format("%Y/%m/%d"),
                uuid::Uuid::new_v4().simple()
            ),
            deadline_ms: now.timestamp_millis().saturating_add(timeout_ms),
        }
    }

    pub fn remaining_time_in_millis(&self) -> i64 {
        (self.deadline_ms - chrono::Utc::now().timestamp_millis()).max(0)
    }

    /// Reporting needs at least a request id and a function name.
    pub fn is_valid(&self) -> bool {
        !self.aws_request_id.trim().is_empty() && !self.function_name.trim().is_empty()
    }
}

#[cfg(feature = "lambda")]
impl From<&lambda_runtime::Context> for LambdaContext {
    fn from(ctx: &lambda_runtime::Context) -> Self {
        Self {
            aws_request_id: ctx.request_id.clone(),
            function_name: ctx.env_config.function_name.clone(),
            function_version: ctx.env_config.version.clone(),
            memory_limit_in_mb: u32::try_from(ctx.env_config.memory).unwrap_or(0),
            invoked_function_arn: ctx.invoked_function_arn.clone(),
            log_group_name: ctx.env_config.log_group.clone(),
            log_stream_name: ctx.env_config.log_stream.clone(),
            deadline_ms: i64::try_from(ctx.deadline).unwrap_or(i64::MAX),
        }
    }
}

/// Data a handler and the plugins add to the report during one invocation.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub custom_metrics: Vec<CustomMetric>,
    pub labels: BTreeSet<String>,
    pub error: Option<ErrorDetails>,
    pub event_type: Option<String>,
}

/// Per-invocation handle passed to handlers and plugin hooks.
///
/// Holds the platform context plus everything recorded for the report. When
/// the agent is not reporting (disabled, no token, invalid context) the
/// recording calls are no-ops.
pub struct InvocationContext {
    lambda: LambdaContext,
    recorder: Option<Mutex<Recorded>>,
    timeline: OnceLock<Mutex<Timeline>>,
}

impl InvocationContext {
    pub(crate) fn reporting(lambda: LambdaContext) -> Self {
        Self {
            lambda,
            recorder: Some(Mutex::new(Recorded::default())),
            timeline: OnceLock::new(),
        }
    }

    /// A context that records nothing.
    pub fn unreported(lambda: LambdaContext) -> Self {
        Self {
            lambda,
            recorder: None,
            timeline: OnceLock::new(),
        }
    }

    pub fn lambda(&self) -> &LambdaContext {
        &self.lambda
    }

    pub fn is_reporting(&self) -> bool {
        self.recorder.is_some()
    }

    fn record(&self, what: &str, f: impl FnOnce(&mut Recorded)) {
        match &self.recorder {
            Some(recorder) => f(&mut recorder.lock()),
            None => tracing::warn!("Reporting is off, dropping {what}"),
        }
    }

    /// Record a custom metric. Alias of [`metric`](Self::metric).
    pub fn log(&self, key: impl fmt::Display, value: impl Into<MetricValue>) {
        self.metric(key, value);
    }

    /// Record a custom metric.
    ///
    /// Names longer than 128 characters are dropped with a warning. User
    /// metrics also mark the report with the `@iopipe/metrics` label.
    pub fn metric(&self, key: impl fmt::Display, value: impl Into<MetricValue>) {
        let name = key.to_string();
        if name.chars().count() > METRIC_NAME_LIMIT {
            tracing::warn!(
                "Metric name exceeds {METRIC_NAME_LIMIT} characters, dropping: {}…",
                name.chars().take(32).collect::<String>()
            );
            return;
        }
        let value = value.into();
        self.record("metric", |r| {
            if !name.starts_with(RESERVED_PREFIX) {
                r.labels.insert(LABEL_METRICS.to_string());
            }
            r.custom_metrics.push(CustomMetric::new(name, value));
        });
    }

    /// Attach a label to the report.
    pub fn label(&self, name: impl Into<String>) {
        let name = name.into();
        if name.chars().count() > METRIC_NAME_LIMIT {
            tracing::warn!("Label name exceeds {METRIC_NAME_LIMIT} characters, dropping");
            return;
        }
        self.record("label", |r| {
            r.labels.insert(name);
        });
    }

    /// Record an error on the report and hand it back for propagation.
    pub fn error(&self, err: HandlerError) -> HandlerError {
        let details = ErrorDetails::from_error(&err);
        self.record("error", |r| {
            r.error = Some(details);
            r.labels.insert(LABEL_ERROR.to_string());
        });
        err
    }

    /// Set the report's event type (e.g. `aws-api-gateway`).
    pub fn event_type(&self, event_type: impl Into<String>) {
        let event_type = event_type.into();
        self.record("event type", |r| r.event_type = Some(event_type));
    }

    /// Snapshot of what has been recorded so far.
    pub fn recorded(&self) -> Recorded {
        self.recorder
            .as_ref()
            .map(|r| r.lock().clone())
            .unwrap_or_default()
    }

    pub(crate) fn take_recorded(&self) -> Recorded {
        self.recorder
            .as_ref()
            .map(|r| std::mem::take(&mut *r.lock()))
            .unwrap_or_default()
    }

    /// Start the performance timeline for this invocation.
    pub fn enable_tracing(&self) {
        self.timeline.get_or_init(|| Mutex::new(Timeline::new()));
    }

    pub fn is_tracing(&self) -> bool {
        self.timeline.get().is_some()
    }

    /// Run `f` against the timeline, if tracing is on.
    pub fn with_timeline<R>(&self, f: impl FnOnce(&mut Timeline) -> R) -> Option<R> {
        self.timeline.get().map(|t| f(&mut t.lock()))
    }

    /// Marker for timing sections of the handler.
    pub fn mark(&self) -> Marker<'_> {
        Marker { ctx: self }
    }
}

/// `context.mark` equivalent: start/end pairs become measures.
pub struct Marker<'a> {
    ctx: &'a InvocationContext,
}

impl Marker<'_> {
    pub fn start(&self, name: &str) {
        self.ctx.with_timeline(|t| t.mark(format!("start:{name}")));
    }

    pub fn end(&self, name: &str) {
        self.ctx.with_timeline(|t| t.mark(format!("end:{name}")));
    }

    /// Measure from `start(start)` to `end(end)`, both named as passed to
    /// [`start`](Self::start) and [`end`](Self::end). Missing marks fall back
    /// to the timeline origin and the current time.
    pub fn measure(&self, name: &str, start: &str, end: Option<&str>) -> Option<PerformanceEntry> {
        let start = format!("start:{start}");
        let end = end.map(|end| format!("end:{end}"));
        self.ctx.with_timeline(|t| {
            t.measure(format!("measure:{name}"), &start, end.as_deref())
        })
    }
}
