use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::agent::context::{LambdaContext, Recorded, LABEL_ERROR};
use crate::agent::metric::CustomMetric;
use crate::agent::traits::HandlerError;
use crate::plugins::trace::timeline::PerformanceEntry;
use crate::system::{Cpu, DiskUsage, PidStat, PidStatus, SystemProbe};

pub const LABEL_COLDSTART: &str = "@iopipe/coldstart";
pub const LABEL_TIMEOUT: &str = "@iopipe/timeout";
/// Version of the compiler that built this binary.
pub const RUSTC_VERSION: &str = env!("FNPIPE_RUSTC_VERSION");

/// Error attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
    pub stack: String,
}

impl ErrorDetails {
    pub fn from_error(err: &HandlerError) -> Self {
        Self {
            name: err.name().to_string(),
            message: err.to_string(),
            stack: err.stack(),
        }
    }

    /// A handler that finished through `fail(message)`.
    pub fn failure(message: &str) -> Self {
        Self {
            name: "Error".into(),
            message: message.to_string(),
            stack: String::new(),
        }
    }
}

/// Plugin metadata listed in every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    pub version: String,
    pub homepage: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentInfo {
    pub load_time: i64,
    pub runtime: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RuntimeInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HostInfo {
    pub boot_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessInfo {
    pub stat: PidStat,
    pub stat_start: PidStat,
    pub status: PidStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PidInfo {
    #[serde(rename = "self")]
    pub current: ProcessInfo,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinuxInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<PidInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OsInfo {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cpus: Vec<Cpu>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freemem: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totalmem: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usedmem: Option<u64>,
    pub linux: LinuxInfo,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Environment {
    pub agent: AgentInfo,
    pub runtime: RuntimeInfo,
    pub host: HostInfo,
    pub os: OsInfo,
}

/// Platform context as reported under `aws`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsData {
    pub function_name: String,
    pub function_version: String,
    #[serde(rename = "memoryLimitInMB")]
    pub memory_limit_in_mb: u32,
    pub invoked_function_arn: String,
    pub aws_request_id: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub get_remaining_time_in_millis: i64,
    pub trace_id: String,
}

impl AwsData {
    /// Build from the invocation context. Under SAM local the ARN is
    /// rewritten to a local one.
    pub fn from_context(lambda: &LambdaContext, sam_local: bool, trace_id: String) -> Self {
        let invoked_function_arn = if sam_local {
            format!("arn:aws:lambda:local:0:function:{}", lambda.function_name)
        } else {
            lambda.invoked_function_arn.clone()
        };
        Self {
            function_name: lambda.function_name.clone(),
            function_version: lambda.function_version.clone(),
            memory_limit_in_mb: lambda.memory_limit_in_mb,
            invoked_function_arn,
            aws_request_id: lambda.aws_request_id.clone(),
            log_group_name: lambda.log_group_name.clone(),
            log_stream_name: lambda.log_stream_name.clone(),
            get_remaining_time_in_millis: lambda.remaining_time_in_millis(),
            trace_id,
        }
    }

    /// Same as [`from_context`](Self::from_context), reading `AWS_SAM_LOCAL`
    /// and `_X_AMZN_TRACE_ID` from the environment.
    pub fn from_env(lambda: &LambdaContext) -> Self {
        Self::from_context(
            lambda,
            std::env::var_os("AWS_SAM_LOCAL").is_some(),
            std::env::var("_X_AMZN_TRACE_ID").unwrap_or_default(),
        )
    }
}

/// Fixed inputs for a new report.
#[derive(Debug, Clone)]
pub struct ReportSeed {
    pub client_id: String,
    pub install_method: String,
    pub coldstart: bool,
    pub load_time_ms: i64,
    pub process_id: String,
    pub plugins: Vec<PluginMeta>,
    pub stat_start: PidStat,
}

/// The record sent to the collector once per invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub client_id: String,
    pub coldstart: bool,
    pub custom_metrics: Vec<CustomMetric>,
    pub environment: Environment,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Option<ErrorDetails>,
    #[serde(rename = "httpTraceEntries")]
    pub http_trace_entries: Vec<serde_json::Value>,
    #[serde(rename = "installMethod")]
    pub install_method: String,
    #[serde(rename = "performanceEntries")]
    pub performance_entries: Vec<PerformanceEntry>,
    pub plugins: Vec<PluginMeta>,
    #[serde(rename = "processId")]
    pub process_id: String,
    pub timestamp: i64,
    #[serde(rename = "timestampEnd", skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsData>,
    pub labels: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskUsage>,
    /// Wall time of the invocation, in nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(rename = "eventType", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

// The collector expects `{}` rather than `null` when nothing failed.
fn serialize_errors<S: Serializer>(
    errors: &Option<ErrorDetails>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match errors {
        Some(details) => details.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

impl Report {
    pub fn new(seed: ReportSeed) -> Self {
        let mut labels = BTreeSet::new();
        if seed.coldstart {
            labels.insert(LABEL_COLDSTART.to_string());
        }
        Self {
            client_id: seed.client_id,
            coldstart: seed.coldstart,
            custom_metrics: Vec::new(),
            environment: Environment {
                agent: AgentInfo {
                    load_time: seed.load_time_ms,
                    runtime: "rust".into(),
                    version: env!("CARGO_PKG_VERSION").into(),
                },
                runtime: RuntimeInfo {
                    name: "rust".into(),
                    version: RUSTC_VERSION.into(),
                },
                host: HostInfo::default(),
                os: OsInfo {
                    linux: LinuxInfo {
                        pid: Some(PidInfo {
                            current: ProcessInfo {
                                stat_start: seed.stat_start,
                                ..ProcessInfo::default()
                            },
                        }),
                    },
                    ..OsInfo::default()
                },
            },
            errors: None,
            http_trace_entries: Vec::new(),
            install_method: seed.install_method,
            performance_entries: Vec::new(),
            plugins: seed.plugins,
            process_id: seed.process_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            timestamp_end: None,
            aws: None,
            labels,
            disk: None,
            duration: None,
            event_type: None,
        }
    }

    /// Attach an error. Timeouts are labelled `@iopipe/timeout`, everything
    /// else `@iopipe/error`.
    pub fn retain_error(&mut self, details: ErrorDetails, timed_out: bool) {
        self.labels.insert(
            if timed_out { LABEL_TIMEOUT } else { LABEL_ERROR }.to_string(),
        );
        self.errors = Some(details);
    }

    /// Merge what was recorded during the invocation.
    pub fn absorb(&mut self, recorded: Recorded) {
        self.custom_metrics.extend(recorded.custom_metrics);
        self.labels.extend(recorded.labels);
        if let Some(error) = recorded.error {
            self.errors = Some(error);
        }
        if recorded.event_type.is_some() {
            self.event_type = recorded.event_type;
        }
    }

    /// Fill in host, process and platform data at the end of an invocation.
    pub fn prepare(&mut self, system: &dyn SystemProbe, aws: AwsData, elapsed: Duration) {
        self.environment.host.boot_id = system.boot_id();

        let meminfo = system.meminfo();
        let os = &mut self.environment.os;
        os.cpus = system.cpus();
        os.freemem = Some(meminfo.free);
        os.hostname = Some(system.hostname());
        os.totalmem = Some(meminfo.total);
        os.usedmem = Some(meminfo.total.saturating_sub(meminfo.free));

        let stat_start = os
            .linux
            .pid
            .as_ref()
            .map(|p| p.current.stat_start)
            .unwrap_or_default();
        os.linux.pid = Some(PidInfo {
            current: ProcessInfo {
                stat: system.pid_stat(),
                stat_start,
                status: system.pid_status(),
            },
        });

        self.aws = Some(aws);
        self.timestamp_end = Some(chrono::Utc::now().timestamp_millis());
        self.disk = Some(system.disk());
        self.duration = Some(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn metric(&self, name: &str) -> Option<&CustomMetric> {
        self.custom_metrics.iter().find(|m| m.name == name)
    }
}
