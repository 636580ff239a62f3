use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::collector::collector_endpoint;

/// Maximum execution time of a function on the platform, in seconds.
pub const MAX_EXECUTION_SECS: f64 = 15.0 * 60.0;

// ── Top-level config ──────────────────────────────────────────────

/// Agent configuration, loaded from `config.toml`.
///
/// Resolution order: explicit path → `FNPIPE_CONFIG` env → `~/.fnpipe/config.toml`
/// (when present) → built-in defaults. Environment overrides are applied last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was read from, if any - computed, not serialized
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    /// Project token sent as the bearer credential. Overridden by `FNPIPE_TOKEN`
    /// or `FNPIPE_CLIENTID`. An empty token disables reporting.
    #[serde(default, alias = "client_id")]
    pub token: String,
    /// Custom collector base URL (e.g. "http://127.0.0.1:9000"). Default: regional host.
    #[serde(default)]
    pub url: Option<String>,
    /// Master switch for reporting. Default: `true`.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Verbose agent logging, including the full report body. Default: `false`.
    #[serde(default)]
    pub debug: bool,
    /// HTTP timeout for report delivery, in seconds. Default: `5`.
    #[serde(default = "default_network_timeout_secs")]
    pub network_timeout_secs: u64,
    /// Seconds reserved before the platform deadline to send a timeout report.
    /// `0` disables the invocation timeout. Default: `0.5`.
    #[serde(default = "default_timeout_window_secs")]
    pub timeout_window_secs: f64,
    /// Reported as `installMethod`. Default: `"manual"`.
    #[serde(default = "default_install_method")]
    pub install_method: String,
    /// Send reports inline instead of on a background task. Default: `false`.
    #[serde(default)]
    pub sync_http: bool,
    /// Platform region used to pick the collector host (`AWS_REGION`).
    #[serde(default)]
    pub region: Option<String>,

    /// Bundled plugin configuration (`[plugins]`).
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// Bundled plugin configuration (`[plugins]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub event_info: EventInfoConfig,
}

/// Trace plugin configuration (`[plugins.trace]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Register the trace plugin. Default: `false`.
    #[serde(default)]
    pub enabled: bool,
    /// Turn matching `start:`/`end:` marks into measures automatically. Default: `true`.
    #[serde(default = "default_true")]
    pub auto_measure: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_measure: true,
        }
    }
}

/// Event info plugin configuration (`[plugins.event_info]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInfoConfig {
    /// Register the event info plugin. Default: `false`.
    #[serde(default)]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_network_timeout_secs() -> u64 {
    5
}

fn default_timeout_window_secs() -> f64 {
    0.5
}

fn default_install_method() -> String {
    "manual".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            token: String::new(),
            url: None,
            enabled: true,
            debug: false,
            network_timeout_secs: default_network_timeout_secs(),
            timeout_window_secs: default_timeout_window_secs(),
            install_method: default_install_method(),
            sync_http: false,
            region: None,
            plugins: PluginsConfig::default(),
        }
    }
}

/// Parse a truthy/falsy flag the way `strtobool` does.
pub fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_bool_flag(&raw);
    if parsed.is_none() {
        tracing::warn!(var = name, value = %raw, "Ignoring unrecognized boolean value");
    }
    parsed
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|u| u.home_dir().join(".fnpipe").join("config.toml"))
}

impl Config {
    /// Resolve, read and validate the configuration.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(expand_path(path)),
            None => match env_non_empty("FNPIPE_CONFIG") {
                Some(raw) => Some(expand_path(Path::new(&raw))),
                None => default_config_path().filter(|p| p.exists()),
            },
        };

        let mut config = match &path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(
            path = ?config.config_path,
            enabled = config.enabled,
            reporting = !config.token.is_empty(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Read a TOML config file without applying env overrides.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        if !self.timeout_window_secs.is_finite() || self.timeout_window_secs < 0.0 {
            anyhow::bail!(
                "timeout_window_secs must be a finite number >= 0 (got {})",
                self.timeout_window_secs
            );
        }
        if self.timeout_window_secs >= MAX_EXECUTION_SECS {
            anyhow::bail!("timeout_window_secs must be below {MAX_EXECUTION_SECS}");
        }
        if self.network_timeout_secs == 0 {
            anyhow::bail!("network_timeout_secs must be greater than 0");
        }
        if self.install_method.trim().is_empty() {
            anyhow::bail!("install_method must not be empty");
        }
        collector_endpoint(self.url.as_deref(), self.region.as_deref())?;
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Token: FNPIPE_TOKEN, then the legacy FNPIPE_CLIENTID
        if let Some(token) =
            env_non_empty("FNPIPE_TOKEN").or_else(|| env_non_empty("FNPIPE_CLIENTID"))
        {
            self.token = token;
        }

        if let Some(url) = env_non_empty("FNPIPE_URL") {
            self.url = Some(url);
        }

        if let Some(enabled) = env_flag("FNPIPE_ENABLED") {
            self.enabled = enabled;
        }
        if let Some(debug) = env_flag("FNPIPE_DEBUG") {
            self.debug = debug;
        }
        if let Some(sync_http) = env_flag("FNPIPE_SYNC_HTTP") {
            self.sync_http = sync_http;
        }

        if let Some(raw) = env_non_empty("FNPIPE_TIMEOUT_WINDOW") {
            match raw.parse::<f64>() {
                Ok(window) if window.is_finite() && window >= 0.0 => {
                    self.timeout_window_secs = window;
                }
                _ => tracing::warn!(value = %raw, "Ignoring invalid FNPIPE_TIMEOUT_WINDOW"),
            }
        }

        if let Some(raw) = env_non_empty("FNPIPE_NETWORK_TIMEOUT") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.network_timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring invalid FNPIPE_NETWORK_TIMEOUT"),
            }
        }

        if let Some(method) = env_non_empty("FNPIPE_INSTALL_METHOD") {
            self.install_method = method;
        }

        if let Some(enabled) = env_flag("FNPIPE_TRACE_ENABLED") {
            self.plugins.trace.enabled = enabled;
        }
        if let Some(enabled) = env_flag("FNPIPE_EVENT_INFO_ENABLED") {
            self.plugins.event_info.enabled = enabled;
        }

        if let Some(region) = env_non_empty("AWS_REGION") {
            self.region = Some(region);
        }
    }

    /// A copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.token.is_empty() {
            let visible: String = copy.token.chars().take(4).collect();
            copy.token = format!("{visible}…[REDACTED]");
        }
        copy
    }

    /// Serialize as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// The fully-resolved collector endpoint.
    pub fn collector_url(&self) -> Result<reqwest::Url> {
        collector_endpoint(self.url.as_deref(), self.region.as_deref())
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
