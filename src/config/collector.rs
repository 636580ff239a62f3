//! Collector endpoint resolution.

use anyhow::{Context, Result};
use reqwest::Url;

/// Regions with a dedicated collector host. Every other region reports to the
/// default (us-east-1) host.
pub const SUPPORTED_REGIONS: &[&str] = &[
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

pub const DEFAULT_COLLECTOR_PATH: &str = "/v0/event";

const EVENT_SEGMENT: &str = "v0/event";

/// Collector hostname for a region. Unsupported or missing regions fall back
/// to `metrics-api.iopipe.com`.
pub fn collector_hostname(region: Option<&str>) -> String {
    match region.map(str::trim) {
        Some(region) if SUPPORTED_REGIONS.contains(&region) => {
            format!("metrics-api.{region}.iopipe.com")
        }
        _ => "metrics-api.iopipe.com".to_string(),
    }
}

/// Event path below a custom base URL: the base path joined with `v0/event`,
/// always absolute, with the base query string carried over.
pub fn collector_path(base: &Url) -> String {
    let base_path = base.path();
    let mut path = if base_path.is_empty() || base_path == "/" {
        EVENT_SEGMENT.to_string()
    } else if base_path.ends_with('/') {
        format!("{base_path}{EVENT_SEGMENT}")
    } else {
        format!("{base_path}/{EVENT_SEGMENT}")
    };
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if let Some(query) = base.query().filter(|q| !q.is_empty()) {
        path.push('?');
        path.push_str(query);
    }
    path
}

/// Full collector endpoint for the given optional base URL and region.
///
/// Without a base URL reports go over https to the regional host. A custom
/// base URL keeps its scheme, host and port so a local collector can be used.
pub fn collector_endpoint(url: Option<&str>, region: Option<&str>) -> Result<Url> {
    let Some(raw) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        let host = collector_hostname(region);
        return Url::parse(&format!("https://{host}{DEFAULT_COLLECTOR_PATH}"))
            .context("Failed to build default collector URL");
    };

    let base = Url::parse(raw).with_context(|| format!("Invalid collector url: {raw}"))?;
    let host = base
        .host_str()
        .with_context(|| format!("Collector url has no host: {raw}"))?;
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let endpoint = format!("{}://{authority}{}", base.scheme(), collector_path(&base));
    Url::parse(&endpoint).with_context(|| format!("Invalid collector endpoint: {endpoint}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_defaults_without_region() {
        assert_eq!(collector_hostname(None), "metrics-api.iopipe.com");
    }

    #[test]
    fn hostname_uses_supported_region() {
        assert_eq!(
            collector_hostname(Some("eu-west-1")),
            "metrics-api.eu-west-1.iopipe.com"
        );
    }

    #[test]
    fn hostname_ignores_unsupported_region() {
        assert_eq!(collector_hostname(Some("us-east-1")), "metrics-api.iopipe.com");
        assert_eq!(collector_hostname(Some("mars-north-1")), "metrics-api.iopipe.com");
    }

    #[test]
    fn path_joins_base_path() {
        let url = Url::parse("https://collector.example.com/foo").unwrap();
        assert_eq!(collector_path(&url), "/foo/v0/event");

        let url = Url::parse("https://collector.example.com/foo/").unwrap();
        assert_eq!(collector_path(&url), "/foo/v0/event");
    }

    #[test]
    fn path_keeps_query() {
        let url = Url::parse("https://collector.example.com/?token=abc").unwrap();
        assert_eq!(collector_path(&url), "/v0/event?token=abc");
    }

    #[test]
    fn endpoint_defaults_to_https_regional_host() {
        let url = collector_endpoint(None, Some("us-west-2")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://metrics-api.us-west-2.iopipe.com/v0/event"
        );
    }

    #[test]
    fn endpoint_keeps_custom_scheme_and_port() {
        let url = collector_endpoint(Some("http://127.0.0.1:9000/base"), None).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/base/v0/event");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(collector_endpoint(Some("not a url"), None).is_err());
    }

    #[test]
    fn blank_url_falls_back_to_default() {
        let url = collector_endpoint(Some("   "), None).unwrap();
        assert_eq!(url.host_str(), Some("metrics-api.iopipe.com"));
    }
}
