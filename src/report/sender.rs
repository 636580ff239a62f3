//! Report delivery.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use std::time::Duration;

use super::schema::Report;
use crate::config::Config;

/// Destination for finished reports.
#[async_trait]
pub trait ReportSender: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, report: &Report) -> Result<()>;
}

/// Posts reports as JSON to the collector with bearer auth.
pub struct HttpReportSender {
    endpoint: Url,
    token: String,
    client: Client,
}

impl HttpReportSender {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config.collector_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.network_timeout_secs))
            .connect_timeout(Duration::from_secs(config.network_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self {
            endpoint,
            token: config.token.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSender for HttpReportSender {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, report: &Report) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(report)
            .send()
            .await
            .with_context(|| format!("Failed to reach collector at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Collector rejected report ({status}): {body}");
        }
        tracing::debug!(endpoint = %self.endpoint, "Report sent");
        Ok(())
    }
}

/// Keeps reports in memory. Used by tests and embedding hosts.
#[derive(Default)]
pub struct MemoryReportSender {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReportSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn last(&self) -> Option<Report> {
        self.reports.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

#[async_trait]
impl ReportSender for MemoryReportSender {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, report: &Report) -> Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}

/// Prints reports as pretty JSON instead of sending them (`--dry-run`).
pub struct StdoutReportSender;

#[async_trait]
impl ReportSender for StdoutReportSender {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, report: &Report) -> Result<()> {
        let body = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{body}");
        Ok(())
    }
}
