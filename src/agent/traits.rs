use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::InvocationContext;

/// How a handler finished when it did not throw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum Outcome {
    /// `context.succeed(message)`
    Success(String),
    /// `context.fail(message)`: the invocation is reported as failed.
    Failure(String),
    /// A structured response payload, e.g. an API Gateway proxy response.
    Response(serde_json::Value),
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success(message.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The payload handed back to the platform.
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            Self::Success(message) | Self::Failure(message) => {
                serde_json::Value::String(message.clone())
            }
            Self::Response(value) => value.clone(),
        }
    }
}

/// The two error flavours a handler throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Generic,
    Type,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Generic => "Error",
            Self::Type => "TypeError",
        }
    }
}

/// Where a thrown error claims to originate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Errors a handler throws. They propagate unchanged through the agent.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{message}")]
    Thrown {
        kind: ErrorKind,
        message: String,
        location: Option<SourceLocation>,
    },
    #[error("Timeout Exceeded.")]
    Timeout,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// A plain `Error`.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Thrown {
            kind: ErrorKind::Generic,
            message: message.into(),
            location: None,
        }
    }

    /// A `TypeError`, optionally pointing at a source location.
    pub fn type_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::Thrown {
            kind: ErrorKind::Type,
            message: message.into(),
            location,
        }
    }

    /// Error class name as it appears in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Thrown { kind, .. } => kind.name(),
            Self::Timeout => "TimeoutError",
            Self::Other(_) => "Error",
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Thrown { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Best-effort stack description.
    pub fn stack(&self) -> String {
        match self {
            Self::Thrown {
                location: Some(location),
                ..
            } => format!("{}: {self}\n    at {location}", self.name()),
            Self::Thrown { .. } | Self::Timeout => format!("{}: {self}", self.name()),
            Self::Other(err) => format!("{err:?}"),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// A serverless function body.
///
/// The platform (or the CLI) calls the instrumented wrapper, which builds the
/// [`InvocationContext`] and hands it to `handle`.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Stable handler name, used for lookup and logging.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }

    async fn handle(
        &self,
        event: serde_json::Value,
        ctx: &InvocationContext,
    ) -> Result<Outcome, HandlerError>;
}
