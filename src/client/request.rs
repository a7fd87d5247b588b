//! Outbound request and response types.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

/// Which backend host a request is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Sandbox and template lifecycle.
    ControlPlane,
    /// The agent running inside the given sandbox.
    Agent(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlPlane => f.write_str("control-plane"),
            Self::Agent(id) => write!(f, "agent:{id}"),
        }
    }
}

/// One outbound call, described independently of any base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub target: Target,
    pub method: Method,
    /// Path segments; each is percent-encoded on its own.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Tool-level timeout. The client adds its grace period on top.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Creates a request for `/seg/seg/...` on `target`.
    pub fn new<S: AsRef<str>>(target: Target, method: Method, segments: &[S]) -> Self {
        Self {
            target,
            method,
            segments: segments.iter().map(|s| s.as_ref().to_string()).collect(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a query parameter if `value` is present.
    #[must_use]
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the tool-level timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Path as it appears in logs, before encoding.
    #[must_use]
    pub fn display_path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// A response that completed at the HTTP level.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// 2xx with the parsed body (`null` when empty).
    Success(Value),
    /// Any other status, with the parsed body or the raw text as a string.
    Remote { status: u16, body: Value },
}

impl ApiResponse {
    pub(crate) fn from_parts(status: reqwest::StatusCode, text: &str) -> Self {
        let body = parse_body(text);
        if status.is_success() {
            Self::Success(body)
        } else {
            Self::Remote {
                status: status.as_u16(),
                body,
            }
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
