//! Configuration for the sandbox API client.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Default control-plane base URL.
pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.hopx.dev";

/// Default per-sandbox agent URL. `{sandbox_id}` is replaced on every call.
pub const DEFAULT_AGENT_URL_TEMPLATE: &str = "https://{sandbox_id}.hopx.dev";

/// Placeholder substituted into the agent URL template.
pub const SANDBOX_ID_PLACEHOLDER: &str = "{sandbox_id}";

/// Port the in-sandbox agent listens on.
pub const DEFAULT_AGENT_PORT: u16 = 7777;

/// How the caller's credential is presented to the control plane.
///
/// Agent calls always use `Authorization: Bearer`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlPlaneAuth {
    /// `X-API-Key: <token>`
    #[default]
    ApiKey,
    /// `Authorization: Bearer <token>`
    Bearer,
}

/// Configuration for [`super::ApiClient`].
///
/// # Example
///
/// ```
/// use sandbox_mcp_bridge::client::{ApiConfig, ControlPlaneAuth};
/// use std::time::Duration;
///
/// let config = ApiConfig::default()
///     .with_control_plane_url("https://api.example.com")
///     .with_agent_url_template("https://{sandbox_id}.agents.example.com")
///     .with_control_plane_auth(ControlPlaneAuth::Bearer)
///     .with_default_timeout(Duration::from_secs(45));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL for sandbox and template lifecycle calls.
    pub control_plane_url: String,

    /// URL template for in-sandbox agent calls.
    pub agent_url_template: String,

    /// Header used to carry the credential to the control plane.
    pub control_plane_auth: ControlPlaneAuth,

    /// Timeout applied when a tool does not supply one.
    pub default_timeout: Duration,

    /// Extra time allowed on top of a tool's own timeout before the client
    /// gives up, so the backend can report its own timeout first.
    pub timeout_grace: Duration,

    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// Port reported by `get_agent_url`.
    pub agent_port: u16,

    /// `User-Agent` sent on every outbound request.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.to_string(),
            agent_url_template: DEFAULT_AGENT_URL_TEMPLATE.to_string(),
            control_plane_auth: ControlPlaneAuth::default(),
            default_timeout: Duration::from_secs(30),
            timeout_grace: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            agent_port: DEFAULT_AGENT_PORT,
            user_agent: concat!("sandbox-mcp-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the control-plane base URL.
    #[must_use]
    pub fn with_control_plane_url(mut self, url: impl Into<String>) -> Self {
        self.control_plane_url = url.into();
        self
    }

    /// Sets the agent URL template.
    #[must_use]
    pub fn with_agent_url_template(mut self, template: impl Into<String>) -> Self {
        self.agent_url_template = template.into();
        self
    }

    /// Sets how the credential is sent to the control plane.
    #[must_use]
    pub fn with_control_plane_auth(mut self, auth: ControlPlaneAuth) -> Self {
        self.control_plane_auth = auth;
        self
    }

    /// Sets the timeout used when a tool supplies none.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the grace period added to every request timeout.
    #[must_use]
    pub fn with_timeout_grace(mut self, grace: Duration) -> Self {
        self.timeout_grace = grace;
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the agent port reported by `get_agent_url`.
    #[must_use]
    pub fn with_agent_port(mut self, port: u16) -> Self {
        self.agent_port = port;
        self
    }

    /// Checks that URLs parse and timeouts are usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control_plane_base()?;

        let template = &self.agent_url_template;
        if !template.contains(SANDBOX_ID_PLACEHOLDER) {
            return Err(ConfigError::InvalidAgentTemplate {
                template: template.clone(),
                reason: format!("missing {SANDBOX_ID_PLACEHOLDER} placeholder"),
            });
        }
        let probe = template.replace(SANDBOX_ID_PLACEHOLDER, "probe");
        if let Err(e) = Url::parse(&probe) {
            return Err(ConfigError::InvalidAgentTemplate {
                template: template.clone(),
                reason: e.to_string(),
            });
        }

        if self.default_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "default_timeout",
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "connect_timeout",
            });
        }
        Ok(())
    }

    pub(crate) fn control_plane_base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.control_plane_url).map_err(|source| ConfigError::InvalidControlPlaneUrl {
            url: self.control_plane_url.clone(),
            source,
        })
    }
}
