//! Upstream client configuration.

use std::time::Duration;

use super::defaults::{
    DEFAULT_LOGIN_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_TIMEOUT_SECS,
    DEFAULT_TOKEN_SAFETY_MARGIN_SECS, DEFAULT_TOKEN_TTL_SECS,
};

/// Endpoints, credentials and timeouts for the upstream service.
///
/// # Example
///
/// ```
/// use lotcheck::config::UpstreamConfig;
/// use std::time::Duration;
///
/// let config = UpstreamConfig::new("https://api.example.com/login", "https://api.example.com/simulate")
///     .with_credentials("operator", "secret")
///     .with_request_timeout(Duration::from_secs(45));
/// assert_eq!(config.username(), "operator");
/// assert_eq!(config.retry_timeout(), Duration::from_secs(30));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    login_url: String,
    simulate_url: String,
    username: String,
    password: String,
    token_ttl: Duration,
    safety_margin: Duration,
    login_timeout: Duration,
    request_timeout: Duration,
    retry_timeout: Duration,
}

impl UpstreamConfig {
    /// Creates a configuration for the given endpoints with default timeouts
    /// and empty credentials.
    pub fn new(login_url: impl Into<String>, simulate_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            simulate_url: simulate_url.into(),
            username: String::new(),
            password: String::new(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            safety_margin: Duration::from_secs(DEFAULT_TOKEN_SAFETY_MARGIN_SECS),
            login_timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_timeout: Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECS),
        }
    }

    /// Set the login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the token lifetime assumed when the login response has none.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the margin subtracted from every token lifetime.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Set the login exchange timeout.
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set the primary evaluation timeout. Default: 60 seconds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the escalation retry timeout. Default: 30 seconds.
    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn simulate_url(&self) -> &str {
        &self.simulate_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    /// Returns true when both endpoints are set.
    pub fn is_configured(&self) -> bool {
        !self.login_url.is_empty() && !self.simulate_url.is_empty()
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("login_url", &self.login_url)
            .field("simulate_url", &self.simulate_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("request_timeout", &self.request_timeout)
            .field("retry_timeout", &self.retry_timeout)
            .finish()
    }
}
