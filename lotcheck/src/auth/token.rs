//! Cached bearer token with expiry.
//!
//! The cache is a single value behind an async mutex. The mutex is held
//! for the whole login exchange, so at most one refresh runs at a time and
//! concurrent callers either get the still-valid token or wait for the new
//! one. An expired token is never handed out.

use crate::upstream::UpstreamError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lifetime assumed when the login response carries no TTL.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Margin subtracted from the server TTL before a token is considered expired.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Result of a successful login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub access_token: String,
    /// Server-reported lifetime, if any.
    pub ttl: Option<Duration>,
}

/// Something that can perform the login exchange.
pub trait CredentialSource: Send + Sync + 'static {
    /// Exchanges the static credentials for a bearer token.
    fn login(&self) -> impl Future<Output = Result<LoginGrant, UpstreamError>> + Send;
}

/// Upstream bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: Instant,
}

impl AuthToken {
    /// Creates a token valid until `expires_at`.
    pub fn new(value: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The empty token handed out when login fails.
    ///
    /// Requests made with it fail upstream with an authentication error.
    pub fn invalid() -> Self {
        Self::new(String::new(), Instant::now())
    }

    /// The bearer value (empty for an invalid token).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Effective expiry, safety margin already applied.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true if the token is non-empty and not yet expired at `now`.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.value.is_empty() && now < self.expires_at
    }
}

/// Fetches and caches the upstream token.
pub struct TokenManager<S: CredentialSource> {
    source: Arc<S>,
    cached: Mutex<Option<AuthToken>>,
    default_ttl: Duration,
    safety_margin: Duration,
}

impl<S: CredentialSource> TokenManager<S> {
    /// Creates a manager with the default TTL and safety margin.
    pub fn new(source: Arc<S>) -> Self {
        Self::with_lifetimes(source, DEFAULT_TOKEN_TTL, DEFAULT_SAFETY_MARGIN)
    }

    /// Creates a manager with explicit lifetime settings.
    pub fn with_lifetimes(source: Arc<S>, default_ttl: Duration, safety_margin: Duration) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            default_ttl,
            safety_margin,
        }
    }

    /// Returns a valid cached token, logging in first if needed.
    ///
    /// Never fails: on login failure the failure is logged and
    /// [`AuthToken::invalid`] is returned. Nothing is cached in that case,
    /// so the next call attempts a fresh login.
    pub async fn get_token(&self) -> AuthToken {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(Instant::now()) {
                return token.clone();
            }
            debug!("Cached token expired, refreshing");
        }

        match self.source.login().await {
            Ok(grant) => {
                let ttl = grant.ttl.unwrap_or(self.default_ttl);
                let lifetime = ttl.saturating_sub(self.safety_margin);
                let token = AuthToken::new(grant.access_token, Instant::now() + lifetime);
                info!(valid_for_secs = lifetime.as_secs(), "Upstream token acquired");
                *cached = Some(token.clone());
                token
            }
            Err(e) => {
                warn!(error = %e, "Login failed, continuing without a valid token");
                *cached = None;
                AuthToken::invalid()
            }
        }
    }

    /// Drops the cached token so the next call logs in again.
    ///
    /// Used when the upstream refuses a token that has not expired locally.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Login source that counts calls and can be told to fail.
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
        ttl: Option<Duration>,
        delay: Duration,
    }

    impl CountingSource {
        fn ok(ttl: Option<Duration>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                ttl,
                delay: Duration::ZERO,
            }
        }
    }

    impl CredentialSource for CountingSource {
        async fn login(&self) -> Result<LoginGrant, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(UpstreamError::AuthFailure("bad credentials".into()));
            }
            Ok(LoginGrant {
                access_token: format!("token-{}", n),
                ttl: self.ttl,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_is_cached_until_expiry() {
        let source = Arc::new(CountingSource::ok(Some(Duration::from_secs(120))));
        let manager = TokenManager::new(Arc::clone(&source));

        let first = manager.get_token().await;
        assert_eq!(first.value(), "token-1");

        // 120s TTL minus 60s margin leaves 60s of validity.
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(manager.get_token().await.value(), "token-1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(manager.get_token().await.value(), "token-2");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies_margin() {
        let source = Arc::new(CountingSource::ok(None));
        let manager = TokenManager::new(source);

        let start = Instant::now();
        let token = manager.get_token().await;
        assert_eq!(token.expires_at() - start, Duration::from_secs(3540));
    }

    #[tokio::test]
    async fn test_login_failure_returns_invalid_token_and_retries() {
        let source = Arc::new(CountingSource {
            fail: true,
            ..CountingSource::ok(None)
        });
        let manager = TokenManager::new(Arc::clone(&source));

        let token = manager.get_token().await;
        assert!(token.value().is_empty());
        assert!(!token.is_valid_at(Instant::now()));

        manager.get_token().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = Arc::new(CountingSource {
            delay: Duration::from_millis(500),
            ..CountingSource::ok(None)
        });
        let manager = Arc::new(TokenManager::new(Arc::clone(&source)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.get_token().await }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().value(), "token-1");
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_login() {
        let source = Arc::new(CountingSource::ok(None));
        let manager = TokenManager::new(Arc::clone(&source));

        manager.get_token().await;
        manager.invalidate().await;
        assert_eq!(manager.get_token().await.value(), "token-2");
    }
}
