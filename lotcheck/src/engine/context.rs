//! Shared collaborators of lot workers and escalation tasks.

use std::sync::Arc;
use tracing::warn;

use super::Pacer;
use crate::auth::TokenManager;
use crate::config::EngineConfig;
use crate::lot::{LotState, SnapshotStore};
use crate::outcome::Outcome;
use crate::quota::{NullQuota, QuotaRecorder};
use crate::upstream::{AsyncHttpClient, RateLimitPolicy, UpstreamClient};

/// Everything a worker needs to evaluate subjects and record outcomes.
///
/// # Example
///
/// ```ignore
/// let client = UpstreamClient::new(ReqwestClient::new()?, file.upstream_config());
/// let context = EngineContext::new(client, SnapshotStore::new(&file.lots.results_dir))
///     .with_pacer(Arc::new(Pacer::new(file.pacer_config())))
///     .with_policy(file.rate_limit_policy())
///     .with_config(file.engine_config());
/// ```
pub struct EngineContext<H: AsyncHttpClient> {
    client: Arc<UpstreamClient<H>>,
    tokens: TokenManager<UpstreamClient<H>>,
    pacer: Arc<Pacer>,
    snapshots: SnapshotStore,
    quota: Arc<dyn QuotaRecorder>,
    policy: RateLimitPolicy,
    config: EngineConfig,
}

impl<H: AsyncHttpClient> EngineContext<H> {
    /// Creates a context with default pacing, policy and engine settings
    /// and no quota recording.
    pub fn new(client: UpstreamClient<H>, snapshots: SnapshotStore) -> Self {
        let client = Arc::new(client);
        let tokens = TokenManager::with_lifetimes(
            Arc::clone(&client),
            client.config().token_ttl(),
            client.config().safety_margin(),
        );
        Self {
            client,
            tokens,
            pacer: Arc::new(Pacer::default()),
            snapshots,
            quota: Arc::new(NullQuota),
            policy: RateLimitPolicy::default(),
            config: EngineConfig::default(),
        }
    }

    /// Use a shared pacer.
    pub fn with_pacer(mut self, pacer: Arc<Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Report visible outcomes to `quota`.
    pub fn with_quota(mut self, quota: Arc<dyn QuotaRecorder>) -> Self {
        self.quota = quota;
        self
    }

    /// Use `policy` to detect throttling.
    pub fn with_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client(&self) -> &UpstreamClient<H> {
        &self.client
    }

    pub fn tokens(&self) -> &TokenManager<UpstreamClient<H>> {
        &self.tokens
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn quota(&self) -> &dyn QuotaRecorder {
        self.quota.as_ref()
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Records `outcome` into a locked lot.
    ///
    /// Visible outcomes are reported to the quota recorder and the pacer.
    /// The caller persists the lot afterwards with [`Self::persist`].
    pub(crate) fn apply(&self, state: &mut LotState, outcome: Outcome) -> bool {
        let visible = state.record(outcome);
        if visible {
            self.quota.record_usage();
            self.pacer.record_completion();
        }
        visible
    }

    /// Writes the snapshot of a locked lot.
    ///
    /// Failures are logged; the next state change rewrites the whole file.
    pub(crate) async fn persist(&self, state: &LotState) {
        if let Err(e) = self.snapshots.write(&state.snapshot()).await {
            warn!(lot_id = %state.id(), error = %e, "Failed to write lot snapshot");
        }
    }
}
