//! End-to-end lot processing against an in-memory upstream.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tempfile::TempDir;

use lotcheck::config::{EngineConfig, PacerConfig, UpstreamConfig};
use lotcheck::engine::{EngineContext, Pacer};
use lotcheck::lot::{
    LotError, LotId, LotRegistry, LotSnapshot, LotStatus, SnapshotStore, WorkerState,
};
use lotcheck::outcome::{Outcome, OutcomeStatus};
use lotcheck::quota::{DailyQuotaFile, QuotaRecorder};
use lotcheck::subject::SubjectId;
use lotcheck::upstream::{AsyncHttpClient, HttpResponse, TransportError, UpstreamClient};

const LOGIN_URL: &str = "http://upstream.test/login";
const SIMULATE_URL: &str = "http://upstream.test/simulate";

type Reply = Result<HttpResponse, TransportError>;

fn ok_body(gross: f64, released: f64) -> String {
    format!(
        r#"{{"success":true,"objectReturn":{{"retornoSimulacao":[{{"valorLiquido":{},"mensagem":"Autorizado","detalhes":{{"saldoTotalBloqueado":{}}}}}]}}}}"#,
        released, gross
    )
}

fn throttled() -> Reply {
    Ok(HttpResponse::new(
        200,
        r#"{"objectReturn":{"retornoSimulacao":[],"description":"Foi excedido o limite de requisições"}}"#,
    ))
}

fn rejected(description: &str) -> Reply {
    Ok(HttpResponse::new(
        200,
        format!(r#"{{"objectReturn":{{"description":"{}"}}}}"#, description),
    ))
}

#[derive(Default)]
struct FakeState {
    /// Replies queued per subject; unscripted calls succeed.
    scripts: HashMap<String, VecDeque<Reply>>,
    /// Reply used for a subject once its script is exhausted.
    fallbacks: HashMap<String, Reply>,
    /// Subjects evaluated, in call order.
    calls: Vec<String>,
    logins: usize,
    login_fails: bool,
}

/// In-memory upstream: a login endpoint and a per-subject scripted
/// evaluation endpoint.
#[derive(Clone, Default)]
struct FakeUpstream {
    state: Arc<Mutex<FakeState>>,
}

impl FakeUpstream {
    fn script(&self, subject: &str, replies: impl IntoIterator<Item = Reply>) {
        self.state
            .lock()
            .scripts
            .entry(subject.to_string())
            .or_default()
            .extend(replies);
    }

    fn always(&self, subject: &str, reply: Reply) {
        self.state.lock().fallbacks.insert(subject.to_string(), reply);
    }

    fn fail_logins(&self) {
        self.state.lock().login_fails = true;
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn calls_for(&self, subject: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == subject).count()
    }

    fn logins(&self) -> usize {
        self.state.lock().logins
    }
}

impl AsyncHttpClient for FakeUpstream {
    async fn post_json(
        &self,
        url: &str,
        json_body: &str,
        bearer_token: Option<&str>,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock();

        if url == LOGIN_URL {
            state.logins += 1;
            if state.login_fails {
                return Ok(HttpResponse::new(500, "login unavailable"));
            }
            return Ok(HttpResponse::new(
                200,
                r#"{"success":true,"objectReturn":{"access_token":"test-token","expires_in":3600}}"#,
            ));
        }

        if bearer_token.is_none() {
            return Ok(HttpResponse::new(401, "missing token"));
        }

        let body: serde_json::Value =
            serde_json::from_str(json_body).map_err(|e| TransportError::Other(e.to_string()))?;
        let subject = body["cpf"].as_str().unwrap_or_default().to_string();
        state.calls.push(subject.clone());

        if let Some(reply) = state.scripts.get_mut(&subject).and_then(|q| q.pop_front()) {
            return reply;
        }
        if let Some(reply) = state.fallbacks.get(&subject) {
            return reply.clone();
        }
        Ok(HttpResponse::new(200, ok_body(1000.0, 500.0)))
    }
}

struct Harness {
    temp: TempDir,
    results_dir: std::path::PathBuf,
    upstream: FakeUpstream,
    quota: Arc<DailyQuotaFile>,
    registry: LotRegistry<FakeUpstream>,
}

fn engine_config() -> EngineConfig {
    EngineConfig::new()
        .with_pause_poll(Duration::from_millis(10))
        .with_settle_delay(Duration::from_millis(1))
        .with_retry_delay(Duration::from_millis(20))
        .with_max_retry_rounds(3)
}

fn registry_for(
    upstream: FakeUpstream,
    results_dir: &std::path::Path,
    quota: Arc<DailyQuotaFile>,
    config: EngineConfig,
) -> LotRegistry<FakeUpstream> {
    let client = UpstreamClient::new(
        upstream,
        UpstreamConfig::new(LOGIN_URL, SIMULATE_URL).with_credentials("user", "secret"),
    );
    let pacer = Pacer::new(
        PacerConfig::new()
            .with_min_delay(Duration::from_millis(2))
            .with_cooldown(Duration::from_millis(2)),
    );
    LotRegistry::new(
        EngineContext::new(client, SnapshotStore::new(results_dir))
            .with_pacer(Arc::new(pacer))
            .with_quota(quota)
            .with_config(config),
    )
}

fn harness_with(config: EngineConfig) -> Harness {
    let temp = TempDir::new().unwrap();
    let results_dir = temp.path().join("results");
    let upstream = FakeUpstream::default();
    let quota = Arc::new(DailyQuotaFile::new(temp.path().join("quota.json")));
    let registry = registry_for(upstream.clone(), &results_dir, Arc::clone(&quota), config);
    Harness {
        temp,
        results_dir,
        upstream,
        quota,
        registry,
    }
}

fn harness() -> Harness {
    harness_with(engine_config())
}

fn sid(s: &str) -> SubjectId {
    SubjectId::from_normalized(s)
}

fn assert_invariants(status: &LotStatus) {
    assert!(status.completed <= status.total, "completed exceeds total");
    if status.finalized {
        assert_eq!(status.pending_retries, 0);
        assert_eq!(status.completed, status.total);
    }
    let mut seen = std::collections::HashSet::new();
    for outcome in &status.results {
        assert!(seen.insert(outcome.subject_id.clone()), "duplicate result");
        assert!(!outcome.is_hidden, "hidden outcome exposed");
    }
}

async fn wait_finalized(registry: &LotRegistry<FakeUpstream>, id: &LotId) -> LotStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let status = registry.status(id).await.unwrap();
        assert_invariants(&status);
        if status.finalized {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "lot did not finalize: {:?}",
            status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_duplicates_collapse_and_lot_completes() {
    let h = harness();
    let id = h.registry.submit(["123", "123", "456"]).await;

    let subjects = h.registry.subjects(&id).await.unwrap();
    assert_eq!(subjects, vec![sid("00000000123"), sid("00000000456")]);

    let status = wait_finalized(&h.registry, &id).await;
    assert_eq!(status.total, 2);
    assert_eq!(status.completed, 2);
    assert_eq!(status.authorized, 2);
    assert_eq!(status.percent, 100);
    assert_eq!(status.worker, WorkerState::Done);
    assert_eq!(status.results[0].subject_id, sid("00000000123"));
    assert_eq!(status.results[0].gross_balance, 1000.0);
    assert_eq!(status.results[0].released_amount, 500.0);
    assert_eq!(h.upstream.calls(), vec!["00000000123", "00000000456"]);
    assert_eq!(h.upstream.logins(), 1);

    let snapshot = SnapshotStore::new(&h.results_dir).load(&id).await.unwrap();
    assert_eq!(snapshot.completed, 2);
    assert_eq!(snapshot.total, 2);
    assert!(snapshot.finalized);
}

#[tokio::test]
async fn test_empty_submission_is_finalized_immediately() {
    let h = harness();
    let id = h.registry.submit(Vec::<String>::new()).await;

    let status = h.registry.status(&id).await.unwrap();
    assert!(status.finalized);
    assert_eq!(status.total, 0);
    assert_eq!(status.completed, 0);
    assert!(h.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_persistent_throttling_exhausts_retry_budget() {
    let h = harness_with(engine_config().with_retry_delay(Duration::from_millis(150)));
    h.upstream.always("00000000456", throttled());

    let id = h.registry.submit(["123", "456"]).await;

    // Wait for the escalation to start; the hidden outcome must not count.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = h.registry.status(&id).await.unwrap();
        assert_invariants(&status);
        if status.pending_retries == 1 {
            assert_eq!(status.completed, 1);
            assert!(!status.finalized);
            assert!(status.results.iter().all(|o| o.subject_id != sid("00000000456")));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "escalation never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let status = wait_finalized(&h.registry, &id).await;
    assert_eq!(status.completed, 2);
    assert_eq!(status.pending_retries, 0);

    let last = status
        .results
        .iter()
        .find(|o| o.subject_id == sid("00000000456"))
        .unwrap();
    assert_eq!(last.status, OutcomeStatus::Error);
    assert_eq!(last.message, "Limite de tentativas atingido");
    assert!(last.is_final);

    // One primary attempt plus three escalation rounds.
    assert_eq!(h.upstream.calls_for("00000000456"), 4);
    // Only visible outcomes are counted against the daily quota.
    assert_eq!(h.quota.count_today(), 2);
}

#[tokio::test]
async fn test_escalation_records_first_non_throttled_reply() {
    let h = harness();
    h.upstream.script(
        "00000000456",
        [throttled(), throttled(), rejected("CPF sem saldo disponível")],
    );

    let id = h.registry.submit(["456"]).await;
    let status = wait_finalized(&h.registry, &id).await;

    assert_eq!(status.results.len(), 1);
    assert_eq!(status.results[0].status, OutcomeStatus::ProcessedNoBenefit);
    assert_eq!(status.results[0].message, "CPF sem saldo disponível");
    assert_eq!(h.upstream.calls_for("00000000456"), 3);
}

#[tokio::test]
async fn test_escalation_transport_errors_consume_rounds() {
    let h = harness();
    h.upstream.script(
        "00000000789",
        [
            throttled(),
            Err(TransportError::Other("connection reset".into())),
            Err(TransportError::Timeout),
            Ok(HttpResponse::new(200, ok_body(10.0, 5.0))),
        ],
    );

    let id = h.registry.submit(["789"]).await;
    let status = wait_finalized(&h.registry, &id).await;

    assert_eq!(status.results[0].status, OutcomeStatus::Ok);
    assert_eq!(status.results[0].released_amount, 5.0);
    assert_eq!(h.upstream.calls_for("00000000789"), 4);
}

#[tokio::test]
async fn test_primary_failures_are_final_outcomes() {
    let h = harness();
    h.upstream.always("00000000001", Err(TransportError::Timeout));
    h.upstream.always(
        "00000000002",
        Err(TransportError::Other("connection refused".into())),
    );
    h.upstream.always("00000000003", rejected("Cliente não elegível"));

    let id = h.registry.submit(["1", "2", "3", "4"]).await;
    let status = wait_finalized(&h.registry, &id).await;

    let by_subject: HashMap<&str, &Outcome> = status
        .results
        .iter()
        .map(|o| (o.subject_id.as_str(), o))
        .collect();
    assert_eq!(by_subject["00000000001"].status, OutcomeStatus::Error);
    assert_eq!(by_subject["00000000001"].message, "request timed out");
    assert_eq!(by_subject["00000000002"].message, "connection refused");
    assert_eq!(
        by_subject["00000000003"].status,
        OutcomeStatus::ProcessedNoBenefit
    );
    assert_eq!(by_subject["00000000004"].status, OutcomeStatus::Ok);
    assert_eq!(status.authorized, 1);
    // No subject was retried.
    assert_eq!(h.upstream.calls().len(), 4);
}

#[tokio::test]
async fn test_login_failure_yields_error_outcomes_and_retries_login() {
    let h = harness();
    h.upstream.fail_logins();

    let id = h.registry.submit(["1", "2"]).await;
    let status = wait_finalized(&h.registry, &id).await;

    assert!(status
        .results
        .iter()
        .all(|o| o.status == OutcomeStatus::Error));
    // Each evaluation asks for a token again.
    assert_eq!(h.upstream.logins(), 2);
}

#[tokio::test]
async fn test_pause_stops_dequeuing_until_resume() {
    let h = harness();
    let id = h
        .registry
        .submit(["1", "2", "3", "4", "5", "6", "7", "8"])
        .await;
    h.registry.pause(&id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls_after_pause = h.upstream.calls().len();
    let status = h.registry.status(&id).await.unwrap();
    assert!(status.paused);
    assert_eq!(status.worker, WorkerState::Paused);
    assert!(calls_after_pause <= 1);
    assert_eq!(status.queued, 8 - calls_after_pause);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.upstream.calls().len(), calls_after_pause);

    h.registry.resume(&id).await.unwrap();
    let status = wait_finalized(&h.registry, &id).await;
    assert_eq!(status.completed, 8);
    assert!(!status.paused);
}

#[tokio::test]
async fn test_escalation_continues_while_paused() {
    let h = harness_with(
        engine_config()
            .with_retry_delay(Duration::from_millis(50))
            .with_settle_delay(Duration::from_millis(100)),
    );
    h.upstream.script("00000000001", [throttled()]);

    let id = h.registry.submit(["1", "2", "3"]).await;

    // Pause as soon as the first subject is handed to escalation.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if h.registry.status(&id).await.unwrap().pending_retries == 1 {
            h.registry.pause(&id).await.unwrap();
            break;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    let status = h.registry.status(&id).await.unwrap();
    assert_eq!(status.pending_retries, 0);
    assert!(status
        .results
        .iter()
        .any(|o| o.subject_id == sid("00000000001") && o.status == OutcomeStatus::Ok));
    assert!(!status.finalized);

    h.registry.resume(&id).await.unwrap();
    let status = wait_finalized(&h.registry, &id).await;
    assert_eq!(status.completed, 3);
}

#[tokio::test]
async fn test_recovery_round_trip() {
    let h = harness();
    let store = SnapshotStore::new(&h.results_dir);
    let id = LotId::generate();
    let subjects = vec![
        sid("00000000001"),
        sid("00000000002"),
        sid("00000000003"),
    ];
    let recorded = Outcome::authorized(sid("00000000001"), 42.0, 21.0, "Autorizado antes");
    store
        .write(&LotSnapshot {
            lot_id: id.clone(),
            created_at: Utc::now(),
            subjects: subjects.clone(),
            results: vec![
                recorded.clone(),
                Outcome::throttled(sid("00000000002"), "limite de requisições"),
            ],
            completed: 1,
            total: 3,
            pending_retries: 1,
            paused: false,
            finalized: false,
        })
        .await
        .unwrap();

    // Offline view: same subject set, unprocessed subjects pending.
    let view = store.recovered_view(&id).await.unwrap();
    let view_ids: Vec<SubjectId> = view.iter().map(|o| o.subject_id.clone()).collect();
    assert_eq!(view_ids, subjects);
    assert_eq!(view[0], recorded);
    assert_eq!(view[1].status, OutcomeStatus::Pending);
    assert_eq!(view[2].status, OutcomeStatus::Pending);

    // A fresh process picks the lot up from disk.
    let recovered = h.registry.recover_all().await.unwrap();
    assert_eq!(recovered, vec![id.clone()]);

    let status = wait_finalized(&h.registry, &id).await;
    assert_eq!(status.completed, 3);
    assert_eq!(status.results[0], recorded);
    assert_eq!(h.upstream.calls(), vec!["00000000002", "00000000003"]);
}

#[tokio::test]
async fn test_concurrent_recovery_runs_one_worker() {
    let h = harness();
    let store = SnapshotStore::new(&h.results_dir);
    let id = LotId::generate();
    store
        .write(&LotSnapshot {
            lot_id: id.clone(),
            created_at: Utc::now(),
            subjects: vec![sid("00000000001"), sid("00000000002")],
            results: Vec::new(),
            completed: 0,
            total: 2,
            pending_retries: 0,
            paused: false,
            finalized: false,
        })
        .await
        .unwrap();

    let (first, second) = tokio::join!(h.registry.recover(&id), h.registry.recover(&id));
    assert_eq!(first.unwrap(), id);
    assert_eq!(second.unwrap(), id);

    let status = wait_finalized(&h.registry, &id).await;
    assert_eq!(status.completed, 2);
    assert_eq!(h.upstream.calls(), vec!["00000000001", "00000000002"]);
    assert_eq!(h.quota.count_today(), 2);
    assert_eq!(h.registry.list().await.len(), 1);
}

#[tokio::test]
async fn test_recovering_finished_lot_starts_no_work() {
    let h = harness();
    let id = h.registry.submit(["1"]).await;
    wait_finalized(&h.registry, &id).await;

    let upstream = FakeUpstream::default();
    let quota = Arc::new(DailyQuotaFile::new(h.temp.path().join("restarted-quota.json")));
    let restarted = registry_for(upstream.clone(), &h.results_dir, quota, engine_config());
    restarted.recover(&id).await.unwrap();

    let status = restarted.status(&id).await.unwrap();
    assert!(status.finalized);
    assert_eq!(status.completed, 1);
    assert!(upstream.calls().is_empty());
    assert_eq!(restarted.list().await.len(), 1);
}

#[tokio::test]
async fn test_report_fills_pending_while_paused() {
    let h = harness();
    let id = h.registry.submit(["1", "2", "3"]).await;
    h.registry.pause(&id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = h.registry.report(&id).await.unwrap();
    assert_eq!(report.len(), 3);
    let pending = report
        .iter()
        .filter(|o| o.status == OutcomeStatus::Pending)
        .count();
    let done = h.registry.results(&id).await.unwrap().len();
    assert_eq!(pending + done, 3);
    assert!(pending >= 2);
}

#[tokio::test]
async fn test_unknown_lot_is_not_found() {
    let h = harness();
    let id = LotId::parse("missing-lot").unwrap();

    assert!(matches!(
        h.registry.status(&id).await,
        Err(LotError::NotFound(_))
    ));
    assert!(matches!(
        h.registry.pause(&id).await,
        Err(LotError::NotFound(_))
    ));
    assert!(matches!(
        h.registry.recover(&id).await,
        Err(LotError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_lots_run_side_by_side() {
    let h = harness();
    h.upstream.script("00000000010", [throttled()]);
    let first = h.registry.submit(["10", "11"]).await;
    let second = h.registry.submit(["20", "21", "22"]).await;

    let a = wait_finalized(&h.registry, &first).await;
    let b = wait_finalized(&h.registry, &second).await;
    assert_eq!(a.completed, 2);
    assert_eq!(b.completed, 3);

    let listed = h.registry.list().await;
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|s| s.finalized));
    assert_eq!(h.quota.count_today(), 5);
}
