//! Per-lot state machine.
//!
//! A [`LotState`] is only ever touched through its [`LotHandle`] lock. The
//! worker and escalation tasks of a lot serialize on that lock; different
//! lots never contend.
//!
//! Counters are derived from the results map as it changes:
//!
//! - `completed` counts subjects whose current outcome is visible, so it
//!   moves down again if a visible entry is replaced by a hidden one and
//!   can never exceed `total`
//! - `finalized` is set once, when the queue has drained, no escalation is
//!   outstanding and every subject has a visible outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::snapshot::LotSnapshot;
use super::LotId;
use crate::outcome::{Outcome, OutcomeStatus};
use crate::subject::SubjectId;

/// Lifecycle of a lot's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Dequeuing and evaluating subjects.
    Running,
    /// Waiting for resume without consuming the queue.
    Paused,
    /// Queue empty; waiting on escalations before finalizing.
    Draining,
    /// Worker has exited.
    Done,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkerState::Running => "running",
            WorkerState::Paused => "paused",
            WorkerState::Draining => "draining",
            WorkerState::Done => "done",
        };
        f.write_str(label)
    }
}

/// Mutable state of one lot.
#[derive(Debug)]
pub struct LotState {
    id: LotId,
    created_at: DateTime<Utc>,
    subjects: Vec<SubjectId>,
    members: HashSet<SubjectId>,
    results: HashMap<SubjectId, Outcome>,
    completed: usize,
    paused: bool,
    finalized: bool,
    pending_retries: usize,
    queue: VecDeque<SubjectId>,
    queue_drained: bool,
    worker: WorkerState,
}

impl LotState {
    /// A fresh lot with every subject queued.
    pub(crate) fn new(id: LotId, subjects: Vec<SubjectId>) -> Self {
        let queue = subjects.iter().cloned().collect();
        Self {
            id,
            created_at: Utc::now(),
            members: subjects.iter().cloned().collect(),
            subjects,
            results: HashMap::new(),
            completed: 0,
            paused: false,
            finalized: false,
            pending_retries: 0,
            queue,
            queue_drained: false,
            worker: WorkerState::Running,
        }
    }

    /// Rebuilds a lot from its snapshot.
    ///
    /// Escalation tasks do not survive a restart, so pending retries start
    /// at zero and every subject without a visible outcome is queued again
    /// in submission order.
    pub(crate) fn from_snapshot(snapshot: LotSnapshot) -> Self {
        let mut state = Self::new(snapshot.lot_id, snapshot.subjects);
        state.created_at = snapshot.created_at;
        state.paused = snapshot.paused;

        for outcome in snapshot.results {
            if state.members.contains(&outcome.subject_id) {
                state.results.insert(outcome.subject_id.clone(), outcome);
            }
        }
        state.completed = state
            .results
            .values()
            .filter(|o| o.counts_as_completed())
            .count();

        let results = &state.results;
        state.queue = state
            .subjects
            .iter()
            .filter(|s| !results.get(*s).is_some_and(Outcome::counts_as_completed))
            .cloned()
            .collect();
        state
    }

    pub fn id(&self) -> &LotId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    pub fn total(&self) -> usize {
        self.subjects.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn pending_retries(&self) -> usize {
        self.pending_retries
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn worker_state(&self) -> WorkerState {
        self.worker
    }

    /// Current outcome for `subject`, hidden or not.
    pub fn outcome(&self, subject: &SubjectId) -> Option<&Outcome> {
        self.results.get(subject)
    }

    /// Visible outcomes in submission order.
    pub fn visible_results(&self) -> Vec<Outcome> {
        self.subjects
            .iter()
            .filter_map(|s| self.results.get(s))
            .filter(|o| o.counts_as_completed())
            .cloned()
            .collect()
    }

    /// Number of visible `Ok` outcomes.
    pub fn authorized(&self) -> usize {
        self.results
            .values()
            .filter(|o| o.counts_as_completed() && o.status == OutcomeStatus::Ok)
            .count()
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(crate) fn set_worker_state(&mut self, worker: WorkerState) {
        self.worker = worker;
    }

    /// Next queued subject, in submission order.
    pub(crate) fn next_subject(&mut self) -> Option<SubjectId> {
        self.queue.pop_front()
    }

    /// Marks that the worker found the queue empty after its last record.
    pub(crate) fn mark_queue_drained(&mut self) {
        self.queue_drained = true;
    }

    /// Stores `outcome`, replacing any previous outcome for the subject.
    ///
    /// Returns true if the stored outcome is visible. Outcomes for subjects
    /// outside the lot are ignored.
    pub(crate) fn record(&mut self, outcome: Outcome) -> bool {
        if !self.members.contains(&outcome.subject_id) {
            warn!(
                lot_id = %self.id,
                subject = %outcome.subject_id,
                "Ignoring outcome for unknown subject"
            );
            return false;
        }

        let visible = outcome.counts_as_completed();
        let previous = self.results.insert(outcome.subject_id.clone(), outcome);
        let was_visible = previous.is_some_and(|p| p.counts_as_completed());

        match (was_visible, visible) {
            (false, true) => self.completed += 1,
            (true, false) => self.completed -= 1,
            _ => {}
        }
        visible
    }

    /// Registers an escalation task for one of this lot's subjects.
    pub(crate) fn begin_retry(&mut self) {
        self.pending_retries += 1;
    }

    /// Releases an escalation task.
    pub(crate) fn finish_retry(&mut self) {
        self.pending_retries = self.pending_retries.saturating_sub(1);
    }

    /// Finalizes the lot if nothing remains to do.
    ///
    /// Returns true only on the transition to finalized.
    pub(crate) fn try_finalize(&mut self) -> bool {
        if self.finalized {
            return false;
        }
        let idle = self.queue.is_empty() && (self.queue_drained || self.subjects.is_empty());
        if idle && self.pending_retries == 0 && self.completed == self.total() {
            self.finalized = true;
            info!(
                lot_id = %self.id,
                total = self.total(),
                authorized = self.authorized(),
                "Lot finalized"
            );
            return true;
        }
        false
    }

    /// Durable representation of this state.
    pub fn snapshot(&self) -> LotSnapshot {
        LotSnapshot {
            lot_id: self.id.clone(),
            created_at: self.created_at,
            subjects: self.subjects.clone(),
            results: self
                .subjects
                .iter()
                .filter_map(|s| self.results.get(s))
                .cloned()
                .collect(),
            completed: self.completed,
            total: self.total(),
            pending_retries: self.pending_retries,
            paused: self.paused,
            finalized: self.finalized,
        }
    }

    /// Read-only status view.
    pub fn status(&self) -> LotStatus {
        LotStatus {
            lot_id: self.id.clone(),
            created_at: self.created_at,
            total: self.total(),
            completed: self.completed,
            percent: percent(self.completed, self.total()),
            authorized: self.authorized(),
            queued: self.queue.len(),
            pending_retries: self.pending_retries,
            paused: self.paused,
            finalized: self.finalized,
            worker: self.worker,
            results: self.visible_results(),
            quota_today: 0,
        }
    }

    /// History entry for this lot.
    pub fn summary(&self) -> LotSummary {
        LotSummary {
            lot_id: self.id.clone(),
            created_at: self.created_at,
            total: self.total(),
            completed: self.completed,
            paused: self.paused,
            finalized: self.finalized,
        }
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed * 100 / total).min(100)) as u8
}

/// Consistent view of one lot for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct LotStatus {
    pub lot_id: LotId,
    pub created_at: DateTime<Utc>,
    pub total: usize,
    pub completed: usize,
    /// Completion percentage, capped at 100.
    pub percent: u8,
    /// Visible `Ok` outcomes.
    pub authorized: usize,
    pub queued: usize,
    pub pending_retries: usize,
    pub paused: bool,
    pub finalized: bool,
    pub worker: WorkerState,
    /// Visible outcomes in submission order.
    pub results: Vec<Outcome>,
    /// Upstream usage counted today.
    pub quota_today: u64,
}

/// Short description of a lot for history listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotSummary {
    pub lot_id: LotId,
    pub created_at: DateTime<Utc>,
    pub total: usize,
    pub completed: usize,
    pub paused: bool,
    pub finalized: bool,
}

/// Shared, lockable lot.
#[derive(Debug)]
pub struct LotHandle {
    id: LotId,
    state: Mutex<LotState>,
}

impl LotHandle {
    pub(crate) fn new(state: LotState) -> Self {
        Self {
            id: state.id().clone(),
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> &LotId {
        &self.id
    }

    /// Locks the lot's state.
    pub async fn lock(&self) -> MutexGuard<'_, LotState> {
        self.state.lock().await
    }
}
