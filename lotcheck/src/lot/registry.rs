//! Process-wide registry of lots.
//!
//! Lots are keyed by [`LotId`] in a concurrent map; each entry carries its
//! own lock, so operations on different lots never serialize on each other.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    LotError, LotHandle, LotId, LotState, LotStatus, LotSummary, SnapshotError, WorkerState,
};
use crate::engine::{spawn_worker, EngineContext};
use crate::export::report_rows;
use crate::outcome::Outcome;
use crate::subject::{normalize_subjects, SubjectId};
use crate::upstream::AsyncHttpClient;

/// Owner of all lots and their workers.
///
/// Must be used from within a tokio runtime: submitting or recovering a
/// lot spawns its worker.
pub struct LotRegistry<H: AsyncHttpClient> {
    ctx: Arc<EngineContext<H>>,
    lots: DashMap<LotId, Arc<LotHandle>>,
}

impl<H: AsyncHttpClient> LotRegistry<H> {
    pub fn new(ctx: EngineContext<H>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            lots: DashMap::new(),
        }
    }

    pub fn context(&self) -> &EngineContext<H> {
        &self.ctx
    }

    fn handle(&self, id: &LotId) -> Result<Arc<LotHandle>, LotError> {
        self.lots
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LotError::not_found(id))
    }

    /// Creates a lot from raw subject identifiers and starts its worker.
    ///
    /// Identifiers are normalized and de-duplicated in submission order.
    /// An empty submission produces a lot that is finalized immediately.
    pub async fn submit<I, S>(&self, raw: I) -> LotId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let subjects = normalize_subjects(raw, self.ctx.config().subject_width());
        let id = LotId::generate();
        info!(lot_id = %id, total = subjects.len(), "Lot submitted");

        // Freshly generated ids never collide.
        self.start(LotState::new(id.clone(), subjects)).await;
        id
    }

    /// Registers `state`, persists it, and spawns a worker if work remains.
    ///
    /// Returns false, leaving the registry untouched, when a lot with the
    /// same id is already registered.
    async fn start(&self, mut state: LotState) -> bool {
        let idle = state.queued() == 0;
        if idle {
            state.mark_queue_drained();
            state.set_worker_state(WorkerState::Done);
            state.try_finalize();
        }

        let handle = Arc::new(LotHandle::new(state));
        match self.lots.entry(handle.id().clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&handle));
            }
        }

        {
            let state = handle.lock().await;
            self.ctx.persist(&state).await;
        }

        if !idle {
            spawn_worker(Arc::clone(&self.ctx), handle);
        }
        true
    }

    /// Stops the lot's worker from dequeuing further subjects.
    ///
    /// Escalation tasks already running continue.
    pub async fn pause(&self, id: &LotId) -> Result<(), LotError> {
        self.set_paused(id, true).await
    }

    /// Lets a paused worker continue within one poll interval.
    pub async fn resume(&self, id: &LotId) -> Result<(), LotError> {
        self.set_paused(id, false).await
    }

    async fn set_paused(&self, id: &LotId, paused: bool) -> Result<(), LotError> {
        let handle = self.handle(id)?;
        let mut state = handle.lock().await;
        if state.is_paused() != paused {
            state.set_paused(paused);
            self.ctx.persist(&state).await;
            info!(lot_id = %id, paused, "Lot pause flag changed");
        }
        Ok(())
    }

    /// Consistent status view, including today's quota count.
    pub async fn status(&self, id: &LotId) -> Result<LotStatus, LotError> {
        let handle = self.handle(id)?;
        let mut status = handle.lock().await.status();
        status.quota_today = self.ctx.quota().count_today();
        Ok(status)
    }

    /// Visible outcomes in submission order.
    pub async fn results(&self, id: &LotId) -> Result<Vec<Outcome>, LotError> {
        let handle = self.handle(id)?;
        let state = handle.lock().await;
        Ok(state.visible_results())
    }

    /// Original subject list.
    pub async fn subjects(&self, id: &LotId) -> Result<Vec<SubjectId>, LotError> {
        let handle = self.handle(id)?;
        let state = handle.lock().await;
        Ok(state.subjects().to_vec())
    }

    /// Report rows: recorded outcomes, then `Pending` for the rest.
    pub async fn report(&self, id: &LotId) -> Result<Vec<Outcome>, LotError> {
        let handle = self.handle(id)?;
        let state = handle.lock().await;
        Ok(report_rows(state.subjects(), &state.visible_results()))
    }

    /// Summaries of every registered lot, oldest first.
    pub async fn list(&self) -> Vec<LotSummary> {
        let handles: Vec<Arc<LotHandle>> =
            self.lots.iter().map(|e| Arc::clone(e.value())).collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.lock().await.summary());
        }
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.lot_id.cmp(&b.lot_id))
        });
        summaries
    }

    /// Reloads a lot from its snapshot and resumes its work.
    ///
    /// A lot already in the registry is left untouched.
    pub async fn recover(&self, id: &LotId) -> Result<LotId, LotError> {
        if self.lots.contains_key(id) {
            return Ok(id.clone());
        }

        let snapshot = match self.ctx.snapshots().load(id).await {
            Ok(snapshot) => snapshot,
            Err(SnapshotError::NotFound(_)) => return Err(LotError::not_found(id)),
            Err(e) => return Err(e.into()),
        };

        let state = LotState::from_snapshot(snapshot);
        let (completed, total, requeued, paused) = (
            state.completed(),
            state.total(),
            state.queued(),
            state.is_paused(),
        );
        if !self.start(state).await {
            debug!(lot_id = %id, "Lot already registered, keeping the running copy");
            return Ok(id.clone());
        }
        info!(
            lot_id = %id,
            completed,
            total,
            requeued,
            paused,
            "Lot recovered"
        );
        Ok(id.clone())
    }

    /// Recovers every snapshot in the results directory.
    ///
    /// Unreadable snapshots are logged and skipped.
    pub async fn recover_all(&self) -> Result<Vec<LotId>, LotError> {
        let mut recovered = Vec::new();
        for id in self.ctx.snapshots().list().await? {
            match self.recover(&id).await {
                Ok(id) => recovered.push(id),
                Err(e) => warn!(lot_id = %id, error = %e, "Skipping unrecoverable lot"),
            }
        }
        Ok(recovered)
    }
}
