//! Per-lot worker loop.
//!
//! One worker drains one lot's queue, strictly in submission order:
//!
//! ```text
//! Running ──pause──► Paused ──resume──► Running
//!    │
//!    └─ queue empty ─► Draining ─► Done
//! ```
//!
//! Each iteration takes the lot lock only to dequeue and again to record;
//! the pacer wait and the upstream call happen without it, so status
//! reads and escalation tasks are never blocked by a slow request.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::escalation::escalate;
use super::EngineContext;
use crate::lot::{LotHandle, WorkerState};
use crate::subject::SubjectId;
use crate::upstream::{
    interpret, to_outcome, AsyncHttpClient, SimulationRequest, UpstreamError,
};

enum Step {
    Paused,
    Evaluate(SubjectId),
    Drained,
}

/// Starts the worker of `lot` on the current runtime.
pub(crate) fn spawn_worker<H: AsyncHttpClient>(ctx: Arc<EngineContext<H>>, lot: Arc<LotHandle>) {
    tokio::spawn(run_worker(ctx, lot));
}

/// Drains the lot's queue, then finalizes it if no escalation is pending.
pub(crate) async fn run_worker<H: AsyncHttpClient>(
    ctx: Arc<EngineContext<H>>,
    lot: Arc<LotHandle>,
) {
    info!(lot_id = %lot.id(), "Worker started");

    loop {
        let step = {
            let mut state = lot.lock().await;
            if state.is_paused() {
                if state.worker_state() != WorkerState::Paused {
                    info!(lot_id = %lot.id(), queued = state.queued(), "Worker paused");
                    state.set_worker_state(WorkerState::Paused);
                }
                Step::Paused
            } else {
                if state.worker_state() == WorkerState::Paused {
                    info!(lot_id = %lot.id(), "Worker resumed");
                }
                match state.next_subject() {
                    Some(subject) => {
                        state.set_worker_state(WorkerState::Running);
                        Step::Evaluate(subject)
                    }
                    None => {
                        state.set_worker_state(WorkerState::Draining);
                        Step::Drained
                    }
                }
            }
        };

        match step {
            Step::Paused => tokio::time::sleep(ctx.config().pause_poll()).await,
            Step::Evaluate(subject) => {
                process_subject(&ctx, &lot, subject).await;
                tokio::time::sleep(ctx.config().settle_delay()).await;
            }
            Step::Drained => break,
        }
    }

    let mut state = lot.lock().await;
    state.mark_queue_drained();
    state.try_finalize();
    state.set_worker_state(WorkerState::Done);
    ctx.persist(&state).await;
    info!(
        lot_id = %lot.id(),
        completed = state.completed(),
        total = state.total(),
        pending_retries = state.pending_retries(),
        finalized = state.is_finalized(),
        "Queue drained, worker exiting"
    );
}

/// Evaluates one subject and records its outcome.
///
/// A throttled subject gets a hidden outcome and is handed to an
/// escalation task; everything else is final.
async fn process_subject<H: AsyncHttpClient>(
    ctx: &Arc<EngineContext<H>>,
    lot: &Arc<LotHandle>,
    subject: SubjectId,
) {
    ctx.pacer().wait_for_slot().await;
    let token = ctx.tokens().get_token().await;
    let request = SimulationRequest::for_subject(&subject);

    let result = match ctx
        .client()
        .evaluate(&request, token.value(), ctx.config().request_timeout())
        .await
    {
        Ok(response) => interpret(&response, ctx.policy()),
        Err(e) => {
            warn!(lot_id = %lot.id(), subject = %subject, error = %e, "Upstream request failed");
            Err(UpstreamError::from(e))
        }
    };

    let throttled = matches!(result, Err(UpstreamError::Throttled(_)));
    match &result {
        Err(UpstreamError::Throttled(description)) => {
            warn!(
                lot_id = %lot.id(),
                subject = %subject,
                description = %description,
                "Upstream throttled, escalating"
            );
        }
        Err(UpstreamError::AuthFailure(reason)) => {
            warn!(
                lot_id = %lot.id(),
                subject = %subject,
                reason = %reason,
                "Upstream refused token"
            );
            ctx.tokens().invalidate().await;
        }
        _ => {}
    }

    let outcome = to_outcome(subject.clone(), result);
    debug!(
        lot_id = %lot.id(),
        subject = %subject,
        status = %outcome.status,
        hidden = outcome.is_hidden,
        "Outcome recorded"
    );

    {
        let mut state = lot.lock().await;
        ctx.apply(&mut state, outcome);
        if throttled {
            state.begin_retry();
        }
        ctx.persist(&state).await;
    }

    if throttled {
        tokio::spawn(escalate(Arc::clone(ctx), Arc::clone(lot), subject, request));
    }
}
