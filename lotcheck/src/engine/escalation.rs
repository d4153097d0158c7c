//! Out-of-band retries for throttled subjects.
//!
//! An escalation task owns one subject from its first throttled response
//! until a visible outcome is recorded. Each round waits the retry delay,
//! bypassing the pacer, then re-submits the same request with a fresh token.
//!
//! - throttled again, or the request failed in transit: the round is spent
//! - anything else: recorded as the final outcome
//! - every round spent: recorded as [`Outcome::retry_exhausted`]
//!
//! The task runs regardless of the lot's pause flag.

use std::sync::Arc;
use tracing::{info, warn};

use super::EngineContext;
use crate::lot::LotHandle;
use crate::outcome::Outcome;
use crate::subject::SubjectId;
use crate::upstream::{
    interpret, to_outcome, AsyncHttpClient, SimulationRequest, UpstreamError,
};

/// Retries `subject` and records its final outcome.
///
/// The caller must have registered the task with `begin_retry` on the lot
/// before spawning it.
pub(crate) async fn escalate<H: AsyncHttpClient>(
    ctx: Arc<EngineContext<H>>,
    lot: Arc<LotHandle>,
    subject: SubjectId,
    request: SimulationRequest,
) {
    let rounds = ctx.config().max_retry_rounds();
    let mut outcome = None;

    for round in 1..=rounds {
        info!(
            lot_id = %lot.id(),
            subject = %subject,
            round,
            rounds,
            "Escalation round scheduled"
        );
        tokio::time::sleep(ctx.config().retry_delay()).await;

        let token = ctx.tokens().get_token().await;
        let response = match ctx
            .client()
            .evaluate(&request, token.value(), ctx.config().retry_timeout())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    lot_id = %lot.id(),
                    subject = %subject,
                    round,
                    error = %e,
                    "Escalation request failed"
                );
                continue;
            }
        };

        match interpret(&response, ctx.policy()) {
            Err(UpstreamError::Throttled(_)) => {
                warn!(lot_id = %lot.id(), subject = %subject, round, "Still throttled");
            }
            result => {
                if matches!(result, Err(UpstreamError::AuthFailure(_))) {
                    ctx.tokens().invalidate().await;
                }
                outcome = Some(to_outcome(subject.clone(), result));
                break;
            }
        }
    }

    let outcome = outcome.unwrap_or_else(|| {
        warn!(lot_id = %lot.id(), subject = %subject, rounds, "Retry budget exhausted");
        Outcome::retry_exhausted(subject.clone())
    });

    let mut state = lot.lock().await;
    ctx.apply(&mut state, outcome);
    state.finish_retry();
    state.try_finalize();
    ctx.persist(&state).await;
    info!(
        lot_id = %lot.id(),
        subject = %subject,
        pending_retries = state.pending_retries(),
        "Escalation finished"
    );
}
