//! Interpretation of upstream evaluation responses.
//!
//! A response is one of three shapes:
//!
//! 1. `objectReturn.retornoSimulacao` is a non-empty list: success.
//! 2. The description matches the [`RateLimitPolicy`]: throttled.
//! 3. Any other description: processed without benefit.
//!
//! The description is `objectReturn.description`, falling back to the raw
//! body when absent or empty. HTTP 401/403 are reported as authentication
//! failures before any of the above.

use super::error::{TransportError, UpstreamError};
use super::http::HttpResponse;
use super::policy::RateLimitPolicy;
use crate::outcome::{Outcome, DEFAULT_SUCCESS_MESSAGE, TIMEOUT_MESSAGE};
use crate::subject::SubjectId;
use serde::Deserialize;
use serde_json::Value;

/// A successful simulation extracted from the first result entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub gross_balance: f64,
    pub released_amount: f64,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
struct EvaluationEnvelope {
    #[serde(rename = "objectReturn", default)]
    object_return: Option<ObjectReturn>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectReturn {
    #[serde(rename = "retornoSimulacao", default)]
    simulations: Option<Vec<SimulationEntry>>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationEntry {
    #[serde(rename = "valorLiquido", default)]
    released_amount: Option<Value>,
    #[serde(rename = "mensagem", default)]
    message: Option<String>,
    #[serde(rename = "detalhes", default)]
    details: Option<SimulationDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationDetails {
    #[serde(rename = "saldoTotalBloqueado", default)]
    gross_balance: Option<Value>,
}

/// Reads a currency amount sent either as a JSON number or a numeric string.
fn amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().unwrap_or_default(),
        _ => 0.0,
    }
}

/// Interprets an evaluation response.
///
/// Returns the simulation on success, otherwise one of
/// [`UpstreamError::AuthFailure`], [`UpstreamError::Throttled`] or
/// [`UpstreamError::Rejected`].
pub fn interpret(
    response: &HttpResponse,
    policy: &RateLimitPolicy,
) -> Result<Simulation, UpstreamError> {
    if response.status == 401 || response.status == 403 {
        return Err(UpstreamError::AuthFailure(format!(
            "HTTP {}: {}",
            response.status,
            response.body.trim()
        )));
    }

    // Unparseable bodies are treated as a bare description.
    let envelope: EvaluationEnvelope = serde_json::from_str(&response.body).unwrap_or_default();
    let object_return = envelope.object_return.unwrap_or_default();

    if let Some(first) = object_return.simulations.and_then(|s| s.into_iter().next()) {
        let message = first
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
        return Ok(Simulation {
            gross_balance: amount(first.details.as_ref().and_then(|d| d.gross_balance.as_ref())),
            released_amount: amount(first.released_amount.as_ref()),
            message,
        });
    }

    let description = object_return
        .description
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| response.body.clone());

    if policy.is_throttled(&description) {
        Err(UpstreamError::Throttled(description))
    } else {
        Err(UpstreamError::Rejected(description))
    }
}

/// Converts an evaluation result into the outcome recorded for `subject`.
///
/// Throttling maps to the hidden placeholder; every other error is final.
pub fn to_outcome(subject: SubjectId, result: Result<Simulation, UpstreamError>) -> Outcome {
    match result {
        Ok(sim) => Outcome::authorized(
            subject,
            sim.gross_balance,
            sim.released_amount,
            sim.message,
        ),
        Err(UpstreamError::Throttled(description)) => Outcome::throttled(subject, description),
        Err(UpstreamError::Rejected(description)) => Outcome::no_benefit(subject, description),
        Err(UpstreamError::Transport(TransportError::Timeout)) => {
            Outcome::error(subject, TIMEOUT_MESSAGE)
        }
        Err(UpstreamError::Transport(TransportError::Other(text))) => Outcome::error(subject, text),
        Err(UpstreamError::RetryBudgetExhausted) => Outcome::retry_exhausted(subject),
        Err(other) => Outcome::error(subject, other.to_string()),
    }
}
