//! Evaluation outcomes recorded against subjects.
//!
//! An [`Outcome`] is what the operator eventually sees for each subject.
//! Hidden outcomes are placeholders recorded while a throttled subject is
//! being retried out of band; they never count toward completion.

use crate::subject::SubjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message used when the upstream returns a simulation without one.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Autorizado";

/// Message recorded when the primary request times out.
pub const TIMEOUT_MESSAGE: &str = "request timed out";

/// Message recorded when every escalation round was throttled.
pub const RETRY_EXHAUSTED_MESSAGE: &str = "Limite de tentativas atingido";

/// Message shown for subjects that have not been evaluated yet.
pub const PENDING_MESSAGE: &str = "Ainda não consultado";

/// Classification of an evaluated subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The upstream returned a simulation.
    Ok,
    /// The upstream answered with a description instead of a simulation.
    ProcessedNoBenefit,
    /// Transport, authentication or retry-budget failure.
    Error,
    /// Not evaluated yet (only ever synthesized for reports).
    Pending,
}

impl OutcomeStatus {
    /// Operator-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "Consulta OK",
            OutcomeStatus::ProcessedNoBenefit => "Consulta realizada",
            OutcomeStatus::Error => "Erro",
            OutcomeStatus::Pending => "Pendente",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of evaluating one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub gross_balance: f64,
    #[serde(default)]
    pub released_amount: f64,
    pub status: OutcomeStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_true")]
    pub is_final: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

fn default_true() -> bool {
    true
}

impl Outcome {
    /// A successful simulation.
    pub fn authorized(
        subject_id: SubjectId,
        gross_balance: f64,
        released_amount: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject_id,
            gross_balance,
            released_amount,
            status: OutcomeStatus::Ok,
            message: message.into(),
            is_final: true,
            is_hidden: false,
        }
    }

    /// The upstream processed the subject but returned a description only.
    pub fn no_benefit(subject_id: SubjectId, description: impl Into<String>) -> Self {
        Self::final_with(subject_id, OutcomeStatus::ProcessedNoBenefit, description)
    }

    /// A final, visible error.
    pub fn error(subject_id: SubjectId, message: impl Into<String>) -> Self {
        Self::final_with(subject_id, OutcomeStatus::Error, message)
    }

    /// The hidden placeholder recorded while a throttled subject is retried.
    pub fn throttled(subject_id: SubjectId, description: impl Into<String>) -> Self {
        Self {
            is_final: false,
            is_hidden: true,
            ..Self::final_with(subject_id, OutcomeStatus::Error, description)
        }
    }

    /// Terminal error once every escalation round was throttled.
    pub fn retry_exhausted(subject_id: SubjectId) -> Self {
        Self::error(subject_id, RETRY_EXHAUSTED_MESSAGE)
    }

    /// Placeholder for a subject that has no visible outcome yet.
    pub fn pending(subject_id: SubjectId) -> Self {
        Self::final_with(subject_id, OutcomeStatus::Pending, PENDING_MESSAGE)
    }

    fn final_with(
        subject_id: SubjectId,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject_id,
            gross_balance: 0.0,
            released_amount: 0.0,
            status,
            message: message.into(),
            is_final: true,
            is_hidden: false,
        }
    }

    /// Returns true if this outcome counts toward lot completion.
    pub fn counts_as_completed(&self) -> bool {
        !self.is_hidden
    }

    /// One-line operator summary, as shown on the progress view.
    pub fn summary_line(&self) -> String {
        format!(
            "{} - {} | Saldo: R$ {:.2} | Liberado: R$ {:.2}",
            self.subject_id, self.message, self.gross_balance, self.released_amount
        )
    }
}
