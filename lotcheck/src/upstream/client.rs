//! Client for the upstream eligibility service.
//!
//! Wraps an [`AsyncHttpClient`] with the two exchanges the service offers:
//! a login returning a bearer token, and a per-subject evaluation.

use super::error::{TransportError, UpstreamError};
use super::http::{AsyncHttpClient, HttpResponse};
use crate::auth::{CredentialSource, LoginGrant};
use crate::config::UpstreamConfig;
use crate::subject::SubjectId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Evaluation payload for one subject.
///
/// Field names are the upstream's wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationRequest {
    #[serde(rename = "cpf")]
    pub subject_id: String,
    #[serde(rename = "parcelas")]
    pub installments: u32,
    #[serde(rename = "convenio")]
    pub agreement_type: u32,
    #[serde(rename = "produto")]
    pub product: u32,
}

impl SimulationRequest {
    /// The fixed evaluation request for `subject`.
    pub fn for_subject(subject: &SubjectId) -> Self {
        Self {
            subject_id: subject.as_str().to_string(),
            installments: 0,
            agreement_type: 1,
            product: 1,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "objectReturn")]
    object_return: Option<LoginObject>,
}

#[derive(Deserialize)]
struct LoginObject {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Upstream client bound to static endpoint configuration.
pub struct UpstreamClient<H: AsyncHttpClient> {
    http: H,
    config: UpstreamConfig,
}

impl<H: AsyncHttpClient> UpstreamClient<H> {
    /// Creates a client for the configured endpoints.
    pub fn new(http: H, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    /// Endpoint configuration.
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Performs one evaluation exchange.
    ///
    /// Returns the raw response; interpretation is left to the caller.
    pub async fn evaluate(
        &self,
        request: &SimulationRequest,
        token: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let body = serde_json::to_string(request)
            .map_err(|e| TransportError::Other(format!("Failed to encode request: {}", e)))?;
        let bearer = (!token.is_empty()).then_some(token);

        let response = self
            .http
            .post_json(self.config.simulate_url(), &body, bearer, timeout)
            .await?;

        debug!(
            subject = %request.subject_id,
            status = response.status,
            "Evaluation response received"
        );
        Ok(response)
    }
}

impl<H: AsyncHttpClient> CredentialSource for UpstreamClient<H> {
    async fn login(&self) -> Result<LoginGrant, UpstreamError> {
        let body = serde_json::to_string(&LoginRequest {
            username: self.config.username(),
            password: self.config.password(),
        })
        .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        let response = self
            .http
            .post_json(self.config.login_url(), &body, None, self.config.login_timeout())
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "Login rejected by upstream");
            return Err(UpstreamError::AuthFailure(format!(
                "login returned HTTP {}",
                response.status
            )));
        }

        let parsed: LoginResponse = serde_json::from_str(&response.body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("login response: {}", e)))?;

        let success = parsed.success;
        let object = parsed.object_return.filter(|_| success).ok_or_else(|| {
            UpstreamError::AuthFailure("login response reported failure".to_string())
        })?;

        let access_token = object
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| UpstreamError::InvalidResponse("missing access_token".to_string()))?;

        Ok(LoginGrant {
            access_token,
            ttl: object.expires_in.map(Duration::from_secs),
        })
    }
}
