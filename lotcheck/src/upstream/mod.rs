//! Upstream eligibility service.
//!
//! - [`http`] - transport abstraction and the reqwest implementation
//! - [`client`] - login and evaluation exchanges
//! - [`response`] - classification of evaluation responses
//! - [`policy`] - adjustable rate-limit phrase matching

mod client;
mod error;
mod http;
mod policy;
mod response;

pub use client::{SimulationRequest, UpstreamClient};
pub use error::{TransportError, UpstreamError};
pub use http::{AsyncHttpClient, HttpResponse, ReqwestClient};
pub use policy::{RateLimitPolicy, DEFAULT_RATE_LIMIT_PATTERNS};
pub use response::{interpret, to_outcome, Simulation};

#[cfg(test)]
pub use http::tests::{RecordedRequest, ScriptedHttpClient};
