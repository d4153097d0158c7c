//! Serve command - HTTP API over the lot registry.
//!
//! | Method | Path                  | Response                 |
//! |--------|-----------------------|--------------------------|
//! | POST   | `/lots`               | `{lot_id}`               |
//! | GET    | `/lots`               | lot summaries            |
//! | GET    | `/lots/:id`           | lot status               |
//! | POST   | `/lots/:id/pause`     | lot status               |
//! | POST   | `/lots/:id/resume`    | lot status               |
//! | GET    | `/lots/:id/export`    | CSV report               |
//! | GET    | `/quota`              | `{count}` for today      |
//!
//! Lots found in the results directory are recovered at startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use lotcheck::export::write_csv;
use lotcheck::lot::{LotError, LotId};
use lotcheck::subject::parse_subject_lines;
use lotcheck::upstream::AsyncHttpClient;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

type Registry<H> = lotcheck::lot::LotRegistry<H>;
type SharedRegistry<H> = Arc<Registry<H>>;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub bind: Option<String>,
}

/// Run the serve command.
pub async fn run(options: &GlobalOptions, args: ServeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options, true)?;
    runner.log_startup("serve");

    let bind = args
        .bind
        .unwrap_or_else(|| runner.config().server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid bind address '{}'", bind)))?;

    let registry = Arc::new(runner.create_registry()?);
    let recovered = registry.recover_all().await?;
    if !recovered.is_empty() {
        info!(count = recovered.len(), "Recovered lots from snapshots");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(CliError::Serve)?;
    info!(%addr, "HTTP API listening");
    println!("Listening on http://{}", addr);

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(CliError::Serve)?;

    info!("HTTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Routes of the HTTP API.
pub fn router<H: AsyncHttpClient>(registry: SharedRegistry<H>) -> Router {
    Router::new()
        .route("/lots", post(submit_lot::<H>).get(list_lots::<H>))
        .route("/lots/:id", get(lot_status::<H>))
        .route("/lots/:id/pause", post(pause_lot::<H>))
        .route("/lots/:id/resume", post(resume_lot::<H>))
        .route("/lots/:id/export", get(export_lot::<H>))
        .route("/quota", get(quota::<H>))
        .with_state(registry)
}

#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    subjects: String,
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn lot_error(err: LotError) -> Response {
    match err {
        LotError::NotFound(_) => json_error(StatusCode::NOT_FOUND, err.to_string()),
        other => json_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn parse_lot_id(raw: &str) -> Result<LotId, Response> {
    LotId::parse(raw)
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, format!("Lot not found: {}", raw)))
}

async fn submit_lot<H: AsyncHttpClient>(
    State(registry): State<SharedRegistry<H>>,
    Form(form): Form<SubmitForm>,
) -> Response {
    let lot_id = registry.submit(parse_subject_lines(&form.subjects)).await;
    (StatusCode::CREATED, Json(json!({ "lot_id": lot_id }))).into_response()
}

async fn list_lots<H: AsyncHttpClient>(State(registry): State<SharedRegistry<H>>) -> Response {
    Json(registry.list().await).into_response()
}

async fn lot_status<H: AsyncHttpClient>(
    State(registry): State<SharedRegistry<H>>,
    Path(id): Path<String>,
) -> Response {
    let lot_id = match parse_lot_id(&id) {
        Ok(lot_id) => lot_id,
        Err(response) => return response,
    };
    match registry.status(&lot_id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => lot_error(e),
    }
}

async fn pause_lot<H: AsyncHttpClient>(
    State(registry): State<SharedRegistry<H>>,
    Path(id): Path<String>,
) -> Response {
    set_paused(&registry, &id, true).await
}

async fn resume_lot<H: AsyncHttpClient>(
    State(registry): State<SharedRegistry<H>>,
    Path(id): Path<String>,
) -> Response {
    set_paused(&registry, &id, false).await
}

async fn set_paused<H: AsyncHttpClient>(
    registry: &Registry<H>,
    id: &str,
    paused: bool,
) -> Response {
    let lot_id = match parse_lot_id(id) {
        Ok(lot_id) => lot_id,
        Err(response) => return response,
    };
    let changed = if paused {
        registry.pause(&lot_id).await
    } else {
        registry.resume(&lot_id).await
    };
    match changed {
        Ok(()) => match registry.status(&lot_id).await {
            Ok(status) => Json(status).into_response(),
            Err(e) => lot_error(e),
        },
        Err(e) => lot_error(e),
    }
}

async fn export_lot<H: AsyncHttpClient>(
    State(registry): State<SharedRegistry<H>>,
    Path(id): Path<String>,
) -> Response {
    let lot_id = match parse_lot_id(&id) {
        Ok(lot_id) => lot_id,
        Err(response) => return response,
    };
    let rows = match registry.report(&lot_id).await {
        Ok(rows) => rows,
        Err(e) => return lot_error(e),
    };

    let mut body = Vec::new();
    if let Err(e) = write_csv(&mut body, &rows) {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    let disposition = format!("attachment; filename=\"{}.csv\"", lot_id);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn quota<H: AsyncHttpClient>(State(registry): State<SharedRegistry<H>>) -> Response {
    let count = registry.context().quota().count_today();
    Json(json!({ "count": count })).into_response()
}
