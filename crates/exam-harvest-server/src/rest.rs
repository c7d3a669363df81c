//! HTTP REST API over the job manager.
//!
//! Every route lives under `/api`. Errors come back as `{ "error": message }`
//! with a status code derived from the underlying [`HarvestError`].

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use exam_harvest::{flatten, to_csv, HarvestError, Target};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/categories", get(categories))
        .route("/api/exams/:category", get(exams_for_category))
        .route("/api/scrape", post(start_scrape))
        .route("/api/job/:job_id", get(job_status))
        .route("/api/jobs", get(list_jobs))
        .route("/api/download/:job_id", get(download))
        .route("/api/cleanup/:job_id", delete(cleanup))
        .route("/api/events", get(events_sse))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API on `addr` until the listener fails.
pub async fn start(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Errors ──────────────────────────────────────────────────────

/// A [`HarvestError`] rendered as an HTTP response.
pub struct ApiError(pub HarvestError);

impl From<HarvestError> for ApiError {
    fn from(e: HarvestError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            HarvestError::InvalidRequest(_) | HarvestError::JobNotCompleted(_) => {
                StatusCode::BAD_REQUEST
            }
            HarvestError::JobNotFound(_) => StatusCode::NOT_FOUND,
            HarvestError::TooManyJobs(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": "exam-harvest",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "active_jobs": state.manager.running_count(),
    }))
}

async fn categories(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "categories": state.manager.config().catalog.category_names() }))
}

/// Exams for one category; an unknown category lists none.
async fn exams_for_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Json<Value> {
    Json(json!({ "exams": state.manager.config().catalog.exams(&category) }))
}

/// Body of `POST /api/scrape`. The exam code is accepted in either casing.
#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub category: Option<String>,
    #[serde(rename = "examCode", alias = "exam_code")]
    pub exam_code: Option<String>,
    pub targets: Option<Vec<Target>>,
}

async fn start_scrape(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body.map_err(|e| HarvestError::InvalidRequest(e.body_text()))?;

    let category = req.category.unwrap_or_default();
    let exam_code = req.exam_code.unwrap_or_default();
    let targets = req.targets.unwrap_or_default();
    let count = targets.len();

    let job_id = state.manager.create(&category, &exam_code, targets)?;
    Ok(Json(json!({
        "job_id": job_id,
        "jobId": job_id,
        "status": "started",
        "message": format!("Started scraping {count} links for {}", exam_code.trim()),
    })))
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let job = state.manager.get(&job_id)?;
    Ok(Json(serde_json::to_value(job).map_err(HarvestError::from)?))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let jobs = serde_json::to_value(state.manager.list()).map_err(HarvestError::from)?;
    Ok(Json(json!({ "jobs": jobs })))
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    /// `csv` for a CSV attachment, `flat` for JSON with pipe-joined list
    /// fields; anything else means full records.
    pub format: Option<String>,
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> ApiResult<Response> {
    let records = state.manager.records_for_download(&job_id)?;
    let response = match params.format.as_deref() {
        Some("csv") => {
            let body = to_csv(&records)?;
            let disposition = format!("attachment; filename=\"{job_id}.csv\"");
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Some("flat") => Json(flatten(&records)).into_response(),
        _ => Json(records).into_response(),
    };
    Ok(response)
}

async fn cleanup(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.manager.delete(&job_id)?;
    Ok(Json(json!({ "message": "Job cleaned up successfully" })))
}

/// SSE query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct EventsParams {
    pub job_id: Option<String>,
}

/// Server-Sent Events stream of job events, optionally for one job only.
async fn events_sse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsParams>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.manager.events().subscribe();
    let job_filter = params.job_id;

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(ref id) = job_filter {
                        if event.job_id() != id.as_str() {
                            continue;
                        }
                    }
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(Event::default().data(json));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE subscriber lagged");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let status = |e: HarvestError| ApiError(e).status();
        assert_eq!(status(HarvestError::InvalidRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(HarvestError::JobNotCompleted("j".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(HarvestError::JobNotFound("j".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(HarvestError::TooManyJobs(2)), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status(HarvestError::Setup("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_scrape_request_accepts_both_casings() {
        let camel: ScrapeRequest =
            serde_json::from_str(r#"{"category":"aws","examCode":"saa-c03"}"#).unwrap();
        let snake: ScrapeRequest =
            serde_json::from_str(r#"{"category":"aws","exam_code":"saa-c03"}"#).unwrap();
        assert_eq!(camel.exam_code.as_deref(), Some("saa-c03"));
        assert_eq!(snake.exam_code.as_deref(), Some("saa-c03"));
        assert!(camel.targets.is_none());
    }
}
