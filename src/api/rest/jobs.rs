use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use uuid::Uuid;

use crate::error::AppError;
use crate::service::{InvoiceResponse, JobStatusResponse, SubmitJobRequest, SubmitJobResponse};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:id", get(get_job_status))
        .route("/jobs/:id/cancel", post(cancel_job))
        .route("/jobs/:id/complete", post(complete_job))
        .route("/jobs/:id/invoice", post(invoice_job))
}

async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitJobRequest>,
) -> Result<Json<SubmitJobResponse>, AppError> {
    Ok(Json(state.dispatch.submit_job(payload).await?))
}

async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    Ok(Json(state.dispatch.get_job_status(id)?))
}

async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    Ok(Json(state.dispatch.cancel_job(id)?))
}

async fn complete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    Ok(Json(state.dispatch.complete_job(id)?))
}

async fn invoice_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    Ok(Json(state.dispatch.invoice_job(id).await?))
}
