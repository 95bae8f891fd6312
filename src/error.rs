use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::driver::DriverId;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("downstream service error: {0}")]
    Downstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Downstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("invalid job: {0}")]
    Validation(String),

    #[error(transparent)]
    Job(#[from] JobStoreError),
}

#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("driver {0} not found")]
    UnknownDriver(DriverId),

    #[error("driver {driver_id} already reserved by job {held_by}")]
    ReservationConflict { driver_id: DriverId, held_by: Uuid },

    #[error("driver {0} is no longer eligible")]
    Ineligible(DriverId),
}

#[derive(Debug, Error, PartialEq)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    UnknownJob(Uuid),

    #[error("job {0} was cancelled")]
    Cancelled(Uuid),

    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: &'static str,
        to: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("routing provider timed out after {0} ms")]
    Timeout(u128),

    #[error("routing provider returned {0}")]
    Status(u16),

    #[error("malformed routing response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{service} unreachable: {source}")]
    Unreachable {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with status {status}")]
    Failed { service: &'static str, status: u16 },

    #[error("{service} sent an unreadable response: {source}")]
    InvalidResponse {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Validation(msg) => AppError::Validation(msg),
            MatchError::Job(err) => err.into(),
        }
    }
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::UnknownDriver(_) => AppError::NotFound(err.to_string()),
            PoolError::ReservationConflict { .. } | PoolError::Ineligible(_) => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<JobStoreError> for AppError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::UnknownJob(_) => AppError::NotFound(err.to_string()),
            JobStoreError::Cancelled(_) | JobStoreError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<CollaboratorError> for AppError {
    fn from(err: CollaboratorError) -> Self {
        AppError::Downstream(err.to_string())
    }
}
