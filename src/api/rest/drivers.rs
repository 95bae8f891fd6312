use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::driver::{Driver, DriverId, GeoPoint};
use crate::service::{DriverStatusAck, RegisterDriverRequest};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(register_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
        .route("/drivers/:id/status", put(update_driver_status))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub location: GeoPoint,
    pub active: bool,
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.dispatch.register_driver(payload).await?))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.dispatch.list_drivers())
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DriverId>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.dispatch.get_driver(id)?))
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DriverId>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<DriverStatusAck>, AppError> {
    Ok(Json(state.dispatch.update_driver_location(
        id,
        payload.location,
        payload.active,
    )?))
}
