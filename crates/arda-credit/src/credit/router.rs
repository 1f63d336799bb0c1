use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::debug;

use super::domain::{CreditApplication, CreditDecision};
use super::service::CreditService;
use crate::error::AppError;

/// Router exposing the credit application endpoint.
pub fn credit_router(service: Arc<CreditService>) -> Router {
    Router::new()
        .route("/api/v1/apply", post(apply_handler))
        .with_state(service)
}

pub(crate) async fn apply_handler(
    State(service): State<Arc<CreditService>>,
    payload: Result<Json<CreditApplication>, JsonRejection>,
) -> Result<Json<CreditDecision>, AppError> {
    let Json(application) = payload.inspect_err(|rejection| {
        debug!(error = %rejection, "rejected credit application body");
    })?;

    let decision = service.apply(application).inspect_err(|err| {
        debug!(error = %err, "rejected credit application");
    })?;

    Ok(Json(decision))
}
