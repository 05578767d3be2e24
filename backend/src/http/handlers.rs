//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to one endpoint and delegates to the service
//! layer. Bodies are taken as `Result<Json<_>, JsonRejection>` so decoding
//! failures surface as 400 through [`AppError`].

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::dto::{HealthResponse, Profit, ProfitBody};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Reports whether the process answers and whether the store is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Profit CRUD
// =============================================================================

/// GET /profits
pub async fn list_profits(State(state): State<AppState>) -> HandlerResult<Vec<Profit>> {
    let profits = db_services::list_profits(state.repository.as_ref()).await?;
    Ok(Json(profits))
}

/// GET /profits/{id}
pub async fn get_profit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Profit> {
    let profit = db_services::get_profit(state.repository.as_ref(), &id).await?;
    Ok(Json(profit))
}

/// POST /profits
///
/// Validates the draft, stores it and returns the stored record with its
/// assigned `_id`.
pub async fn create_profit(
    State(state): State<AppState>,
    body: Result<Json<ProfitBody>, JsonRejection>,
) -> HandlerResult<Profit> {
    let Json(draft) = body?;
    let profit = db_services::create_profit(state.repository.as_ref(), &draft).await?;
    Ok(Json(profit))
}

/// PUT /profits/{id}
///
/// Overwrites only the supplied fields and returns the re-read record.
pub async fn update_profit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ProfitBody>, JsonRejection>,
) -> HandlerResult<Profit> {
    let patch = match body {
        Ok(Json(patch)) => patch,
        Err(rejection) => {
            // A malformed id wins over a bad body.
            db_services::parse_profit_id(&id)?;
            return Err(rejection.into());
        }
    };
    let profit = db_services::update_profit(state.repository.as_ref(), &id, &patch).await?;
    Ok(Json(profit))
}

/// DELETE /profits/{id}
///
/// Returns the record that was removed.
pub async fn delete_profit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Profit> {
    let profit = db_services::delete_profit(state.repository.as_ref(), &id).await?;
    Ok(Json(profit))
}
