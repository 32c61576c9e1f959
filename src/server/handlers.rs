use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::daemon::storage::entities::{DaySummary, TimeData};

use super::{
    error::ApiError,
    types::{RealtimeUpdate, SuccessResponse, MAX_INCREMENT_SECONDS},
    ApiState,
};

/// POST /api/realtime-update: Merge one increment into today's aggregate.
pub async fn realtime_update(
    State(state): State<ApiState>,
    body: Result<Json<RealtimeUpdate>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(update) = body?;

    if update.seconds > MAX_INCREMENT_SECONDS {
        return Err(ApiError::ImplausibleSeconds {
            got: update.seconds,
            max: MAX_INCREMENT_SECONDS,
        });
    }

    let today = state.clock.today();
    let charged = state.store.apply(&state.user_id, &update, today).await?;
    info!(
        domain = %update.domain,
        seconds = update.seconds,
        "Recorded {charged} time for {today}"
    );

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/time-data: Every recorded day of the user.
pub async fn time_data(State(state): State<ApiState>) -> Result<Json<TimeData>, ApiError> {
    Ok(Json(state.store.time_data(&state.user_id).await?))
}

/// GET /api/weekly-report: Totals of the last 7 recorded days, oldest first.
pub async fn weekly_report(
    State(state): State<ApiState>,
) -> Result<Json<Vec<DaySummary>>, ApiError> {
    Ok(Json(state.store.weekly_report(&state.user_id).await?))
}

/// GET /api/health: Simple health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
