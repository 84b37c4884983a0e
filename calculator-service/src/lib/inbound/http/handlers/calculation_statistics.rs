use auth::AuthenticatedIdentity;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::StatisticsData;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

pub async fn calculation_statistics(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<ApiSuccess<StatisticsData>, ApiError> {
    state
        .calculation_service
        .statistics(&UserId::from(&identity))
        .await
        .map_err(ApiError::from)
        .map(|stats| ApiSuccess::new(StatusCode::OK, stats.into()))
}
