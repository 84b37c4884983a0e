use auth::AuthenticatedIdentity;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::CalculationData;
use crate::calculation::models::CalculationId;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

pub async fn get_calculation(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
) -> Result<ApiSuccess<CalculationData>, ApiError> {
    state
        .calculation_service
        .read(&UserId::from(&identity), &CalculationId(id))
        .await
        .map_err(ApiError::from)
        .map(|ref calculation| ApiSuccess::new(StatusCode::OK, calculation.into()))
}
