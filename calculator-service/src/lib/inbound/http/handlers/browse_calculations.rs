use auth::AuthenticatedIdentity;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::CalculationData;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

pub async fn browse_calculations(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<ApiSuccess<Vec<CalculationData>>, ApiError> {
    let calculations = state
        .calculation_service
        .browse(&UserId::from(&identity))
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        calculations.iter().map(CalculationData::from).collect(),
    ))
}
