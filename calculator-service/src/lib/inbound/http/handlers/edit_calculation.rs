use auth::AuthenticatedIdentity;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;

use super::add_calculation::CalculationRequest;
use super::ApiError;
use super::ApiSuccess;
use super::CalculationData;
use crate::calculation::models::CalculationId;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

pub async fn edit_calculation(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
    Json(body): Json<CalculationRequest>,
) -> Result<ApiSuccess<CalculationData>, ApiError> {
    let command = body.try_into_command()?;

    state
        .calculation_service
        .edit(&UserId::from(&identity), &CalculationId(id), command)
        .await
        .map_err(ApiError::from)
        .map(|ref calculation| ApiSuccess::new(StatusCode::OK, calculation.into()))
}
