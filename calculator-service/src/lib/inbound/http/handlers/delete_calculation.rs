use auth::AuthenticatedIdentity;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::calculation::models::CalculationId;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteCalculationData {
    pub message: String,
    pub id: i64,
}

pub async fn delete_calculation(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
) -> Result<ApiSuccess<DeleteCalculationData>, ApiError> {
    state
        .calculation_service
        .delete(&UserId::from(&identity), &CalculationId(id))
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        DeleteCalculationData {
            message: "Calculation deleted successfully".to_string(),
            id,
        },
    ))
}
