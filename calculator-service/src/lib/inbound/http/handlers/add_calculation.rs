use auth::AuthenticatedIdentity;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::CalculationData;
use crate::calculation::errors::OperationError;
use crate::calculation::models::CalculationCommand;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

pub async fn add_calculation(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Json(body): Json<CalculationRequest>,
) -> Result<ApiSuccess<CalculationData>, ApiError> {
    let command = body.try_into_command()?;

    state
        .calculation_service
        .add(&UserId::from(&identity), command)
        .await
        .map_err(ApiError::from)
        .map(|ref calculation| ApiSuccess::new(StatusCode::CREATED, calculation.into()))
}

/// HTTP request body for adding or editing a calculation (raw JSON).
///
/// `b` may be omitted for unary operations and then defaults to zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculationRequest {
    a: f64,
    #[serde(default)]
    b: f64,
    #[serde(rename = "type")]
    operation: String,
}

impl CalculationRequest {
    pub(super) fn try_into_command(self) -> Result<CalculationCommand, OperationError> {
        Ok(CalculationCommand {
            a: self.a,
            b: self.b,
            operation: self.operation.parse()?,
        })
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}
