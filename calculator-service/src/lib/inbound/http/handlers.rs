use std::collections::BTreeMap;

use auth::PasswordError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::calculation::errors::CalculationError;
use crate::calculation::models::Calculation;
use crate::calculation::models::CalculationStatistics;
use crate::user::errors::UserError;
use crate::user::models::User;
use crate::user::models::UserSession;

pub mod add_calculation;
pub mod browse_calculations;
pub mod calculation_statistics;
pub mod change_password;
pub mod delete_calculation;
pub mod edit_calculation;
pub mod get_calculation;
pub mod get_current_user;
pub mod health;
pub mod login;
pub mod register;
pub mod update_profile;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::NotFoundByUsername(_) => {
                ApiError::NotFound(err.to_string())
            }
            UserError::UsernameAlreadyExists(_) | UserError::EmailAlreadyExists(_) => {
                ApiError::Conflict(err.to_string())
            }
            UserError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            UserError::InvalidUsername(_)
            | UserError::InvalidEmail(_)
            | UserError::InvalidPassword(_)
            | UserError::Password(PasswordError::CredentialTooLong { .. }) => {
                ApiError::UnprocessableEntity(err.to_string())
            }
            UserError::Password(PasswordError::HashingFailed(_))
            | UserError::Token(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<CalculationError> for ApiError {
    fn from(err: CalculationError) -> Self {
        match err {
            CalculationError::InvalidOperation(_) => ApiError::UnprocessableEntity(err.to_string()),
            CalculationError::Computation(_) => ApiError::BadRequest(err.to_string()),
            CalculationError::NotFound(_) => {
                ApiError::NotFound("Calculation not found".to_string())
            }
            CalculationError::DatabaseError(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

/// Body returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub user: UserData,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

impl From<UserSession> for SessionData {
    fn from(session: UserSession) -> Self {
        Self {
            user: (&session.user).into(),
            access_token: session.access_token.into_string(),
            token_type: "bearer",
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationData {
    pub id: i64,
    pub a: f64,
    pub b: f64,
    #[serde(rename = "type")]
    pub operation: String,
    pub result: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Calculation> for CalculationData {
    fn from(calculation: &Calculation) -> Self {
        Self {
            id: calculation.id.0,
            a: calculation.a,
            b: calculation.b,
            operation: calculation.operation.as_str().to_string(),
            result: calculation.result,
            created_at: calculation.created_at,
            updated_at: calculation.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsData {
    pub total_calculations: usize,
    pub operation_counts: BTreeMap<String, usize>,
    pub average_a: f64,
    pub average_b: f64,
    pub most_used_operation: Option<String>,
}

impl From<CalculationStatistics> for StatisticsData {
    fn from(stats: CalculationStatistics) -> Self {
        Self {
            total_calculations: stats.total_calculations,
            operation_counts: stats
                .operation_counts
                .into_iter()
                .map(|(operation, count)| (operation.as_str().to_string(), count))
                .collect(),
            average_a: stats.average_a,
            average_b: stats.average_b,
            most_used_operation: stats.most_used_operation.map(|op| op.as_str().to_string()),
        }
    }
}
