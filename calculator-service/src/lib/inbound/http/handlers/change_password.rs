use auth::AuthenticatedIdentity;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::Password;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;
use crate::user::errors::PasswordPolicyError;
use crate::user::errors::UserError;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

impl ChangePasswordRequest {
    fn try_into_command(self) -> Result<ChangePasswordCommand, PasswordPolicyError> {
        let new_password = Password::new(self.new_password)?;
        ChangePasswordCommand::new(self.old_password, new_password)
    }
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let command = req.try_into_command().map_err(UserError::from)?;

    state
        .user_service
        .change_password(&UserId::from(&identity), command)
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::NO_CONTENT)
}
