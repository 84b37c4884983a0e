use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticatedIdentity;
use auth::IdentityLookup;
use auth::LookupError;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserServicePort;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// Resolves token identity references through the user service.
pub struct UserServiceLookup {
    user_service: Arc<dyn UserServicePort>,
}

impl UserServiceLookup {
    pub fn new(user_service: Arc<dyn UserServicePort>) -> Self {
        Self { user_service }
    }
}

#[async_trait]
impl IdentityLookup for UserServiceLookup {
    async fn find_by_id(
        &self,
        user_id: i64,
    ) -> Result<Option<AuthenticatedIdentity>, LookupError> {
        match self.user_service.get_user(&UserId(user_id)).await {
            Ok(user) => Ok(Some(user.identity())),
            Err(UserError::NotFound(_)) => Ok(None),
            Err(e) => Err(LookupError(e.to_string())),
        }
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthenticatedIdentity>, LookupError> {
        // Names that fail validation were never stored
        let Ok(username) = Username::new(username.to_string()) else {
            return Ok(None);
        };

        match self.user_service.get_user_by_username(&username).await {
            Ok(user) => Ok(Some(user.identity())),
            Err(UserError::NotFoundByUsername(_)) => Ok(None),
            Err(e) => Err(LookupError(e.to_string())),
        }
    }
}

/// Middleware that resolves the bearer token and adds the identity to request extensions
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token_from_header(&req)?.to_string();

    let lookup = UserServiceLookup::new(Arc::clone(&state.user_service));
    let identity = state
        .authenticator
        .resolve_identity(&token, &lookup)
        .await
        .map_err(|e| {
            if e.is_unauthenticated() {
                tracing::warn!(reason = e.kind(), "Token rejected");
                unauthorized()
            } else {
                ApiError::InternalServerError(e.to_string()).into_response()
            }
        })?;

    tracing::debug!(user_id = identity.user_id, "Request authenticated");
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

fn unauthorized() -> Response {
    ApiError::Unauthorized("Could not validate credentials".to_string()).into_response()
}

fn extract_token_from_header(req: &Request) -> Result<&str, Response> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| {
            tracing::debug!("Missing Authorization header");
            unauthorized()
        })?;

    let auth_str = auth_header.to_str().map_err(|_| unauthorized())?;

    auth_str
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(unauthorized)
}
