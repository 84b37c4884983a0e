use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::add_calculation::add_calculation;
use super::handlers::browse_calculations::browse_calculations;
use super::handlers::calculation_statistics::calculation_statistics;
use super::handlers::change_password::change_password;
use super::handlers::delete_calculation::delete_calculation;
use super::handlers::edit_calculation::edit_calculation;
use super::handlers::get_calculation::get_calculation;
use super::handlers::get_current_user::get_current_user;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::register::register;
use super::handlers::update_profile::update_profile;
use super::middleware::authenticate as auth_middleware;
use crate::domain::calculation::ports::CalculationServicePort;
use crate::domain::user::ports::UserServicePort;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServicePort>,
    pub calculation_service: Arc<dyn CalculationServicePort>,
    pub authenticator: Arc<Authenticator>,
}

pub fn create_router(
    user_service: Arc<dyn UserServicePort>,
    calculation_service: Arc<dyn CalculationServicePort>,
    authenticator: Arc<Authenticator>,
) -> Router {
    let state = AppState {
        user_service,
        calculation_service,
        authenticator,
    };

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/users/register", post(register))
        .route("/users/login", post(login));

    let protected_routes = Router::new()
        .route("/users/me", get(get_current_user).put(update_profile))
        .route("/users/me/password", post(change_password))
        .route(
            "/calculations",
            get(browse_calculations).post(add_calculation),
        )
        .route("/calculations/stats/summary", get(calculation_statistics))
        .route(
            "/calculations/:id",
            get(get_calculation)
                .put(edit_calculation)
                .delete(delete_calculation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
