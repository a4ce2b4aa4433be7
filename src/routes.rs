//! HTTP route table.
//!
//! | Group                | Authentication                   |
//! |----------------------|----------------------------------|
//! | `/health`, `/auth/*` | none                             |
//! | developer routes     | `Authorization: Bearer <access>` |
//! | `/partner/*`         | `X-Client-Id` + `X-Client-Secret`|
//! | `/developer/*`       | `X-API-Key`                      |

use axum::{
    Router,
    http::{HeaderValue, Method, header, header::InvalidHeaderValue},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware, state::AppState};

/// Build the application router with request tracing.
pub fn build_router(state: AppState) -> Router {
    // Routes for signed-in developers
    let developer_routes = Router::new()
        .route(
            "/api/v1/users/me",
            get(handlers::users::get_profile).put(handlers::users::update_profile),
        )
        .route(
            "/api/v1/api-keys",
            get(handlers::api_keys::list_api_keys).post(handlers::api_keys::create_api_key),
        )
        .route(
            "/api/v1/api-keys/{id}",
            get(handlers::api_keys::get_api_key).delete(handlers::api_keys::revoke_api_key),
        )
        .route(
            "/api/v1/partner-credentials",
            get(handlers::partner_credentials::list_partner_credentials)
                .post(handlers::partner_credentials::create_partner_credential),
        )
        .route(
            "/api/v1/partner-credentials/{id}",
            get(handlers::partner_credentials::get_partner_credential)
                .put(handlers::partner_credentials::update_partner_credential)
                .delete(handlers::partner_credentials::delete_partner_credential),
        )
        .route(
            "/api/v1/partner-credentials/{id}/public-key",
            put(handlers::partner_credentials::update_public_key),
        )
        .route(
            "/api/v1/partner-credentials/{id}/regenerate-secret",
            post(handlers::partner_credentials::regenerate_secret),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_access_token,
        ));

    // Routes for partner integrations
    let partner_routes = Router::new()
        .route("/api/v1/partner/me", get(handlers::partner::current_partner))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_client_credentials,
        ));

    // Routes for API key holders
    let api_key_routes = Router::new()
        .route(
            "/api/v1/developer/me",
            get(handlers::api_keys::current_api_key),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_key,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .merge(developer_routes)
        .merge(partner_routes)
        .merge(api_key_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the portal frontend.
///
/// # Errors
///
/// Returns an error if an origin is not a valid header value.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ]))
}
