//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, injected identity)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// API key management endpoints
pub mod api_keys;
/// Registration, login and token refresh
pub mod auth;
/// Service health
pub mod health;
/// Endpoints called by partners with client credentials
pub mod partner;
/// Partner credential management endpoints
pub mod partner_credentials;
/// Profile endpoints
pub mod users;
