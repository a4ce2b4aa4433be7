//! HTTP middleware components.
//!
//! Middleware run before route handlers to authenticate the caller and
//! short-circuit unauthorized requests.

/// Bearer token, client credential and API key authentication
pub mod auth;
