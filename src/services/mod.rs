//! Business logic services.
//!
//! Services contain the credential lifecycle logic, separated from HTTP handlers
//! and from the concrete store.

pub mod api_key_service;
pub mod auth_service;
pub mod gateway;
pub mod partner_credential_service;
pub mod quota;
pub mod token_service;
pub mod user_service;
