//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response bodies built from them.

/// API key model
pub mod api_key;
/// Partner (SNAP) client credential model
pub mod partner_credential;
/// Shared lifecycle and classification enums
pub mod status;
/// Developer account model
pub mod user;
