//! Developer portal backend.
//!
//! Account registration and login, profile management, and the lifecycle of the
//! credentials the portal hands out: session tokens, API keys, and partner
//! (SNAP) client-ID/secret pairs with optional RSA public keys.
//!
//! The binary in `main.rs` wires these modules over PostgreSQL. Tests build the
//! same router over [`store::memory::MemoryStore`].

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
