// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;

pub use auth::{health, login, logout, register, secrets};
