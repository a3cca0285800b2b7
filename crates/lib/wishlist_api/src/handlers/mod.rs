//! Request handlers.

pub mod auth;
pub mod gifts;
pub mod health;
pub mod users;
pub mod volunteers;
