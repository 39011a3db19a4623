//! HTTP request handlers.

pub mod health;

pub use health::{alive, health_check, health_routes};
