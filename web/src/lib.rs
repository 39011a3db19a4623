//! Axum request pipeline for the Tidy request-processing core.
//!
//! This crate wraps an application's routes in the fixed, ordered chain of
//! request-processing stages and provides the HTTP error type handlers
//! return.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ exception boundary                      │  ← panics, 5xx faults
//! │ ┌─────────────────────────────────────┐ │
//! │ │ runtime mode: logging | HSTS + 429  │ │  ← rate limiter
//! │ │ HTTPS redirect, compression         │ │
//! │ │ static assets                       │ │  ← short-circuit
//! │ │ ┌─────────────────────────────────┐ │ │
//! │ │ │ authentication, authorization   │ │ │  ← 401 / 403
//! │ │ │ routes → handlers → dispatcher  │ │ │
//! │ │ │ fallback: index.html            │ │ │
//! │ │ └─────────────────────────────────┘ │ │
//! │ └─────────────────────────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tidy_web::{AppError, Pipeline, PipelineConfig};
//! use axum::{Router, routing::get};
//!
//! let routes = Router::new()
//!     .route("/api/TodoLists", get(list_todos))
//!     .with_state(app_state);
//!
//! let app = Pipeline::builder(PipelineConfig::default())
//!     .identity(resolver)
//!     .authorization(policy)
//!     .build()
//!     .wrap(routes);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod pipeline;

// Re-export key types for convenience
pub use config::{PipelineConfig, RuntimeMode};
pub use error::AppError;
pub use extractors::{CurrentUser, RequestCancellation};
pub use middleware::{AccessRule, AuthorizationPolicy};
pub use pipeline::{Pipeline, PipelineBuilder};
