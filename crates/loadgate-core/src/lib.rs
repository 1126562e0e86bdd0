//! Core request-dispatch pipeline and backend-state machinery for the
//! loadgate reverse proxy.
//!
//! - [`config`] — settings tree, loading, and semantic validation.
//! - [`models`] — domain types (`Backend`, `Upstream`) and `GatewayError`.
//! - [`services`] — rate limiter, circuit breaker, retrier, health
//!   checker, balancing policies, metrics, and the dispatch pipeline that
//!   composes them.
//! - [`routes`] — actix-web handlers for the front-door and side-car
//!   listeners.
//! - [`logs`] — structured logging setup.
//! - [`utils`] — request-shaping helpers.
//! - [`state`] — shared `AppState` handed to route handlers.

pub mod config;
pub mod logs;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
