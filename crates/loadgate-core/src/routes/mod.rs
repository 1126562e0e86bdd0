//! Front-door and side-car HTTP surfaces.
//!
//! - [`health`] / [`status`] — front-door introspection endpoints.
//! - [`proxy`] — the catch-all handler that feeds every other request into
//!   the dispatch pipeline.
//! - [`metrics_route`] — the side-car listener's `/metrics` and `/health`.

pub mod health;
pub mod metrics_route;
pub mod proxy;
pub mod status;
