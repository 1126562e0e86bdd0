//! Configuration loading and validation.
//!
//! - [`settings`] — the `Settings` tree, its JSON shape, and `load_settings`.
//! - [`validation`] — semantic checks beyond what serde enforces structurally.

pub mod settings;
pub mod validation;
