//! Logging configuration: an `env_logger` formatter with aligned columns
//! and optional ANSI color, honoring `NO_COLOR`.

pub mod logger;
