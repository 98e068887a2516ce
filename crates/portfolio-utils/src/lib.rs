//! Shared utilities for portfolio-rs
//!
//! Logging setup and environment configuration helpers used by the binary.

pub mod config;
pub mod logging;

pub use config::{ConfigError, env_var, load_dotenv, parse_value};
pub use logging::{LogFormat, init_tracing};
