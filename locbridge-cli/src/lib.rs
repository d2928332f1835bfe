//! CLI library for testing purposes

pub mod host;

pub use host::{LoggingProjectCache, Settings, build_config};
