pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod types;

// Use cases and the ports they depend on
pub mod app;
// File system and Pushgateway adapters
pub mod infra;
