// ABOUTME: CLI module for the entrypoint wrapper
// ABOUTME: Exports command line interface components and main application logic

pub mod app;
pub mod args;
pub mod config;

pub use app::App;
pub use args::Args;
pub use config::{Config, LogFormat, LoggingConfig};
