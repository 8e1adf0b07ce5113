// ABOUTME: Main library module for the container entrypoint wrapper
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod providers;
pub mod resolver;
pub mod template;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{Entrypoint, EntrypointError, ErrorKind, Handoff};
pub use providers::Providers;
pub use resolver::VariableSnapshot;
pub use template::{MissingKeyPolicy, TemplateContext, TemplateEngine};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
