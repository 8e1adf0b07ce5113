// ABOUTME: Template engine module for the entrypoint wrapper
// ABOUTME: Provides template rendering, the helper function table and the render context

pub mod context;
pub mod engine;
pub mod error;
pub mod helpers;

pub use context::TemplateContext;
pub use engine::{output_path, MissingKeyPolicy, TemplateEngine};
pub use error::{Result, TemplateError};
