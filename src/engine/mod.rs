// ABOUTME: Run engine for the entrypoint wrapper
// ABOUTME: Inline environment rendering, the concurrent file pass and the final exec handoff

pub mod error;
pub mod executor;
pub mod handoff;
pub mod inline;
pub mod scheduler;

pub use error::{EntrypointError, ErrorKind, FileRenderFailure, Result};
pub use executor::Entrypoint;
pub use handoff::{look_path, ExecLauncher, Handoff, LaunchError, ProcessLauncher};
pub use inline::{is_inline_template, render_inline, InlineOutcome};
pub use scheduler::TemplateScheduler;
