// ABOUTME: Main application orchestration for the entrypoint CLI
// ABOUTME: Sets up logging, resolves the command, runs the passes and hands off to the workload

use anyhow::Result;
use std::convert::Infallible;
use tokio::runtime::Handle;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::config::{LogFormat, LoggingConfig};
use super::{Args, Config};
use crate::engine::{look_path, Entrypoint, EntrypointError, ProcessLauncher};
use crate::providers::Providers;
use crate::resolver::VariableSnapshot;

pub struct App {
    snapshot: VariableSnapshot,
    logging: LoggingConfig,
}

impl App {
    /// Create a new application instance
    pub fn new(snapshot: VariableSnapshot) -> Self {
        let logging = LoggingConfig::from_snapshot(&snapshot);
        Self { snapshot, logging }
    }

    /// Capture the process environment once, at startup
    pub fn from_env() -> Self {
        Self::new(VariableSnapshot::from_env())
    }

    /// Initialize logging on stderr; stdout belongs to the workload
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        match self.logging.format {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .compact()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
        }

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the whole entrypoint and hand off to the workload.
    ///
    /// Only returns on failure: a successful launch replaces this process.
    pub async fn run(
        &self,
        args: Args,
        launcher: &dyn ProcessLauncher,
    ) -> std::result::Result<Infallible, EntrypointError> {
        info!("entrypoint version: {}", crate::VERSION);
        info!("entrypoint arguments: {}", args.command.join(" "));

        let name = args.command.first().map(String::as_str).unwrap_or_default();
        let program = look_path(name, self.snapshot.get("PATH"))?;
        debug!("Resolved {} to {}", name, program.display());

        let config = Config::from_snapshot(&self.snapshot)?;
        let providers = Providers::aws(config.aws.region.clone(), Handle::current()).map_err(
            |e| EntrypointError::Fetch {
                what: "provider clients".to_string(),
                source: e,
            },
        )?;

        let entrypoint = Entrypoint::new(config, self.snapshot.clone(), providers);
        let handoff = entrypoint.prepare(program, args.command).await?;

        Err(EntrypointError::Handoff(launcher.replace(&handoff)))
    }
}
