// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Wrapper flags first, then the workload command line passed through untouched

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "entrypoint")]
#[command(
    about = "Render environment variables and config templates, then exec the workload",
    long_about = "Render environment variables and config templates, then exec the workload.\n\n\
        Behaviour is controlled by ENTRYPOINT_VARS_FILE, ENTRYPOINT_TEMPLATES, \
        ENTRYPOINT_TMPL_OPTION, ENTRYPOINT_LOG_LEVEL and ENTRYPOINT_LOG_FORMAT."
)]
#[command(version)]
pub struct Args {
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND",
        help = "Workload command and its arguments"
    )]
    pub command: Vec<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
