use entrypoint::cli::{App, Args};
use entrypoint::engine::ExecLauncher;
use tracing::error;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    let app = App::from_env();

    if let Err(e) = app.init_logging(args.verbose, args.no_color) {
        eprintln!("entrypoint: failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    let err = match app.run(args, &ExecLauncher).await {
        Ok(never) => match never {},
        Err(e) => e,
    };

    error!("{}: {}", err.kind(), err);
    std::process::exit(err.exit_code());
}
