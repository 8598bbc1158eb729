// src/main.rs

use buildmon::cli::{self, Command};
use buildmon::{config, logging, resolve_paths, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("buildmon error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();

    // Config first: the logs dir it names receives a copy of the log stream.
    let (cfg, outcome) = config::load_quiet(&args.config);
    let paths = resolve_paths(&cfg)?;

    let log_file = matches!(args.command, Command::Build | Command::Watch).then(|| paths.log_file());
    logging::init_logging(args.log_level, log_file.as_deref())?;
    config::report_load(&args.config, &outcome);

    run(args, cfg, paths).await
}
