use std::process::ExitCode;

use clap::Parser;
use hospital_lib::cli::{self, Cli};
use hospital_lib::config::{APP_NAME, APP_VERSION};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error [{}]: {e}", e.kind());
            return ExitCode::FAILURE;
        }
    };
    hospital_lib::init_tracing(&config.log_filter);
    tracing::debug!("{APP_NAME} v{APP_VERSION}");

    match cli::run(config, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error [{}]: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}
