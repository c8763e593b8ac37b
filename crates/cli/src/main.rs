use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};

mod commands;
mod printer;

use commands::{Cli, RunConfig};
use shatag_engine::EXIT_USAGE;
use shatag_runtime::logging;

fn main() -> ExitCode {
    logging::init().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        }
    };

    commands::check::run(RunConfig::from_args(cli))
}
