use std::{
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context;
use log::info;
use shatag_engine::{Checker, EXIT_OTHER};
use shatag_scheduler::run_batch;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};

use crate::{
    commands::RunConfig,
    printer::{Summary, make_printer},
};

pub fn run(cfg: RunConfig) -> ExitCode {
    match execute(&cfg) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_OTHER)
        }
    }
}

fn execute(cfg: &RunConfig) -> anyhow::Result<ExitCode> {
    let cancel = Arc::new(AtomicBool::new(false));

    // Handlers only set the flag; workers finish the file they are on.
    for sig in [SIGINT, SIGTERM] {
        flag::register(sig, Arc::clone(&cancel))
            .with_context(|| format!("Failed to register signal handler for {sig}"))?;
    }

    let checker = Checker::new(cfg.check_options());
    let printer = make_printer(&cfg.printer_config());

    let stats = run_batch(
        &cfg.files,
        &cfg.batch_options(),
        &checker,
        printer.as_ref(),
        &cancel,
    )?;

    let interrupted = cancel.load(Ordering::Relaxed);
    if interrupted {
        info!("[check] interrupted after {} file(s)", stats.total());
    }

    let summary = Summary { stats, interrupted };
    printer
        .finish(&summary)
        .context("Failed to write summary")?;

    Ok(ExitCode::from(summary.exit_code()))
}
