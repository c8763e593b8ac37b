pub mod check;

use std::path::PathBuf;

use clap::{Args, Parser};
use shatag_engine::CheckOptions;
use shatag_runtime::default_concurrency;
use shatag_scheduler::{BatchOptions, Mode};

use crate::printer::{ColorChoice, OutputFormat, PrinterConfig, Verbosity};

#[derive(Parser, Debug)]
#[command(
    name = "shatag",
    version,
    about = "Detect silent data corruption by storing sha256 and mtime in extended attributes",
    after_help = "Exit status: 0 clean, 1 usage error, 2 open errors, 3 not a regular file, \
                  4 attribute write errors, 5 corrupt file found, 6 other or mixed errors."
)]
pub struct Cli {
    /// Remove the stored extended attributes instead of checking
    #[arg(long)]
    pub remove: bool,

    /// Don't print <ok> and <removed xattr> lines
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Only print <corrupt> lines and errors (implies -q)
    #[arg(long = "qq")]
    pub quieter: bool,

    /// Descend into directories. Symbolic links are not followed
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Don't make any changes
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite the stored sha256 of corrupt files
    #[arg(long)]
    pub fix: bool,

    /// Number of files checked in parallel [default: number of CPUs]
    #[arg(long, short = 'j', value_name = "N", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Output formatting options
    #[command(flatten)]
    pub output: OutputOptions,

    /// Files (or, with --recursive, directories) to check
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OutputOptions {
    /// Output results as NDJSON (one JSON object per line)
    #[arg(long)]
    pub json: bool,

    /// When to use colors: auto, always, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: String,
}

fn parse_jobs(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Everything one invocation needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub files: Vec<PathBuf>,
    pub mode: Mode,
    pub verbosity: Verbosity,
    pub recursive: bool,
    pub dry_run: bool,
    pub force_fix: bool,
    pub jobs: usize,
    pub format: OutputFormat,
    pub color: ColorChoice,
}

impl RunConfig {
    pub fn from_args(cli: Cli) -> Self {
        let mode = if cli.remove { Mode::Remove } else { Mode::Check };

        let verbosity = if cli.quieter {
            Verbosity::Quieter
        } else if cli.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };

        let format = if cli.output.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        };

        let color = match cli.output.color.as_str() {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        };

        Self {
            files: cli.files,
            mode,
            verbosity,
            recursive: cli.recursive,
            dry_run: cli.dry_run,
            force_fix: cli.fix,
            jobs: cli.jobs.unwrap_or_else(default_concurrency),
            format,
            color,
        }
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            dry_run: self.dry_run,
            force_fix: self.force_fix,
            ..CheckOptions::detect()
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            concurrency: self.jobs,
            recursive: self.recursive,
            mode: self.mode,
        }
    }

    pub fn printer_config(&self) -> PrinterConfig {
        PrinterConfig {
            format: self.format,
            color: self.color,
            verbosity: self.verbosity,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
