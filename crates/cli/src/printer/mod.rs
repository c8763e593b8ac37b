use std::{
    io::{self, IsTerminal, Write},
    path::Path,
    sync::{Mutex, PoisonError},
};

use log::{debug, warn};
use serde_json::json;
use shatag_engine::{
    Comparison, Decision, FileReport, OptDigest, OptTimestamp, Outcome, StatsSnapshot,
};
use shatag_scheduler::Reporter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tagged lines, as `<ok> path`.
    #[default]
    Human,
    /// NDJSON (newline-delimited JSON) for machine consumption.
    Json,
}

/// Color handling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Automatically detect TTY and enable colors if appropriate.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// How much per-file output to produce. Errors are always printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    #[default]
    Normal,
    /// Hide `<ok>` and `<removed xattr>`.
    Quiet,
    /// Only corrupt files and errors.
    Quieter,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrinterConfig {
    pub format: OutputFormat,
    pub color: ColorChoice,
    pub verbosity: Verbosity,
}

/// End-of-run information.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub stats: StatsSnapshot,
    /// A signal stopped the batch before every file was seen.
    pub interrupted: bool,
}

impl Summary {
    pub fn exit_code(&self) -> u8 {
        self.stats.exit_code()
    }
}

/// A [`Reporter`] that also renders the end-of-run summary.
pub trait Printer: Reporter {
    fn finish(&self, summary: &Summary) -> io::Result<()>;
}

pub fn make_printer(cfg: &PrinterConfig) -> Box<dyn Printer> {
    match cfg.format {
        OutputFormat::Human => Box::new(HumanPrinter::<io::Stdout, io::Stderr>::stdout(*cfg)),
        OutputFormat::Json => Box::new(JsonPrinter::<io::Stdout, io::Stderr>::stdout(*cfg)),
    }
}

/// Whether a result at `outcome` is shown at `verbosity`.
fn visible(outcome: Outcome, verbosity: Verbosity) -> bool {
    match outcome {
        Outcome::Corrupt => true,
        o if o.is_error() => true,
        Outcome::Ok | Outcome::Removed => verbosity == Verbosity::Normal,
        _ => verbosity < Verbosity::Quieter,
    }
}

fn decision_tag(decision: Decision) -> &'static str {
    match decision {
        Decision::Ok => "ok",
        Decision::Corrupt => "corrupt",
        Decision::TimeChange => "timechange",
        Decision::Outdated => "outdated",
        Decision::New => "new",
    }
}

/// Output and error stream, locked together so a file's lines stay adjacent.
struct Streams<W, E> {
    out: W,
    err: E,
}

/// Human-readable printer with optional color support.
pub struct HumanPrinter<W: Write, E: Write> {
    streams: Mutex<Streams<W, E>>,
    cfg: PrinterConfig,
    use_color: bool,
}

impl<W: Write, E: Write> HumanPrinter<W, E> {
    /// Printer over arbitrary writers. `Auto` color means no color here.
    pub fn new(out: W, err: E, cfg: PrinterConfig) -> Self {
        let use_color = cfg.color == ColorChoice::Always;
        Self {
            streams: Mutex::new(Streams { out, err }),
            cfg,
            use_color,
        }
    }

    /// Create a printer that writes to stdout and stderr with TTY detection.
    pub fn stdout(cfg: PrinterConfig) -> HumanPrinter<io::Stdout, io::Stderr> {
        let use_color = match cfg.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        };

        HumanPrinter {
            streams: Mutex::new(Streams {
                out: io::stdout(),
                err: io::stderr(),
            }),
            cfg,
            use_color,
        }
    }

    pub fn into_inner(self) -> (W, E) {
        let streams = self
            .streams
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (streams.out, streams.err)
    }

    fn tag(&self, tag: &str) -> String {
        if !self.use_color {
            return format!("<{tag}>");
        }
        let color = match tag {
            "ok" | "removed xattr" => "32",
            "corrupt" => "31",
            _ => "33",
        };
        format!("\x1b[{color}m<{tag}>\x1b[0m")
    }

    fn write_report(&self, s: &mut Streams<W, E>, r: &FileReport) -> io::Result<()> {
        let verbosity = self.cfg.verbosity;
        let path = r.path.display();

        match r.outcome {
            Outcome::Ok => writeln!(s.out, "{} {path}", self.tag("ok"))?,
            Outcome::Removed => writeln!(s.out, "{} {path}", self.tag("removed xattr"))?,
            Outcome::ConcurrentModification => {
                writeln!(s.out, "{} {path}", self.tag("concurrent modification"))?
            }
            Outcome::Corrupt => {
                let fixing = if r.fix_requested {
                    "Fixing hash (--fix was passed)."
                } else {
                    "Keeping hash as-is (use --fix to force hash update)."
                };
                writeln!(s.err, "Error: corrupt file {:?}. {fixing}", r.path)?;
                writeln!(s.out, "{} {path}", self.tag("corrupt"))?;
            }
            // A classified file, possibly one whose update then failed.
            _ => {
                if let Some(decision) = r.decision
                    && verbosity < Verbosity::Quieter
                {
                    writeln!(s.out, "{} {path}", self.tag(decision_tag(decision)))?;
                }
            }
        }

        if verbosity < Verbosity::Quieter
            && let Some(cmp) = &r.comparison
            && r.decision != Some(Decision::Ok)
        {
            write_comparison(&mut s.out, cmp)?;
        }

        if let Some(e) = &r.error {
            writeln!(s.err, "Error: {e}")?;
        }

        Ok(())
    }
}

/// ` stored: <hex> <ts>` / ` actual: <hex> <ts>`
fn write_comparison<W: Write>(out: &mut W, cmp: &Comparison) -> io::Result<()> {
    writeln!(
        out,
        " stored: {} {}",
        OptDigest(cmp.stored.digest),
        OptTimestamp(cmp.stored.timestamp)
    )?;
    writeln!(out, " actual: {} {}", cmp.actual.digest, cmp.actual.timestamp)
}

impl<W: Write + Send, E: Write + Send> Reporter for HumanPrinter<W, E> {
    fn report(&self, report: &FileReport) {
        // Errors and classified-but-unwritten files must always reach the
        // error stream, even when their tag line is hidden.
        if !visible(report.outcome, self.cfg.verbosity) && report.error.is_none() {
            return;
        }

        let mut s = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.write_report(&mut s, report) {
            debug!("[printer] writing report for {:?}: {e}", report.path);
        }
    }

    fn skipped(&self, path: &Path) {
        if self.cfg.verbosity == Verbosity::Quieter {
            return;
        }
        let mut s = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        let tag = self.tag("nonregular");
        if let Err(e) = writeln!(s.out, "{tag} {}", path.display()) {
            debug!("[printer] writing skipped {path:?}: {e}");
        }
    }
}

impl<W: Write + Send, E: Write + Send> Printer for HumanPrinter<W, E> {
    fn finish(&self, summary: &Summary) -> io::Result<()> {
        let mut s = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        if summary.interrupted {
            writeln!(
                s.err,
                "\nInterrupted: {} file(s) processed, remaining files were skipped.",
                summary.stats.total()
            )?;
        }
        s.out.flush()?;
        s.err.flush()
    }
}

/// One JSON object per file on the output stream; the summary goes to the
/// error stream.
pub struct JsonPrinter<W: Write, E: Write> {
    streams: Mutex<Streams<W, E>>,
    cfg: PrinterConfig,
}

impl<W: Write, E: Write> JsonPrinter<W, E> {
    pub fn new(out: W, err: E, cfg: PrinterConfig) -> Self {
        Self {
            streams: Mutex::new(Streams { out, err }),
            cfg,
        }
    }

    /// Create a printer that writes to stdout and stderr.
    pub fn stdout(cfg: PrinterConfig) -> JsonPrinter<io::Stdout, io::Stderr> {
        JsonPrinter::new(io::stdout(), io::stderr(), cfg)
    }

    pub fn into_inner(self) -> (W, E) {
        let streams = self
            .streams
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (streams.out, streams.err)
    }

    fn emit(&self, value: &serde_json::Value) {
        let mut s = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(s.out, "{value}") {
            debug!("[printer] writing json record: {e}");
        }
    }
}

impl<W: Write + Send, E: Write + Send> Reporter for JsonPrinter<W, E> {
    fn report(&self, report: &FileReport) {
        if !visible(report.outcome, self.cfg.verbosity) {
            return;
        }

        match serde_json::to_value(report) {
            Ok(mut value) => {
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_owned(), json!("file"));
                }
                self.emit(&value);
            }
            Err(e) => warn!("[printer] serializing report for {:?}: {e}", report.path),
        }
    }

    fn skipped(&self, path: &Path) {
        if self.cfg.verbosity == Verbosity::Quieter {
            return;
        }
        self.emit(&json!({
            "type": "nonregular",
            "path": path.to_string_lossy(),
        }));
    }
}

impl<W: Write + Send, E: Write + Send> Printer for JsonPrinter<W, E> {
    fn finish(&self, summary: &Summary) -> io::Result<()> {
        let obj = json!({
            "type": "summary",
            "stats": summary.stats,
            "total": summary.stats.total(),
            "exit_code": summary.exit_code(),
            "interrupted": summary.interrupted,
        });

        let mut s = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        s.out.flush()?;
        writeln!(s.err, "{obj}")?;
        s.err.flush()
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
