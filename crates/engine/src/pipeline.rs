use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    time::Instant,
};

use log::debug;
use shatag_runtime::{XATTR_SHA256, XATTR_TS};

use crate::{
    attr::{ActualAttr, StoredAttr, decode_stored, encode},
    config::CheckOptions,
    decision::{Decision, WriteAction, decide, write_action},
    error::{CheckError, ProbeError, RemovalError},
    probe::{Probe, Sha256Probe},
    report::{CheckMetrics, Comparison, FileReport, Outcome},
    store::{AttrStore, XattrStore},
};

/// Entry point for checking or cleaning individual files.
///
/// Holds no per-file state, so one `Checker` is shared by every worker.
pub struct Checker<S = XattrStore, P = Sha256Probe> {
    store: S,
    probe: P,
    options: CheckOptions,
}

impl Checker<XattrStore, Sha256Probe> {
    /// Checker backed by real extended attributes.
    pub fn new(options: CheckOptions) -> Self {
        Self::with_parts(XattrStore, Sha256Probe::new(), options)
    }
}

impl<S: AttrStore, P: Probe> Checker<S, P> {
    pub fn with_parts(store: S, probe: P, options: CheckOptions) -> Self {
        Self {
            store,
            probe,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Verify `path` against its stored attributes, updating them as the
    /// write policy allows.
    pub fn check(&self, path: &Path) -> FileReport {
        let pipeline = match CheckPipeline::open(self, path) {
            Ok(p) => p,
            Err(report) => return report,
        };

        match pipeline.read_stored().compute_actual() {
            Ok(computed) => computed.classify().apply().report(),
            Err(report) => report,
        }
    }

    /// Delete both stored attributes from `path`.
    pub fn remove(&self, path: &Path) -> FileReport {
        match CheckPipeline::open(self, path) {
            Ok(p) => p.remove(),
            Err(report) => report,
        }
    }
}

/// State shared by every stage of one file's pipeline.
struct PipelineCtx<'a, S, P> {
    checker: &'a Checker<S, P>,
    path: PathBuf,
    file: File,
    metrics: CheckMetrics,
}

/// File is open and known to be regular.
pub struct Opened;

/// Stored attributes have been read (and possibly found missing).
pub struct StoredRead {
    stored: StoredAttr,
}

/// Content hashed without interference.
pub struct ActualComputed {
    stored: StoredAttr,
    actual: ActualAttr,
}

/// Classified; the write decision is made but not yet carried out.
pub struct Classified {
    comparison: Comparison,
    decision: Decision,
    action: WriteAction,
}

/// Result of the update stage.
#[derive(Debug)]
pub enum WriteResult {
    Updated,
    Skipped,
    Failed(io::Error),
}

/// Update stage done, ready to report.
pub struct Applied {
    comparison: Comparison,
    decision: Decision,
    write: WriteResult,
}

/// Per-file check, one stage type per step:
/// `Opened -> StoredRead -> ActualComputed -> Classified -> Applied -> report`.
///
/// Each transition consumes the previous stage, so no stage can be skipped or
/// run twice. Failing stages return the finished [`FileReport`] instead.
pub struct CheckPipeline<'a, S, P, St> {
    ctx: PipelineCtx<'a, S, P>,
    state: St,
}

impl<'a, S: AttrStore, P: Probe> CheckPipeline<'a, S, P, Opened> {
    pub fn open(checker: &'a Checker<S, P>, path: &Path) -> Result<Self, FileReport> {
        let file = File::open(path).map_err(|source| {
            let err = CheckError::Open {
                path: path.to_path_buf(),
                source,
            };
            debug!("[pipeline] {err}");
            FileReport::new(path.to_path_buf(), Outcome::OpenError).with_error(err)
        })?;

        let is_file = match file.metadata() {
            Ok(meta) => meta.is_file(),
            Err(source) => {
                let err = CheckError::Open {
                    path: path.to_path_buf(),
                    source,
                };
                return Err(
                    FileReport::new(path.to_path_buf(), Outcome::OpenError).with_error(err)
                );
            }
        };

        if !is_file {
            let err = CheckError::NotRegular {
                path: path.to_path_buf(),
            };
            return Err(FileReport::new(path.to_path_buf(), Outcome::NotRegular).with_error(err));
        }

        Ok(Self {
            ctx: PipelineCtx {
                checker,
                path: path.to_path_buf(),
                file,
                metrics: CheckMetrics::default(),
            },
            state: Opened,
        })
    }

    pub fn read_stored(self) -> CheckPipeline<'a, S, P, StoredRead> {
        let CheckPipeline { ctx, state: Opened } = self;

        let store = &ctx.checker.store;
        let raw_digest = read_attr(store, &ctx.file, &ctx.path, XATTR_SHA256);
        let raw_ts = read_attr(store, &ctx.file, &ctx.path, XATTR_TS);
        let stored = decode_stored(raw_digest.as_deref(), raw_ts.as_deref());

        CheckPipeline {
            ctx,
            state: StoredRead { stored },
        }
    }

    /// Delete both attributes. Each removal is attempted regardless of the
    /// other's result.
    pub fn remove(self) -> FileReport {
        let CheckPipeline { ctx, state: Opened } = self;

        if ctx.checker.options.dry_run {
            debug!("[pipeline] dry run, keeping attributes of {:?}", ctx.path);
            return FileReport::new(ctx.path, Outcome::Removed);
        }

        match remove_attrs(&ctx.checker.store, &ctx.file) {
            Ok(()) => FileReport::new(ctx.path, Outcome::Removed),
            Err(removal) => {
                let err = CheckError::Remove {
                    path: ctx.path.clone(),
                    source: removal,
                };
                FileReport::new(ctx.path, Outcome::RemoveError).with_error(err)
            }
        }
    }
}

/// Remove both attributes, reporting each failure separately.
/// An attribute that was never set is not a failure.
pub fn remove_attrs<S: AttrStore>(store: &S, file: &File) -> Result<(), RemovalError> {
    let removal = RemovalError {
        timestamp: store.remove(file, XATTR_TS).err(),
        digest: store.remove(file, XATTR_SHA256).err(),
    };

    if removal.is_empty() {
        Ok(())
    } else {
        Err(removal)
    }
}

/// Unreadable attributes count as missing.
fn read_attr<S: AttrStore>(store: &S, file: &File, path: &Path, name: &str) -> Option<Vec<u8>> {
    match store.get(file, name) {
        Ok(v) => v,
        Err(e) => {
            debug!("[pipeline] reading {name} of {path:?}: {e}");
            None
        }
    }
}

impl<'a, S: AttrStore, P: Probe> CheckPipeline<'a, S, P, StoredRead> {
    pub fn stored(&self) -> &StoredAttr {
        &self.state.stored
    }

    pub fn compute_actual(self) -> Result<CheckPipeline<'a, S, P, ActualComputed>, FileReport> {
        let CheckPipeline {
            mut ctx,
            state: StoredRead { stored },
        } = self;

        let start = Instant::now();
        let result = ctx.checker.probe.compute(&ctx.file);
        ctx.metrics.hash_time = Some(start.elapsed());

        match result {
            Ok(actual) => Ok(CheckPipeline {
                ctx,
                state: ActualComputed { stored, actual },
            }),
            Err(err @ ProbeError::ConcurrentModification { .. }) => {
                debug!("[pipeline] {:?}: {err}", ctx.path);
                let mut report = FileReport::new(ctx.path, Outcome::ConcurrentModification);
                report.metrics = ctx.metrics;
                Err(report)
            }
            Err(ProbeError::Io(source)) => {
                let err = CheckError::Read {
                    path: ctx.path.clone(),
                    source,
                };
                let mut report = FileReport::new(ctx.path, Outcome::ReadError).with_error(err);
                report.metrics = ctx.metrics;
                Err(report)
            }
        }
    }
}

impl<'a, S: AttrStore, P: Probe> CheckPipeline<'a, S, P, ActualComputed> {
    pub fn actual(&self) -> &ActualAttr {
        &self.state.actual
    }

    pub fn classify(self) -> CheckPipeline<'a, S, P, Classified> {
        let CheckPipeline {
            ctx,
            state: ActualComputed { stored, actual },
        } = self;

        let options = &ctx.checker.options;
        let decision = decide(&stored, &actual, options.resolution);
        let action = write_action(decision, options);

        CheckPipeline {
            ctx,
            state: Classified {
                comparison: Comparison { stored, actual },
                decision,
                action,
            },
        }
    }
}

impl<'a, S: AttrStore, P: Probe> CheckPipeline<'a, S, P, Classified> {
    pub fn decision(&self) -> Decision {
        self.state.decision
    }

    /// Carry out the write decision. Stores the timestamp first, then the
    /// digest; a failure leaves whatever already landed.
    pub fn apply(self) -> CheckPipeline<'a, S, P, Applied> {
        let CheckPipeline {
            mut ctx,
            state:
                Classified {
                    comparison,
                    decision,
                    action,
                },
        } = self;

        let write = match action {
            WriteAction::Skip => WriteResult::Skipped,
            WriteAction::Store => {
                let start = Instant::now();
                let res = store_attr(&ctx.checker.store, &ctx.file, &comparison.actual);
                ctx.metrics.write_time = Some(start.elapsed());
                match res {
                    Ok(()) => WriteResult::Updated,
                    Err(e) => WriteResult::Failed(e),
                }
            }
        };

        CheckPipeline {
            ctx,
            state: Applied {
                comparison,
                decision,
                write,
            },
        }
    }
}

fn store_attr<S: AttrStore>(store: &S, file: &File, actual: &ActualAttr) -> io::Result<()> {
    let encoded = encode(actual);
    store.set(file, XATTR_TS, &encoded.timestamp)?;
    store.set(file, XATTR_SHA256, &encoded.digest)
}

impl<'a, S: AttrStore, P: Probe> CheckPipeline<'a, S, P, Applied> {
    pub fn write_result(&self) -> &WriteResult {
        &self.state.write
    }

    pub fn report(self) -> FileReport {
        let CheckPipeline {
            ctx,
            state:
                Applied {
                    comparison,
                    decision,
                    write,
                },
        } = self;

        let (outcome, updated, error): (Outcome, bool, Option<String>) = match write {
            WriteResult::Updated => (decision.into(), true, None),
            WriteResult::Skipped => (decision.into(), false, None),
            WriteResult::Failed(source) => {
                let err = CheckError::Write {
                    path: ctx.path.clone(),
                    source,
                };
                // A failed fix must not hide the corruption itself.
                let outcome = match decision {
                    Decision::Corrupt => Outcome::Corrupt,
                    _ => Outcome::WriteError,
                };
                (outcome, false, Some(err.to_string()))
            }
        };

        debug!(
            "[pipeline] {:?}: {decision:?} -> {outcome:?} (updated: {updated})",
            ctx.path
        );

        FileReport {
            path: ctx.path,
            outcome,
            decision: Some(decision),
            comparison: Some(comparison),
            updated,
            fix_requested: ctx.checker.options.force_fix,
            error,
            metrics: ctx.metrics,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
