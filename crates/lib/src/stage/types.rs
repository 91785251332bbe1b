//! Types for stage execution.
//!
//! Stages never abort the process themselves. Each one returns a
//! `Result<StageStatus, StageError>` and the driver records it in a
//! [`PipelineResult`], deciding what runs next.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::codegen::CodegenError;
use crate::exec::ExecError;
use crate::host::HostError;
use crate::staleness::StalenessError;
use crate::testing::TestSummary;

/// The steps of the build, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
  /// Compile and run charmonizer to produce `charmony.h`.
  Probe,
  /// Discover class declarations and materialize the autogen tree.
  Hierarchy,
  /// Emit core sources, reporting whether any changed.
  CoreBind,
  /// Emit host-language glue, only after a changed core bind. The one
  /// exception is a missing glue file (e.g. after `clean`), which is
  /// regenerated even when the core is unchanged; existing glue is never
  /// rewritten without a core change.
  HostBind,
  /// Build the runtime core static archive.
  Archive,
  /// Copy host-language packages into the build directory.
  Package,
  /// Compile and link the extension module.
  Link,
  /// Run the host test suite.
  Test,
}

impl StageKind {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Probe => "probe",
      Self::Hierarchy => "hierarchy",
      Self::CoreBind => "core-bind",
      Self::HostBind => "host-bind",
      Self::Archive => "archive",
      Self::Package => "package",
      Self::Link => "link",
      Self::Test => "test",
    }
  }

  /// All stages in execution order.
  pub fn all() -> [StageKind; 8] {
    [
      Self::Probe,
      Self::Hierarchy,
      Self::CoreBind,
      Self::HostBind,
      Self::Archive,
      Self::Package,
      Self::Link,
      Self::Test,
    ]
  }
}

impl fmt::Display for StageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// How a stage that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StageStatus {
  /// The stage did work.
  Ran,
  /// Every artifact was already current.
  UpToDate,
  /// The stage was gated off by an earlier result.
  NotNeeded,
  /// The test suite ran; it may still have failing tests.
  Tested(TestSummary),
}

impl StageStatus {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Ran => "done",
      Self::UpToDate => "up to date",
      Self::NotNeeded => "not needed",
      Self::Tested(summary) if summary.passed() => "passed",
      Self::Tested(_) => "failed",
    }
  }
}

/// Errors that fail a stage.
#[derive(Debug, Error)]
pub enum StageError {
  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error(transparent)]
  Staleness(#[from] StalenessError),

  #[error(transparent)]
  Codegen(#[from] CodegenError),

  #[error(transparent)]
  Host(#[from] HostError),

  /// A stage finished without leaving behind an output it promises.
  #[error("{stage} finished but {path} was not produced")]
  MissingArtifact { stage: StageKind, path: PathBuf },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A stage needs state that an earlier stage produces.
  #[error("{stage} cannot run before {requires}")]
  OutOfOrder { stage: StageKind, requires: StageKind },

  #[error("stage not declared in graph: {0}")]
  UnknownStage(StageKind),

  #[error("dependency cycle detected between stages")]
  CycleDetected,

  #[error("stages do not form a linear chain: {0}")]
  NotLinear(String),
}

impl StageError {
  /// Create an I/O error with path context
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  /// Exit code of the sub-process that caused this failure, if any.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      Self::Exec(e) => e.exit_code(),
      Self::Codegen(CodegenError::Exec(e)) => e.exit_code(),
      Self::Host(HostError::Exec(e)) => e.exit_code(),
      _ => None,
    }
  }
}

/// Outcome of one stage that did not fail.
#[derive(Debug, Clone)]
pub struct StageReport {
  pub kind: StageKind,
  pub status: StageStatus,
  pub duration: Duration,
}

/// A stage that never ran because one of its dependencies failed or was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedStage {
  pub kind: StageKind,
  /// The dependency that failed or was itself skipped.
  pub after: StageKind,
}

/// Result of driving the pipeline towards a goal.
#[derive(Debug, Default)]
pub struct PipelineResult {
  /// Stages that finished, in execution order.
  pub completed: Vec<StageReport>,

  /// The stage that failed (at most one, stops the pipeline).
  pub failed: Option<(StageKind, StageError)>,

  /// Stages skipped because of the failure.
  pub skipped: Vec<SkippedStage>,
}

impl PipelineResult {
  pub fn is_success(&self) -> bool {
    self.failed.is_none() && self.skipped.is_empty()
  }

  pub fn report(&self, kind: StageKind) -> Option<&StageReport> {
    self.completed.iter().find(|r| r.kind == kind)
  }

  pub fn status(&self, kind: StageKind) -> Option<&StageStatus> {
    self.report(kind).map(|r| &r.status)
  }

  /// True if `kind` completed and actually did work.
  pub fn ran(&self, kind: StageKind) -> bool {
    matches!(self.status(kind), Some(StageStatus::Ran) | Some(StageStatus::Tested(_)))
  }

  pub fn is_skipped(&self, kind: StageKind) -> bool {
    self.skipped.iter().any(|s| s.kind == kind)
  }

  /// Summary of the test stage, when it ran.
  pub fn test_summary(&self) -> Option<&TestSummary> {
    match self.status(StageKind::Test) {
      Some(StageStatus::Tested(summary)) => Some(summary),
      _ => None,
    }
  }

  /// Process exit code for this result: 0 on success, the failing
  /// sub-process's own code when there is one, 1 otherwise.
  pub fn exit_code(&self) -> i32 {
    if let Some((_, err)) = &self.failed {
      return err.exit_code().filter(|code| *code != 0).unwrap_or(1);
    }
    match self.test_summary() {
      Some(summary) if !summary.passed() => 1,
      _ => 0,
    }
  }

  pub fn total_duration(&self) -> Duration {
    self.completed.iter().map(|r| r.duration).sum()
  }
}
