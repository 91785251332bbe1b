//! Modification-time staleness checks.
//!
//! An [`Artifact`] is a target path plus the inputs it is produced from. It is
//! stale when the target is missing or any input was modified strictly after
//! it. Time lookups go through [`Timestamps`] so the decision can be tested
//! without a real filesystem.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StalenessError {
  /// An input an artifact is built from does not exist.
  #[error("missing input {path} for {target}")]
  MissingInput { path: PathBuf, target: PathBuf },

  #[error("failed to read modification time of {path}: {source}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Source of modification times.
pub trait Timestamps {
  /// Modification time of `path`, or `None` if nothing exists there.
  fn modified(&self, path: &Path) -> Result<Option<SystemTime>, StalenessError>;
}

/// Reads modification times from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl Timestamps for RealFs {
  fn modified(&self, path: &Path) -> Result<Option<SystemTime>, StalenessError> {
    let metadata = match std::fs::metadata(path) {
      Ok(metadata) => metadata,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => {
        return Err(StalenessError::Metadata {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    metadata.modified().map(Some).map_err(|source| StalenessError::Metadata {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// In-memory modification times, for exercising staleness rules in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTimes {
  times: HashMap<PathBuf, SystemTime>,
}

impl MemoryTimes {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, path: impl Into<PathBuf>, time: SystemTime) {
    self.times.insert(path.into(), time);
  }

  pub fn with(mut self, path: impl Into<PathBuf>, time: SystemTime) -> Self {
    self.set(path, time);
    self
  }

  pub fn remove(&mut self, path: &Path) {
    self.times.remove(path);
  }
}

impl Timestamps for MemoryTimes {
  fn modified(&self, path: &Path) -> Result<Option<SystemTime>, StalenessError> {
    Ok(self.times.get(path).copied())
  }
}

/// A generated file and the inputs it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub path: PathBuf,
  pub inputs: Vec<PathBuf>,
}

impl Artifact {
  pub fn new(path: impl Into<PathBuf>, inputs: impl IntoIterator<Item = PathBuf>) -> Self {
    Self {
      path: path.into(),
      inputs: inputs.into_iter().collect(),
    }
  }
}

/// Why an artifact needs regenerating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
  /// The artifact does not exist yet.
  Missing,
  /// This input was modified after the artifact.
  NewerInput(PathBuf),
}

impl fmt::Display for StaleReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StaleReason::Missing => write!(f, "missing"),
      StaleReason::NewerInput(path) => write!(f, "{} is newer", path.display()),
    }
  }
}

/// Decide whether `artifact` must be regenerated, and why.
///
/// Every input must exist; a missing input is an error rather than a reason
/// to rebuild. Equal timestamps count as up to date.
pub fn check(artifact: &Artifact, times: &dyn Timestamps) -> Result<Option<StaleReason>, StalenessError> {
  let mut input_times = Vec::with_capacity(artifact.inputs.len());
  for input in &artifact.inputs {
    let Some(time) = times.modified(input)? else {
      return Err(StalenessError::MissingInput {
        path: input.clone(),
        target: artifact.path.clone(),
      });
    };
    input_times.push((input, time));
  }

  let Some(target_time) = times.modified(&artifact.path)? else {
    debug!(target = %artifact.path.display(), "artifact missing");
    return Ok(Some(StaleReason::Missing));
  };

  for (input, time) in input_times {
    if time > target_time {
      debug!(target = %artifact.path.display(), input = %input.display(), "input newer than artifact");
      return Ok(Some(StaleReason::NewerInput(input.clone())));
    }
  }

  debug!(target = %artifact.path.display(), "artifact up to date");
  Ok(None)
}

/// True when `artifact` must be regenerated.
pub fn is_stale(artifact: &Artifact, times: &dyn Timestamps) -> Result<bool, StalenessError> {
  Ok(check(artifact, times)?.is_some())
}
