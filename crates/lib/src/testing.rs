//! Host test suite runner.
//!
//! Tests import the freshly built extension, so the build output directory is
//! appended to the interpreter's module search path for the duration of the
//! run. The search path is a value owned by the caller; [`SearchPathScope`]
//! puts it back exactly as it was however the run ends.

use std::ffi::{OsStr, OsString};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{ENV_SEARCH_PATH, ProjectLayout};
use crate::exec::{self, CommandSpec, EnvVars};
use crate::stage::StageError;
use crate::util::glob::matches_pattern;

const TEST_FILE_PATTERN: &str = "test*.py";

/// Ordered module search path, as carried in `PYTHONPATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
  entries: Vec<PathBuf>,
}

impl SearchPath {
  pub fn new() -> Self {
    Self::default()
  }

  /// Split an environment value such as `a:b` into entries.
  pub fn from_env_value(value: Option<&OsStr>) -> Self {
    let entries = value.map(|v| std::env::split_paths(v).collect()).unwrap_or_default();
    Self { entries }
  }

  pub fn entries(&self) -> &[PathBuf] {
    &self.entries
  }

  pub fn push(&mut self, dir: impl Into<PathBuf>) {
    self.entries.push(dir.into());
  }

  pub fn to_env_value(&self) -> Result<OsString, std::env::JoinPathsError> {
    std::env::join_paths(&self.entries)
  }

  /// Append `dir` until the returned guard is dropped.
  pub fn scoped(&mut self, dir: impl Into<PathBuf>) -> SearchPathScope<'_> {
    let saved = self.entries.clone();
    self.push(dir);
    SearchPathScope { path: self, saved }
  }
}

/// Restores the search path it was created from when dropped.
#[derive(Debug)]
pub struct SearchPathScope<'a> {
  path: &'a mut SearchPath,
  saved: Vec<PathBuf>,
}

impl Deref for SearchPathScope<'_> {
  type Target = SearchPath;

  fn deref(&self) -> &SearchPath {
    self.path
  }
}

impl Drop for SearchPathScope<'_> {
  fn drop(&mut self) {
    self.path.entries = std::mem::take(&mut self.saved);
  }
}

/// Counts reported by the test runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
  pub ran: usize,
  pub failures: usize,
  pub errors: usize,
  pub skipped: usize,
  /// The runner reported overall success.
  pub success: bool,
  /// Raw runner output.
  #[serde(skip)]
  pub output: String,
}

impl TestSummary {
  /// Summary for a suite with nothing to run.
  pub fn empty() -> Self {
    Self {
      success: true,
      ..Self::default()
    }
  }

  pub fn passed(&self) -> bool {
    self.success && self.failures == 0 && self.errors == 0
  }

  /// Parse `unittest` text output (`Ran N tests`, then `OK` or `FAILED (...)`).
  pub fn parse(output: &str) -> Self {
    let mut summary = Self {
      output: output.to_string(),
      ..Self::default()
    };

    for line in output.lines().map(str::trim) {
      if let Some(rest) = line.strip_prefix("Ran ") {
        if let Some(count) = rest.split_whitespace().next().and_then(|n| n.parse().ok()) {
          summary.ran = count;
        }
      } else if line == "OK" || line.starts_with("OK (") {
        summary.success = true;
        summary.read_counts(line);
      } else if line.starts_with("FAILED") {
        summary.success = false;
        summary.read_counts(line);
      }
    }
    summary
  }

  fn read_counts(&mut self, line: &str) {
    let Some(inner) = line.split_once('(').and_then(|(_, rest)| rest.strip_suffix(')')) else {
      return;
    };
    for pair in inner.split(',') {
      let Some((key, value)) = pair.trim().split_once('=') else {
        continue;
      };
      let Ok(value) = value.parse() else {
        continue;
      };
      match key {
        "failures" => self.failures = value,
        "errors" => self.errors = value,
        "skipped" => self.skipped = value,
        _ => {}
      }
    }
  }
}

/// Every `test*.py` under `dir`, sorted. A missing directory holds no tests.
pub fn discover_tests(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let mut tests = Vec::new();
  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry.map_err(|e| StageError::io(dir, e.into()))?;
    let matches = entry
      .file_name()
      .to_str()
      .is_some_and(|name| matches_pattern(TEST_FILE_PATTERN, name));
    if entry.file_type().is_file() && matches {
      tests.push(entry.into_path());
    }
  }
  Ok(tests)
}

/// `<python> -m unittest discover` rooted at the test directory.
///
/// The test directory doubles as the top-level directory so test modules
/// import by their bare names and never collide with the interpreter's own
/// `test` package.
pub fn discover_command(python: &CommandSpec, layout: &ProjectLayout) -> CommandSpec {
  let dir = layout.test_dir.strip_prefix(&layout.root).unwrap_or(&layout.test_dir);
  python
    .clone()
    .args(["-m", "unittest", "discover", "-s"])
    .path_arg(dir)
    .arg("-t")
    .path_arg(dir)
    .arg("-p")
    .arg(TEST_FILE_PATTERN)
}

/// Run the suite with `lib_dir` on the search path.
pub async fn run_tests(
  python: &CommandSpec,
  layout: &ProjectLayout,
  lib_dir: &Path,
  search_path: &mut SearchPath,
) -> Result<TestSummary, StageError> {
  let tests = discover_tests(&layout.test_dir)?;
  if tests.is_empty() {
    info!(dir = %layout.test_dir.display(), "no tests found");
    return Ok(TestSummary::empty());
  }

  let scope = search_path.scoped(lib_dir);
  let value = scope
    .to_env_value()
    .map_err(|e| StageError::io(lib_dir, io::Error::new(io::ErrorKind::InvalidInput, e)))?;
  let mut env = EnvVars::new();
  env.insert(ENV_SEARCH_PATH.to_string(), value);

  let spec = discover_command(python, layout);
  info!(count = tests.len(), "running tests");

  let output = exec::capture(&spec, &layout.root, Some(&env)).await?;
  drop(scope);

  // unittest reports on stderr
  let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
  text.push_str(&String::from_utf8_lossy(&output.stdout));
  info!("{}", text.trim_end());
  let mut summary = TestSummary::parse(&text);
  if !output.status.success() {
    summary.success = false;
  }
  debug!(ran = summary.ran, failures = summary.failures, errors = summary.errors, "tests finished");
  Ok(summary)
}
