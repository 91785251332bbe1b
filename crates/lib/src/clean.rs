use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ProjectLayout, charmonizer_exe_name};
use crate::consts::STAGING_DIR;
use crate::exec::{self, ExecError};
use crate::platform::Toolchain;
use crate::util::glob::matches_pattern;

const DISTCLEAN_TARGET: &str = "distclean";

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("failed to read directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to delete {path}: {source}")]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

#[derive(Debug, Default, Serialize)]
pub struct CleanResult {
  /// Paths removed by cfbuild itself, in removal order.
  pub removed: Vec<PathBuf>,
  /// Whether the build tool's `distclean` target was invoked.
  pub distclean_ran: bool,
}

/// Entries of `dir` whose names match `pattern`, sorted. A missing directory
/// has no matches.
pub fn glob_dir(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, CleanError> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(source) => {
      return Err(CleanError::ReadDir {
        path: dir.to_path_buf(),
        source,
      });
    }
  };

  let mut matches: Vec<PathBuf> = entries
    .flatten()
    .filter(|entry| entry.file_name().to_str().is_some_and(|name| matches_pattern(pattern, name)))
    .map(|entry| entry.path())
    .collect();
  matches.sort();
  Ok(matches)
}

fn remove_path(path: &Path, removed: &mut Vec<PathBuf>) -> Result<(), CleanError> {
  let Ok(metadata) = fs::symlink_metadata(path) else {
    debug!(path = %path.display(), "already gone");
    return Ok(());
  };

  info!("removing {}", path.display());
  let result = if metadata.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  };

  match result {
    Ok(()) => {
      removed.push(path.to_path_buf());
      Ok(())
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(source) => Err(CleanError::Delete {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Patterns matched inside the build directory.
fn build_dir_patterns(all: bool) -> Vec<&'static str> {
  if all {
    vec!["temp.*", "lib.*", STAGING_DIR]
  } else {
    vec!["temp.*"]
  }
}

/// Remove generated artifacts. Cleaning an already clean tree succeeds and
/// removes nothing.
pub async fn clean(layout: &ProjectLayout, toolchain: &Toolchain, all: bool) -> Result<CleanResult, CleanError> {
  let mut result = CleanResult::default();

  for pattern in build_dir_patterns(all) {
    for path in glob_dir(&layout.build_dir, pattern)? {
      remove_path(&path, &mut result.removed)?;
    }
  }

  if layout.makefile().is_file() {
    let spec = toolchain.make_target(DISTCLEAN_TARGET, false);
    exec::run(&spec, &layout.root, None).await?;
    result.distclean_ran = true;
  }

  let exe_name = charmonizer_exe_name(toolchain.os);
  for pattern in layout.clean_patterns(&exe_name) {
    for path in glob_dir(&layout.root, &pattern)? {
      remove_path(&path, &mut result.removed)?;
    }
  }

  info!(removed = result.removed.len(), distclean = result.distclean_ran, "clean complete");
  Ok(result)
}
