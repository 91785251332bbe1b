//! Pure host-language packages.
//!
//! The extension module lives inside a package whose Python sources sit in
//! `src/`. They are copied next to the built module so the build directory
//! is importable on its own.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::codegen::sync::{WriteResult, write_if_modified};
use crate::config::ProjectLayout;
use crate::stage::{StageError, StageStatus};

const SOURCE_EXT: &str = "py";

/// Source files of every package, as (source, destination) pairs.
pub fn package_files(layout: &ProjectLayout, lib_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, StageError> {
  let mut files = Vec::new();
  for package in &layout.packages {
    let root = layout.package_dir.join(package);
    if !root.is_dir() {
      return Err(StageError::io(
        &root,
        std::io::Error::new(std::io::ErrorKind::NotFound, "package directory missing"),
      ));
    }
    for entry in WalkDir::new(&root).sort_by_file_name() {
      let entry = entry.map_err(|e| StageError::io(&root, e.into()))?;
      let is_source = entry.path().extension().is_some_and(|ext| ext == SOURCE_EXT);
      if !entry.file_type().is_file() || !is_source {
        continue;
      }
      if let Ok(relative) = entry.path().strip_prefix(&layout.package_dir) {
        files.push((entry.path().to_path_buf(), lib_dir.join(relative)));
      }
    }
  }
  Ok(files)
}

/// Copy package sources into `lib_dir`, leaving identical files untouched.
pub fn copy_packages(layout: &ProjectLayout, lib_dir: &Path) -> Result<StageStatus, StageError> {
  let mut copied = 0;
  for (source, dest) in package_files(layout, lib_dir)? {
    let content = std::fs::read(&source).map_err(|e| StageError::io(&source, e))?;
    if write_if_modified(&dest, &content)? == WriteResult::Written {
      debug!(file = %dest.display(), "copied package file");
      copied += 1;
    }
  }
  Ok(if copied > 0 { StageStatus::Ran } else { StageStatus::UpToDate })
}
