//! Copy a generated tree into place, touching only files that changed.
//!
//! Make decides what to rebuild from modification times, so rewriting an
//! identical generated file would trigger a needless rebuild of everything
//! that includes it.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::CodegenError;

/// Result of syncing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
  /// File was missing or its contents differed.
  Written,
  /// File already had identical contents.
  Skipped,
}

/// Write `content` to `path` unless it already holds exactly those bytes.
pub fn write_if_modified(path: &Path, content: &[u8]) -> Result<WriteResult, CodegenError> {
  match fs::read(path) {
    Ok(existing) if existing == content => return Ok(WriteResult::Skipped),
    Ok(_) => {}
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => return Err(CodegenError::io(path, e)),
  }

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
  }
  fs::write(path, content).map_err(|e| CodegenError::io(path, e))?;
  Ok(WriteResult::Written)
}

/// Mirror every file under `staging` into `dest`. Returns the destination
/// paths that were written, in sorted order.
pub fn write_all_modified(staging: &Path, dest: &Path) -> Result<Vec<PathBuf>, CodegenError> {
  let mut written = Vec::new();

  for entry in WalkDir::new(staging).sort_by_file_name() {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    let Ok(relative) = entry.path().strip_prefix(staging) else {
      continue;
    };
    let target = dest.join(relative);
    let content = fs::read(entry.path()).map_err(|e| CodegenError::io(entry.path(), e))?;
    if write_if_modified(&target, &content)? == WriteResult::Written {
      written.push(target);
    }
  }

  Ok(written)
}
