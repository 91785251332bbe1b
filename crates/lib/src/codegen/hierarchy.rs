//! Class hierarchy inputs.
//!
//! The class model itself belongs to the generator. This side knows where the
//! declaration files live, where generated code goes, and records what was
//! bound in a log next to the output.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::{DECLARATION_EXT, HIERARCHY_LOG};
use crate::util::hash::hash_file;

use super::CodegenError;

#[derive(Debug, Clone)]
pub struct Hierarchy {
  dest: PathBuf,
  source_dirs: Vec<PathBuf>,
  declarations: Vec<PathBuf>,
}

/// A declaration file as recorded in the hierarchy log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
  pub path: PathBuf,
  pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyLog {
  pub source_dirs: Vec<PathBuf>,
  pub declarations: Vec<LogEntry>,
}

impl Hierarchy {
  /// A hierarchy that materializes into `dest`.
  pub fn new(dest: impl Into<PathBuf>) -> Self {
    Self {
      dest: dest.into(),
      source_dirs: Vec::new(),
      declarations: Vec::new(),
    }
  }

  pub fn add_source_dir(&mut self, dir: impl Into<PathBuf>) {
    self.source_dirs.push(dir.into());
  }

  pub fn dest(&self) -> &Path {
    &self.dest
  }

  pub fn source_dirs(&self) -> &[PathBuf] {
    &self.source_dirs
  }

  pub fn include_dir(&self) -> PathBuf {
    self.dest.join("include")
  }

  pub fn source_dir(&self) -> PathBuf {
    self.dest.join("source")
  }

  /// Declaration files found by the last [`build`](Self::build).
  pub fn declarations(&self) -> &[PathBuf] {
    &self.declarations
  }

  /// Discover declaration files and create the output tree.
  pub fn build(&mut self) -> Result<(), CodegenError> {
    let mut declarations = Vec::new();
    for dir in &self.source_dirs {
      if !dir.is_dir() {
        return Err(CodegenError::MissingSourceDir(dir.clone()));
      }
      for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let is_declaration = entry.path().extension().is_some_and(|ext| ext == DECLARATION_EXT);
        if entry.file_type().is_file() && is_declaration {
          declarations.push(entry.into_path());
        }
      }
    }
    debug!(count = declarations.len(), "discovered class declarations");
    self.declarations = declarations;

    for dir in [self.include_dir(), self.source_dir()] {
      fs::create_dir_all(&dir).map_err(|e| CodegenError::io(&dir, e))?;
    }
    info!(dest = %self.dest.display(), "hierarchy built");
    Ok(())
  }

  pub fn log_path(&self) -> PathBuf {
    self.dest.join(HIERARCHY_LOG)
  }

  /// Snapshot of the declarations with their content digests.
  pub fn log(&self) -> Result<HierarchyLog, CodegenError> {
    let mut entries = Vec::with_capacity(self.declarations.len());
    for path in &self.declarations {
      let hash = hash_file(path).map_err(|e| CodegenError::io(path, e))?;
      entries.push(LogEntry {
        path: path.clone(),
        sha256: hash.0,
      });
    }
    Ok(HierarchyLog {
      source_dirs: self.source_dirs.clone(),
      declarations: entries,
    })
  }

  /// Persist the hierarchy log.
  pub fn write_log(&self) -> Result<PathBuf, CodegenError> {
    let log = self.log()?;
    let path = self.log_path();
    let json = serde_json::to_string_pretty(&log)?;
    fs::write(&path, json).map_err(|e| CodegenError::io(&path, e))?;
    debug!(path = %path.display(), "wrote hierarchy log");
    Ok(path)
  }
}
