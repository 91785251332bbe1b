//! Code generation boundary.
//!
//! The class-declaration parser and the binders that emit C and host glue are
//! an external program. This module owns everything around it: discovering
//! the hierarchy inputs, invoking the generator through the [`Generator`]
//! trait, and keeping generated files untouched when their content is the same.
//!
//! # Submodules
//!
//! - [`hierarchy`] - declaration discovery and the hierarchy log
//! - [`generator`] - the external `cfc` program
//! - [`sync`] - changed-files-only copy from staging into place

pub mod generator;
pub mod hierarchy;
pub mod sync;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{AUTOGEN_HEADER, PARCEL};
use crate::exec::ExecError;

pub use generator::ExternalGenerator;
pub use hierarchy::Hierarchy;

#[derive(Debug, Error)]
pub enum CodegenError {
  /// The generator program is not installed.
  #[error("code generator not found: {program} (set CFBUILD_CFC)")]
  GeneratorUnavailable { program: String },

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error("source directory does not exist: {0}")]
  MissingSourceDir(PathBuf),

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk directory: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("failed to serialize hierarchy log: {0}")]
  Log(#[from] serde_json::Error),
}

impl CodegenError {
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}

/// Where and how host-language glue is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBinding {
  pub lang: String,
  pub parcel: String,
  /// Directory receiving the glue source.
  pub dest: PathBuf,
  pub header: String,
}

impl HostBinding {
  /// Python glue for the runtime parcel, written to `dest`.
  pub fn python(dest: impl Into<PathBuf>) -> Self {
    Self {
      lang: "python".to_string(),
      parcel: PARCEL.to_string(),
      dest: dest.into(),
      header: AUTOGEN_HEADER.to_string(),
    }
  }
}

/// Emits bindings from a built hierarchy.
#[allow(async_fn_in_trait)]
pub trait Generator {
  /// Emit core sources into the hierarchy's destination. Returns true when
  /// at least one generated file was written.
  async fn bind_core(&mut self, hierarchy: &Hierarchy, header: &str) -> Result<bool, CodegenError>;

  /// Emit host-language glue.
  async fn bind_host(&mut self, hierarchy: &Hierarchy, binding: &HostBinding) -> Result<(), CodegenError>;
}
