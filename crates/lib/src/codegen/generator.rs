//! The external `cfc` code generator.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::exec::{self, CommandSpec};

use super::sync::write_all_modified;
use super::{CodegenError, Generator, Hierarchy, HostBinding};

/// Runs a generator program that understands the `core` and `host` subcommands.
///
/// Core output is written to a staging directory first and synced into the
/// hierarchy's destination, so the change flag reflects real content changes.
#[derive(Debug, Clone)]
pub struct ExternalGenerator {
  command: CommandSpec,
  cwd: PathBuf,
  staging: PathBuf,
}

impl ExternalGenerator {
  pub fn new(command: CommandSpec, cwd: impl Into<PathBuf>, staging: impl Into<PathBuf>) -> Self {
    Self {
      command,
      cwd: cwd.into(),
      staging: staging.into(),
    }
  }

  pub fn command(&self) -> &CommandSpec {
    &self.command
  }

  pub fn core_command(&self, hierarchy: &Hierarchy, header: &str) -> CommandSpec {
    let mut spec = self.command.clone().arg("core");
    for dir in hierarchy.source_dirs() {
      spec = spec.arg("--source").path_arg(dir);
    }
    spec
      .arg("--dest")
      .path_arg(&self.staging)
      .arg("--header")
      .arg(header)
  }

  pub fn host_command(&self, hierarchy: &Hierarchy, binding: &HostBinding) -> CommandSpec {
    let mut spec = self
      .command
      .clone()
      .arg("host")
      .arg("--lang")
      .arg(&binding.lang)
      .arg("--parcel")
      .arg(&binding.parcel);
    for dir in hierarchy.source_dirs() {
      spec = spec.arg("--source").path_arg(dir);
    }
    spec
      .arg("--autogen")
      .path_arg(hierarchy.dest())
      .arg("--dest")
      .path_arg(&binding.dest)
      .arg("--header")
      .arg(&binding.header)
  }

  async fn invoke(&self, spec: &CommandSpec) -> Result<(), CodegenError> {
    exec::run(spec, &self.cwd, None).await.map_err(|e| {
      if e.is_not_found() {
        return CodegenError::GeneratorUnavailable {
          program: spec.program.clone(),
        };
      }
      CodegenError::Exec(e)
    })
  }
}

fn reset_dir(dir: &Path) -> Result<(), CodegenError> {
  if dir.exists() {
    fs::remove_dir_all(dir).map_err(|e| CodegenError::io(dir, e))?;
  }
  fs::create_dir_all(dir).map_err(|e| CodegenError::io(dir, e))
}

impl Generator for ExternalGenerator {
  async fn bind_core(&mut self, hierarchy: &Hierarchy, header: &str) -> Result<bool, CodegenError> {
    reset_dir(&self.staging)?;
    self.invoke(&self.core_command(hierarchy, header)).await?;

    let written = write_all_modified(&self.staging, hierarchy.dest())?;
    for path in &written {
      debug!(path = %path.display(), "updated generated file");
    }
    info!(changed = written.len(), "core bindings synced");
    Ok(!written.is_empty())
  }

  async fn bind_host(&mut self, hierarchy: &Hierarchy, binding: &HostBinding) -> Result<(), CodegenError> {
    self.invoke(&self.host_command(hierarchy, binding)).await
  }
}
