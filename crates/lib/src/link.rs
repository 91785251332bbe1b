//! Extension module compile and link.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::archive_path;
use crate::config::ProjectLayout;
use crate::exec;
use crate::host::HostConfig;
use crate::platform::Toolchain;
use crate::stage::{StageError, StageStatus};
use crate::staleness::{self, Artifact, Timestamps};

pub struct Linker<'a> {
  pub layout: &'a ProjectLayout,
  pub toolchain: &'a Toolchain,
  pub host: &'a HostConfig,
}

impl<'a> Linker<'a> {
  pub fn module_path(&self) -> PathBuf {
    self.host.module_path(self.layout)
  }

  pub fn sources(&self) -> Vec<PathBuf> {
    vec![self.layout.binding_file.clone()]
  }

  /// The module, rebuilt when any source or the core archive is newer.
  pub fn module_artifact(&self) -> Artifact {
    let mut inputs = self.sources();
    inputs.push(archive_path(self.layout, self.toolchain));
    Artifact::new(self.module_path(), inputs)
  }

  pub fn include_dirs(&self) -> Vec<PathBuf> {
    let mut dirs = self.layout.include_dirs();
    dirs.push(self.host.include_dir.clone());
    dirs
  }

  /// Interpreter flags first so user flags can override them.
  pub fn cflags(&self) -> Vec<String> {
    let mut flags = self.host.cflags.clone();
    flags.extend(self.toolchain.cflags.iter().cloned());
    flags
  }

  pub fn object_path(&self, source: &Path) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    self
      .host
      .temp_dir(self.layout)
      .join(self.toolchain.object_filename(&stem))
  }

  pub async fn run(&self, times: &dyn Timestamps) -> Result<StageStatus, StageError> {
    let module = self.module_artifact();
    let Some(reason) = staleness::check(&module, times)? else {
      return Ok(StageStatus::UpToDate);
    };
    info!(module = %module.path.display(), reason = %reason, "building extension");

    let temp_dir = self.host.temp_dir(self.layout);
    fs::create_dir_all(&temp_dir).map_err(|e| StageError::io(&temp_dir, e))?;
    if let Some(parent) = module.path.parent() {
      fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
    }

    let include_dirs = self.include_dirs();
    let cflags = self.cflags();
    let mut objects = Vec::new();
    for source in self.sources() {
      let object = self.object_path(&source);
      let spec = self.toolchain.compile_object(&source, &object, &include_dirs, &cflags);
      exec::run(&spec, &self.layout.root, None).await?;
      objects.push(object);
    }

    let archive = archive_path(self.layout, self.toolchain);
    let spec = self.toolchain.link_module(&objects, &archive, &module.path);
    exec::run(&spec, &self.layout.root, None).await?;

    Ok(StageStatus::Ran)
  }
}
