//! Platform probe.
//!
//! Compiles `charmonizer.c` into a small program and runs it to detect
//! compiler capabilities. It leaves `charmony.h` and a `Makefile` in the
//! project root. Both steps are gated on modification times.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{ProjectLayout, charmonizer_exe_name};
use crate::exec::{self, CommandSpec};
use crate::host::HostConfig;
use crate::platform::Toolchain;
use crate::stage::{StageError, StageStatus};
use crate::staleness::{self, Artifact, Timestamps};

const HOST_LANG: &str = "python";
const VALGRIND_PREFIX: [&str; 2] = ["valgrind", "--leak-check=yes"];

/// Quote a value for the probe's `--cc` option.
pub fn quotify(text: &str) -> String {
  let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
  format!("\"{}\"", escaped)
}

/// Flags handed to the probe after `--`: the interpreter's own flags, then
/// the user's, then the interpreter's header directory.
pub fn probe_cflags(host: &HostConfig, user_cflags: &[String]) -> Vec<String> {
  let mut flags = host.cflags.clone();
  flags.extend(user_cflags.iter().cloned());
  flags.push(format!("-I{}", host.include_dir.display()));
  flags
}

pub struct Probe<'a> {
  pub layout: &'a ProjectLayout,
  pub toolchain: &'a Toolchain,
  pub host: &'a HostConfig,
  /// Run the probe under valgrind.
  pub valgrind: bool,
}

impl<'a> Probe<'a> {
  pub fn executable(&self) -> PathBuf {
    self.layout.charmonizer_exe(&charmonizer_exe_name(self.toolchain.os))
  }

  /// The probe program, built from its C source.
  pub fn program_artifact(&self) -> Artifact {
    Artifact::new(self.executable(), [self.layout.charmonizer_c.clone()])
  }

  /// The configuration header, produced by running the probe program.
  pub fn header_artifact(&self) -> Artifact {
    Artifact::new(self.layout.charmony_h(), [self.executable()])
  }

  pub fn compile_command(&self) -> CommandSpec {
    self
      .toolchain
      .compile_executable(&self.layout.charmonizer_c, &self.executable())
  }

  pub fn run_command(&self) -> CommandSpec {
    let spec = CommandSpec::new(self.executable().to_string_lossy())
      .arg(format!("--cc={}", quotify(&self.toolchain.compiler_line())))
      .arg("--enable-c")
      .arg(format!("--enable-{}", HOST_LANG))
      .arg(format!("--host={}", HOST_LANG))
      .arg("--enable-makefile")
      .arg("--")
      .args(probe_cflags(self.host, &self.toolchain.cflags));

    if self.valgrind {
      spec.wrapped_in(&VALGRIND_PREFIX)
    } else {
      spec
    }
  }

  /// Bring `charmony.h` up to date.
  pub async fn run(&self, times: &dyn Timestamps) -> Result<StageStatus, StageError> {
    let cwd: &Path = &self.layout.root;
    let mut did_work = false;

    if let Some(reason) = staleness::check(&self.program_artifact(), times)? {
      info!(reason = %reason, "compiling charmonizer");
      exec::run(&self.compile_command(), cwd, None).await?;
      did_work = true;
    }

    if let Some(reason) = staleness::check(&self.header_artifact(), times)? {
      info!(reason = %reason, "running charmonizer");
      exec::run(&self.run_command(), cwd, None).await?;
      did_work = true;
    }

    Ok(if did_work { StageStatus::Ran } else { StageStatus::UpToDate })
  }
}
