//! Compiler and build tool conventions.
//!
//! The archive name, the executable suffix, and the build tool invocation all
//! depend on which toolchain is in use. Detection looks at the compiler
//! command: a `cl` compiler means MSVC conventions, anything else is treated
//! as a GNU-compatible driver (gcc, clang, cc).

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{BuildEnv, spec_or_default};
use crate::exec::CommandSpec;

use super::os::Os;

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("unsupported operating system: {0}")]
  UnsupportedPlatform(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
  Gnu,
  Msvc,
}

impl CompilerKind {
  /// Classify a compiler by its program name.
  pub fn detect(program: &str) -> Self {
    let stem = Path::new(program)
      .file_stem()
      .map(|s| s.to_string_lossy().to_lowercase())
      .unwrap_or_default();
    if stem == "cl" { Self::Msvc } else { Self::Gnu }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Toolchain {
  #[serde(skip)]
  pub os: Os,
  pub cc: CommandSpec,
  pub kind: CompilerKind,
  /// User flags passed to every compile.
  pub cflags: Vec<String>,
  pub make: CommandSpec,
  /// Parallelism handed to the build tool.
  pub jobs: usize,
}

impl Toolchain {
  /// Detect the toolchain for the running OS.
  pub fn detect(env: &BuildEnv) -> Result<Self, ToolchainError> {
    let os = Os::current().ok_or_else(|| ToolchainError::UnsupportedPlatform(std::env::consts::OS.to_string()))?;
    Ok(Self::for_os(os, env))
  }

  pub fn for_os(os: Os, env: &BuildEnv) -> Self {
    let default_cc = match os {
      Os::Windows => "cl",
      Os::Linux | Os::MacOs => "cc",
    };
    let cc = spec_or_default(env.cc.as_deref(), default_cc);
    let kind = CompilerKind::detect(&cc.program);

    let default_make = match kind {
      CompilerKind::Msvc => "nmake",
      CompilerKind::Gnu => "make",
    };
    let make = spec_or_default(env.make.as_deref(), default_make);

    let toolchain = Self {
      os,
      cc,
      kind,
      cflags: env.cflags(),
      make,
      jobs: available_jobs(),
    };
    debug!(cc = %toolchain.cc, kind = ?toolchain.kind, make = %toolchain.make, "detected toolchain");
    toolchain
  }

  /// The compiler command line as handed to the probe's `--cc` option.
  pub fn compiler_line(&self) -> String {
    self.cc.command_line()
  }

  pub fn executable_filename(&self, name: &str) -> String {
    self.os.executable_filename(name)
  }

  /// File name of a static archive for library `name`.
  pub fn static_lib_filename(&self, name: &str) -> String {
    match self.kind {
      CompilerKind::Msvc => format!("{}.lib", name),
      CompilerKind::Gnu => format!("lib{}.a", name),
    }
  }

  pub fn object_filename(&self, stem: &str) -> String {
    match self.kind {
      CompilerKind::Msvc => format!("{}.obj", stem),
      CompilerKind::Gnu => format!("{}.o", stem),
    }
  }

  /// Compile a single-file program into an executable.
  pub fn compile_executable(&self, source: &Path, exe: &Path) -> CommandSpec {
    let spec = self.cc.clone();
    match self.kind {
      CompilerKind::Msvc => spec.arg(format!("/Fe{}", exe.display())).path_arg(source),
      CompilerKind::Gnu => spec.arg("-o").path_arg(exe).path_arg(source),
    }
  }

  /// Compile one translation unit into an object file suitable for a shared module.
  pub fn compile_object(&self, source: &Path, object: &Path, include_dirs: &[PathBuf], cflags: &[String]) -> CommandSpec {
    let mut spec = self.cc.clone().args(cflags.iter().cloned());
    match self.kind {
      CompilerKind::Msvc => {
        spec = spec.arg("/nologo");
        for dir in include_dirs {
          spec = spec.arg(format!("/I{}", dir.display()));
        }
        spec.arg("/c").path_arg(source).arg(format!("/Fo{}", object.display()))
      }
      CompilerKind::Gnu => {
        if self.os != Os::Windows {
          spec = spec.arg("-fPIC");
        }
        for dir in include_dirs {
          spec = spec.arg(format!("-I{}", dir.display()));
        }
        spec.arg("-c").path_arg(source).arg("-o").path_arg(object)
      }
    }
  }

  /// Link objects plus the static archive into a loadable module.
  pub fn link_module(&self, objects: &[PathBuf], archive: &Path, output: &Path) -> CommandSpec {
    let mut spec = self.cc.clone();
    match self.kind {
      CompilerKind::Msvc => {
        spec = spec.arg("/nologo").arg("/LD");
        for object in objects {
          spec = spec.path_arg(object);
        }
        spec.path_arg(archive).arg(format!("/Fe{}", output.display()))
      }
      CompilerKind::Gnu => {
        spec = match self.os {
          Os::MacOs => spec.args(["-bundle", "-undefined", "dynamic_lookup"]),
          Os::Linux | Os::Windows => spec.arg("-shared"),
        };
        for object in objects {
          spec = spec.path_arg(object);
        }
        spec.path_arg(archive).arg("-o").path_arg(output)
      }
    }
  }

  /// Whether the build tool understands `-j`. `nmake` does not.
  pub fn make_supports_jobs(&self) -> bool {
    let stem = Path::new(&self.make.program)
      .file_stem()
      .map(|s| s.to_string_lossy().to_lowercase())
      .unwrap_or_default();
    stem != "nmake"
  }

  /// Invoke the build tool on `target`, in parallel where supported.
  pub fn make_target(&self, target: &str, parallel: bool) -> CommandSpec {
    let mut spec = self.make.clone();
    if parallel && self.make_supports_jobs() {
      spec = spec.arg(format!("-j{}", self.jobs));
    }
    spec.arg(target)
  }
}

fn available_jobs() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
