//! Build configuration.
//!
//! Two halves: [`BuildEnv`] captures the tool overrides read from the process
//! environment once at startup, and [`ProjectLayout`] fixes every conventional
//! path relative to the project root.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::consts::{
  AUTOGEN_DIR, BINDING_FILE, BUILD_DIR, CFEXT_DIR, CHARMONIZER_NAME, CHARMONY_H, MAKEFILE, STAGING_DIR,
};
use crate::exec::CommandSpec;

pub const ENV_CC: &str = "CC";
pub const ENV_CFLAGS: &str = "CFLAGS";
pub const ENV_MAKE: &str = "MAKE";
pub const ENV_PYTHON: &str = "PYTHON";
pub const ENV_GENERATOR: &str = "CFBUILD_CFC";
pub const ENV_VALGRIND: &str = "CHARM_VALGRIND";
pub const ENV_SEARCH_PATH: &str = "PYTHONPATH";

const DEFAULT_GENERATOR: &str = "cfc";

#[cfg(windows)]
const DEFAULT_PYTHON: &str = "python";

#[cfg(not(windows))]
const DEFAULT_PYTHON: &str = "python3";

/// Tool overrides taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
  pub cc: Option<String>,
  pub cflags: Option<String>,
  pub make: Option<String>,
  pub python: Option<String>,
  pub generator: Option<String>,
  /// Run the probe under valgrind. Set by the mere presence of `CHARM_VALGRIND`.
  pub valgrind: bool,
  pub search_path: Option<OsString>,
}

impl BuildEnv {
  pub fn from_env() -> Self {
    Self {
      cc: non_blank_var(ENV_CC),
      cflags: non_blank_var(ENV_CFLAGS),
      make: non_blank_var(ENV_MAKE),
      python: non_blank_var(ENV_PYTHON),
      generator: non_blank_var(ENV_GENERATOR),
      valgrind: std::env::var_os(ENV_VALGRIND).is_some(),
      search_path: std::env::var_os(ENV_SEARCH_PATH).filter(|v| !v.is_empty()),
    }
  }

  /// The host interpreter command.
  pub fn python_command(&self) -> CommandSpec {
    spec_or_default(self.python.as_deref(), DEFAULT_PYTHON)
  }

  /// The external code generator command.
  pub fn generator_command(&self) -> CommandSpec {
    spec_or_default(self.generator.as_deref(), DEFAULT_GENERATOR)
  }

  /// User `CFLAGS`, split on whitespace.
  pub fn cflags(&self) -> Vec<String> {
    self
      .cflags
      .as_deref()
      .map(|flags| flags.split_whitespace().map(str::to_string).collect())
      .unwrap_or_default()
  }
}

fn non_blank_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn spec_or_default(value: Option<&str>, default: &str) -> CommandSpec {
  value
    .and_then(CommandSpec::parse)
    .unwrap_or_else(|| CommandSpec::new(default))
}

/// Conventional paths of a host binding project.
///
/// The root is the host binding directory (e.g. `runtime/python`); the runtime
/// core and the shared probe source live next to it in the parent directory.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectLayout {
  pub root: PathBuf,
  pub core_source_dir: PathBuf,
  pub charmonizer_c: PathBuf,
  pub cfext_dir: PathBuf,
  pub autogen_dir: PathBuf,
  pub binding_file: PathBuf,
  pub build_dir: PathBuf,
  pub test_dir: PathBuf,
  /// Directory holding the host-language packages (`src/`).
  pub package_dir: PathBuf,
  pub packages: Vec<String>,
}

impl ProjectLayout {
  /// Layout rooted at `root`. Pass an absolute path; the parent directory is
  /// resolved lexically.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    let parent = if root.is_absolute() {
      root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone())
    } else {
      root.join("..")
    };

    Self {
      core_source_dir: parent.join("core"),
      charmonizer_c: parent.join("common").join("charmonizer.c"),
      cfext_dir: root.join(CFEXT_DIR),
      autogen_dir: root.join(AUTOGEN_DIR),
      binding_file: root.join(BINDING_FILE),
      build_dir: root.join(BUILD_DIR),
      test_dir: root.join("test"),
      package_dir: root.join("src"),
      packages: vec!["clownfish".to_string()],
      root,
    }
  }

  pub fn with_core_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.core_source_dir = dir.into();
    self
  }

  pub fn with_charmonizer_c(mut self, path: impl Into<PathBuf>) -> Self {
    self.charmonizer_c = path.into();
    self
  }

  pub fn autogen_include(&self) -> PathBuf {
    self.autogen_dir.join("include")
  }

  pub fn autogen_source(&self) -> PathBuf {
    self.autogen_dir.join("source")
  }

  pub fn staging_dir(&self) -> PathBuf {
    self.build_dir.join(STAGING_DIR)
  }

  pub fn charmony_h(&self) -> PathBuf {
    self.root.join(CHARMONY_H)
  }

  pub fn makefile(&self) -> PathBuf {
    self.root.join(MAKEFILE)
  }

  /// Path of the probe executable for an OS-specific file name.
  pub fn charmonizer_exe(&self, exe_name: &str) -> PathBuf {
    self.root.join(exe_name)
  }

  /// Include search path for the extension: runtime core headers, generated
  /// headers, binding support headers, then the project root.
  pub fn include_dirs(&self) -> Vec<PathBuf> {
    vec![
      self.core_source_dir.clone(),
      self.autogen_include(),
      self.cfext_dir.clone(),
      self.root.clone(),
    ]
  }

  /// Glob patterns removed by `clean`, relative to the root.
  pub fn clean_patterns(&self, exe_name: &str) -> Vec<String> {
    vec![
      exe_name.to_string(),
      CHARMONY_H.to_string(),
      "_charm*".to_string(),
      BINDING_FILE.to_string(),
    ]
  }
}

/// Name of the probe executable for the given OS.
pub fn charmonizer_exe_name(os: crate::platform::os::Os) -> String {
  os.executable_filename(CHARMONIZER_NAME)
}
