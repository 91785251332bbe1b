//! Host interpreter configuration.
//!
//! The extension must be compiled against the interpreter that will load it,
//! so its platform tag, version, header directory, module suffix and compile
//! flags are asked of the interpreter itself.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ProjectLayout;
use crate::consts::EXTENSION_NAME;
use crate::exec::{self, CommandSpec, ExecError};

const QUERY_SCRIPT: &str = "import sys, sysconfig
print(sysconfig.get_platform())
print('%d.%d' % sys.version_info[:2])
print(sysconfig.get_path('include'))
print(sysconfig.get_config_var('EXT_SUFFIX') or '.so')
print(sysconfig.get_config_var('CFLAGS') or '')";

#[derive(Debug, Error)]
pub enum HostError {
  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error("unexpected interpreter configuration output: {0}")]
  Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostConfig {
  pub python: CommandSpec,
  /// Platform tag such as `linux-x86_64` or `macosx-11.0-arm64`.
  pub platform: String,
  pub major: u32,
  pub minor: u32,
  pub include_dir: PathBuf,
  /// File name suffix of extension modules, e.g. `.cpython-312-x86_64-linux-gnu.so`.
  pub ext_suffix: String,
  pub cflags: Vec<String>,
}

impl HostConfig {
  /// Ask the interpreter for its build configuration.
  pub async fn probe(python: &CommandSpec, cwd: &Path) -> Result<Self, HostError> {
    let spec = python.clone().arg("-c").arg(QUERY_SCRIPT);
    let stdout = exec::capture_stdout(&spec, cwd, None).await?;
    let config = Self::parse(python.clone(), &stdout)?;
    debug!(platform = %config.platform, version = %config.version(), "host interpreter configured");
    Ok(config)
  }

  /// Parse the line-oriented output of the configuration query.
  pub fn parse(python: CommandSpec, output: &str) -> Result<Self, HostError> {
    let lines: Vec<&str> = output.lines().map(str::trim).collect();
    if lines.len() < 4 {
      return Err(HostError::Malformed(format!("expected at least 4 lines, got {}", lines.len())));
    }

    let (major, minor) = parse_version(lines[1])?;
    let platform = lines[0];
    if platform.is_empty() {
      return Err(HostError::Malformed("empty platform tag".to_string()));
    }

    Ok(Self {
      python,
      platform: platform.to_string(),
      major,
      minor,
      include_dir: PathBuf::from(lines[2]),
      ext_suffix: lines[3].to_string(),
      cflags: lines
        .get(4)
        .map(|flags| flags.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default(),
    })
  }

  pub fn version(&self) -> String {
    format!("{}.{}", self.major, self.minor)
  }

  /// Suffix shared by the per-interpreter build directories.
  pub fn build_tag(&self) -> String {
    format!("{}-{}", self.platform, self.version())
  }

  /// Directory holding the importable build output.
  pub fn lib_dir(&self, layout: &ProjectLayout) -> PathBuf {
    layout.build_dir.join(format!("lib.{}", self.build_tag()))
  }

  /// Directory holding intermediate objects.
  pub fn temp_dir(&self, layout: &ProjectLayout) -> PathBuf {
    layout.build_dir.join(format!("temp.{}", self.build_tag()))
  }

  /// Final path of the extension module.
  pub fn module_path(&self, layout: &ProjectLayout) -> PathBuf {
    let mut path = self.lib_dir(layout);
    let mut parts = EXTENSION_NAME.split('.').peekable();
    while let Some(part) = parts.next() {
      if parts.peek().is_some() {
        path.push(part);
      } else {
        path.push(format!("{}{}", part, self.ext_suffix));
      }
    }
    path
  }
}

fn parse_version(line: &str) -> Result<(u32, u32), HostError> {
  let malformed = || HostError::Malformed(format!("bad version: {:?}", line));
  let (major, minor) = line.split_once('.').ok_or_else(malformed)?;
  Ok((
    major.parse().map_err(|_| malformed())?,
    minor.parse().map_err(|_| malformed())?,
  ))
}
