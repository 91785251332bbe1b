//! External process invocation.
//!
//! Every toolchain step (compiler, probe, build tool, code generator, interpreter)
//! runs through this module. Command lines are echoed before they start and a
//! non-zero exit is always an error carrying the exit code.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};

use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variables layered on top of the inherited process environment.
pub type EnvVars = BTreeMap<String, OsString>;

#[derive(Debug, Error)]
pub enum ExecError {
  /// The program could not be started at all.
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },
}

impl ExecError {
  /// Exit code of the failed process, if it exited normally.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      Self::Failed { code, .. } => *code,
      Self::Spawn { .. } => None,
    }
  }

  /// True when the program does not exist on this system.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
  }
}

/// A program plus its leading arguments.
///
/// Tool variables such as `CC="ccache gcc"` carry arguments, so a spec is
/// parsed from a whitespace-separated line rather than treated as one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  /// Parse a whitespace-separated command line. Returns `None` for blank input.
  pub fn parse(line: &str) -> Option<Self> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some(Self {
      program,
      args: parts.collect(),
    })
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Path arguments are passed lossily; build trees are expected to be UTF-8.
  pub fn path_arg(self, path: &Path) -> Self {
    self.arg(path.to_string_lossy().into_owned())
  }

  /// Returns a spec that runs `prefix` with this command appended to it.
  pub fn wrapped_in(self, prefix: &[&str]) -> Self {
    let Some((program, rest)) = prefix.split_first() else {
      return self;
    };
    let mut args: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
    args.push(self.program);
    args.extend(self.args);
    Self {
      program: program.to_string(),
      args,
    }
  }

  /// The program and its arguments joined by spaces, as echoed to the user.
  pub fn command_line(&self) -> String {
    self.to_string()
  }

  fn to_command(&self, cwd: &Path, env: Option<&EnvVars>) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args).current_dir(cwd);
    if let Some(vars) = env {
      for (key, value) in vars {
        command.env(key, value);
      }
    }
    command
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Run a command with inherited stdio.
///
/// The child's own diagnostics go straight to the terminal; the only thing
/// reported here is whether it exited successfully.
pub async fn run(spec: &CommandSpec, cwd: &Path, env: Option<&EnvVars>) -> Result<(), ExecError> {
  info!(cmd = %spec, "running");

  let status = spec
    .to_command(cwd, env)
    .stdin(Stdio::null())
    .status()
    .await
    .map_err(|source| ExecError::Spawn {
      program: spec.program.clone(),
      source,
    })?;

  if !status.success() {
    return Err(ExecError::Failed {
      cmd: spec.command_line(),
      code: status.code(),
    });
  }

  Ok(())
}

/// Run a command and capture its output without judging the exit status.
pub async fn capture(spec: &CommandSpec, cwd: &Path, env: Option<&EnvVars>) -> Result<Output, ExecError> {
  debug!(cmd = %spec, working_dir = ?cwd, "spawning process");

  spec
    .to_command(cwd, env)
    .stdin(Stdio::null())
    .output()
    .await
    .map_err(|source| ExecError::Spawn {
      program: spec.program.clone(),
      source,
    })
}

/// Run a command and return its trimmed stdout, failing on a non-zero exit.
pub async fn capture_stdout(spec: &CommandSpec, cwd: &Path, env: Option<&EnvVars>) -> Result<String, ExecError> {
  let output = capture(spec, cwd, env).await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(ExecError::Failed {
      cmd: spec.command_line(),
      code: output.status.code(),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
