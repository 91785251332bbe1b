//! Test utilities for cfbuild-lib.
//!
//! Cross-platform helpers for tests that need to execute shell commands.

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Write an executable `/bin/sh` script at `path`.
#[cfg(unix)]
pub fn write_script(path: &std::path::Path, body: &str) {
  use std::os::unix::fs::PermissionsExt;

  std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
