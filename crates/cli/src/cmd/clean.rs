//! Implementation of the `cfbuild clean` command.

use std::path::Path;

use anyhow::{Context, Result};

use cfbuild_lib::clean::{CleanError, clean};
use cfbuild_lib::config::{BuildEnv, ProjectLayout};
use cfbuild_lib::platform::Toolchain;

use crate::output::{OutputFormat, print_error, print_info, print_json, print_stat, print_success};

/// Remove generated artifacts from the project at `root`.
///
/// A failing `distclean` propagates the build tool's exit code.
pub async fn cmd_clean(root: &Path, all: bool, output: OutputFormat) -> Result<i32> {
  let env = BuildEnv::from_env();
  let layout = ProjectLayout::new(root);
  let toolchain = Toolchain::detect(&env).context("Failed to detect toolchain")?;

  let result = match clean(&layout, &toolchain, all).await {
    Ok(result) => result,
    Err(CleanError::Exec(err)) => {
      print_error(&format!("clean failed: {}", err));
      return Ok(err.exit_code().filter(|code| *code != 0).unwrap_or(1));
    }
    Err(err) => return Err(err).context("Clean failed"),
  };

  if output.is_json() {
    print_json(&result)?;
  } else if result.removed.is_empty() && !result.distclean_ran {
    print_info("Nothing to clean");
  } else {
    print_success("Clean complete!");
    print_stat("Paths removed", &result.removed.len().to_string());
    if result.distclean_ran {
      print_stat("distclean", "ran");
    }
  }

  Ok(0)
}
