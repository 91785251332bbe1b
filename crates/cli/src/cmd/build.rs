use std::path::Path;

use anyhow::Result;

use cfbuild_lib::stage::StageKind;

use super::open_pipeline;
use super::report::print_result;
use crate::output::OutputFormat;

/// Execute the build command.
///
/// Runs every stage up to and including the extension link. Returns the
/// process exit code.
pub async fn cmd_build(root: &Path, output: OutputFormat) -> Result<i32> {
  let mut pipeline = open_pipeline(root).await?;
  let result = pipeline.build().await;
  print_result(StageKind::Link, &result, output, "Build complete!")
}
