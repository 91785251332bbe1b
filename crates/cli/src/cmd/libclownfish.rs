use std::path::Path;

use anyhow::Result;

use cfbuild_lib::stage::StageKind;

use super::open_pipeline;
use super::report::print_result;
use crate::output::OutputFormat;

/// Probe, generate the core sources, and build the static archive.
pub async fn cmd_libclownfish(root: &Path, output: OutputFormat) -> Result<i32> {
  let mut pipeline = open_pipeline(root).await?;
  let result = pipeline.libclownfish().await;
  print_result(StageKind::Archive, &result, output, "Archive complete!")
}
