use std::path::Path;

use anyhow::Result;

use cfbuild_lib::stage::StageKind;

use super::open_pipeline;
use super::report::print_result;
use crate::output::OutputFormat;

pub async fn cmd_charmony(root: &Path, output: OutputFormat) -> Result<i32> {
  let mut pipeline = open_pipeline(root).await?;
  let result = pipeline.charmony().await;
  print_result(StageKind::Probe, &result, output, "Probe complete!")
}
