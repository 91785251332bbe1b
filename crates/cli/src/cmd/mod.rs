mod build;
mod charmony;
mod clean;
mod info;
mod libclownfish;
mod report;

use std::path::Path;

use anyhow::{Context, Result};

use cfbuild_lib::codegen::ExternalGenerator;
use cfbuild_lib::config::{BuildEnv, ProjectLayout};
use cfbuild_lib::pipeline::Pipeline;

pub use build::cmd_build;
pub use charmony::cmd_charmony;
pub use clean::cmd_clean;
pub use info::cmd_info;
pub use libclownfish::cmd_libclownfish;
pub use test::cmd_test;

/// Detect the toolchain and interpreter for the project at `root`.
async fn open_pipeline(root: &Path) -> Result<Pipeline<ExternalGenerator>> {
  let env = BuildEnv::from_env();
  Pipeline::from_env(ProjectLayout::new(root), &env)
    .await
    .context("Failed to configure build")
}
