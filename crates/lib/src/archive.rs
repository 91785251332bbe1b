//! Static archive of the runtime core.
//!
//! The probe-generated `Makefile` knows how to compile the core; this stage
//! only asks it for the `static` target and checks the archive appeared.

use std::path::PathBuf;

use tracing::info;

use crate::config::ProjectLayout;
use crate::consts::CORE_LIB_NAME;
use crate::exec;
use crate::platform::Toolchain;
use crate::stage::{StageError, StageKind, StageStatus};

const STATIC_TARGET: &str = "static";

/// Path of the core archive for this toolchain.
pub fn archive_path(layout: &ProjectLayout, toolchain: &Toolchain) -> PathBuf {
  layout.root.join(toolchain.static_lib_filename(CORE_LIB_NAME))
}

/// Run the build tool's `static` target.
pub async fn build_archive(layout: &ProjectLayout, toolchain: &Toolchain) -> Result<StageStatus, StageError> {
  let spec = toolchain.make_target(STATIC_TARGET, true);
  exec::run(&spec, &layout.root, None).await?;

  let archive = archive_path(layout, toolchain);
  if !archive.is_file() {
    return Err(StageError::MissingArtifact {
      stage: StageKind::Archive,
      path: archive,
    });
  }
  info!(archive = %archive.display(), "core archive ready");
  Ok(StageStatus::Ran)
}
