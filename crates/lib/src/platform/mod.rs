//! Platform and toolchain detection.

pub mod arch;
pub mod os;
pub mod toolchain;

use std::fmt;

use arch::Arch;
use os::Os;
use serde::{Serialize, Serializer};

pub use toolchain::{CompilerKind, Toolchain, ToolchainError};

/// Architecture and OS of the build machine, shown as `<arch>-<os>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// `None` when either half is unsupported.
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

impl Serialize for Platform {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.triple())
  }
}
