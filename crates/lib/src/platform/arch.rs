use std::fmt;

/// CPU architectures the probe is known to build on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86,
  X86_64,
  Arm,
  Aarch64,
}

impl Arch {
  pub fn current() -> Option<Self> {
    Self::from_rust_name(std::env::consts::ARCH)
  }

  /// Map a `std::env::consts::ARCH` value.
  pub fn from_rust_name(name: &str) -> Option<Self> {
    match name {
      "x86" => Some(Self::X86),
      "x86_64" => Some(Self::X86_64),
      "arm" => Some(Self::Arm),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Arm => "arm",
      Self::Aarch64 => "aarch64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
