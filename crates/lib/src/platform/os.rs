use std::fmt;

/// Operating system variants cfbuild knows how to drive a toolchain on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }

  /// Suffix appended to executables built on this OS.
  pub fn exe_suffix(&self) -> &'static str {
    match self {
      Self::Windows => ".exe",
      Self::Linux | Self::MacOs => "",
    }
  }

  /// Returns `name` with this OS's executable suffix.
  pub fn executable_filename(&self, name: &str) -> String {
    format!("{}{}", name, self.exe_suffix())
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
