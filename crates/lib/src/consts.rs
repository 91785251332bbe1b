//! Fixed names and conventional relative paths.

/// Header stamped on every generated source file.
pub const AUTOGEN_HEADER: &str = "Autogenerated by cfbuild";

/// Name of the probe program, before platform executable suffixing.
pub const CHARMONIZER_NAME: &str = "charmonizer";

pub const CHARMONY_H: &str = "charmony.h";

/// Library name of the runtime core archive (`libclownfish.a`, `clownfish.lib`).
pub const CORE_LIB_NAME: &str = "clownfish";

pub const PARCEL: &str = "Clownfish";

/// Dotted name of the host extension module.
pub const EXTENSION_NAME: &str = "clownfish._clownfish";

pub const BINDING_FILE: &str = "_clownfish.c";

pub const AUTOGEN_DIR: &str = "autogen";

pub const CFEXT_DIR: &str = "cfext";

pub const BUILD_DIR: &str = "build";

/// Scratch tree the code generator writes into before changed files are synced into `autogen/`.
pub const STAGING_DIR: &str = "cfc-staging";

pub const MAKEFILE: &str = "Makefile";

/// File name of the persisted hierarchy log inside the autogen directory.
pub const HIERARCHY_LOG: &str = "hierarchy.json";

/// Extension of class declaration files.
pub const DECLARATION_EXT: &str = "cfh";
