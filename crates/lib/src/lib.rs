//! cfbuild-lib: build pipeline for the Clownfish runtime's Python extension
//!
//! This crate drives every step of building the extension:
//! - `probe`: compile and run charmonizer to produce `charmony.h`
//! - `codegen`: hand the class hierarchy to the external code generator
//! - `archive`: build the runtime core as a static archive via `make`
//! - `link`: compile and link the loadable extension module
//! - `clean`: remove every generated artifact
//! - `testing`: run the host test suite against the build output
//!
//! `pipeline::Pipeline` chains these stages, gating each on staleness.

pub mod archive;
pub mod clean;
pub mod codegen;
pub mod config;
pub mod consts;
pub mod exec;
pub mod host;
pub mod link;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod probe;
pub mod stage;
pub mod staleness;
pub mod testing;
pub mod util;
