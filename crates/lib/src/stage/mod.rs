//! Pipeline stages.
//!
//! A stage is one artifact-producing step of the build. Stages are declared in
//! a [`StageGraph`] with the inputs they read and the outputs they must leave
//! behind; the graph fixes their order and which stages a goal requires.
//!
//! # Submodules
//!
//! - [`graph`] - dependency graph and ordering
//! - `types` - stage kinds, statuses, errors and the pipeline result

pub mod graph;
mod types;

pub use graph::{StageGraph, StageNode};
pub use types::*;
