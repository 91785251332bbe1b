//! Build pipeline driver.
//!
//! The pipeline walks the stage chain towards a goal one stage at a time.
//! Every stage reports a status or an error; the first error stops the walk
//! and every later stage on the way to the goal is reported as skipped.
//!
//! ```text
//! probe -> hierarchy -> core-bind -> [changed?] host-bind -> archive -> package -> link -> test
//! ```

use std::time::Instant;

use thiserror::Error;
use tracing::{error, info};

use crate::archive::{archive_path, build_archive};
use crate::codegen::{ExternalGenerator, Generator, Hierarchy, HostBinding};
use crate::config::{BuildEnv, ProjectLayout};
use crate::consts::AUTOGEN_HEADER;
use crate::host::{HostConfig, HostError};
use crate::link::Linker;
use crate::package::copy_packages;
use crate::platform::{Toolchain, ToolchainError};
use crate::probe::Probe;
use crate::stage::{
  PipelineResult, SkippedStage, StageError, StageGraph, StageKind, StageNode, StageReport, StageStatus,
};
use crate::staleness::{RealFs, Timestamps};
use crate::testing::{SearchPath, run_tests};

/// Errors raised while assembling a pipeline, before any stage runs.
#[derive(Debug, Error)]
pub enum SetupError {
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error("failed to query host interpreter: {0}")]
  Host(#[from] HostError),
}

/// The chain of stages for a project, with the files each reads and produces.
pub fn stage_graph(layout: &ProjectLayout, toolchain: &Toolchain, host: &HostConfig) -> StageGraph {
  let archive = archive_path(layout, toolchain);
  StageGraph::chain([
    StageNode::new(StageKind::Probe)
      .input(&layout.charmonizer_c)
      .output(layout.charmony_h())
      .output(layout.makefile()),
    StageNode::new(StageKind::Hierarchy)
      .input(&layout.core_source_dir)
      .output(layout.autogen_include())
      .output(layout.autogen_source()),
    StageNode::new(StageKind::CoreBind),
    StageNode::new(StageKind::HostBind).output(&layout.binding_file),
    StageNode::new(StageKind::Archive).output(&archive),
    StageNode::new(StageKind::Package),
    StageNode::new(StageKind::Link)
      .input(&layout.binding_file)
      .input(&archive)
      .output(host.module_path(layout)),
    StageNode::new(StageKind::Test),
  ])
}

pub struct Pipeline<G: Generator> {
  layout: ProjectLayout,
  toolchain: Toolchain,
  host: HostConfig,
  generator: G,
  valgrind: bool,
  search_path: SearchPath,
  times: Box<dyn Timestamps>,
  graph: StageGraph,
  hierarchy: Option<Hierarchy>,
  core_changed: bool,
}

impl Pipeline<ExternalGenerator> {
  /// Assemble the production pipeline: detect the toolchain, query the
  /// interpreter, and use the external code generator.
  pub async fn from_env(layout: ProjectLayout, env: &BuildEnv) -> Result<Self, SetupError> {
    let toolchain = Toolchain::detect(env)?;
    let host = HostConfig::probe(&env.python_command(), &layout.root).await?;
    let generator = ExternalGenerator::new(env.generator_command(), &layout.root, layout.staging_dir());

    Ok(
      Self::new(layout, toolchain, host, generator)
        .with_valgrind(env.valgrind)
        .with_search_path(SearchPath::from_env_value(env.search_path.as_deref())),
    )
  }
}

impl<G: Generator> Pipeline<G> {
  pub fn new(layout: ProjectLayout, toolchain: Toolchain, host: HostConfig, generator: G) -> Self {
    let graph = stage_graph(&layout, &toolchain, &host);
    Self {
      layout,
      toolchain,
      host,
      generator,
      valgrind: false,
      search_path: SearchPath::new(),
      times: Box::new(RealFs),
      graph,
      hierarchy: None,
      core_changed: false,
    }
  }

  pub fn with_valgrind(mut self, valgrind: bool) -> Self {
    self.valgrind = valgrind;
    self
  }

  pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
    self.search_path = search_path;
    self
  }

  pub fn with_timestamps(mut self, times: impl Timestamps + 'static) -> Self {
    self.times = Box::new(times);
    self
  }

  pub fn layout(&self) -> &ProjectLayout {
    &self.layout
  }

  pub fn toolchain(&self) -> &Toolchain {
    &self.toolchain
  }

  pub fn host(&self) -> &HostConfig {
    &self.host
  }

  pub fn graph(&self) -> &StageGraph {
    &self.graph
  }

  pub fn generator(&self) -> &G {
    &self.generator
  }

  pub fn generator_mut(&mut self) -> &mut G {
    &mut self.generator
  }

  pub fn search_path(&self) -> &SearchPath {
    &self.search_path
  }

  /// Probe only.
  pub async fn charmony(&mut self) -> PipelineResult {
    self.run_until(StageKind::Probe).await
  }

  /// Probe, code generation, and the core archive.
  pub async fn libclownfish(&mut self) -> PipelineResult {
    self.run_until(StageKind::Archive).await
  }

  /// Everything up to a linked extension module.
  pub async fn build(&mut self) -> PipelineResult {
    self.run_until(StageKind::Link).await
  }

  /// Build, then run the test suite.
  pub async fn test(&mut self) -> PipelineResult {
    self.run_until(StageKind::Test).await
  }

  /// Run every stage `goal` depends on, then `goal` itself.
  pub async fn run_until(&mut self, goal: StageKind) -> PipelineResult {
    let mut result = PipelineResult::default();
    let plan = match self.graph.verify_chain().and_then(|()| self.graph.plan(goal)) {
      Ok(plan) => plan,
      Err(err) => {
        result.failed = Some((goal, err));
        return result;
      }
    };

    self.hierarchy = None;
    self.core_changed = false;
    let mut blocked: Option<StageKind> = None;

    for kind in plan {
      if let Some(after) = blocked {
        info!(stage = %kind, after = %after, "skipping stage");
        result.skipped.push(SkippedStage { kind, after });
        blocked = Some(kind);
        continue;
      }

      info!(stage = %kind, "starting stage");
      let start = Instant::now();
      let outcome = match self.run_stage(kind).await {
        Ok(status) => self.verify_outputs(kind).map(|()| status),
        Err(err) => Err(err),
      };

      match outcome {
        Ok(status) => {
          let duration = start.elapsed();
          info!(stage = %kind, status = status.label(), elapsed_ms = duration.as_millis() as u64, "stage finished");
          result.completed.push(StageReport { kind, status, duration });
        }
        Err(err) => {
          error!(stage = %kind, error = %err, "stage failed");
          result.failed = Some((kind, err));
          blocked = Some(kind);
        }
      }
    }

    result
  }

  async fn run_stage(&mut self, kind: StageKind) -> Result<StageStatus, StageError> {
    match kind {
      StageKind::Probe => {
        let probe = Probe {
          layout: &self.layout,
          toolchain: &self.toolchain,
          host: &self.host,
          valgrind: self.valgrind,
        };
        probe.run(self.times.as_ref()).await
      }
      StageKind::Hierarchy => {
        let mut hierarchy = Hierarchy::new(&self.layout.autogen_dir);
        hierarchy.add_source_dir(&self.layout.core_source_dir);
        hierarchy.build()?;
        self.hierarchy = Some(hierarchy);
        Ok(StageStatus::Ran)
      }
      StageKind::CoreBind => {
        let hierarchy = self.hierarchy.as_ref().ok_or(StageError::OutOfOrder {
          stage: kind,
          requires: StageKind::Hierarchy,
        })?;
        self.core_changed = self.generator.bind_core(hierarchy, AUTOGEN_HEADER).await?;
        Ok(if self.core_changed { StageStatus::Ran } else { StageStatus::UpToDate })
      }
      StageKind::HostBind => {
        let hierarchy = self.hierarchy.as_ref().ok_or(StageError::OutOfOrder {
          stage: kind,
          requires: StageKind::Hierarchy,
        })?;
        // Unchanged core sources mean the existing glue is still valid. A
        // missing glue file is regenerated regardless.
        if !self.core_changed && self.layout.binding_file.exists() {
          return Ok(StageStatus::NotNeeded);
        }
        let binding = HostBinding::python(&self.layout.root);
        self.generator.bind_host(hierarchy, &binding).await?;
        hierarchy.write_log()?;
        Ok(StageStatus::Ran)
      }
      StageKind::Archive => build_archive(&self.layout, &self.toolchain).await,
      StageKind::Package => copy_packages(&self.layout, &self.host.lib_dir(&self.layout)),
      StageKind::Link => {
        let linker = Linker {
          layout: &self.layout,
          toolchain: &self.toolchain,
          host: &self.host,
        };
        linker.run(self.times.as_ref()).await
      }
      StageKind::Test => {
        let lib_dir = self.host.lib_dir(&self.layout);
        let summary = run_tests(&self.host.python, &self.layout, &lib_dir, &mut self.search_path).await?;
        Ok(StageStatus::Tested(summary))
      }
    }
  }

  /// Fail the stage if it left a promised output missing.
  fn verify_outputs(&self, kind: StageKind) -> Result<(), StageError> {
    let Some(node) = self.graph.node(kind) else {
      return Err(StageError::UnknownStage(kind));
    };
    match node.outputs.iter().find(|path| !path.exists()) {
      Some(path) => Err(StageError::MissingArtifact {
        stage: kind,
        path: path.clone(),
      }),
      None => Ok(()),
    }
  }
}
