//! Stage dependency graph.
//!
//! Stages are nodes; an edge runs from a dependency to its dependent. The
//! build is a single chain, so besides ordering the graph also checks that no
//! stage has more than one dependency or dependent.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use super::types::{StageError, StageKind};

/// A stage and the files it reads and promises to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNode {
  pub kind: StageKind,
  pub inputs: Vec<PathBuf>,
  /// Files that must exist once the stage has finished successfully.
  pub outputs: Vec<PathBuf>,
}

impl StageNode {
  pub fn new(kind: StageKind) -> Self {
    Self {
      kind,
      inputs: Vec::new(),
      outputs: Vec::new(),
    }
  }

  pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
    self.inputs.push(path.into());
    self
  }

  pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
    self.outputs.push(path.into());
    self
  }
}

#[derive(Debug, Default)]
pub struct StageGraph {
  graph: DiGraph<StageNode, ()>,
  nodes: HashMap<StageKind, NodeIndex>,
}

impl StageGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a graph where each stage depends on the one before it.
  pub fn chain(stages: impl IntoIterator<Item = StageNode>) -> Self {
    let mut graph = Self::new();
    let mut previous = None;
    for node in stages {
      let kind = node.kind;
      graph.add_stage(node);
      if let Some(prev) = previous {
        graph.link(prev, kind);
      }
      previous = Some(kind);
    }
    graph
  }

  /// Add a stage, replacing any stage of the same kind.
  pub fn add_stage(&mut self, node: StageNode) {
    match self.nodes.get(&node.kind) {
      Some(&idx) => self.graph[idx] = node,
      None => {
        let kind = node.kind;
        let idx = self.graph.add_node(node);
        self.nodes.insert(kind, idx);
      }
    }
  }

  /// Declare that `dependent` consumes what `dependency` produces.
  pub fn add_dependency(&mut self, dependency: StageKind, dependent: StageKind) -> Result<(), StageError> {
    for kind in [dependency, dependent] {
      if !self.nodes.contains_key(&kind) {
        return Err(StageError::UnknownStage(kind));
      }
    }
    self.link(dependency, dependent);
    Ok(())
  }

  fn link(&mut self, dependency: StageKind, dependent: StageKind) {
    let (from, to) = (self.nodes[&dependency], self.nodes[&dependent]);
    self.graph.update_edge(from, to, ());
  }

  pub fn node(&self, kind: StageKind) -> Option<&StageNode> {
    self.nodes.get(&kind).map(|&idx| &self.graph[idx])
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Direct dependencies of a stage.
  pub fn dependencies(&self, kind: StageKind) -> Vec<StageKind> {
    let Some(&idx) = self.nodes.get(&kind) else {
      return Vec::new();
    };
    self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep| self.graph[dep].kind)
      .collect()
  }

  /// All stages with dependencies before dependents.
  pub fn order(&self) -> Result<Vec<StageKind>, StageError> {
    let sorted = toposort(&self.graph, None).map_err(|_| StageError::CycleDetected)?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].kind).collect())
  }

  /// The stages needed to reach `goal`, goal last.
  pub fn plan(&self, goal: StageKind) -> Result<Vec<StageKind>, StageError> {
    let &start = self.nodes.get(&goal).ok_or(StageError::UnknownStage(goal))?;

    let reversed = Reversed(&self.graph);
    let mut dfs = Dfs::new(reversed, start);
    let mut needed = HashSet::new();
    while let Some(idx) = dfs.next(reversed) {
      needed.insert(self.graph[idx].kind);
    }

    Ok(self.order()?.into_iter().filter(|kind| needed.contains(kind)).collect())
  }

  /// Check that the stages form one acyclic chain.
  pub fn verify_chain(&self) -> Result<(), StageError> {
    self.order()?;

    let mut roots = Vec::new();
    for (&kind, &idx) in &self.nodes {
      let incoming = self.graph.neighbors_directed(idx, Direction::Incoming).count();
      let outgoing = self.graph.neighbors_directed(idx, Direction::Outgoing).count();
      if incoming > 1 {
        return Err(StageError::NotLinear(format!("{} has {} dependencies", kind, incoming)));
      }
      if outgoing > 1 {
        return Err(StageError::NotLinear(format!("{} has {} dependents", kind, outgoing)));
      }
      if incoming == 0 {
        roots.push(kind);
      }
    }

    if roots.len() > 1 {
      roots.sort();
      let names: Vec<&str> = roots.iter().map(StageKind::name).collect();
      return Err(StageError::NotLinear(format!("multiple first stages: {}", names.join(", "))));
    }
    Ok(())
  }
}
