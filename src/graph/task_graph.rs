//! Task DAG built on petgraph
//!
//! ## Graph Structure
//!
//! - **Directed Graph**: `A → B` means "B depends on A" (A must be done before B starts)
//! - **Nodes**: Tasks, named `<module>:<task>` or a bare global name
//! - **Index**: task name → node index
//! - **Invariants**: acyclic at all times; tasks whose output paths are equal or nested are always ordered
//!
//! Every edge is checked when it is added, so a cycle is reported with the exact chain that
//! would close it. `validate` re-checks the whole graph before execution.

use crate::core::error::{GraphError, YardResult};
use crate::utils::normalize_lexical;
use petgraph::Direction;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

/// What a task does when it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskAction {
  Compile,
  /// Render the bundle descriptor and archive compiled output
  Package,
  SourcesArchive,
  ModuleDocs,
  DocsArchive,
  /// Copy runtime dependencies and the primary artifact into `into`
  CollectRuntime { into: PathBuf },
  /// Aggregate with no work of its own
  Lifecycle,
  /// Cross-module documentation generation
  GenerateDocs,
  Sign,
  Publish,
  ReleaseStaging,
  Distribute,
}

/// A named unit of work
#[derive(Debug, Clone, Serialize)]
pub struct Task {
  pub name: String,
  /// Owning module; `None` for global tasks
  pub module: Option<String>,
  pub action: TaskAction,
  /// Destination written exclusively by this task
  pub output: Option<PathBuf>,
  pub description: String,
}

impl Task {
  pub fn module_task(module: &str, task: &str, action: TaskAction, description: impl Into<String>) -> Self {
    Self {
      name: task_name(module, task),
      module: Some(module.to_string()),
      action,
      output: None,
      description: description.into(),
    }
  }

  pub fn global(name: &str, action: TaskAction, description: impl Into<String>) -> Self {
    Self {
      name: name.to_string(),
      module: None,
      action,
      output: None,
      description: description.into(),
    }
  }

  pub fn with_output(mut self, output: PathBuf) -> Self {
    self.output = Some(output);
    self
  }
}

/// `<module>:<task>`
pub fn task_name(module: &str, task: &str) -> String {
  format!("{}:{}", module, task)
}

/// Directed acyclic task graph
#[derive(Debug, Default)]
pub struct TaskGraph {
  graph: DiGraph<Task, ()>,
  name_to_node: HashMap<String, NodeIndex>,
}

impl TaskGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a task; names are unique
  pub fn add_task(&mut self, task: Task) -> YardResult<()> {
    if self.name_to_node.contains_key(&task.name) {
      return Err(GraphError::DuplicateTask { name: task.name }.into());
    }
    let name = task.name.clone();
    let idx = self.graph.add_node(task);
    self.name_to_node.insert(name, idx);
    Ok(())
  }

  /// Declare that `task` cannot start before `predecessor` is done.
  ///
  /// # Errors
  /// - either task is unknown
  /// - the edge would close a cycle (the error names the chain)
  pub fn depends_on(&mut self, task: &str, predecessor: &str) -> YardResult<()> {
    let task_idx = self.find_node(task)?;
    let pred_idx = self.find_node(predecessor)?;

    if self.graph.contains_edge(pred_idx, task_idx) {
      return Ok(());
    }
    if task_idx == pred_idx {
      return Err(
        GraphError::Cycle {
          tasks: vec![task.to_string(), task.to_string()],
        }
        .into(),
      );
    }
    if let Some(mut chain) = self.path(task_idx, pred_idx) {
      chain.push(task.to_string());
      return Err(GraphError::Cycle { tasks: chain }.into());
    }

    self.graph.add_edge(pred_idx, task_idx, ());
    Ok(())
  }

  /// Shortest chain of task names from `from` to `to` following edges (BFS)
  fn path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<String>> {
    let mut queue = VecDeque::new();
    let mut visited = HashMap::new();

    queue.push_back(from);
    visited.insert(from, None);

    while let Some(current) = queue.pop_front() {
      if current == to {
        let mut path = vec![];
        let mut node = Some(current);
        while let Some(idx) = node {
          path.push(self.graph[idx].name.clone());
          node = visited[&idx];
        }
        path.reverse();
        return Some(path);
      }

      for neighbor in self.graph.neighbors_directed(current, Direction::Outgoing) {
        if let std::collections::hash_map::Entry::Vacant(e) = visited.entry(neighbor) {
          e.insert(Some(current));
          queue.push_back(neighbor);
        }
      }
    }

    None
  }

  fn find_node(&self, name: &str) -> YardResult<NodeIndex> {
    self
      .name_to_node
      .get(name)
      .copied()
      .ok_or_else(|| GraphError::UnknownTask { name: name.to_string() }.into())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.name_to_node.contains_key(name)
  }

  pub fn task(&self, name: &str) -> Option<&Task> {
    self.name_to_node.get(name).map(|idx| &self.graph[*idx])
  }

  /// Tasks in registration order
  pub fn tasks(&self) -> impl Iterator<Item = &Task> {
    self.graph.node_indices().map(|idx| &self.graph[idx])
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  fn neighbors_sorted(&self, name: &str, direction: Direction) -> YardResult<Vec<String>> {
    let idx = self.find_node(name)?;
    let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
    nodes.sort();
    Ok(nodes.into_iter().map(|n| self.graph[n].name.clone()).collect())
  }

  /// Direct predecessors in registration order
  pub fn predecessors(&self, name: &str) -> YardResult<Vec<String>> {
    self.neighbors_sorted(name, Direction::Incoming)
  }

  /// True when one task is (transitively) ordered before the other
  pub fn is_ordered(&self, a: &str, b: &str) -> YardResult<bool> {
    let a = self.find_node(a)?;
    let b = self.find_node(b)?;
    Ok(algo::has_path_connecting(&self.graph, a, b, None) || algo::has_path_connecting(&self.graph, b, a, None))
  }

  /// Deterministic topological order: among ready tasks the earliest registered goes first
  pub fn topological_order(&self) -> YardResult<Vec<String>> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut ready: BTreeSet<NodeIndex> = in_degree.iter().filter(|(_, d)| **d == 0).map(|(i, _)| *i).collect();
    let mut order = Vec::with_capacity(self.graph.node_count());

    while let Some(idx) = ready.pop_first() {
      order.push(self.graph[idx].name.clone());
      for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
        let target = edge.target();
        if let Some(degree) = in_degree.get_mut(&target) {
          *degree -= 1;
          if *degree == 0 {
            ready.insert(target);
          }
        }
      }
    }

    if order.len() != self.graph.node_count() {
      return Err(GraphError::Cycle { tasks: self.find_cycle() }.into());
    }
    Ok(order)
  }

  fn find_cycle(&self) -> Vec<String> {
    algo::tarjan_scc(&self.graph)
      .into_iter()
      .find(|component| component.len() > 1)
      .map(|component| component.into_iter().map(|idx| self.graph[idx].name.clone()).collect())
      .unwrap_or_default()
  }

  /// Pairs of tasks whose outputs are the same path or nested.
  ///
  /// Each pair is `(path, first, second)` where `first` should run before `second`: an
  /// ancestor directory's writer goes first, otherwise registration order decides.
  fn output_conflicts(&self) -> Vec<(PathBuf, String, String)> {
    let outputs: Vec<(&str, PathBuf)> = self
      .graph
      .node_indices()
      .filter_map(|idx| {
        let task = &self.graph[idx];
        task.output.as_deref().map(|out| (task.name.as_str(), normalize_lexical(out)))
      })
      .collect();

    let mut conflicts = Vec::new();
    for (i, (first, first_out)) in outputs.iter().enumerate() {
      for (second, second_out) in &outputs[i + 1..] {
        if second_out != first_out && first_out.starts_with(second_out) {
          conflicts.push((second_out.clone(), second.to_string(), first.to_string()));
        } else if second_out.starts_with(first_out) {
          conflicts.push((first_out.clone(), first.to_string(), second.to_string()));
        }
      }
    }
    conflicts
  }

  /// Order every unordered pair of tasks with overlapping outputs
  pub fn serialize_shared_outputs(&mut self) -> YardResult<usize> {
    let mut added = 0;
    for (output, first, second) in self.output_conflicts() {
      if !self.is_ordered(&first, &second)? {
        tracing::debug!(output = %output.display(), %first, %second, "serialising shared output");
        self.depends_on(&second, &first)?;
        added += 1;
      }
    }
    Ok(added)
  }

  /// Static check before execution: acyclic, overlapping outputs ordered
  pub fn validate(&self) -> YardResult<()> {
    algo::toposort(&self.graph, None).map_err(|_| GraphError::Cycle { tasks: self.find_cycle() })?;

    for (output, first, second) in self.output_conflicts() {
      if !self.is_ordered(&first, &second)? {
        return Err(GraphError::SharedOutput { path: output, first, second }.into());
      }
    }
    Ok(())
  }

  /// The targets plus all of their transitive predecessors
  pub fn closure(&self, targets: &[String]) -> YardResult<HashSet<String>> {
    let mut seen = HashSet::new();
    let mut stack = Vec::new();
    for target in targets {
      stack.push(self.find_node(target)?);
    }
    while let Some(idx) = stack.pop() {
      if seen.insert(idx) {
        stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
      }
    }
    Ok(seen.into_iter().map(|idx| self.graph[idx].name.clone()).collect())
  }

  /// Export graph to DOT format (Graphviz).
  ///
  /// ```bash
  /// shipyard plan --dot > tasks.dot
  /// dot -Tpng tasks.dot -o tasks.png
  /// ```
  pub fn to_dot(&self) -> String {
    use petgraph::dot::{Config, Dot};

    let dot = Dot::with_attr_getters(
      &self.graph,
      &[Config::EdgeNoLabel, Config::NodeNoLabel],
      &|_, _| String::new(),
      &|_, (_idx, task)| {
        if task.module.is_some() {
          format!("label=\"{}\" shape=box", task.name)
        } else {
          format!("label=\"{}\" shape=box style=filled fillcolor=lightblue", task.name)
        }
      },
    );

    format!("{:?}", dot)
  }
}
