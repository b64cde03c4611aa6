//! In-process task engine
//!
//! Tasks run in waves: every pending task whose predecessors are all done is dispatched to a
//! rayon pool, and the next wave is computed once the current one finishes. A failed task
//! turns its pending dependents into skipped tasks (transitively) while unrelated branches
//! keep running. Cancellation stops new tasks from starting; running ones finish.

use crate::core::error::{YardError, YardResult};
use crate::graph::task_graph::{Task, TaskGraph};
use crate::ui::progress::BuildProgress;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Performs the action of a single task
pub trait ActionHandler: Sync {
  fn execute(&self, task: &Task) -> YardResult<()>;
}

/// Lifecycle state of a task during one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
  Pending,
  Running,
  Done,
  Failed,
  Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedTask {
  pub name: String,
  pub error: String,
}

/// Terminal outcome of a run; every list follows topological order
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
  pub done: Vec<String>,
  pub failed: Vec<FailedTask>,
  pub skipped: Vec<String>,
  /// Tasks never started because the run was cancelled
  pub not_started: Vec<String>,
  pub cancelled: bool,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty() && self.not_started.is_empty() && !self.cancelled
  }

  /// Error carrying the failure counts, `None` on success
  pub fn into_error(&self) -> Option<YardError> {
    if self.is_success() {
      None
    } else {
      Some(YardError::BuildFailed {
        failed: self.failed.len(),
        skipped: self.skipped.len() + self.not_started.len(),
      })
    }
  }
}

enum Outcome {
  Done,
  Failed(String),
  NotStarted,
}

/// Runs a validated task graph
pub struct Executor<'g> {
  graph: &'g TaskGraph,
  jobs: usize,
  cancel: Arc<AtomicBool>,
  progress: bool,
}

impl<'g> Executor<'g> {
  pub fn new(graph: &'g TaskGraph) -> Self {
    let jobs = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    Self {
      graph,
      jobs,
      cancel: Arc::new(AtomicBool::new(false)),
      progress: false,
    }
  }

  /// Worker pool size (at least 1)
  pub fn jobs(mut self, jobs: usize) -> Self {
    self.jobs = jobs.max(1);
    self
  }

  /// Shared cancellation flag; setting it stops new tasks from starting
  pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
    self.cancel = flag;
    self
  }

  pub fn with_progress(mut self, enabled: bool) -> Self {
    self.progress = enabled;
    self
  }

  /// Selected tasks in topological order: the targets' closure, or everything
  fn selection(&self, targets: &[String]) -> YardResult<Vec<String>> {
    self.graph.validate()?;
    let order = self.graph.topological_order()?;
    if targets.is_empty() {
      return Ok(order);
    }
    let closure = self.graph.closure(targets)?;
    Ok(order.into_iter().filter(|name| closure.contains(name)).collect())
  }

  fn selected_predecessors(&self, order: &[String]) -> YardResult<HashMap<String, Vec<String>>> {
    let selected: HashSet<&String> = order.iter().collect();
    order
      .iter()
      .map(|name| {
        let preds = self
          .graph
          .predecessors(name)?
          .into_iter()
          .filter(|p| selected.contains(p))
          .collect();
        Ok((name.clone(), preds))
      })
      .collect()
  }

  /// Waves a successful run would execute, without running anything
  pub fn plan_waves(&self, targets: &[String]) -> YardResult<Vec<Vec<String>>> {
    let order = self.selection(targets)?;
    let preds = self.selected_predecessors(&order)?;
    let mut level: HashMap<&str, usize> = HashMap::new();
    let mut waves: Vec<Vec<String>> = Vec::new();

    for name in &order {
      let wave = preds[name]
        .iter()
        .filter_map(|p| level.get(p.as_str()))
        .map(|l| l + 1)
        .max()
        .unwrap_or(0);
      level.insert(name, wave);
      if waves.len() <= wave {
        waves.resize_with(wave + 1, Vec::new);
      }
      waves[wave].push(name.clone());
    }
    Ok(waves)
  }

  /// Execute the selected tasks.
  ///
  /// Returns the report even when tasks fail; graph errors (cycles, unknown targets) are
  /// returned before any task starts.
  pub fn run(&self, targets: &[String], handler: &dyn ActionHandler) -> YardResult<ExecutionReport> {
    let order = self.selection(targets)?;
    let preds = self.selected_predecessors(&order)?;
    let pool = rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build()?;
    let progress = if self.progress {
      Some(BuildProgress::new(order.len(), "tasks"))
    } else {
      None
    };

    let started_at = Utc::now();
    let mut states: HashMap<String, TaskState> = order.iter().map(|n| (n.clone(), TaskState::Pending)).collect();
    let mut errors: HashMap<String, String> = HashMap::new();
    let mut not_started: HashSet<String> = HashSet::new();

    loop {
      propagate_skips(&order, &preds, &mut states);
      if self.cancel.load(Ordering::SeqCst) {
        break;
      }

      let wave: Vec<&String> = order
        .iter()
        .filter(|name| states[*name] == TaskState::Pending)
        .filter(|name| preds[*name].iter().all(|p| states[p] == TaskState::Done))
        .collect();
      if wave.is_empty() {
        break;
      }

      tracing::debug!(tasks = wave.len(), "starting wave");
      for name in &wave {
        states.insert((*name).clone(), TaskState::Running);
      }

      let cancel = &self.cancel;
      let graph = self.graph;
      let progress_ref = progress.as_ref();
      let outcomes: Vec<(String, Outcome)> = pool.install(|| {
        wave
          .par_iter()
          .map(|name| {
            if cancel.load(Ordering::SeqCst) {
              return ((*name).clone(), Outcome::NotStarted);
            }
            let outcome = match graph.task(name) {
              Some(task) => match handler.execute(task) {
                Ok(()) => Outcome::Done,
                Err(e) => Outcome::Failed(e.to_string()),
              },
              None => Outcome::Failed(format!("Task '{}' not found", name)),
            };
            if let Some(progress) = progress_ref {
              progress.inc();
            }
            ((*name).clone(), outcome)
          })
          .collect()
      });

      for (name, outcome) in outcomes {
        match outcome {
          Outcome::Done => {
            tracing::info!(task = %name, "done");
            states.insert(name, TaskState::Done);
          }
          Outcome::Failed(error) => {
            tracing::warn!(task = %name, %error, "task failed");
            states.insert(name.clone(), TaskState::Failed);
            errors.insert(name, error);
          }
          Outcome::NotStarted => {
            states.insert(name.clone(), TaskState::Pending);
            not_started.insert(name);
          }
        }
      }
    }

    let cancelled = self.cancel.load(Ordering::SeqCst);
    let mut report = ExecutionReport {
      done: Vec::new(),
      failed: Vec::new(),
      skipped: Vec::new(),
      not_started: Vec::new(),
      cancelled,
      started_at,
      finished_at: Utc::now(),
    };
    for name in &order {
      match states[name] {
        TaskState::Done => report.done.push(name.clone()),
        TaskState::Failed => report.failed.push(FailedTask {
          name: name.clone(),
          error: errors.remove(name).unwrap_or_default(),
        }),
        TaskState::Skipped => report.skipped.push(name.clone()),
        TaskState::Pending | TaskState::Running => report.not_started.push(name.clone()),
      }
    }
    if !not_started.is_empty() {
      tracing::debug!(count = not_started.len(), "tasks not started after cancellation");
    }

    Ok(report)
  }
}

/// Mark pending tasks with a failed or skipped predecessor as skipped, in topological order
fn propagate_skips(order: &[String], preds: &HashMap<String, Vec<String>>, states: &mut HashMap<String, TaskState>) {
  for name in order {
    if states[name] != TaskState::Pending {
      continue;
    }
    let blocked = preds[name]
      .iter()
      .any(|p| matches!(states[p], TaskState::Failed | TaskState::Skipped));
    if blocked {
      tracing::debug!(task = %name, "skipped: predecessor did not complete");
      states.insert(name.clone(), TaskState::Skipped);
    }
  }
}
