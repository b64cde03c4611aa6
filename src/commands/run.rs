//! `shipyard run` - Execute the task graph
//!
//! Without `--apply` this is a dry run that prints the waves a successful run would execute.

use crate::core::actions::ToolchainActions;
use crate::core::context::BuildContext;
use crate::core::credentials::EnvCredentials;
use crate::core::error::YardResult;
use crate::graph::builder::build_plan;
use crate::graph::executor::{ActionHandler, ExecutionReport, Executor};
use crate::graph::task_graph::Task;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Options for `shipyard run`
#[derive(Debug, Default)]
pub struct RunOptions {
  /// Tasks to run (with their predecessors); empty means every task
  pub targets: Vec<String>,
  pub apply: bool,
  pub jobs: Option<usize>,
  /// Stop starting new tasks after the first failure
  pub fail_fast: bool,
  pub json: bool,
}

/// Sets the cancellation flag when a task fails
struct FailFast<'a> {
  inner: &'a dyn ActionHandler,
  cancel: Arc<AtomicBool>,
}

impl ActionHandler for FailFast<'_> {
  fn execute(&self, task: &Task) -> YardResult<()> {
    let result = self.inner.execute(task);
    if result.is_err() {
      self.cancel.store(true, Ordering::SeqCst);
    }
    result
  }
}

/// Run the run command
pub fn run_run(ctx: &BuildContext, options: RunOptions) -> YardResult<()> {
  let plan = build_plan(ctx)?;
  let mut executor = Executor::new(&plan.graph).with_progress(options.apply && !options.json);
  if let Some(jobs) = options.jobs {
    executor = executor.jobs(jobs);
  }

  if !options.apply {
    let waves = executor.plan_waves(&options.targets)?;
    if options.json {
      let output = serde_json::json!({ "dry_run": true, "waves": waves });
      println!("{}", serde_json::to_string_pretty(&output)?);
      return Ok(());
    }
    let total: usize = waves.iter().map(Vec::len).sum();
    println!("🔍 Dry run: {} tasks in {} waves", total, waves.len());
    for (i, wave) in waves.iter().enumerate() {
      println!("  wave {}: {}", i + 1, wave.join(", "));
    }
    println!();
    println!("Run with --apply to execute.");
    return Ok(());
  }

  let cancel = Arc::new(AtomicBool::new(false));
  let executor = executor.cancel_flag(Arc::clone(&cancel));
  let credentials = EnvCredentials;
  let actions = ToolchainActions::new(ctx, &plan, &credentials);

  tracing::info!(tasks = plan.graph.len(), fail_fast = options.fail_fast, "running build");
  let report = if options.fail_fast {
    let handler = FailFast {
      inner: &actions,
      cancel,
    };
    executor.run(&options.targets, &handler)?
  } else {
    executor.run(&options.targets, &actions)?
  };

  if options.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report);
  }

  match report.into_error() {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

fn print_report(report: &ExecutionReport) {
  let elapsed = report.finished_at - report.started_at;
  println!();
  println!(
    "🏁 {} done, {} failed, {} skipped, {} not started ({:.2}s)",
    report.done.len(),
    report.failed.len(),
    report.skipped.len(),
    report.not_started.len(),
    elapsed.num_milliseconds() as f64 / 1000.0
  );
  for failed in &report.failed {
    println!("  ❌ {}: {}", failed.name, failed.error);
  }
  for skipped in &report.skipped {
    println!("  ⏭  {}", skipped);
  }
  if report.cancelled {
    for name in &report.not_started {
      println!("  ⏸  {}", name);
    }
  }
}
