//! `shipyard plan` - Show the wired task graph
//!
//! Prints the version channel, cohort assignments and every task in topological order with
//! its predecessors. The plan fingerprint is a SHA-256 over task names and edges, so two
//! runs against the same configuration print the same fingerprint.

use crate::core::context::BuildContext;
use crate::core::error::YardResult;
use crate::graph::builder::{BuildPlan, build_plan};
use crate::graph::task_graph::TaskAction;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// One task as shown by `plan`
#[derive(Debug, Serialize)]
pub struct TaskView {
  pub name: String,
  pub module: Option<String>,
  pub action: TaskAction,
  pub predecessors: Vec<String>,
  pub output: Option<PathBuf>,
}

/// Tasks in topological order with their predecessors
pub fn task_views(ctx: &BuildContext, plan: &BuildPlan) -> YardResult<Vec<TaskView>> {
  let mut views = Vec::with_capacity(plan.graph.len());
  for name in plan.graph.topological_order()? {
    let Some(task) = plan.graph.task(&name) else {
      continue;
    };
    views.push(TaskView {
      predecessors: plan.graph.predecessors(&name)?,
      module: task.module.clone(),
      action: task.action.clone(),
      output: task
        .output
        .as_ref()
        .map(|o| o.strip_prefix(&ctx.root).map(|p| p.to_path_buf()).unwrap_or_else(|_| o.clone())),
      name,
    });
  }
  Ok(views)
}

/// SHA-256 over `name <- predecessors` lines
pub fn fingerprint(views: &[TaskView]) -> String {
  let mut hasher = Sha256::new();
  for view in views {
    hasher.update(view.name.as_bytes());
    hasher.update(b" <- ");
    hasher.update(view.predecessors.join(",").as_bytes());
    hasher.update(b"\n");
  }
  format!("{:x}", hasher.finalize())
}

/// Run the plan command
pub fn run_plan(ctx: &BuildContext, json: bool, dot: bool) -> YardResult<()> {
  let plan = build_plan(ctx)?;

  if dot {
    println!("{}", plan.graph.to_dot());
    return Ok(());
  }

  let views = task_views(ctx, &plan)?;
  let fingerprint = fingerprint(&views);

  if json {
    let publications: Vec<_> = plan
      .publications
      .iter()
      .map(|p| {
        serde_json::json!({
          "module": p.module,
          "coordinates": p.coordinates(),
          "published": p.is_published(),
          "status": p.status(),
        })
      })
      .collect();
    let output = serde_json::json!({
      "project": ctx.project_name(),
      "channel": ctx.channel,
      "cohorts": ctx.cohorts,
      "publications": publications,
      "tasks": views,
      "fingerprint": fingerprint,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  println!("📋 Build plan for {} {}", ctx.project_name(), ctx.version());
  println!("   Channel: {}", ctx.channel.channel);
  println!("   Modules: {}", ctx.modules.len());
  println!("   Tasks:   {} ({} edges)", plan.graph.len(), plan.graph.edge_count());
  println!();

  for publication in &plan.publications {
    println!("  📦 {} [{}]", publication.coordinates(), publication.status());
  }
  println!();

  for view in &views {
    if view.predecessors.is_empty() {
      println!("  • {}", view.name);
    } else {
      println!("  • {} ← {}", view.name, view.predecessors.join(", "));
    }
  }
  println!();
  println!("🔏 Fingerprint: {}", fingerprint);

  Ok(())
}
