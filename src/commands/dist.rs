//! `shipyard dist` - Preview or assemble the distribution archive
//!
//! Assembling here does not run the tasks the archive depends on; use
//! `shipyard run --apply dist` for a full build. Upstream outputs that do not exist yet
//! are reported so a stale or partial tree is never packaged silently.

use crate::core::context::BuildContext;
use crate::core::error::YardResult;
use crate::dist::assemble;
use crate::graph::builder::{BuildPlan, DIST, build_plan};
use std::path::PathBuf;

/// Upstream tasks of `dist` whose declared output is missing, in registration order
fn missing_outputs(plan: &BuildPlan) -> YardResult<Vec<(String, PathBuf)>> {
  let upstream = plan.graph.closure(&[DIST.to_string()])?;
  Ok(
    plan
      .graph
      .tasks()
      .filter(|task| task.name != DIST && upstream.contains(&task.name))
      .filter_map(|task| task.output.as_ref().map(|out| (task.name.clone(), out.clone())))
      .filter(|(_, out)| !out.exists())
      .collect(),
  )
}

/// Run the dist command
pub fn run_dist(ctx: &BuildContext, apply: bool, json: bool) -> YardResult<()> {
  let plan = build_plan(ctx)?;
  let manifest = &plan.distribution;

  let missing = missing_outputs(&plan)?;
  for (task, output) in &missing {
    eprintln!(
      "⚠️  '{}' has not produced {} yet - run `shipyard run --apply dist` for a complete archive",
      task,
      output.display()
    );
  }

  if apply {
    let report = assemble(manifest)?;
    if json {
      println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
      println!("📦 Wrote {} ({} entries)", report.path.display(), report.entries);
      println!("   sha256: {}", report.sha256);
    }
    return Ok(());
  }

  let entries = manifest.collect_entries()?;

  if json {
    let output = serde_json::json!({
      "archive": manifest.archive_path(),
      "depends_on": manifest.depends_on,
      "missing_outputs": missing.iter().map(|(task, _)| task).collect::<Vec<_>>(),
      "entries": entries,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  println!("📦 {} ({} entries)", manifest.archive_path().display(), entries.len());
  println!("   Depends on: {}", manifest.depends_on.join(", "));
  println!();
  for entry in &entries {
    let marker = if entry.executable { " *" } else { "" };
    println!("  {}{}", entry.archive_path, marker);
  }
  println!();
  println!("Run with --apply to write the archive.");

  Ok(())
}
