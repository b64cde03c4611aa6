//! `shipyard cohorts` - Show cohort membership and treatment assignment

use crate::core::context::BuildContext;
use crate::core::error::YardResult;
use crate::graph::builder::Treatment;

/// Run the cohorts command
pub fn run_cohorts(ctx: &BuildContext, json: bool) -> YardResult<()> {
  let treatments = &ctx.config.treatments;

  if json {
    let assignment: serde_json::Map<String, serde_json::Value> = Treatment::ORDER
      .iter()
      .map(|t| (t.name().to_string(), serde_json::Value::from(t.cohort(treatments))))
      .collect();
    let modules: Vec<_> = ctx
      .modules
      .iter()
      .map(|m| serde_json::json!({ "module": m.name, "cohorts": m.cohorts }))
      .collect();
    let output = serde_json::json!({
      "cohorts": ctx.cohorts,
      "treatments": assignment,
      "modules": modules,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  println!("👥 Cohorts");
  for name in ctx.cohorts.names() {
    let members = ctx.cohorts.members(&name)?;
    println!("  {} ({}): {}", name, members.len(), members.join(", "));
  }
  println!();

  println!("🧩 Treatments");
  for treatment in Treatment::ORDER {
    println!("  {:<13} → {}", treatment.name(), treatment.cohort(treatments));
  }

  Ok(())
}
