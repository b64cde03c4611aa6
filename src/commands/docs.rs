//! `shipyard docs` - Show the aggregated documentation inputs

use crate::core::context::BuildContext;
use crate::core::error::YardResult;
use crate::docs::DocAggregator;

/// Run the docs command
pub fn run_docs(ctx: &BuildContext, json: bool) -> YardResult<()> {
  let cohort = &ctx.config.treatments.docs;
  let modules = ctx.modules_in(cohort)?;
  let inputs = DocAggregator::new(&ctx.root, &ctx.config.docs)?.collect(&modules)?;

  if json {
    let output = serde_json::json!({
      "cohort": cohort,
      "destination": ctx.config.docs.destination,
      "inputs": inputs,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  println!(
    "📚 Documentation for cohort '{}' ({} modules) → {}",
    cohort,
    modules.len(),
    ctx.config.docs.destination.display()
  );
  println!();
  println!("Sources: {}", inputs.sources.len());
  for source in &inputs.sources {
    println!("  {}", source.display());
  }
  println!();
  println!("Classpath: {}", inputs.classpath.len());
  for entry in &inputs.classpath {
    println!("  {}", entry.display());
  }
  if !inputs.links.is_empty() {
    println!();
    println!("Links:");
    for link in &inputs.links {
      println!("  🔗 {}", link);
    }
  }

  Ok(())
}
