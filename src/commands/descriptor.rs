//! `shipyard descriptor` - Print a module's bundle metadata

use crate::bundle::BundleDescriptor;
use crate::core::context::BuildContext;
use crate::core::error::{YardError, YardResult};

/// Run the descriptor command
pub fn run_descriptor(ctx: &BuildContext, module: &str, json: bool) -> YardResult<()> {
  let module = ctx.module(module).ok_or_else(|| {
    YardError::with_help(
      format!("Module '{}' not found", module),
      format!("Known modules: {}", ctx.cohorts.modules().join(", ")),
    )
  })?;
  let descriptor = BundleDescriptor::generate(module);

  if json {
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
  } else {
    print!("{}", descriptor.render_manifest().replace("\r\n", "\n"));
  }
  Ok(())
}
