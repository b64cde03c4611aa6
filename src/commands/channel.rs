//! `shipyard channel` - Classify a version and show the resolved publish policy

use crate::core::context::BuildContext;
use crate::core::error::YardResult;
use crate::release::channel::{ChannelResolution, ChannelResolver, should_sign};

/// Run the channel command; `version` overrides the project version
pub fn run_channel(ctx: &BuildContext, version: Option<String>, json: bool) -> YardResult<()> {
  let resolution: ChannelResolution = match version {
    Some(v) => ChannelResolver::from_config(&ctx.config.publishing).resolve(&v),
    None => ctx.channel.clone(),
  };

  let repository = ctx.cohorts.members(&ctx.config.treatments.repository)?;
  let signed: Vec<&String> = ctx
    .modules
    .iter()
    .map(|m| &m.name)
    .filter(|name| should_sign(resolution.signing_enabled, repository.contains(*name)))
    .collect();

  if json {
    let output = serde_json::json!({
      "resolution": resolution,
      "signed_modules": signed,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  let url = if resolution.target.is_unset() {
    "<unset>"
  } else {
    resolution.target.url.as_str()
  };
  println!("🏷  Version:     {}", resolution.version);
  println!("   Channel:     {}", resolution.channel);
  println!("   Repository:  {}", url);
  println!(
    "   Credentials: {}",
    resolution.target.credentials.as_deref().unwrap_or("<none>")
  );
  println!("   Signing:     {}", if resolution.signing_enabled { "enabled" } else { "disabled" });
  if !signed.is_empty() {
    println!(
      "   Signed:      {}",
      signed.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    );
  }
  if resolution.target.is_unset() {
    println!();
    println!("⚠️  No repository URL for this channel; publish tasks will fail when run.");
  }

  Ok(())
}
