//! Integration tests for `shipyard docs`

use crate::helpers::{BASE_CONFIG, TestProject, run_shipyard, stdout_json};
use anyhow::Result;

fn sources(docs: &serde_json::Value) -> Vec<String> {
  docs["inputs"]["sources"]
    .as_array()
    .into_iter()
    .flatten()
    .filter_map(|s| s.as_str().map(String::from))
    .collect()
}

#[test]
fn test_internal_packages_are_excluded() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let docs = stdout_json(&run_shipyard(&project.path, &["docs", "--json"])?)?;
  let sources = sources(&docs);

  assert!(sources.iter().any(|s| s.ends_with("Api.java")));
  assert!(sources.iter().any(|s| s.ends_with("Main.java")));
  assert!(!sources.iter().any(|s| s.contains("internal")));
  Ok(())
}

#[test]
fn test_docs_cohort_limits_sources() -> Result<()> {
  let config = BASE_CONFIG.replace(
    "[publishing]\n",
    "[[cohorts]]\nname = \"libraries\"\npattern = \"co*\"\n\n[treatments]\ndocs = \"libraries\"\n\n[publishing]\n",
  );
  let project = TestProject::new(&config)?;
  let docs = stdout_json(&run_shipyard(&project.path, &["docs", "--json"])?)?;

  assert_eq!(docs["cohort"], "libraries");
  let sources = sources(&docs);
  assert_eq!(sources.len(), 1);
  assert!(sources[0].ends_with("Api.java"));
  Ok(())
}

#[test]
fn test_non_http_links_are_dropped() -> Result<()> {
  let config = format!(
    "{}\n[docs]\nlinks = [\"https://docs.example.org/api/\", \"file:///tmp/local\"]\n",
    BASE_CONFIG
  );
  let project = TestProject::new(&config)?;
  let docs = stdout_json(&run_shipyard(&project.path, &["docs", "--json"])?)?;

  assert_eq!(
    docs["inputs"]["links"],
    serde_json::json!(["https://docs.example.org/api/"])
  );
  Ok(())
}
