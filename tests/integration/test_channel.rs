//! Integration tests for `shipyard channel`

use crate::helpers::{BASE_CONFIG, TestProject, run_shipyard, stdout_json};
use anyhow::Result;

#[test]
fn test_project_version_is_release() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let channel = stdout_json(&run_shipyard(&project.path, &["channel", "--json"])?)?;

  assert_eq!(channel["resolution"]["version"], "1.2.0");
  assert_eq!(channel["resolution"]["channel"], "release");
  assert_eq!(channel["resolution"]["target"]["url"], "./build/repo");
  assert_eq!(channel["resolution"]["signing_enabled"], false);
  assert_eq!(channel["signed_modules"], serde_json::json!([]));
  Ok(())
}

#[test]
fn test_snapshot_override_is_prerelease() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let channel = stdout_json(&run_shipyard(
    &project.path,
    &["channel", "--version", "2.0.0-SNAPSHOT", "--json"],
  )?)?;

  assert_eq!(channel["resolution"]["channel"], "prerelease");
  assert_eq!(channel["resolution"]["target"]["url"], "https://repo.example.org/snapshots");
  Ok(())
}

#[test]
fn test_dotted_snapshot_is_prerelease() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let channel = stdout_json(&run_shipyard(
    &project.path,
    &["channel", "--version", "1.9.0.SNAPSHOT", "--json"],
  )?)?;

  assert_eq!(channel["resolution"]["channel"], "prerelease");
  Ok(())
}

#[test]
fn test_marker_is_case_sensitive_suffix() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  for version in ["2.0.0-snapshot", "2.0.0-SNAPSHOT.1"] {
    let channel = stdout_json(&run_shipyard(&project.path, &["channel", "--version", version, "--json"])?)?;
    assert_eq!(channel["resolution"]["channel"], "release", "{}", version);
  }
  Ok(())
}

#[test]
fn test_signing_applies_to_published_modules_only() -> Result<()> {
  let config = BASE_CONFIG.replace(
    "[publishing]\n",
    "[[cohorts]]\nname = \"libraries\"\nmodules = [\"core\"]\n\n[treatments]\nrepository = \"libraries\"\n\n[publishing]\nsign = true\n",
  );
  let project = TestProject::new(&config)?;

  let channel = stdout_json(&run_shipyard(&project.path, &["channel", "--json"])?)?;
  assert_eq!(channel["signed_modules"], serde_json::json!(["core"]));

  let plan = stdout_json(&run_shipyard(&project.path, &["plan", "--json"])?)?;
  let statuses: Vec<(String, String)> = plan["publications"]
    .as_array()
    .into_iter()
    .flatten()
    .map(|p| {
      (
        p["module"].as_str().unwrap_or_default().to_string(),
        p["status"].as_str().unwrap_or_default().to_string(),
      )
    })
    .collect();
  assert_eq!(
    statuses,
    vec![
      ("core".to_string(), "signed".to_string()),
      ("client".to_string(), "publish-disabled".to_string()),
    ]
  );
  Ok(())
}

#[test]
fn test_unset_repository_is_not_a_config_error() -> Result<()> {
  let config = BASE_CONFIG.replace("release_url = \"./build/repo\"\n", "");
  let project = TestProject::new(&config)?;

  let output = run_shipyard(&project.path, &["channel"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("<unset>"));
  run_shipyard(&project.path, &["plan"])?;
  Ok(())
}
