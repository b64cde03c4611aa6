//! Integration tests for `shipyard run`

use crate::helpers::{BASE_CONFIG, TestProject, run_shipyard, shipyard, stdout_json};
use anyhow::Result;

#[test]
fn test_dry_run_waves_for_target() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let output = run_shipyard(&project.path, &["run", "core:package", "--json"])?;
  let plan = stdout_json(&output)?;

  assert_eq!(plan["dry_run"], true);
  assert_eq!(plan["waves"], serde_json::json!([["core:compile"], ["core:package"]]));
  assert!(!project.file_exists("core/build"));
  Ok(())
}

#[test]
fn test_unknown_target_is_rejected() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let output = shipyard(&project.path, &["run", "core:nothing"])?;

  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("core:nothing"));
  Ok(())
}

#[cfg(unix)]
mod apply {
  use super::*;

  fn with_tools(compile: &str) -> String {
    format!(
      r#"{}
[tools]
compile = ["sh", "-c", "{}"]
package = ["sh", "-c", "cp {{manifest}} {{output}}"]
archive = ["sh", "-c", "echo {{input}} > {{output}}"]
docs = ["sh", "-c", "mkdir -p {{destination}} && touch {{destination}}/index.html"]
"#,
      BASE_CONFIG, compile
    )
  }

  const COMPILE_OK: &str = "mkdir -p {output} && touch {output}/Built.class";

  #[test]
  fn test_full_build_publishes_and_packages() -> Result<()> {
    let project = TestProject::new(&with_tools(COMPILE_OK))?;
    run_shipyard(&project.path, &["run", "--apply", "--jobs", "2"])?;

    let repo = "build/repo/com/example";
    for module in ["core", "client"] {
      assert!(project.file_exists(&format!("{}/build/classes/Built.class", module)));
      assert!(project.file_exists(&format!("{}/{}/1.2.0/{}-1.2.0.jar", repo, module, module)));
      assert!(project.file_exists(&format!("{}/{}/1.2.0/{}-1.2.0-sources.jar", repo, module, module)));
      assert!(project.file_exists(&format!("{}/{}/1.2.0/{}-1.2.0-docs.jar", repo, module, module)));
    }
    assert!(project.file_exists("build/docs/api-all/index.html"));
    assert!(project.file_exists("build/distributions/demo-1.2.0.tgz"));

    let primary = String::from_utf8(project.read_bytes("core/build/libs/core-1.2.0.jar")?)?;
    assert!(primary.contains("Import-Package: org.slf4j"));
    Ok(())
  }

  #[test]
  fn test_failed_task_skips_dependents_only() -> Result<()> {
    let compile = "test {module} != client && mkdir -p {output}";
    let project = TestProject::new(&with_tools(compile))?;
    let output = shipyard(&project.path, &["run", "--apply", "--json"])?;

    assert_eq!(output.status.code(), Some(4));
    let report = stdout_json(&output)?;
    let list = |key: &str| -> Vec<String> {
      report[key]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
    };

    assert_eq!(report["failed"][0]["name"], "client:compile");
    assert!(list("done").contains(&"core:publish".to_string()));
    assert!(list("done").contains(&"client:sourcesArchive".to_string()));
    for skipped in ["client:package", "client:publish", "docsAll", "dist"] {
      assert!(list("skipped").contains(&skipped.to_string()), "{} not skipped", skipped);
    }
    assert_eq!(report["cancelled"], false);
    assert!(!project.file_exists("build/distributions/demo-1.2.0.tgz"));
    Ok(())
  }

  #[test]
  fn test_missing_tool_reports_tool_name() -> Result<()> {
    let project = TestProject::new(BASE_CONFIG)?;
    let output = shipyard(&project.path, &["run", "--apply", "core:compile"])?;

    assert_eq!(output.status.code(), Some(4));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("core:compile"));
    assert!(stdout.contains("compile"));
    Ok(())
  }
}
