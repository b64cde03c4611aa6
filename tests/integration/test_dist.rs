//! Integration tests for `shipyard dist`

use crate::helpers::{BASE_CONFIG, TestProject, run_shipyard, stdout_json};
use anyhow::Result;

const ARCHIVE: &str = "build/distributions/demo-1.2.0.tgz";

fn entry_paths(preview: &serde_json::Value) -> Vec<String> {
  preview["entries"]
    .as_array()
    .into_iter()
    .flatten()
    .filter_map(|e| e["archive_path"].as_str().map(String::from))
    .collect()
}

#[test]
fn test_preview_applies_default_layout() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  project.write("bin/run.sh", "#!/bin/sh\n")?;
  project.write("bin/main/Generated.class", "")?;
  project.write("build/docs/api-all/index.html", "<html/>")?;
  project.write("notes.txt", "scratch")?;

  let preview = stdout_json(&run_shipyard(&project.path, &["dist", "--json"])?)?;
  let paths = entry_paths(&preview);

  assert!(paths.contains(&"demo/shipyard.toml".to_string()));
  assert!(paths.contains(&"demo/README.md".to_string()));
  assert!(paths.contains(&"demo/LICENSE".to_string()));
  assert!(paths.contains(&"demo/bin/run.sh".to_string()));
  assert!(paths.contains(&"demo/doc/api-all/index.html".to_string()));
  assert!(!paths.contains(&"demo/bin/main/Generated.class".to_string()));
  assert!(!paths.contains(&"demo/notes.txt".to_string()));

  let mut sorted = paths.clone();
  sorted.sort();
  assert_eq!(paths, sorted);

  let depends_on = preview["depends_on"].as_array().cloned().unwrap_or_default();
  assert!(depends_on.contains(&serde_json::json!("docsAll")));
  assert!(depends_on.contains(&serde_json::json!("core:build")));
  Ok(())
}

#[test]
fn test_assembly_is_reproducible() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;

  run_shipyard(&project.path, &["dist", "--apply"])?;
  assert!(project.file_exists(ARCHIVE));
  assert!(project.file_exists(&format!("{}.sha256", ARCHIVE)));
  let first = project.read_bytes(ARCHIVE)?;

  std::thread::sleep(std::time::Duration::from_millis(1100));
  project.write("README.md", "# demo\n")?;

  let report = stdout_json(&run_shipyard(&project.path, &["dist", "--apply", "--json"])?)?;
  let second = project.read_bytes(ARCHIVE)?;

  assert_eq!(first, second);
  assert_eq!(report["sha256"].as_str().map(str::len), Some(64));
  Ok(())
}

#[test]
fn test_missing_upstream_outputs_are_reported() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;

  let output = run_shipyard(&project.path, &["dist", "--apply"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("'docsAll' has not produced"), "{}", stderr);
  assert!(stderr.contains("'core:package' has not produced"), "{}", stderr);
  assert!(project.file_exists(ARCHIVE));

  project.write("build/docs/api-all/index.html", "<html/>")?;
  let preview = stdout_json(&run_shipyard(&project.path, &["dist", "--json"])?)?;
  let missing = preview["missing_outputs"].as_array().cloned().unwrap_or_default();
  assert!(!missing.contains(&serde_json::json!("docsAll")));
  assert!(missing.contains(&serde_json::json!("core:compile")));
  Ok(())
}

#[test]
fn test_custom_layout_rules() -> Result<()> {
  let config = format!(
    r#"{}
[distribution]
extension = "tar.gz"

[[distribution.layouts]]
into = "{{project}}-bin"
from = "core"
rules = [{{ include = "src/**" }}, {{ exclude = "**/internal/**" }}]
"#,
    BASE_CONFIG
  );
  let project = TestProject::new(&config)?;
  let preview = stdout_json(&run_shipyard(&project.path, &["dist", "--json"])?)?;

  assert_eq!(
    entry_paths(&preview),
    vec!["demo-bin/src/main/java/com/example/core/Api.java".to_string()]
  );
  assert!(
    preview["archive"]
      .as_str()
      .is_some_and(|a| a.ends_with("demo-1.2.0.tar.gz"))
  );
  Ok(())
}
