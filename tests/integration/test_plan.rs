//! Integration tests for `shipyard plan` and `shipyard cohorts`

use crate::helpers::{BASE_CONFIG, TestProject, run_shipyard, shipyard, stdout_json};
use anyhow::Result;

fn task_names(plan: &serde_json::Value) -> Vec<String> {
  plan["tasks"]
    .as_array()
    .map(|tasks| {
      tasks
        .iter()
        .filter_map(|t| t["name"].as_str().map(String::from))
        .collect()
    })
    .unwrap_or_default()
}

#[test]
fn test_plan_lists_tasks_in_dependency_order() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let plan = stdout_json(&run_shipyard(&project.path, &["plan", "--json"])?)?;
  let names = task_names(&plan);

  for expected in ["core:compile", "core:package", "core:build", "client:publish", "docsAll", "dist"] {
    assert!(names.contains(&expected.to_string()), "missing {}", expected);
  }

  let position = |name: &str| names.iter().position(|n| n == name);
  for task in plan["tasks"].as_array().into_iter().flatten() {
    let name = task["name"].as_str().unwrap_or_default();
    for pred in task["predecessors"].as_array().into_iter().flatten() {
      let pred = pred.as_str().unwrap_or_default();
      assert!(position(pred) < position(name), "{} listed after {}", pred, name);
    }
  }

  assert_eq!(plan["channel"]["channel"], "release");
  Ok(())
}

#[test]
fn test_plan_fingerprint_is_stable() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let first = stdout_json(&run_shipyard(&project.path, &["plan", "--json"])?)?;
  let second = stdout_json(&run_shipyard(&project.path, &["plan", "--json"])?)?;

  assert_eq!(first["fingerprint"], second["fingerprint"]);
  assert_eq!(task_names(&first), task_names(&second));
  Ok(())
}

#[test]
fn test_plan_dot_output() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let output = run_shipyard(&project.path, &["plan", "--dot"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("digraph"));
  assert!(stdout.contains("core:compile"));
  Ok(())
}

#[test]
fn test_user_edge_cycle_is_rejected() -> Result<()> {
  let config = format!(
    "{}\n[[edges]]\ntask = \"core:compile\"\ndepends_on = [\"core:build\"]\n",
    BASE_CONFIG
  );
  let project = TestProject::new(&config)?;
  let output = shipyard(&project.path, &["plan"])?;

  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Dependency cycle detected"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_narrow_treatment_cohort() -> Result<()> {
  let config = format!(
    "{}\n[[cohorts]]\nname = \"libraries\"\nmodules = [\"core\"]\n\n[treatments]\ndocs = \"libraries\"\nrepository = \"libraries\"\n",
    BASE_CONFIG
  );
  let project = TestProject::new(&config)?;
  let plan = stdout_json(&run_shipyard(&project.path, &["plan", "--json"])?)?;
  let names = task_names(&plan);

  assert!(names.contains(&"core:publish".to_string()));
  assert!(!names.contains(&"client:publish".to_string()));
  assert!(names.contains(&"client:build".to_string()));

  let docs_all = plan["tasks"]
    .as_array()
    .into_iter()
    .flatten()
    .find(|t| t["name"] == "docsAll")
    .map(|t| t["predecessors"].clone())
    .unwrap_or_default();
  assert_eq!(docs_all, serde_json::json!(["core:compile"]));

  let cohorts = stdout_json(&run_shipyard(&project.path, &["cohorts", "--json"])?)?;
  assert_eq!(cohorts["treatments"]["repository"], "libraries");
  assert_eq!(cohorts["treatments"]["build"], "all");
  Ok(())
}

#[test]
fn test_unknown_treatment_cohort_is_config_error() -> Result<()> {
  let config = format!("{}\n[treatments]\ndocs = \"nope\"\n", BASE_CONFIG);
  let project = TestProject::new(&config)?;
  let output = shipyard(&project.path, &["plan"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("nope"));
  Ok(())
}

#[test]
fn test_descriptor_for_unknown_module() -> Result<()> {
  let project = TestProject::new(BASE_CONFIG)?;
  let output = shipyard(&project.path, &["descriptor", "missing"])?;

  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("Known modules: core, client"));

  let output = run_shipyard(&project.path, &["descriptor", "core"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Bundle-SymbolicName: com.example.core"));
  assert!(stdout.contains("Bundle-Version: 1.2.0"));
  Ok(())
}
