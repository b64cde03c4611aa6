//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Two modules (`core`, `client`) with sources, one internal package and a README
pub const BASE_CONFIG: &str = r#"
[project]
name = "demo"
group = "com.example"
version = "1.2.0"

[[modules]]
name = "core"
path = "core"
required_imports = ["org.slf4j"]

[[modules]]
name = "client"
path = "client"
classpath = ["core/build/classes"]

[publishing]
release_url = "./build/repo"
prerelease_url = "https://repo.example.org/snapshots"
"#;

/// A scratch project on disk
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  /// Create a project from `config` with sources for `core` and `client`
  pub fn new(config: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    let project = Self { _root: root, path };
    project.write("shipyard.toml", config)?;
    project.write("README.md", "# demo\n")?;
    project.write("LICENSE", "MIT\n")?;
    project.write("core/src/main/java/com/example/core/Api.java", "package com.example.core;\n")?;
    project.write(
      "core/src/main/java/com/example/core/internal/Impl.java",
      "package com.example.core.internal;\n",
    )?;
    project.write("client/src/main/java/com/example/client/Main.java", "package com.example.client;\n")?;
    Ok(project)
  }

  /// Write a file relative to the project root, creating parents
  pub fn write(&self, relative: &str, content: &str) -> Result<()> {
    let file = self.path.join(relative);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))?;
    Ok(())
  }

  pub fn file_exists(&self, relative: &str) -> bool {
    self.path.join(relative).exists()
  }

  pub fn read_bytes(&self, relative: &str) -> Result<Vec<u8>> {
    Ok(std::fs::read(self.path.join(relative))?)
  }
}

/// Run shipyard and return its output regardless of exit status
pub fn shipyard(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_shipyard"))
    .current_dir(cwd)
    .args(args)
    .env_remove("SHIPYARD_LOG")
    .output()
    .context("Failed to run shipyard")
}

/// Run shipyard and fail unless it exits successfully
pub fn run_shipyard(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = shipyard(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "shipyard command failed: shipyard {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Parse stdout as JSON
pub fn stdout_json(output: &Output) -> Result<serde_json::Value> {
  serde_json::from_slice(&output.stdout).context("stdout is not valid JSON")
}
