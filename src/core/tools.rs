//! External tool invocation
//!
//! Compilation, archiving, documentation rendering, signing and remote uploads are performed
//! by user-configured commands (`[tools]` in shipyard.toml). Each command is an argument
//! vector whose `{placeholder}` tokens are substituted per task; every parameter is also
//! exported as a `SHIPYARD_<NAME>` environment variable. Secrets are only ever passed
//! through the environment.

use crate::core::config::ToolsConfig;
use crate::core::credentials::env_key;
use crate::core::error::{ToolError, YardResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The external collaborators shipyard drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
  Compile,
  Package,
  Archive,
  Docs,
  Sign,
  Publish,
  ReleaseStaging,
}

impl Tool {
  pub fn name(self) -> &'static str {
    match self {
      Tool::Compile => "compile",
      Tool::Package => "package",
      Tool::Archive => "archive",
      Tool::Docs => "docs",
      Tool::Sign => "sign",
      Tool::Publish => "publish",
      Tool::ReleaseStaging => "release_staging",
    }
  }
}

impl fmt::Display for Tool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Parameters for one tool invocation
#[derive(Default)]
pub struct ToolVars {
  values: BTreeMap<String, String>,
  secrets: BTreeMap<String, String>,
}

impl ToolVars {
  pub fn new() -> Self {
    Self::default()
  }

  /// Plain parameter: substituted into `{key}` and exported as `SHIPYARD_KEY`
  pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
    self.values.insert(key.to_string(), value.into());
    self
  }

  pub fn set_path(self, key: &str, path: &Path) -> Self {
    self.set(key, path.to_string_lossy())
  }

  /// Secret parameter: exported as `SHIPYARD_KEY` only, never substituted or logged
  pub fn secret(mut self, key: &str, value: impl Into<String>) -> Self {
    self.secrets.insert(key.to_string(), value.into());
    self
  }

  /// Replace every `{key}` token in `arg`
  pub fn substitute(&self, arg: &str) -> String {
    let mut out = arg.to_string();
    for (key, value) in &self.values {
      out = out.replace(&format!("{{{}}}", key), value);
    }
    out
  }

  fn env_pairs(&self) -> impl Iterator<Item = (String, &str)> {
    self
      .values
      .iter()
      .chain(self.secrets.iter())
      .map(|(k, v)| (env_name(k), v.as_str()))
  }
}

impl fmt::Debug for ToolVars {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ToolVars")
      .field("values", &self.values)
      .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
      .finish()
  }
}

fn env_name(key: &str) -> String {
  format!("SHIPYARD_{}", env_key(key))
}

/// Runs configured tool commands from the project root
#[derive(Debug, Clone)]
pub struct ToolRunner {
  root: PathBuf,
  tools: ToolsConfig,
}

impl ToolRunner {
  pub fn new(root: &Path, tools: &ToolsConfig) -> Self {
    Self {
      root: root.to_path_buf(),
      tools: tools.clone(),
    }
  }

  fn template(&self, tool: Tool) -> Option<&[String]> {
    let template = match tool {
      Tool::Compile => &self.tools.compile,
      Tool::Package => &self.tools.package,
      Tool::Archive => &self.tools.archive,
      Tool::Docs => &self.tools.docs,
      Tool::Sign => &self.tools.sign,
      Tool::Publish => &self.tools.publish,
      Tool::ReleaseStaging => &self.tools.release_staging,
    };
    template.as_deref().filter(|argv| !argv.is_empty())
  }

  /// Run a tool, failing with `ToolError::Missing` when it is not configured
  pub fn run(&self, tool: Tool, vars: &ToolVars) -> YardResult<()> {
    let template = self.template(tool).ok_or_else(|| ToolError::Missing {
      tool: tool.name().to_string(),
    })?;

    let argv: Vec<String> = template.iter().map(|arg| vars.substitute(arg)).collect();
    let (program, args) = match argv.split_first() {
      Some(split) => split,
      None => {
        return Err(
          ToolError::Missing {
            tool: tool.name().to_string(),
          }
          .into(),
        );
      }
    };

    tracing::debug!(%tool, command = %argv.join(" "), "running tool");

    let mut command = Command::new(program);
    command.args(args).current_dir(&self.root);
    for (key, value) in vars.env_pairs() {
      command.env(key, value);
    }

    let output = command.output().map_err(|e| ToolError::Spawn {
      tool: tool.name().to_string(),
      program: program.clone(),
      reason: e.to_string(),
    })?;

    if !output.status.success() {
      return Err(
        ToolError::Failed {
          tool: tool.name().to_string(),
          status: output.status.to_string(),
          stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
        .into(),
      );
    }

    Ok(())
  }
}
