//! Unified build context - build once, pass everywhere
//!
//! `BuildContext` loads shipyard.toml, resolves cohorts and classifies the project version
//! exactly once in main.rs. Commands and graph wiring receive it by reference; nothing in
//! it changes after construction.
//!
//! ```text
//! main.rs:
//!   BuildContext::build() -> &BuildContext
//!   |
//!   v
//! graph::builder, commands/*:
//!   fn execute(ctx: &BuildContext)
//! ```

use crate::cohort::CohortMap;
use crate::core::config::{ModuleConfig, ShipyardConfig};
use crate::core::error::{ConfigError, YardResult};
use crate::release::channel::{ChannelResolution, ChannelResolver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A module with every path resolved against the project root
#[derive(Debug, Clone, Serialize)]
pub struct Module {
  pub name: String,
  /// Canonical dotted identifier (bundle symbolic name)
  pub identifier: String,
  pub display_name: String,
  /// Inherited from the project
  pub version: String,
  /// Absolute module root
  pub root: PathBuf,
  /// Absolute source roots in declaration order
  pub source_roots: Vec<PathBuf>,
  pub classpath: Vec<PathBuf>,
  pub runtime_classpath: Vec<PathBuf>,
  pub required_imports: Vec<String>,
  /// Cohorts this module belongs to (sorted)
  pub cohorts: Vec<String>,
}

impl Module {
  fn from_config(config: &ModuleConfig, project: &ShipyardConfig, root: &Path, cohorts: &CohortMap) -> Self {
    let module_root = root.join(&config.path);
    Self {
      name: config.name.clone(),
      identifier: config.identifier(&project.project.group),
      display_name: config.display_name().to_string(),
      version: project.project.version.clone(),
      source_roots: config.source_roots.iter().map(|p| module_root.join(p)).collect(),
      classpath: config.classpath.iter().map(|p| root.join(p)).collect(),
      runtime_classpath: config.runtime_classpath.iter().map(|p| root.join(p)).collect(),
      required_imports: config.required_imports.clone(),
      cohorts: cohorts.memberships(&config.name),
      root: module_root,
    }
  }

  pub fn build_dir(&self) -> PathBuf {
    self.root.join("build")
  }

  pub fn classes_dir(&self) -> PathBuf {
    self.build_dir().join("classes")
  }

  pub fn libs_dir(&self) -> PathBuf {
    self.build_dir().join("libs")
  }

  /// Per-module documentation output
  pub fn docs_dir(&self) -> PathBuf {
    self.build_dir().join("docs").join("api")
  }

  /// Where the bundle descriptor is rendered before packaging
  pub fn manifest_path(&self) -> PathBuf {
    self.build_dir().join("bundle").join("MANIFEST.MF")
  }

  /// `<root>/build/libs/<name>-<version>[-<classifier>].<ext>`
  pub fn artifact(&self, extension: &str, classifier: Option<&str>) -> PathBuf {
    let file = match classifier {
      Some(classifier) => format!("{}-{}-{}.{}", self.name, self.version, classifier, extension),
      None => format!("{}-{}.{}", self.name, self.version, extension),
    };
    self.libs_dir().join(file)
  }
}

/// Everything known about the project before any task runs
#[derive(Debug, Clone)]
pub struct BuildContext {
  /// Project root directory (absolute path)
  pub root: PathBuf,

  /// Parsed shipyard.toml, shared read-only
  pub config: Arc<ShipyardConfig>,

  pub cohorts: CohortMap,

  /// Modules in declaration order
  pub modules: Vec<Module>,

  /// Channel of the project version; computed once per build
  pub channel: ChannelResolution,
}

impl BuildContext {
  /// Load shipyard.toml from `root` and resolve everything derived from it
  pub fn build(root: &Path) -> YardResult<Self> {
    let config = ShipyardConfig::load(root)?;
    Self::from_config(root, config)
  }

  pub fn from_config(root: &Path, config: ShipyardConfig) -> YardResult<Self> {
    let cohorts = CohortMap::resolve(&config.module_names(), &config.cohorts)?;

    let treatments = [
      ("treatments.build", &config.treatments.build),
      ("treatments.docs", &config.treatments.docs),
      ("treatments.distribution", &config.treatments.distribution),
      ("treatments.repository", &config.treatments.repository),
    ];
    for (key, cohort) in treatments {
      if cohorts.members(cohort).is_err() {
        return Err(
          ConfigError::UnknownCohort {
            name: cohort.clone(),
            referenced_by: key.to_string(),
          }
          .into(),
        );
      }
    }

    let modules = config
      .modules
      .iter()
      .map(|m| Module::from_config(m, &config, root, &cohorts))
      .collect();

    let channel = ChannelResolver::from_config(&config.publishing).resolve(&config.project.version);
    tracing::debug!(version = %channel.version, channel = %channel.channel, "resolved version channel");

    Ok(Self {
      root: root.to_path_buf(),
      config: Arc::new(config),
      cohorts,
      modules,
      channel,
    })
  }

  pub fn module(&self, name: &str) -> Option<&Module> {
    self.modules.iter().find(|m| m.name == name)
  }

  /// Modules of a cohort, in declaration order
  pub fn modules_in(&self, cohort: &str) -> YardResult<Vec<&Module>> {
    let members = self.cohorts.members(cohort)?;
    Ok(self.modules.iter().filter(|m| members.contains(&m.name)).collect())
  }

  /// Shared runtime collection directory used when `copy_to_root` is set
  pub fn shared_libs_dir(&self) -> PathBuf {
    self.root.join("build").join("libs-all")
  }

  /// Destination of the aggregated documentation
  pub fn docs_destination(&self) -> PathBuf {
    self.root.join(&self.config.docs.destination)
  }

  pub fn project_name(&self) -> &str {
    &self.config.project.name
  }

  pub fn version(&self) -> &str {
    &self.channel.version
  }
}
