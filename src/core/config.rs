//! Configuration loading and validation for `shipyard.toml`

use crate::core::error::{ConfigError, ResultExt, YardError, YardResult};
use crate::dist::manifest::PathRule;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for shipyard
/// Searched in order: shipyard.toml, .shipyard.toml, .config/shipyard.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipyardConfig {
  pub project: ProjectConfig,
  #[serde(default)]
  pub modules: Vec<ModuleConfig>,
  #[serde(default)]
  pub cohorts: Vec<CohortConfig>,
  #[serde(default)]
  pub treatments: TreatmentConfig,
  #[serde(default)]
  pub publishing: PublishingConfig,
  #[serde(default)]
  pub docs: DocsConfig,
  #[serde(default)]
  pub distribution: DistributionConfig,
  #[serde(default)]
  pub tools: ToolsConfig,
  #[serde(default)]
  pub edges: Vec<EdgeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
  pub name: String,
  #[serde(default)]
  pub group: String,
  pub version: String,
  /// Collect every module's runtime dependencies into `<root>/build/libs-all`
  #[serde(default)]
  pub copy_to_root: bool,
  /// Extension of packaged artifacts
  #[serde(default = "default_artifact_extension")]
  pub artifact_extension: String,
}

fn default_artifact_extension() -> String {
  "jar".to_string()
}

/// One module of the project. Modules inherit the project version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
  pub name: String,
  /// Canonical dotted identifier (defaults to `<group>.<name>`)
  #[serde(default)]
  pub identifier: Option<String>,
  /// Human readable name used in bundle metadata
  #[serde(default)]
  pub display_name: Option<String>,
  /// Module root relative to the project root
  #[serde(default = "default_module_path")]
  pub path: PathBuf,
  /// Ordered source roots, relative to the module root
  #[serde(default = "default_source_roots")]
  pub source_roots: Vec<PathBuf>,
  /// Compile-time classpath entries, relative to the project root
  #[serde(default)]
  pub classpath: Vec<PathBuf>,
  /// Resolved runtime dependency artifacts, relative to the project root
  #[serde(default)]
  pub runtime_classpath: Vec<PathBuf>,
  /// Packages imported without `resolution:=optional`
  #[serde(default)]
  pub required_imports: Vec<String>,
}

fn default_module_path() -> PathBuf {
  PathBuf::from(".")
}

fn default_source_roots() -> Vec<PathBuf> {
  vec![PathBuf::from("src/main/java")]
}

impl ModuleConfig {
  pub fn identifier(&self, group: &str) -> String {
    match &self.identifier {
      Some(id) => id.clone(),
      None if group.is_empty() => self.name.clone(),
      None => format!("{}.{}", group, self.name),
    }
  }

  pub fn display_name(&self) -> &str {
    self.display_name.as_deref().unwrap_or(&self.name)
  }
}

/// Named cohort definition. Exactly one rule field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohortConfig {
  pub name: String,
  #[serde(default)]
  pub all: bool,
  #[serde(default)]
  pub modules: Option<Vec<String>>,
  /// Glob matched against module names
  #[serde(default)]
  pub pattern: Option<String>,
  /// Derive membership from another cohort
  #[serde(default)]
  pub from: Option<String>,
}

/// Which cohort receives each configuration treatment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreatmentConfig {
  #[serde(default = "default_cohort")]
  pub build: String,
  #[serde(default = "default_cohort")]
  pub docs: String,
  #[serde(default = "default_cohort")]
  pub distribution: String,
  #[serde(default = "default_cohort")]
  pub repository: String,
}

fn default_cohort() -> String {
  crate::cohort::ALL.to_string()
}

impl Default for TreatmentConfig {
  fn default() -> Self {
    Self {
      build: default_cohort(),
      docs: default_cohort(),
      distribution: default_cohort(),
      repository: default_cohort(),
    }
  }
}

/// Repository, credential and signing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
  #[serde(default)]
  pub release_url: String,
  #[serde(default)]
  pub prerelease_url: String,
  /// Case-sensitive suffix marking a pre-release version
  #[serde(default = "default_prerelease_marker")]
  pub prerelease_marker: String,
  /// Credential name for repository username/password
  #[serde(default)]
  pub credentials: Option<String>,
  /// Global signing flag
  #[serde(default)]
  pub sign: bool,
  /// Credential name holding the signing key
  #[serde(default = "default_signing_key")]
  pub signing_key: String,
  /// Staging profile; enables the close-and-release step for release versions
  #[serde(default)]
  pub staging_profile: Option<String>,
  #[serde(default)]
  pub metadata: PublicationMetadata,
}

fn default_prerelease_marker() -> String {
  "SNAPSHOT".to_string()
}

fn default_signing_key() -> String {
  "SIGNING_KEY".to_string()
}

impl Default for PublishingConfig {
  fn default() -> Self {
    Self {
      release_url: String::new(),
      prerelease_url: String::new(),
      prerelease_marker: default_prerelease_marker(),
      credentials: None,
      sign: false,
      signing_key: default_signing_key(),
      staging_profile: None,
      metadata: PublicationMetadata::default(),
    }
  }
}

/// Descriptive metadata attached to every publication
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationMetadata {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub license_name: Option<String>,
  #[serde(default)]
  pub license_url: Option<String>,
  #[serde(default)]
  pub developers: Vec<Developer>,
  #[serde(default)]
  pub scm_connection: Option<String>,
  #[serde(default)]
  pub scm_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Developer {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
  #[serde(default = "default_docs_destination")]
  pub destination: PathBuf,
  #[serde(default = "default_docs_exclude")]
  pub exclude: Vec<String>,
  #[serde(default = "default_docs_extensions")]
  pub extensions: Vec<String>,
  #[serde(default)]
  pub links: Vec<String>,
}

fn default_docs_destination() -> PathBuf {
  PathBuf::from("build/docs/api-all")
}

fn default_docs_exclude() -> Vec<String> {
  vec![
    "**/internal/**".to_string(),
    "**/java-gen/**".to_string(),
    "**/app/**".to_string(),
  ]
}

fn default_docs_extensions() -> Vec<String> {
  vec!["java".to_string()]
}

impl Default for DocsConfig {
  fn default() -> Self {
    Self {
      destination: default_docs_destination(),
      exclude: default_docs_exclude(),
      extensions: default_docs_extensions(),
      links: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
  #[serde(default = "default_dist_output")]
  pub output_dir: PathBuf,
  #[serde(default = "default_dist_extension")]
  pub extension: String,
  #[serde(default)]
  pub layouts: Vec<LayoutConfig>,
}

fn default_dist_output() -> PathBuf {
  PathBuf::from("build/distributions")
}

fn default_dist_extension() -> String {
  "tgz".to_string()
}

impl Default for DistributionConfig {
  fn default() -> Self {
    Self {
      output_dir: default_dist_output(),
      extension: default_dist_extension(),
      layouts: Vec::new(),
    }
  }
}

/// Maps a source directory into an archive prefix through an ordered rule list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
  /// Archive prefix; `{project}` expands to the project name
  pub into: String,
  #[serde(default = "default_layout_from")]
  pub from: PathBuf,
  #[serde(default)]
  pub rules: Vec<PathRule>,
}

fn default_layout_from() -> PathBuf {
  PathBuf::from(".")
}

/// External command templates, one argument vector per tool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
  #[serde(default)]
  pub compile: Option<Vec<String>>,
  #[serde(default)]
  pub package: Option<Vec<String>>,
  /// Generic archiver: `{input}` (path list) into `{output}`
  #[serde(default)]
  pub archive: Option<Vec<String>>,
  #[serde(default)]
  pub docs: Option<Vec<String>>,
  #[serde(default)]
  pub sign: Option<Vec<String>>,
  #[serde(default)]
  pub publish: Option<Vec<String>>,
  #[serde(default)]
  pub release_staging: Option<Vec<String>>,
}

/// Extra dependency edge declared by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
  pub task: String,
  pub depends_on: Vec<String>,
}

impl ShipyardConfig {
  /// Find config file in search order: shipyard.toml, .shipyard.toml, .config/shipyard.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("shipyard.toml"),
      path.join(".shipyard.toml"),
      path.join(".config").join("shipyard.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from shipyard.toml (searches multiple locations)
  pub fn load(path: &Path) -> YardResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      YardError::Config(ConfigError::NotFound {
        project_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

    Self::parse(&content).with_context(|| format!("Invalid configuration in {}", config_path.display()))
  }

  /// Parse and validate configuration text
  pub fn parse(content: &str) -> YardResult<Self> {
    let config: ShipyardConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Structural validation that does not need cohort resolution
  pub fn validate(&self) -> YardResult<()> {
    if self.project.name.trim().is_empty() {
      return Err(ConfigError::MissingField {
        field: "project.name".to_string(),
      }
      .into());
    }
    if self.project.version.trim().is_empty() {
      return Err(ConfigError::MissingField {
        field: "project.version".to_string(),
      }
      .into());
    }

    let mut seen = HashSet::new();
    let mut roots: HashMap<PathBuf, &str> = HashMap::new();
    for module in &self.modules {
      if module.name.trim().is_empty() {
        return Err(ConfigError::MissingField {
          field: "modules[].name".to_string(),
        }
        .into());
      }
      if !seen.insert(module.name.as_str()) {
        return Err(ConfigError::Duplicate {
          kind: "module",
          name: module.name.clone(),
        }
        .into());
      }
      if module.identifier(&self.project.group).trim().is_empty() {
        return Err(ConfigError::MissingField {
          field: format!("identifier for module '{}'", module.name),
        }
        .into());
      }
      let root = crate::utils::normalize_lexical(&module.path);
      if let Some(first) = roots.insert(root.clone(), module.name.as_str()) {
        return Err(
          ConfigError::SharedModuleRoot {
            path: if root.as_os_str().is_empty() { PathBuf::from(".") } else { root },
            first: first.to_string(),
            second: module.name.clone(),
          }
          .into(),
        );
      }
    }

    for pattern in &self.docs.exclude {
      crate::utils::compile_pattern(pattern)?;
    }
    for layout in &self.distribution.layouts {
      for rule in &layout.rules {
        crate::utils::compile_pattern(rule.pattern())?;
      }
    }

    Ok(())
  }

  /// Find a module by name
  pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
    self.modules.iter().find(|m| m.name == name)
  }

  /// Module names in declaration order
  pub fn module_names(&self) -> Vec<String> {
    self.modules.iter().map(|m| m.name.clone()).collect()
  }
}
