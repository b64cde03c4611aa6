//! Distribution manifest: ordered include/exclude rules and destination layouts
//!
//! Rules are evaluated in declaration order and the last matching rule wins. Once an
//! exclude has matched a path, only a later include naming exactly that path (no glob
//! metacharacters) brings it back; a broader include never re-includes an excluded path.
//! A rule list without any include accepts every path it does not exclude.

use crate::core::config::{DistributionConfig, LayoutConfig};
use crate::core::error::YardResult;
use crate::utils::{MATCH_OPTIONS, compile_pattern, is_literal_pattern, normalize_relative};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One entry of a rule list, written as `{ include = "glob" }` or `{ exclude = "glob" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRule {
  Include(String),
  Exclude(String),
}

impl PathRule {
  pub fn pattern(&self) -> &str {
    match self {
      PathRule::Include(p) | PathRule::Exclude(p) => p,
    }
  }
}

/// Compiled rule list
#[derive(Debug, Clone)]
pub struct RuleSet {
  rules: Vec<(PathRule, Pattern)>,
  has_include: bool,
}

impl RuleSet {
  pub fn new(rules: &[PathRule]) -> YardResult<Self> {
    let compiled = rules
      .iter()
      .map(|rule| Ok((rule.clone(), compile_pattern(rule.pattern())?)))
      .collect::<YardResult<Vec<_>>>()?;
    Ok(Self {
      has_include: rules.iter().any(|r| matches!(r, PathRule::Include(_))),
      rules: compiled,
    })
  }

  /// Decide whether a relative, forward-slash path is part of the archive
  pub fn evaluate(&self, path: &str) -> bool {
    let mut included = !self.has_include;
    let mut excluded = false;

    for (rule, pattern) in &self.rules {
      if !pattern.matches_with(path, MATCH_OPTIONS) {
        continue;
      }
      match rule {
        PathRule::Exclude(_) => {
          included = false;
          excluded = true;
        }
        PathRule::Include(raw) => {
          if !excluded || is_literal_pattern(raw) {
            included = true;
            excluded = false;
          }
        }
      }
    }

    included
  }

  pub fn rules(&self) -> impl Iterator<Item = &PathRule> {
    self.rules.iter().map(|(rule, _)| rule)
  }
}

/// Maps files below `from` into the archive under `into`
#[derive(Debug, Clone)]
pub struct Layout {
  /// Archive prefix with `{project}` expanded
  pub into: String,
  /// Absolute source directory
  pub from: PathBuf,
  pub rules: RuleSet,
}

impl Layout {
  fn from_config(config: &LayoutConfig, root: &Path, project: &str) -> YardResult<Self> {
    Ok(Self {
      into: config.into.replace("{project}", project).trim_matches('/').to_string(),
      from: root.join(&config.from),
      rules: RuleSet::new(&config.rules)?,
    })
  }
}

/// One file destined for the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
  /// Forward-slash path inside the archive
  pub archive_path: String,
  pub source: PathBuf,
  pub executable: bool,
}

/// Everything the packager needs to assemble the distribution archive
#[derive(Debug, Clone)]
pub struct DistributionManifest {
  pub layouts: Vec<Layout>,
  /// `<project>-<version>.<ext>`
  pub archive_name: String,
  /// Absolute output directory
  pub output_dir: PathBuf,
  /// Tasks that must be done before assembly
  pub depends_on: Vec<String>,
}

impl DistributionManifest {
  /// Build the manifest. Without configured layouts the project tree and the aggregated
  /// documentation are laid out under `<project>/` and `<project>/doc/`.
  pub fn from_config(
    root: &Path,
    project: &str,
    version: &str,
    config: &DistributionConfig,
    docs_destination: &Path,
    depends_on: Vec<String>,
  ) -> YardResult<Self> {
    let layouts = if config.layouts.is_empty() {
      default_layouts(docs_destination)
    } else {
      config.layouts.clone()
    };

    Ok(Self {
      layouts: layouts
        .iter()
        .map(|l| Layout::from_config(l, root, project))
        .collect::<YardResult<Vec<_>>>()?,
      archive_name: archive_name(project, version, &config.extension),
      output_dir: root.join(&config.output_dir),
      depends_on,
    })
  }

  pub fn archive_path(&self) -> PathBuf {
    self.output_dir.join(&self.archive_name)
  }

  /// Walk every layout and return the selected files sorted by archive path.
  ///
  /// The first layout to claim an archive path keeps it. The output directory is never
  /// walked so earlier archives do not end up inside new ones.
  pub fn collect_entries(&self) -> YardResult<Vec<ArchiveEntry>> {
    let mut entries: BTreeMap<String, ArchiveEntry> = BTreeMap::new();

    for layout in &self.layouts {
      if !layout.from.is_dir() {
        tracing::warn!(from = %layout.from.display(), "distribution layout source does not exist");
        continue;
      }

      let walker = WalkDir::new(&layout.from)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != self.output_dir);

      for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
          continue;
        }
        let relative = normalize_relative(entry.path().strip_prefix(&layout.from)?);
        if !layout.rules.evaluate(&relative) {
          continue;
        }

        let archive_path = if layout.into.is_empty() {
          relative
        } else {
          format!("{}/{}", layout.into, relative)
        };
        if entries.contains_key(&archive_path) {
          tracing::debug!(path = %archive_path, "already claimed by an earlier layout");
          continue;
        }

        let executable = is_executable(&entry.metadata()?);
        entries.insert(
          archive_path.clone(),
          ArchiveEntry {
            archive_path,
            source: entry.path().to_path_buf(),
            executable,
          },
        );
      }
    }

    Ok(entries.into_values().collect())
  }
}

/// `<project>-<version>.<ext>`
pub fn archive_name(project: &str, version: &str, extension: &str) -> String {
  format!("{}-{}.{}", project, version, extension.trim_start_matches('.'))
}

fn default_layouts(docs_destination: &Path) -> Vec<LayoutConfig> {
  let include = |p: &str| PathRule::Include(p.to_string());
  let exclude = |p: &str| PathRule::Exclude(p.to_string());

  let project = LayoutConfig {
    into: "{project}".to_string(),
    from: PathBuf::from("."),
    rules: vec![
      include("shipyard.toml"),
      include("LICENSE*"),
      include("README*"),
      include("doc/**"),
      include("bin/**"),
      exclude("bin/main/"),
      exclude("bin/test/"),
      include("build/libs-all/**"),
      include("src/**"),
    ],
  };

  let docs_dir = docs_destination
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();
  let docs = LayoutConfig {
    into: "{project}/doc".to_string(),
    from: docs_destination.parent().map(Path::to_path_buf).unwrap_or_default(),
    rules: vec![include(&format!("{}/**", docs_dir))],
  };

  vec![project, docs]
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
  use std::os::unix::fs::PermissionsExt;
  metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
  false
}
