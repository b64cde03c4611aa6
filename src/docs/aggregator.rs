//! Documentation input aggregation
//!
//! Merges the source roots and compile classpaths of a module subset into one input set for
//! the documentation tool. Both lists are kept in sorted sets so the argument file is
//! byte-identical across runs regardless of module or directory iteration order.

use crate::core::config::DocsConfig;
use crate::core::context::Module;
use crate::core::error::{ResultExt, YardResult};
use crate::utils::{MATCH_OPTIONS, compile_pattern, normalize_relative, path_to_archive_format};
use glob::Pattern;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Inputs of one documentation generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocInputs {
  /// Source files, project-relative, sorted
  pub sources: Vec<PathBuf>,
  /// Compile classpath entries, sorted and deduplicated
  pub classpath: Vec<PathBuf>,
  /// External cross-reference URLs
  pub links: Vec<String>,
}

impl DocInputs {
  /// Argument file consumed by the documentation tool
  pub fn argfile_contents(&self, destination: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("-d\n{}\n", path_to_archive_format(destination)));
    if !self.classpath.is_empty() {
      let separator = if cfg!(windows) { ";" } else { ":" };
      let joined = self
        .classpath
        .iter()
        .map(|p| path_to_archive_format(p))
        .collect::<Vec<_>>()
        .join(separator);
      out.push_str(&format!("-classpath\n{}\n", joined));
    }
    for link in &self.links {
      out.push_str(&format!("-link\n{}\n", link));
    }
    for source in &self.sources {
      out.push_str(&path_to_archive_format(source));
      out.push('\n');
    }
    out
  }

  pub fn write_argfile(&self, destination: &Path, path: &Path) -> YardResult<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, self.argfile_contents(destination))
      .with_context(|| format!("Failed to write documentation argument file {}", path.display()))?;
    Ok(())
  }
}

/// Collects documentation inputs under a fixed denylist
pub struct DocAggregator {
  root: PathBuf,
  exclude: Vec<Pattern>,
  extensions: Vec<String>,
  links: Vec<String>,
}

impl DocAggregator {
  pub fn new(root: &Path, config: &DocsConfig) -> YardResult<Self> {
    let exclude = config
      .exclude
      .iter()
      .map(|p| compile_pattern(p))
      .collect::<YardResult<Vec<_>>>()?;

    let mut links = Vec::new();
    for link in &config.links {
      if link.starts_with("https://") || link.starts_with("http://") {
        links.push(link.clone());
      } else {
        tracing::warn!(link = %link, "documentation link is not an http(s) URL; ignoring");
      }
    }

    Ok(Self {
      root: root.to_path_buf(),
      exclude,
      extensions: config.extensions.clone(),
      links,
    })
  }

  /// Whether a project-relative path is on the denylist
  pub fn is_excluded(&self, relative: &str) -> bool {
    self.exclude.iter().any(|p| p.matches_with(relative, MATCH_OPTIONS))
  }

  fn has_doc_extension(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
  }

  /// Union of the modules' filtered sources and compile classpaths
  pub fn collect(&self, modules: &[&Module]) -> YardResult<DocInputs> {
    let mut sources = BTreeSet::new();
    let mut classpath = BTreeSet::new();

    for module in modules {
      for source_root in &module.source_roots {
        if !source_root.is_dir() {
          tracing::warn!(module = %module.name, root = %source_root.display(), "source root does not exist");
          continue;
        }

        for entry in WalkDir::new(source_root).sort_by_file_name() {
          let entry = entry?;
          if !entry.file_type().is_file() || !self.has_doc_extension(entry.path()) {
            continue;
          }
          let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
          if self.is_excluded(&normalize_relative(relative)) {
            continue;
          }
          sources.insert(relative.to_path_buf());
        }
      }

      classpath.extend(module.classpath.iter().cloned());
      classpath.insert(module.classes_dir());
    }

    Ok(DocInputs {
      sources: sources.into_iter().collect(),
      classpath: classpath.into_iter().collect(),
      links: self.links.clone(),
    })
  }
}

/// Clear and recreate a documentation destination (generation is non-incremental)
pub fn prepare_destination(destination: &Path) -> YardResult<()> {
  if destination.exists() {
    fs::remove_dir_all(destination).with_context(|| format!("Failed to clear {}", destination.display()))?;
  }
  fs::create_dir_all(destination).with_context(|| format!("Failed to create {}", destination.display()))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn module(root: &Path, name: &str, classpath: &[&str]) -> Module {
    let module_root = root.join(name);
    Module {
      name: name.into(),
      identifier: format!("com.example.{}", name),
      display_name: name.into(),
      version: "1.0.0".into(),
      source_roots: vec![module_root.join("src/main/java")],
      classpath: classpath.iter().map(|c| root.join(c)).collect(),
      runtime_classpath: vec![],
      required_imports: vec![],
      cohorts: vec!["all".into()],
      root: module_root,
    }
  }

  fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "class X {}").unwrap();
  }

  fn fixture() -> (tempfile::TempDir, Vec<Module>) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("core/src/main/java/com/example/core/Api.java"));
    touch(&root.join("core/src/main/java/com/example/core/internal/Impl.java"));
    touch(&root.join("core/src/main/java/com/example/core/notes.txt"));
    touch(&root.join("client/src/main/java/com/example/client/Client.java"));
    touch(&root.join("client/src/main/java/com/example/java-gen/Gen.java"));
    let modules = vec![
      module(root, "core", &["lib/b.jar", "lib/a.jar"]),
      module(root, "client", &["lib/a.jar"]),
    ];
    (dir, modules)
  }

  #[test]
  fn test_denylist_and_extensions() {
    let (dir, modules) = fixture();
    let aggregator = DocAggregator::new(dir.path(), &DocsConfig::default()).unwrap();
    let inputs = aggregator.collect(&modules.iter().collect::<Vec<_>>()).unwrap();

    assert_eq!(
      inputs.sources,
      vec![
        PathBuf::from("client/src/main/java/com/example/client/Client.java"),
        PathBuf::from("core/src/main/java/com/example/core/Api.java"),
      ]
    );
    let jars: Vec<_> = inputs.classpath.iter().filter(|p| p.extension().is_some()).collect();
    assert_eq!(jars, vec![&dir.path().join("lib/a.jar"), &dir.path().join("lib/b.jar")]);
  }

  #[test]
  fn test_two_runs_give_identical_argfiles() {
    let (dir, modules) = fixture();
    let aggregator = DocAggregator::new(dir.path(), &DocsConfig::default()).unwrap();
    let dest = dir.path().join("build/docs/api-all");

    let forward: Vec<&Module> = modules.iter().collect();
    let backward: Vec<&Module> = modules.iter().rev().collect();
    let first = aggregator.collect(&forward).unwrap().argfile_contents(&dest);
    let second = aggregator.collect(&backward).unwrap().argfile_contents(&dest);
    assert_eq!(first.as_bytes(), second.as_bytes());
  }

  #[test]
  fn test_non_http_links_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let config = DocsConfig {
      links: vec!["https://docs.oracle.com/javase/8/docs/api/".into(), "ftp://old".into()],
      ..Default::default()
    };
    let aggregator = DocAggregator::new(dir.path(), &config).unwrap();
    let inputs = aggregator.collect(&[]).unwrap();
    assert_eq!(inputs.links, vec!["https://docs.oracle.com/javase/8/docs/api/".to_string()]);
  }

  #[test]
  fn test_prepare_destination_clears_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    touch(&dest.join("stale.html"));
    prepare_destination(&dest).unwrap();
    assert!(dest.is_dir());
    assert!(!dest.join("stale.html").exists());
  }
}
