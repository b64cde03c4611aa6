//! Bundle descriptor generation
//!
//! Each module's primary archive carries a metadata block naming the module and describing
//! which packages it exports and imports. The descriptor never gates execution; the package
//! task renders it to a manifest file before the archiver runs.

use crate::core::context::Module;
use crate::core::error::{ResultExt, YardResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Package segment that keeps a package out of the exported surface
pub const INTERNAL_SEGMENT: &str = "internal";

/// Maximum manifest line length in bytes (continuations start with a single space)
const MANIFEST_LINE_WIDTH: usize = 72;

/// Export everything except packages containing an `internal` segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRule {
  pub excluded_segment: String,
}

impl Default for ExportRule {
  fn default() -> Self {
    Self {
      excluded_segment: INTERNAL_SEGMENT.to_string(),
    }
  }
}

impl ExportRule {
  pub fn exports(&self, package: &str) -> bool {
    !package.split('.').any(|segment| segment == self.excluded_segment)
  }

  /// Header form: `!*.internal.*,*`
  pub fn header(&self) -> String {
    format!("!*.{}.*,*", self.excluded_segment)
  }
}

/// One import clause; `pattern` is an exact package, a `prefix.*` wildcard or `*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRule {
  pub pattern: String,
  pub optional: bool,
}

impl ImportRule {
  pub fn matches(&self, package: &str) -> bool {
    if self.pattern == "*" {
      return true;
    }
    match self.pattern.strip_suffix(".*") {
      Some(prefix) => package == prefix || package.starts_with(&format!("{}.", prefix)),
      None => package == self.pattern,
    }
  }

  fn header(&self) -> String {
    if self.optional {
      format!("{};resolution:=optional", self.pattern)
    } else {
      self.pattern.clone()
    }
  }
}

/// Module-scoped packaging metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleDescriptor {
  pub symbolic_name: String,
  pub name: String,
  pub version: String,
  pub export: ExportRule,
  /// Evaluated in order; the first matching rule decides optionality
  pub imports: Vec<ImportRule>,
}

impl BundleDescriptor {
  /// Descriptor for a module: required imports first, everything else optional
  pub fn generate(module: &Module) -> Self {
    let mut imports: Vec<ImportRule> = module
      .required_imports
      .iter()
      .map(|pattern| ImportRule {
        pattern: pattern.clone(),
        optional: false,
      })
      .collect();
    imports.push(ImportRule {
      pattern: "*".to_string(),
      optional: true,
    });

    Self {
      symbolic_name: module.identifier.clone(),
      name: module.display_name.clone(),
      version: module.version.clone(),
      export: ExportRule::default(),
      imports,
    }
  }

  pub fn exports(&self, package: &str) -> bool {
    self.export.exports(package)
  }

  /// Optionality of a foreign package import
  pub fn is_import_optional(&self, package: &str) -> bool {
    self
      .imports
      .iter()
      .find(|rule| rule.matches(package))
      .is_none_or(|rule| rule.optional)
  }

  /// Ordered header list written into the archive metadata
  pub fn headers(&self) -> Vec<(&'static str, String)> {
    let imports = self.imports.iter().map(ImportRule::header).collect::<Vec<_>>().join(",");
    vec![
      ("Manifest-Version", "1.0".to_string()),
      ("Bundle-ManifestVersion", "2".to_string()),
      ("Bundle-Name", self.name.clone()),
      ("Bundle-SymbolicName", self.symbolic_name.clone()),
      ("Bundle-Version", self.version.clone()),
      ("-exportcontents", self.export.header()),
      ("Import-Package", imports),
      ("Automatic-Module-Name", self.symbolic_name.clone()),
    ]
  }

  /// Manifest text with 72-byte line wrapping
  pub fn render_manifest(&self) -> String {
    let mut out = String::new();
    for (key, value) in self.headers() {
      out.push_str(&wrap_header(&format!("{}: {}", key, value)));
    }
    out.push_str("\r\n");
    out
  }

  pub fn write_manifest(&self, path: &Path) -> YardResult<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, self.render_manifest()).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
  }
}

fn wrap_header(line: &str) -> String {
  let mut out = String::new();
  let mut width = MANIFEST_LINE_WIDTH;
  let mut current = 0;
  for ch in line.chars() {
    if current + ch.len_utf8() > width {
      out.push_str("\r\n ");
      current = 0;
      width = MANIFEST_LINE_WIDTH - 1;
    }
    out.push(ch);
    current += ch.len_utf8();
  }
  out.push_str("\r\n");
  out
}
