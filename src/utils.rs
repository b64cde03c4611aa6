//! Utility functions for path patterns and repository locations

use crate::core::error::{ConfigError, YardResult};
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};

/// Match options shared by every glob in shipyard: case-sensitive, `*` never crosses `/`
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

/// Compile a glob pattern.
///
/// A trailing `/` means "everything below this directory" (`bin/main/` == `bin/main/**`).
pub fn compile_pattern(pattern: &str) -> YardResult<Pattern> {
  let expanded = if pattern.ends_with('/') {
    format!("{}**", pattern)
  } else {
    pattern.to_string()
  };

  Pattern::new(&expanded).map_err(|e| {
    ConfigError::InvalidPattern {
      pattern: pattern.to_string(),
      reason: e.to_string(),
    }
    .into()
  })
}

/// True when the pattern contains no glob metacharacters (names exactly one path)
pub fn is_literal_pattern(pattern: &str) -> bool {
  !pattern.ends_with('/') && !pattern.contains(['*', '?', '[', ']'])
}

/// Check if a repository URL refers to the local filesystem
///
/// Returns true for:
/// - `file://` URLs
/// - Absolute paths on Unix: /path/to/repo
/// - Absolute paths on Windows: C:\path\to\repo or C:/path/to/repo
/// - Relative paths: ./path or ../path
///
/// Returns false for:
/// - HTTP(S) URLs: <https://repo.example.com/releases>
/// - SSH style locations: deploy@host:/srv/repo
pub fn is_local_path(path: &str) -> bool {
  if path.starts_with("file://") {
    return true;
  }

  if path.starts_with("./") || path.starts_with("../") {
    return true;
  }

  // Windows drive letter (C:\ or C:/), checked before the URL test since it contains ':'
  if path.len() >= 3 {
    let bytes = path.as_bytes();
    if bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/') {
      return true;
    }
  }

  if path.starts_with('/') && !path.contains("://") && !path.contains('@') {
    return true;
  }

  if Path::new(path).is_absolute() {
    return true;
  }

  false
}

/// Turn a local repository URL into a filesystem path, resolving relative paths against `root`
pub fn local_repository_path(root: &Path, url: &str) -> PathBuf {
  let raw = url.strip_prefix("file://").unwrap_or(url);
  let path = PathBuf::from(raw);
  if path.is_absolute() { path } else { root.join(path) }
}

/// Convert a path to archive/pattern format (always forward slashes)
pub fn path_to_archive_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Normalise a relative path for matching: forward slashes, no leading `./`
pub fn normalize_relative(path: &Path) -> String {
  let text = path_to_archive_format(path);
  let mut trimmed = text.as_str();
  while let Some(rest) = trimmed.strip_prefix("./") {
    trimmed = rest;
  }
  if trimmed == "." { String::new() } else { trimmed.to_string() }
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_lexical(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push(component);
        }
      }
      other => out.push(other),
    }
  }
  out
}
