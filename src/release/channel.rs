//! Version channel resolution: release vs. pre-release
//!
//! Classification is a literal, case-sensitive suffix check against the configured marker.
//! Semver parsing only feeds a warning. With the default `SNAPSHOT` marker,
//! `1.0.0.SNAPSHOT` is a PRE-RELEASE and `1.0.0-snapshot` is a RELEASE.

use crate::core::config::PublishingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Release channel of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  Release,
  Prerelease,
}

impl Channel {
  /// Classify a version string by exact suffix match
  pub fn classify(version: &str, marker: &str) -> Self {
    if !marker.is_empty() && version.ends_with(marker) {
      Channel::Prerelease
    } else {
      Channel::Release
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Channel::Release => write!(f, "release"),
      Channel::Prerelease => write!(f, "pre-release"),
    }
  }
}

/// Repository a publication is uploaded to
///
/// The URL may be empty: resolution still succeeds, the publish task fails at use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTarget {
  pub url: String,
  /// Credential name resolved at publish time
  pub credentials: Option<String>,
}

impl RepositoryTarget {
  pub fn is_unset(&self) -> bool {
    self.url.trim().is_empty()
  }
}

/// Outcome of channel resolution for a module group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResolution {
  pub version: String,
  pub channel: Channel,
  pub target: RepositoryTarget,
  /// Global signing flag; per-module signing also needs a publication
  pub signing_enabled: bool,
}

impl ChannelResolution {
  /// Signing is applied iff the global flag is set and the module has a publication
  pub fn applies_signing(&self, has_publication: bool) -> bool {
    should_sign(self.signing_enabled, has_publication)
  }
}

/// Signing policy shared by graph wiring and the CLI report
pub fn should_sign(signing_enabled: bool, has_publication: bool) -> bool {
  signing_enabled && has_publication
}

/// Resolves a version to its channel, target and signing policy
#[derive(Debug, Clone)]
pub struct ChannelResolver {
  marker: String,
  release: RepositoryTarget,
  prerelease: RepositoryTarget,
  signing_enabled: bool,
}

impl ChannelResolver {
  pub fn from_config(publishing: &PublishingConfig) -> Self {
    Self {
      marker: publishing.prerelease_marker.clone(),
      release: RepositoryTarget {
        url: publishing.release_url.clone(),
        credentials: publishing.credentials.clone(),
      },
      prerelease: RepositoryTarget {
        url: publishing.prerelease_url.clone(),
        credentials: publishing.credentials.clone(),
      },
      signing_enabled: publishing.sign,
    }
  }

  pub fn resolve(&self, version: &str) -> ChannelResolution {
    let channel = Channel::classify(version, &self.marker);
    let target = match channel {
      Channel::Release => self.release.clone(),
      Channel::Prerelease => self.prerelease.clone(),
    };

    if semver::Version::parse(version).is_err() {
      tracing::warn!(version, "version is not valid semver; channel is decided by suffix only");
    }
    if target.is_unset() {
      tracing::debug!(%channel, "repository URL unset; publish tasks will fail at use");
    }

    ChannelResolution {
      version: version.to_string(),
      channel,
      target,
      signing_enabled: self.signing_enabled,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resolver(sign: bool) -> ChannelResolver {
    ChannelResolver::from_config(&PublishingConfig {
      release_url: "https://repo.example.org/releases".into(),
      prerelease_url: "https://repo.example.org/snapshots".into(),
      credentials: Some("REPO".into()),
      sign,
      ..Default::default()
    })
  }

  #[test]
  fn test_snapshot_is_prerelease() {
    let res = resolver(false).resolve("1.9.0-SNAPSHOT");
    assert_eq!(res.channel, Channel::Prerelease);
    assert_eq!(res.target.url, "https://repo.example.org/snapshots");
  }

  #[test]
  fn test_plain_version_is_release() {
    let res = resolver(false).resolve("1.9.0");
    assert_eq!(res.channel, Channel::Release);
    assert_eq!(res.target.url, "https://repo.example.org/releases");
    assert_eq!(res.target.credentials.as_deref(), Some("REPO"));
  }

  #[test]
  fn test_suffix_check_is_exact_and_case_sensitive() {
    assert_eq!(Channel::classify("1.0.0-snapshot", "SNAPSHOT"), Channel::Release);
    assert_eq!(Channel::classify("1.0.0-SNAPSHOT.1", "SNAPSHOT"), Channel::Release);
    assert_eq!(Channel::classify("1.0.0-SNAPSHOT-x", "SNAPSHOT"), Channel::Release);
    assert_eq!(Channel::classify("2.0-SNAPSHOT", "SNAPSHOT"), Channel::Prerelease);
    assert_eq!(Channel::classify("SNAPSHOT", "-SNAPSHOT"), Channel::Release);
    assert_eq!(Channel::classify("1.0.0", ""), Channel::Release);
  }

  #[test]
  fn test_default_marker_matches_any_snapshot_suffix() {
    let r = ChannelResolver::from_config(&PublishingConfig::default());
    for version in ["1.9.0.SNAPSHOT", "1.9.0SNAPSHOT", "SNAPSHOT", "1.9.0-SNAPSHOT"] {
      assert_eq!(r.resolve(version).channel, Channel::Prerelease, "{}", version);
    }
    assert_eq!(r.resolve("1.9.0-snapshot").channel, Channel::Release);
  }

  #[test]
  fn test_empty_url_still_resolves() {
    let res = ChannelResolver::from_config(&PublishingConfig::default()).resolve("1.0.0");
    assert_eq!(res.channel, Channel::Release);
    assert!(res.target.is_unset());
  }

  #[test]
  fn test_signing_policy_truth_table() {
    assert!(should_sign(true, true));
    assert!(!should_sign(true, false));
    assert!(!should_sign(false, true));
    assert!(!should_sign(false, false));

    assert!(resolver(true).resolve("1.0.0").applies_signing(true));
    assert!(!resolver(false).resolve("1.0.0").applies_signing(true));
  }

  #[test]
  fn test_resolution_is_stable() {
    let r = resolver(true);
    assert_eq!(r.resolve("3.1.4-SNAPSHOT"), r.resolve("3.1.4-SNAPSHOT"));
  }
}
