//! Publications: the artifact set of a module bound to a repository target
//!
//! A publication is created for every module while the graph is built. Modules in the
//! repository treatment are bound to the resolved channel target (with a signing decision);
//! all others are marked publish-disabled. Problems with the target or credentials only
//! surface when the publish task runs.

use crate::core::config::PublicationMetadata;
use crate::core::context::{BuildContext, Module};
use crate::core::credentials::CredentialProvider;
use crate::core::error::{PublishError, ResultExt, YardError, YardResult};
use crate::core::tools::{Tool, ToolRunner, ToolVars};
use crate::release::channel::{Channel, RepositoryTarget};
use crate::release::signing::signature_path;
use crate::utils::{is_local_path, local_repository_path};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Classifier of the sources archive
pub const SOURCES_CLASSIFIER: &str = "sources";
/// Classifier of the documentation archive
pub const DOCS_CLASSIFIER: &str = "docs";

/// Primary archive, sources and documentation of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
  pub primary: PathBuf,
  pub sources: PathBuf,
  pub docs: PathBuf,
}

impl ArtifactSet {
  pub fn for_module(module: &Module, extension: &str) -> Self {
    Self {
      primary: module.artifact(extension, None),
      sources: module.artifact(extension, Some(SOURCES_CLASSIFIER)),
      docs: module.artifact(extension, Some(DOCS_CLASSIFIER)),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
    [&self.primary, &self.sources, &self.docs].into_iter()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SigningDecision {
  /// Sign with the key resolved from this credential name
  Sign { key: String },
  /// Global signing flag is off
  SigningSkipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PublishBinding {
  /// Module is outside the repository treatment
  PublishDisabled,
  Bound {
    channel: Channel,
    target: RepositoryTarget,
    signing: SigningDecision,
  },
}

#[derive(Debug, Clone, Serialize)]
pub struct Publication {
  pub module: String,
  pub group: String,
  pub artifact_id: String,
  pub version: String,
  pub artifacts: ArtifactSet,
  pub metadata: PublicationMetadata,
  pub binding: PublishBinding,
}

impl Publication {
  /// Publication of `module`; bound to the channel target when `in_repository`
  pub fn new(ctx: &BuildContext, module: &Module, in_repository: bool) -> Self {
    let config = &ctx.config;
    let mut metadata = config.publishing.metadata.clone();
    if metadata.name.is_none() {
      metadata.name = Some(module.display_name.clone());
    }

    let binding = if in_repository {
      let signing = if ctx.channel.applies_signing(true) {
        SigningDecision::Sign {
          key: config.publishing.signing_key.clone(),
        }
      } else {
        SigningDecision::SigningSkipped
      };
      PublishBinding::Bound {
        channel: ctx.channel.channel,
        target: ctx.channel.target.clone(),
        signing,
      }
    } else {
      PublishBinding::PublishDisabled
    };

    Self {
      module: module.name.clone(),
      group: config.project.group.clone(),
      artifact_id: module.name.clone(),
      version: module.version.clone(),
      artifacts: ArtifactSet::for_module(module, &config.project.artifact_extension),
      metadata,
      binding,
    }
  }

  pub fn is_published(&self) -> bool {
    matches!(self.binding, PublishBinding::Bound { .. })
  }

  /// Credential name of the signing key when this publication is signed
  pub fn signing_key(&self) -> Option<&str> {
    match &self.binding {
      PublishBinding::Bound {
        signing: SigningDecision::Sign { key },
        ..
      } => Some(key.as_str()),
      _ => None,
    }
  }

  pub fn status(&self) -> &'static str {
    match &self.binding {
      PublishBinding::PublishDisabled => "publish-disabled",
      PublishBinding::Bound {
        signing: SigningDecision::SigningSkipped,
        ..
      } => "signing-skipped",
      PublishBinding::Bound { .. } => "signed",
    }
  }

  /// `group:artifact:version`
  pub fn coordinates(&self) -> String {
    format!("{}:{}:{}", self.group, self.artifact_id, self.version)
  }
}

/// Uploads publications to their bound repository
pub struct Publisher<'a> {
  root: &'a Path,
  tools: &'a ToolRunner,
  credentials: &'a dyn CredentialProvider,
}

impl<'a> Publisher<'a> {
  pub fn new(root: &'a Path, tools: &'a ToolRunner, credentials: &'a dyn CredentialProvider) -> Self {
    Self {
      root,
      tools,
      credentials,
    }
  }

  /// Publish one module.
  ///
  /// # Errors
  /// - the publication is publish-disabled
  /// - the bound target has no URL (`publish target unset`)
  /// - an artifact is missing, credentials cannot be resolved, or the upload tool fails
  pub fn publish(&self, publication: &Publication) -> YardResult<()> {
    let (channel, target) = match &publication.binding {
      PublishBinding::PublishDisabled => {
        return Err(YardError::message(format!(
          "Publishing is disabled for '{}'",
          publication.module
        )));
      }
      PublishBinding::Bound { channel, target, .. } => (channel, target),
    };

    if target.is_unset() {
      return Err(
        PublishError::TargetUnset {
          module: publication.module.clone(),
          channel: channel.to_string(),
        }
        .into(),
      );
    }

    for artifact in publication.artifacts.iter() {
      if !artifact.is_file() {
        return Err(YardError::message(format!(
          "Artifact {} for '{}' does not exist",
          artifact.display(),
          publication.module
        )));
      }
    }

    if is_local_path(&target.url) {
      self.publish_local(publication, &target.url)?;
    } else {
      self.publish_remote(publication, target)?;
    }

    tracing::info!(coordinates = %publication.coordinates(), url = %target.url, "published");
    Ok(())
  }

  fn publish_local(&self, publication: &Publication, url: &str) -> YardResult<PathBuf> {
    let mut dest = local_repository_path(self.root, url);
    for segment in publication.group.split('.').filter(|s| !s.is_empty()) {
      dest.push(segment);
    }
    dest.push(&publication.artifact_id);
    dest.push(&publication.version);
    fs::create_dir_all(&dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    let signed = publication.signing_key().is_some();
    for artifact in publication.artifacts.iter() {
      let mut files = vec![artifact.clone()];
      if signed {
        files.push(signature_path(artifact));
      }
      for file in files {
        let name = file
          .file_name()
          .ok_or_else(|| YardError::message(format!("Invalid artifact path {}", file.display())))?;
        fs::copy(&file, dest.join(name)).with_context(|| format!("Failed to copy {}", file.display()))?;
      }
    }

    let record = dest.join(format!("{}-{}.json", publication.artifact_id, publication.version));
    fs::write(&record, serde_json::to_string_pretty(publication)?)
      .with_context(|| format!("Failed to write {}", record.display()))?;
    Ok(dest)
  }

  fn publish_remote(&self, publication: &Publication, target: &RepositoryTarget) -> YardResult<()> {
    let mut vars = ToolVars::new()
      .set("module", &publication.module)
      .set("group", &publication.group)
      .set("artifact", &publication.artifact_id)
      .set("version", &publication.version)
      .set("url", &target.url)
      .set_path("primary", &publication.artifacts.primary)
      .set_path("sources", &publication.artifacts.sources)
      .set_path("docs", &publication.artifacts.docs)
      .set("signed", publication.signing_key().is_some().to_string());

    if let Some(name) = &target.credentials {
      let pair = self.credentials.user_password(name)?;
      vars = vars.secret("username", pair.username.clone()).secret("password", pair.password());
    }

    self.tools.run(Tool::Publish, &vars)
  }
}
