//! Artifact signing
//!
//! The signing primitive is external: `CommandSigner` runs `tools.sign` once per artifact
//! with the key material exported through the environment. A missing key fails only the
//! sign task of the module being signed.

use crate::core::credentials::{CredentialProvider, SecretKey};
use crate::core::error::{PublishError, YardError, YardResult};
use crate::core::tools::{Tool, ToolRunner, ToolVars};
use crate::release::publication::Publication;
use std::path::{Path, PathBuf};

/// Produces a detached signature next to an artifact
pub trait Signer: Send + Sync {
  fn sign(&self, artifact: &Path, key: &SecretKey) -> YardResult<PathBuf>;
}

/// `<artifact>.asc`
pub fn signature_path(artifact: &Path) -> PathBuf {
  let mut name = artifact.as_os_str().to_os_string();
  name.push(".asc");
  PathBuf::from(name)
}

/// Signs by running the configured `sign` tool
pub struct CommandSigner<'a> {
  tools: &'a ToolRunner,
}

impl<'a> CommandSigner<'a> {
  pub fn new(tools: &'a ToolRunner) -> Self {
    Self { tools }
  }
}

impl Signer for CommandSigner<'_> {
  fn sign(&self, artifact: &Path, key: &SecretKey) -> YardResult<PathBuf> {
    let signature = signature_path(artifact);
    let vars = ToolVars::new()
      .set_path("artifact", artifact)
      .set_path("signature", &signature)
      .secret("signing_key", key.expose());
    self.tools.run(Tool::Sign, &vars)?;

    if !signature.is_file() {
      return Err(YardError::message(format!(
        "Sign tool finished but {} was not produced",
        signature.display()
      )));
    }
    Ok(signature)
  }
}

/// Sign every artifact of a publication when its binding asks for it.
///
/// Returns the produced signatures; empty when signing does not apply.
pub fn sign_publication(
  publication: &Publication,
  credentials: &dyn CredentialProvider,
  signer: &dyn Signer,
) -> YardResult<Vec<PathBuf>> {
  let Some(key_name) = publication.signing_key() else {
    tracing::debug!(module = %publication.module, status = publication.status(), "signing not applied");
    return Ok(Vec::new());
  };

  let key = credentials.key(key_name).map_err(|_| PublishError::SigningKeyMissing {
    module: publication.module.clone(),
    key: key_name.to_string(),
  })?;

  publication
    .artifacts
    .iter()
    .map(|artifact| signer.sign(artifact, &key))
    .collect()
}
