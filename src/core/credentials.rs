//! Credential lookup for repository uploads and signing
//!
//! Credentials are read-only shared state: providers are `Send + Sync` and never mutate,
//! so concurrent publish tasks may resolve them freely.

use crate::core::error::{PublishError, YardResult};
use std::fmt;

/// Repository username/password pair
#[derive(Clone)]
pub struct UserPassword {
  pub username: String,
  password: String,
}

impl UserPassword {
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      username: username.into(),
      password: password.into(),
    }
  }

  pub fn password(&self) -> &str {
    &self.password
  }
}

impl fmt::Debug for UserPassword {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserPassword")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Opaque key material (a signing key id, path or armored key)
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for SecretKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SecretKey(<redacted>)")
  }
}

/// Resolves a named credential, failing with `CredentialNotFound`
pub trait CredentialProvider: Send + Sync {
  fn user_password(&self, name: &str) -> YardResult<UserPassword>;
  fn key(&self, name: &str) -> YardResult<SecretKey>;
}

/// Reads `<NAME>_USERNAME`/`<NAME>_PASSWORD` and `<NAME>` from the environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
  fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
  }
}

/// Normalise a credential name into an environment variable prefix
pub fn env_key(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect()
}

impl CredentialProvider for EnvCredentials {
  fn user_password(&self, name: &str) -> YardResult<UserPassword> {
    let prefix = env_key(name);
    let username = Self::var(&format!("{}_USERNAME", prefix));
    let password = Self::var(&format!("{}_PASSWORD", prefix));
    match (username, password) {
      (Some(username), Some(password)) => Ok(UserPassword::new(username, password)),
      _ => Err(PublishError::CredentialNotFound { name: prefix }.into()),
    }
  }

  fn key(&self, name: &str) -> YardResult<SecretKey> {
    let var = env_key(name);
    Self::var(&var)
      .map(SecretKey::new)
      .ok_or_else(|| PublishError::CredentialNotFound { name: var }.into())
  }
}
