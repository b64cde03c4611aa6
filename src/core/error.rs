//! Error types for shipyard with contextual messages and exit codes
//!
//! Errors are split by where they are detected: configuration errors surface while the
//! context and graph are built (before any task runs), graph errors come from wiring, and
//! publish errors only appear at the point of use inside a task action.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for shipyard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (I/O, external tools)
  System = 2,
  /// Validation failure (graph shape, publish policy)
  Validation = 3,
  /// At least one task failed or was skipped
  BuildFailed = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for shipyard
#[derive(Debug)]
pub enum YardError {
  /// Configuration errors
  Config(ConfigError),

  /// Task graph construction errors
  Graph(GraphError),

  /// Publishing and signing errors
  Publish(PublishError),

  /// External tool invocation errors
  Tool(ToolError),

  /// The build ran but did not finish cleanly
  BuildFailed { failed: usize, skipped: usize },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl YardError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    YardError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    YardError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      YardError::Message { message, context, help } => YardError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      YardError::Io(e) => YardError::Message {
        message: format!("I/O error: {}", e),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      YardError::Config(_) => ExitCode::User,
      YardError::Graph(_) => ExitCode::Validation,
      YardError::Publish(_) => ExitCode::Validation,
      YardError::Tool(_) => ExitCode::System,
      YardError::BuildFailed { .. } => ExitCode::BuildFailed,
      YardError::Io(_) => ExitCode::System,
      YardError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      YardError::Config(e) => e.help_message(),
      YardError::Graph(e) => e.help_message(),
      YardError::Publish(e) => e.help_message(),
      YardError::Tool(e) => e.help_message(),
      YardError::BuildFailed { .. } => {
        Some("Tasks marked skipped did not run because a predecessor failed. Fix the failed tasks first.".to_string())
      }
      YardError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for YardError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      YardError::Config(e) => write!(f, "{}", e),
      YardError::Graph(e) => write!(f, "{}", e),
      YardError::Publish(e) => write!(f, "{}", e),
      YardError::Tool(e) => write!(f, "{}", e),
      YardError::BuildFailed { failed, skipped } => {
        write!(f, "Build failed: {} task(s) failed, {} task(s) skipped", failed, skipped)
      }
      YardError::Io(e) => write!(f, "I/O error: {}", e),
      YardError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for YardError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      YardError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for YardError {
  fn from(err: io::Error) -> Self {
    YardError::Io(err)
  }
}

impl From<String> for YardError {
  fn from(msg: String) -> Self {
    YardError::message(msg)
  }
}

impl From<&str> for YardError {
  fn from(msg: &str) -> Self {
    YardError::message(msg)
  }
}

impl From<ConfigError> for YardError {
  fn from(err: ConfigError) -> Self {
    YardError::Config(err)
  }
}

impl From<GraphError> for YardError {
  fn from(err: GraphError) -> Self {
    YardError::Graph(err)
  }
}

impl From<PublishError> for YardError {
  fn from(err: PublishError) -> Self {
    YardError::Publish(err)
  }
}

impl From<ToolError> for YardError {
  fn from(err: ToolError) -> Self {
    YardError::Tool(err)
  }
}

impl From<toml_edit::de::Error> for YardError {
  fn from(err: toml_edit::de::Error) -> Self {
    YardError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for YardError {
  fn from(err: serde_json::Error) -> Self {
    YardError::message(format!("JSON error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for YardError {
  fn from(err: std::path::StripPrefixError) -> Self {
    YardError::message(format!("Path strip prefix error: {}", err))
  }
}

impl From<walkdir::Error> for YardError {
  fn from(err: walkdir::Error) -> Self {
    YardError::message(format!("Directory walk error: {}", err))
  }
}

impl From<rayon::ThreadPoolBuildError> for YardError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    YardError::message(format!("Failed to start worker pool: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// shipyard.toml not found
  NotFound { project_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// A cohort names a module that is not declared
  UnknownModule { cohort: String, module: String },

  /// A cohort or treatment names a cohort that is not declared
  UnknownCohort { name: String, referenced_by: String },

  /// Cohorts derive from each other in a loop
  CohortCycle { chain: Vec<String> },

  /// Two modules (or two cohorts) share a name
  Duplicate { kind: &'static str, name: String },

  /// A glob pattern could not be compiled
  InvalidPattern { pattern: String, reason: String },

  /// Two modules resolve to the same module root
  SharedModuleRoot { path: PathBuf, first: String, second: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Create a shipyard.toml at the project root.".to_string()),
      ConfigError::UnknownModule { .. } => {
        Some("Cohort members must match a `[[modules]]` name. Run `shipyard cohorts` to list them.".to_string())
      }
      ConfigError::UnknownCohort { .. } => Some(
        "Declare the cohort under `[[cohorts]]` or use the implicit `all` cohort.".to_string(),
      ),
      ConfigError::CohortCycle { .. } => Some("Break the loop of `from = ...` references.".to_string()),
      ConfigError::SharedModuleRoot { .. } => Some(
        "Give each module its own `path`; modules write build output under their root.".to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { project_root } => {
        write!(
          f,
          "No shipyard configuration found.\nExpected file: {}/shipyard.toml",
          project_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::UnknownModule { cohort, module } => {
        write!(f, "Cohort '{}' references undefined module '{}'", cohort, module)
      }
      ConfigError::UnknownCohort { name, referenced_by } => {
        write!(f, "Unknown cohort '{}' (referenced by {})", name, referenced_by)
      }
      ConfigError::CohortCycle { chain } => {
        write!(f, "Cohort definitions form a cycle: {}", chain.join(" -> "))
      }
      ConfigError::Duplicate { kind, name } => {
        write!(f, "Duplicate {} '{}'", kind, name)
      }
      ConfigError::InvalidPattern { pattern, reason } => {
        write!(f, "Invalid pattern '{}': {}", pattern, reason)
      }
      ConfigError::SharedModuleRoot { path, first, second } => {
        write!(f, "Modules '{}' and '{}' share the module root '{}'", first, second, path.display())
      }
    }
  }
}

/// Task graph errors
#[derive(Debug)]
pub enum GraphError {
  /// Adding an edge (or the graph as a whole) contains a dependency cycle
  Cycle { tasks: Vec<String> },

  /// A task name does not exist in the graph
  UnknownTask { name: String },

  /// Two tasks registered under the same name
  DuplicateTask { name: String },

  /// Two tasks write the same destination without an ordering edge
  SharedOutput { path: PathBuf, first: String, second: String },
}

impl GraphError {
  fn help_message(&self) -> Option<String> {
    match self {
      GraphError::Cycle { .. } => Some("Check the `[[edges]]` entries in shipyard.toml.".to_string()),
      GraphError::UnknownTask { .. } => Some("Run `shipyard plan` to list the available tasks.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for GraphError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GraphError::Cycle { tasks } => {
        write!(f, "Dependency cycle detected: {}", tasks.join(" -> "))
      }
      GraphError::UnknownTask { name } => write!(f, "Task '{}' not found", name),
      GraphError::DuplicateTask { name } => write!(f, "Task '{}' registered twice", name),
      GraphError::SharedOutput { path, first, second } => write!(
        f,
        "Tasks '{}' and '{}' both write {} but are not ordered",
        first,
        second,
        path.display()
      ),
    }
  }
}

/// Publishing and signing errors, raised at the point of use
#[derive(Debug)]
pub enum PublishError {
  /// The resolved repository target has no URL
  TargetUnset { module: String, channel: String },

  /// The credential provider has nothing under this name
  CredentialNotFound { name: String },

  /// Signing is required but no key could be resolved
  SigningKeyMissing { module: String, key: String },
}

impl PublishError {
  fn help_message(&self) -> Option<String> {
    match self {
      PublishError::TargetUnset { .. } => {
        Some("Set `publishing.release_url` / `publishing.prerelease_url` in shipyard.toml.".to_string())
      }
      PublishError::CredentialNotFound { name } => Some(format!(
        "Export {}_USERNAME and {}_PASSWORD (or {} for key material).",
        name, name, name
      )),
      PublishError::SigningKeyMissing { key, .. } => Some(format!("Export {} with the signing key reference.", key)),
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::TargetUnset { module, channel } => {
        write!(f, "Publish target unset for '{}' ({} channel)", module, channel)
      }
      PublishError::CredentialNotFound { name } => write!(f, "Credential '{}' not found", name),
      PublishError::SigningKeyMissing { module, key } => {
        write!(f, "Signing required for '{}' but key '{}' is unavailable", module, key)
      }
    }
  }
}

/// External tool errors (compiler, archiver, doc generator, signer, uploader)
#[derive(Debug)]
pub enum ToolError {
  /// No command configured for a tool
  Missing { tool: String },

  /// The command could not be started
  Spawn { tool: String, program: String, reason: String },

  /// The command exited unsuccessfully
  Failed { tool: String, status: String, stderr: String },
}

impl ToolError {
  fn help_message(&self) -> Option<String> {
    match self {
      ToolError::Missing { tool } => Some(format!("Configure `tools.{}` in shipyard.toml.", tool)),
      ToolError::Spawn { program, .. } => Some(format!("Check that '{}' is installed and on PATH.", program)),
      ToolError::Failed { .. } => None,
    }
  }
}

impl fmt::Display for ToolError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ToolError::Missing { tool } => write!(f, "No command configured for tool '{}'", tool),
      ToolError::Spawn { tool, program, reason } => {
        write!(f, "Failed to start '{}' for tool '{}': {}", program, tool, reason)
      }
      ToolError::Failed { tool, status, stderr } => {
        write!(f, "Tool '{}' failed ({})", tool, status)?;
        if !stderr.is_empty() {
          write!(f, "\n{}", stderr.trim_end())?;
        }
        Ok(())
      }
    }
  }
}

/// Result type alias for shipyard
pub type YardResult<T> = Result<T, YardError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> YardResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> YardResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<YardError>,
{
  fn context(self, ctx: impl Into<String>) -> YardResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> YardResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &YardError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

impl From<anyhow::Error> for YardError {
  fn from(err: anyhow::Error) -> Self {
    YardError::message(err.to_string())
  }
}
