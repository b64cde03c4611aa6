//! Task actions backed by configured tools and native file operations
//!
//! Compilation, archiving, documentation rendering, signing and remote uploads go through
//! `ToolRunner`; runtime collection, local repository publishing and distribution assembly
//! are done natively.

use crate::bundle::BundleDescriptor;
use crate::core::context::{BuildContext, Module};
use crate::core::credentials::CredentialProvider;
use crate::core::error::{ResultExt, YardError, YardResult};
use crate::core::tools::{Tool, ToolRunner, ToolVars};
use crate::dist::packager;
use crate::docs::{DocAggregator, DocInputs, prepare_destination};
use crate::graph::builder::BuildPlan;
use crate::graph::executor::ActionHandler;
use crate::graph::task_graph::{Task, TaskAction};
use crate::release::publication::{Publication, Publisher};
use crate::release::signing::{CommandSigner, sign_publication};
use std::fs;
use std::path::{Path, PathBuf};

/// Executes tasks of one build plan
pub struct ToolchainActions<'a> {
  ctx: &'a BuildContext,
  plan: &'a BuildPlan,
  tools: ToolRunner,
  credentials: &'a dyn CredentialProvider,
}

impl<'a> ToolchainActions<'a> {
  pub fn new(ctx: &'a BuildContext, plan: &'a BuildPlan, credentials: &'a dyn CredentialProvider) -> Self {
    Self {
      ctx,
      plan,
      tools: ToolRunner::new(&ctx.root, &ctx.config.tools),
      credentials,
    }
  }

  fn module(&self, task: &Task) -> YardResult<&'a Module> {
    task
      .module
      .as_deref()
      .and_then(|name| self.ctx.module(name))
      .ok_or_else(|| YardError::message(format!("Task '{}' has no owning module", task.name)))
  }

  fn publication(&self, module: &Module) -> YardResult<&'a Publication> {
    self
      .plan
      .publication(&module.name)
      .ok_or_else(|| YardError::message(format!("No publication for module '{}'", module.name)))
  }

  fn extension(&self) -> &str {
    &self.ctx.config.project.artifact_extension
  }

  fn module_vars(&self, module: &Module) -> ToolVars {
    ToolVars::new()
      .set("project", self.ctx.project_name())
      .set("module", &module.name)
      .set("identifier", &module.identifier)
      .set("version", &module.version)
      .set_path("module_dir", &module.root)
  }

  fn compile(&self, module: &Module) -> YardResult<()> {
    let output = module.classes_dir();
    create_dir(&output)?;
    let vars = self
      .module_vars(module)
      .set("sources", path_list(&module.source_roots)?)
      .set("classpath", path_list(&module.classpath)?)
      .set_path("output", &output);
    self.tools.run(Tool::Compile, &vars)
  }

  fn package(&self, module: &Module) -> YardResult<()> {
    let descriptor = BundleDescriptor::generate(module);
    let manifest = module.manifest_path();
    descriptor.write_manifest(&manifest)?;

    let output = module.artifact(self.extension(), None);
    create_parent(&output)?;
    let vars = self
      .module_vars(module)
      .set_path("input", &module.classes_dir())
      .set_path("manifest", &manifest)
      .set_path("output", &output);
    self.tools.run(Tool::Package, &vars)
  }

  fn archive(&self, module: &Module, inputs: &[PathBuf], output: &Path) -> YardResult<()> {
    create_parent(output)?;
    let vars = self
      .module_vars(module)
      .set("input", path_list(inputs)?)
      .set_path("output", output);
    self.tools.run(Tool::Archive, &vars)
  }

  fn render_docs(&self, label: &str, inputs: &DocInputs, destination: &Path, argfile: &Path) -> YardResult<()> {
    prepare_destination(destination)?;
    inputs.write_argfile(destination, argfile)?;
    if inputs.sources.is_empty() {
      tracing::warn!(task = label, "no documentation sources after filtering; output left empty");
      return Ok(());
    }
    let vars = ToolVars::new()
      .set("project", self.ctx.project_name())
      .set("version", self.ctx.version())
      .set("title", label)
      .set_path("destination", destination)
      .set_path("argfile", argfile);
    self.tools.run(Tool::Docs, &vars)
  }

  fn module_docs(&self, module: &Module) -> YardResult<()> {
    let aggregator = DocAggregator::new(&self.ctx.root, &self.ctx.config.docs)?;
    let inputs = aggregator.collect(&[module])?;
    let argfile = module.build_dir().join("tmp").join("docs.args");
    self.render_docs(&module.name, &inputs, &module.docs_dir(), &argfile)
  }

  fn aggregate_docs(&self) -> YardResult<()> {
    let modules = self.ctx.modules_in(&self.ctx.config.treatments.docs)?;
    let aggregator = DocAggregator::new(&self.ctx.root, &self.ctx.config.docs)?;
    let inputs = aggregator.collect(&modules)?;
    let argfile = self.ctx.root.join("build").join("tmp").join("docs-all.args");
    self.render_docs(self.ctx.project_name(), &inputs, &self.ctx.docs_destination(), &argfile)
  }

  fn collect_runtime(&self, module: &Module, into: &Path) -> YardResult<()> {
    create_dir(into)?;
    let primary = module.artifact(self.extension(), None);
    for file in module.runtime_classpath.iter().chain(std::iter::once(&primary)) {
      let name = file
        .file_name()
        .ok_or_else(|| YardError::message(format!("Invalid runtime entry {}", file.display())))?;
      fs::copy(file, into.join(name))
        .with_context(|| format!("Failed to copy runtime dependency {}", file.display()))?;
    }
    Ok(())
  }

  fn release_staging(&self) -> YardResult<()> {
    let publishing = &self.ctx.config.publishing;
    let mut vars = ToolVars::new()
      .set("project", self.ctx.project_name())
      .set("version", self.ctx.version())
      .set("profile", publishing.staging_profile.clone().unwrap_or_default())
      .set("url", &self.ctx.channel.target.url);
    if let Some(name) = &self.ctx.channel.target.credentials {
      let pair = self.credentials.user_password(name)?;
      vars = vars.secret("username", pair.username.clone()).secret("password", pair.password());
    }
    self.tools.run(Tool::ReleaseStaging, &vars)
  }
}

impl ActionHandler for ToolchainActions<'_> {
  fn execute(&self, task: &Task) -> YardResult<()> {
    tracing::debug!(task = %task.name, action = ?task.action, "executing");
    match &task.action {
      TaskAction::Compile => self.compile(self.module(task)?),
      TaskAction::Package => self.package(self.module(task)?),
      TaskAction::SourcesArchive => {
        let module = self.module(task)?;
        let roots: Vec<PathBuf> = module.source_roots.iter().filter(|r| r.is_dir()).cloned().collect();
        let output = module.artifact(self.extension(), Some(crate::release::publication::SOURCES_CLASSIFIER));
        self.archive(module, &roots, &output)
      }
      TaskAction::ModuleDocs => self.module_docs(self.module(task)?),
      TaskAction::DocsArchive => {
        let module = self.module(task)?;
        let output = module.artifact(self.extension(), Some(crate::release::publication::DOCS_CLASSIFIER));
        self.archive(module, &[module.docs_dir()], &output)
      }
      TaskAction::CollectRuntime { into } => self.collect_runtime(self.module(task)?, into),
      TaskAction::Lifecycle => Ok(()),
      TaskAction::GenerateDocs => self.aggregate_docs(),
      TaskAction::Sign => {
        let publication = self.publication(self.module(task)?)?;
        let signer = CommandSigner::new(&self.tools);
        let signatures = sign_publication(publication, self.credentials, &signer)?;
        tracing::debug!(module = %publication.module, count = signatures.len(), "signatures written");
        Ok(())
      }
      TaskAction::Publish => {
        let publication = self.publication(self.module(task)?)?;
        Publisher::new(&self.ctx.root, &self.tools, self.credentials).publish(publication)
      }
      TaskAction::ReleaseStaging => self.release_staging(),
      TaskAction::Distribute => packager::assemble(&self.plan.distribution).map(|_| ()),
    }
  }
}

/// Join paths with the platform separator
fn path_list(paths: &[PathBuf]) -> YardResult<String> {
  let joined = std::env::join_paths(paths).map_err(|e| YardError::message(format!("Invalid path list: {}", e)))?;
  Ok(joined.to_string_lossy().to_string())
}

fn create_dir(path: &Path) -> YardResult<()> {
  fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn create_parent(path: &Path) -> YardResult<()> {
  match path.parent() {
    Some(parent) => create_dir(parent),
    None => Ok(()),
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::core::config::ShipyardConfig;
  use crate::core::credentials::testing::StaticCredentials;
  use crate::graph::builder::build_plan;
  use crate::graph::executor::Executor;

  const CONFIG: &str = r#"
[project]
name = "demo"
group = "com.example"
version = "1.0.0"

[[modules]]
name = "core"
path = "core"
runtime_classpath = ["lib/dep.jar"]

[tools]
compile = ["sh", "-c", "touch {output}/Api.class"]
package = ["sh", "-c", "cp {manifest} {output}"]
"#;

  fn setup() -> (tempfile::TempDir, BuildContext) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("core/src/main/java/com/example")).unwrap();
    fs::write(dir.path().join("core/src/main/java/com/example/Api.java"), "class Api {}").unwrap();
    fs::create_dir_all(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/dep.jar"), "dep").unwrap();
    let ctx = BuildContext::from_config(dir.path(), ShipyardConfig::parse(CONFIG).unwrap()).unwrap();
    (dir, ctx)
  }

  #[test]
  fn test_package_writes_descriptor_and_collects_runtime() {
    let (dir, ctx) = setup();
    let plan = build_plan(&ctx).unwrap();
    let credentials = StaticCredentials::default();
    let actions = ToolchainActions::new(&ctx, &plan, &credentials);

    let report = Executor::new(&plan.graph)
      .run(&["core:build".to_string()], &actions)
      .unwrap();
    assert!(report.is_success(), "{:?}", report.failed);

    let primary = dir.path().join("core/build/libs/core-1.0.0.jar");
    assert!(fs::read_to_string(&primary).unwrap().contains("Bundle-SymbolicName: com.example.core"));
    assert!(dir.path().join("core/build/libs-all/dep.jar").is_file());
    assert!(dir.path().join("core/build/libs-all/core-1.0.0.jar").is_file());
  }

  #[test]
  fn test_missing_tool_fails_task_and_skips_dependents() {
    let (_dir, ctx) = setup();
    let plan = build_plan(&ctx).unwrap();
    let credentials = StaticCredentials::default();
    let actions = ToolchainActions::new(&ctx, &plan, &credentials);

    let report = Executor::new(&plan.graph).run(&[], &actions).unwrap();
    let failed: Vec<_> = report.failed.iter().map(|f| f.name.as_str()).collect();
    assert!(failed.contains(&"core:sourcesArchive"));
    assert!(report.skipped.contains(&"core:publish".to_string()));
    assert!(report.skipped.contains(&"dist".to_string()));
    assert!(report.done.contains(&"core:build".to_string()));
  }
}
