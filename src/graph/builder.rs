//! Cohort-driven task graph wiring
//!
//! Each configuration treatment is a plain function applied once to every member of the
//! cohort mapped to it in `[treatments]`:
//!
//! - **build**: `compile → package → collectRuntime → build` plus `sourcesArchive` and
//!   `moduleDocs → docsArchive`
//! - **docs**: the module's sources feed the global `docsAll` task
//! - **repository**: the publication is bound to the channel target; `sign` (when signing
//!   applies) and `publish`
//! - **distribution**: the global `dist` task waits for the module's `build`
//!
//! User edges from `[[edges]]` are added last, then tasks with equal or nested outputs are ordered and
//! the whole graph is validated.

use crate::core::config::TreatmentConfig;
use crate::core::context::{BuildContext, Module};
use crate::core::error::{YardError, YardResult};
use crate::dist::manifest::DistributionManifest;
use crate::graph::task_graph::{Task, TaskAction, TaskGraph, task_name};
use crate::release::channel::Channel;
use crate::release::publication::Publication;
use std::collections::HashMap;

pub const COMPILE: &str = "compile";
pub const PACKAGE: &str = "package";
pub const SOURCES_ARCHIVE: &str = "sourcesArchive";
pub const MODULE_DOCS: &str = "moduleDocs";
pub const DOCS_ARCHIVE: &str = "docsArchive";
pub const COLLECT_RUNTIME: &str = "collectRuntime";
pub const BUILD: &str = "build";
pub const SIGN: &str = "sign";
pub const PUBLISH: &str = "publish";
pub const DOCS_ALL: &str = "docsAll";
pub const DIST: &str = "dist";
pub const RELEASE_STAGING: &str = "closeAndReleaseRepository";

/// A configuration treatment applied to the members of one cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
  Build,
  Docs,
  Repository,
  Distribution,
}

impl Treatment {
  /// Application order; later treatments wire onto tasks created by `Build`
  pub const ORDER: [Treatment; 4] = [
    Treatment::Build,
    Treatment::Docs,
    Treatment::Repository,
    Treatment::Distribution,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Treatment::Build => "build",
      Treatment::Docs => "docs",
      Treatment::Repository => "repository",
      Treatment::Distribution => "distribution",
    }
  }

  pub fn cohort(self, treatments: &TreatmentConfig) -> &str {
    match self {
      Treatment::Build => &treatments.build,
      Treatment::Docs => &treatments.docs,
      Treatment::Repository => &treatments.repository,
      Treatment::Distribution => &treatments.distribution,
    }
  }

  fn apply(self, wiring: &mut Wiring<'_>, module: &Module) -> YardResult<()> {
    match self {
      Treatment::Build => apply_build(wiring, module),
      Treatment::Docs => apply_docs(wiring, module),
      Treatment::Repository => apply_repository(wiring, module),
      Treatment::Distribution => apply_distribution(wiring, module),
    }
  }
}

/// The wired graph plus the entities created alongside it
#[derive(Debug)]
pub struct BuildPlan {
  pub graph: TaskGraph,
  /// One per module, in declaration order
  pub publications: Vec<Publication>,
  pub distribution: DistributionManifest,
}

impl BuildPlan {
  pub fn publication(&self, module: &str) -> Option<&Publication> {
    self.publications.iter().find(|p| p.module == module)
  }
}

struct Wiring<'c> {
  ctx: &'c BuildContext,
  graph: TaskGraph,
  publications: HashMap<String, Publication>,
}

impl Wiring<'_> {
  fn add(&mut self, task: Task, predecessors: &[String]) -> YardResult<()> {
    let name = task.name.clone();
    self.graph.add_task(task)?;
    for predecessor in predecessors {
      self.graph.depends_on(&name, predecessor)?;
    }
    Ok(())
  }

  /// Later treatments need the module's build chain
  fn require_build(&self, module: &Module, treatment: Treatment) -> YardResult<()> {
    if self.graph.contains(&task_name(&module.name, BUILD)) {
      return Ok(());
    }
    let treatments = &self.ctx.config.treatments;
    Err(YardError::with_help(
      format!(
        "Module '{}' receives the {} treatment (cohort '{}') but is not in the build cohort '{}'",
        module.name,
        treatment.name(),
        treatment.cohort(treatments),
        treatments.build
      ),
      "Every module that is documented, published or distributed must also be built",
    ))
  }
}

fn apply_build(wiring: &mut Wiring<'_>, module: &Module) -> YardResult<()> {
  let name = module.name.as_str();
  let ext = wiring.ctx.config.project.artifact_extension.clone();
  let t = |task: &str| task_name(name, task);

  wiring.add(
    Task::module_task(name, COMPILE, TaskAction::Compile, "Compile sources").with_output(module.classes_dir()),
    &[],
  )?;
  wiring.add(
    Task::module_task(name, PACKAGE, TaskAction::Package, "Package the primary archive with bundle metadata")
      .with_output(module.artifact(&ext, None)),
    &[t(COMPILE)],
  )?;
  wiring.add(
    Task::module_task(name, SOURCES_ARCHIVE, TaskAction::SourcesArchive, "Archive the source roots")
      .with_output(module.artifact(&ext, Some(crate::release::publication::SOURCES_CLASSIFIER))),
    &[],
  )?;
  wiring.add(
    Task::module_task(name, MODULE_DOCS, TaskAction::ModuleDocs, "Generate module API documentation")
      .with_output(module.docs_dir()),
    &[t(COMPILE)],
  )?;
  wiring.add(
    Task::module_task(name, DOCS_ARCHIVE, TaskAction::DocsArchive, "Archive the module documentation")
      .with_output(module.artifact(&ext, Some(crate::release::publication::DOCS_CLASSIFIER))),
    &[t(MODULE_DOCS)],
  )?;

  let into = if wiring.ctx.config.project.copy_to_root {
    wiring.ctx.shared_libs_dir()
  } else {
    module.build_dir().join("libs-all")
  };
  wiring.add(
    Task::module_task(
      name,
      COLLECT_RUNTIME,
      TaskAction::CollectRuntime { into: into.clone() },
      "Collect runtime dependencies next to the primary archive",
    )
    .with_output(into),
    &[t(PACKAGE)],
  )?;
  wiring.add(
    Task::module_task(name, BUILD, TaskAction::Lifecycle, "Assemble the module"),
    &[t(PACKAGE), t(COLLECT_RUNTIME)],
  )?;
  Ok(())
}

fn apply_docs(wiring: &mut Wiring<'_>, module: &Module) -> YardResult<()> {
  wiring.require_build(module, Treatment::Docs)?;
  wiring.graph.depends_on(DOCS_ALL, &task_name(&module.name, COMPILE))
}

fn apply_repository(wiring: &mut Wiring<'_>, module: &Module) -> YardResult<()> {
  wiring.require_build(module, Treatment::Repository)?;
  let name = module.name.as_str();
  let publication = Publication::new(wiring.ctx, module, true);

  let mut predecessors = vec![
    task_name(name, PACKAGE),
    task_name(name, SOURCES_ARCHIVE),
    task_name(name, DOCS_ARCHIVE),
  ];
  if publication.signing_key().is_some() {
    wiring.add(
      Task::module_task(name, SIGN, TaskAction::Sign, "Sign the publication artifacts"),
      &predecessors,
    )?;
    predecessors.push(task_name(name, SIGN));
  }

  let description = format!("Publish to the {} repository", wiring.ctx.channel.channel);
  wiring.add(
    Task::module_task(name, PUBLISH, TaskAction::Publish, description),
    &predecessors,
  )?;
  wiring.publications.insert(name.to_string(), publication);
  Ok(())
}

fn apply_distribution(wiring: &mut Wiring<'_>, module: &Module) -> YardResult<()> {
  wiring.require_build(module, Treatment::Distribution)?;
  wiring.graph.depends_on(DIST, &task_name(&module.name, BUILD))
}

/// Build the complete task graph for a context
pub fn build_plan(ctx: &BuildContext) -> YardResult<BuildPlan> {
  let mut wiring = Wiring {
    ctx,
    graph: TaskGraph::new(),
    publications: HashMap::new(),
  };

  let config = &ctx.config;
  let archive_name = crate::dist::manifest::archive_name(ctx.project_name(), ctx.version(), &config.distribution.extension);

  wiring.add(
    Task::global(DOCS_ALL, TaskAction::GenerateDocs, "Generate aggregated API documentation")
      .with_output(ctx.docs_destination()),
    &[],
  )?;
  wiring.add(
    Task::global(DIST, TaskAction::Distribute, "Assemble the distribution archive")
      .with_output(ctx.root.join(&config.distribution.output_dir).join(&archive_name)),
    &[DOCS_ALL.to_string()],
  )?;

  for treatment in Treatment::ORDER {
    let cohort = treatment.cohort(&config.treatments);
    for module in ctx.modules_in(cohort)? {
      tracing::debug!(treatment = treatment.name(), cohort, module = %module.name, "applying treatment");
      treatment.apply(&mut wiring, module)?;
    }
  }

  let publish_tasks: Vec<String> = ctx
    .modules
    .iter()
    .map(|m| task_name(&m.name, PUBLISH))
    .filter(|t| wiring.graph.contains(t))
    .collect();
  if ctx.channel.channel == Channel::Release && config.publishing.staging_profile.is_some() && !publish_tasks.is_empty()
  {
    wiring.add(
      Task::global(
        RELEASE_STAGING,
        TaskAction::ReleaseStaging,
        "Close and release the staging repository",
      ),
      &publish_tasks,
    )?;
  }

  for edge in &config.edges {
    for predecessor in &edge.depends_on {
      wiring.graph.depends_on(&edge.task, predecessor)?;
    }
  }

  wiring.graph.serialize_shared_outputs()?;
  wiring.graph.validate()?;

  let distribution = DistributionManifest::from_config(
    &ctx.root,
    ctx.project_name(),
    ctx.version(),
    &config.distribution,
    &ctx.docs_destination(),
    wiring.graph.predecessors(DIST)?,
  )?;

  let mut publications = wiring.publications;
  let publications = ctx
    .modules
    .iter()
    .map(|m| {
      publications
        .remove(&m.name)
        .unwrap_or_else(|| Publication::new(ctx, m, false))
    })
    .collect();

  Ok(BuildPlan {
    graph: wiring.graph,
    publications,
    distribution,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::ShipyardConfig;
  use crate::core::error::GraphError;
  use std::path::Path;

  const BASE: &str = r#"
[project]
name = "demo"
group = "com.example"
version = "1.0.0"

[[modules]]
name = "core"
path = "core"

[[modules]]
name = "client"
path = "client"

[[modules]]
name = "app-demo"
path = "app-demo"
"#;

  fn plan(extra: &str) -> YardResult<BuildPlan> {
    let config = ShipyardConfig::parse(&format!("{}\n{}", BASE, extra))?;
    let ctx = BuildContext::from_config(Path::new("/work"), config)?;
    build_plan(&ctx)
  }

  fn preds(plan: &BuildPlan, task: &str) -> Vec<String> {
    plan.graph.predecessors(task).unwrap()
  }

  #[test]
  fn test_standard_module_chain() {
    let plan = plan("").unwrap();
    assert_eq!(preds(&plan, "core:package"), vec!["core:compile"]);
    assert_eq!(preds(&plan, "core:collectRuntime"), vec!["core:package"]);
    assert_eq!(preds(&plan, "core:build"), vec!["core:package", "core:collectRuntime"]);
    assert_eq!(preds(&plan, "core:docsArchive"), vec!["core:moduleDocs"]);
  }

  #[test]
  fn test_dist_waits_for_distribution_cohort_and_docs() {
    let plan = plan(
      r#"
[[cohorts]]
name = "shipped"
modules = ["core", "client"]

[treatments]
distribution = "shipped"
"#,
    )
    .unwrap();
    assert_eq!(preds(&plan, DIST), vec!["docsAll", "core:build", "client:build"]);
    assert_eq!(plan.distribution.depends_on, preds(&plan, DIST));
    assert_eq!(plan.distribution.archive_name, "demo-1.0.0.tgz");
  }

  #[test]
  fn test_docs_all_depends_on_docs_cohort_compiles() {
    let plan = plan(
      r#"
[[cohorts]]
name = "documented"
pattern = "c*"

[treatments]
docs = "documented"
"#,
    )
    .unwrap();
    assert_eq!(preds(&plan, DOCS_ALL), vec!["core:compile", "client:compile"]);
  }

  #[test]
  fn test_repository_cohort_controls_publications() {
    let plan = plan(
      r#"
[[cohorts]]
name = "published"
modules = ["core"]

[treatments]
repository = "published"
"#,
    )
    .unwrap();
    assert!(plan.graph.contains("core:publish"));
    assert!(!plan.graph.contains("client:publish"));
    assert!(!plan.graph.contains("core:sign"));
    assert_eq!(plan.publication("core").unwrap().status(), "signing-skipped");
    assert_eq!(plan.publication("client").unwrap().status(), "publish-disabled");
    assert_eq!(
      preds(&plan, "core:publish"),
      vec!["core:package", "core:sourcesArchive", "core:docsArchive"]
    );
  }

  #[test]
  fn test_sign_task_only_with_global_flag() {
    let plan = plan("[publishing]\nsign = true\n").unwrap();
    for module in ["core", "client", "app-demo"] {
      assert!(plan.graph.contains(&task_name(module, SIGN)));
      assert!(preds(&plan, &task_name(module, PUBLISH)).contains(&task_name(module, SIGN)));
    }
  }

  #[test]
  fn test_release_staging_only_for_release_channel() {
    let staging = "[publishing]\nstaging_profile = \"com.example\"\n";
    let release = plan(staging).unwrap();
    assert_eq!(
      preds(&release, RELEASE_STAGING),
      vec!["core:publish", "client:publish", "app-demo:publish"]
    );

    let config = ShipyardConfig::parse(&format!("{}\n{}", BASE.replace("1.0.0", "1.1.0-SNAPSHOT"), staging)).unwrap();
    let ctx = BuildContext::from_config(Path::new("/work"), config).unwrap();
    assert!(!build_plan(&ctx).unwrap().graph.contains(RELEASE_STAGING));
  }

  #[test]
  fn test_user_edge_cycle_is_fatal() {
    let err = plan(
      r#"
[[edges]]
task = "core:compile"
depends_on = ["core:build"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, YardError::Graph(GraphError::Cycle { .. })));
  }

  #[test]
  fn test_user_edge_across_modules() {
    let plan = plan(
      r#"
[[edges]]
task = "client:compile"
depends_on = ["core:package"]
"#,
    )
    .unwrap();
    assert_eq!(preds(&plan, "client:compile"), vec!["core:package"]);
  }

  #[test]
  fn test_copy_to_root_serialises_collection() {
    let plan = plan("").unwrap();
    assert!(!plan.graph.is_ordered("core:collectRuntime", "client:collectRuntime").unwrap());

    let config = ShipyardConfig::parse(&BASE.replace("version = \"1.0.0\"", "version = \"1.0.0\"\ncopy_to_root = true")).unwrap();
    let ctx = BuildContext::from_config(Path::new("/work"), config).unwrap();
    let shared = build_plan(&ctx).unwrap();
    assert!(shared.graph.is_ordered("core:collectRuntime", "client:collectRuntime").unwrap());
    assert!(shared.graph.is_ordered("client:collectRuntime", "app-demo:collectRuntime").unwrap());
  }

  #[test]
  fn test_docs_destination_enclosing_module_docs_is_ordered() {
    let config = ShipyardConfig::parse(
      r#"
[project]
name = "demo"
version = "1.0.0"

[[modules]]
name = "core"

[docs]
destination = "build/docs"
"#,
    )
    .unwrap();
    let ctx = BuildContext::from_config(Path::new("/work"), config).unwrap();
    let plan = build_plan(&ctx).unwrap();

    assert_eq!(preds(&plan, "core:moduleDocs"), vec![DOCS_ALL, "core:compile"]);
    assert!(plan.graph.is_ordered(DOCS_ALL, "core:docsArchive").unwrap());
    plan.graph.validate().unwrap();
  }

  #[test]
  fn test_distribution_requires_build() {
    let err = plan(
      r#"
[[cohorts]]
name = "libs"
modules = ["core"]

[treatments]
build = "libs"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("not in the build cohort"));
  }

  #[test]
  fn test_graph_is_acyclic_for_every_module_set() {
    for extra in ["", "[publishing]\nsign = true\nstaging_profile = \"x\"\n"] {
      let plan = plan(extra).unwrap();
      assert_eq!(plan.graph.topological_order().unwrap().len(), plan.graph.len());
    }
  }
}
