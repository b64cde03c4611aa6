//! CLI commands for shipyard
//!
//! ## Inspection
//! - **plan**: Wired task graph in topological order, with a fingerprint
//! - **cohorts**: Cohort membership and treatment assignment
//! - **channel**: Version channel, repository target and signing policy
//! - **descriptor**: Bundle metadata for one module
//! - **docs**: Aggregated documentation inputs
//!
//! ## Execution
//! - **run**: Execute the task graph (dry run unless `--apply`)
//! - **dist**: Preview or assemble the distribution archive
//!
//! All commands accept `&BuildContext` so configuration and cohorts load once.

pub mod channel;
pub mod cohorts;
pub mod descriptor;
pub mod dist;
pub mod docs;
pub mod plan;
pub mod run;

pub use channel::run_channel;
pub use cohorts::run_cohorts;
pub use descriptor::run_descriptor;
pub use dist::run_dist;
pub use docs::run_docs;
pub use plan::run_plan;
pub use run::{RunOptions, run_run};
