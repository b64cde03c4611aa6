//! Task graph construction and execution
//!
//! Built on petgraph with our own domain types: tasks, actions and the cohort-driven wiring
//! that turns a `BuildContext` into a DAG the executor can walk.

pub mod builder;
pub mod executor;
pub mod task_graph;

pub use builder::{BuildPlan, build_plan};
pub use executor::{ActionHandler, ExecutionReport, Executor};
pub use task_graph::{Task, TaskAction, TaskGraph};
