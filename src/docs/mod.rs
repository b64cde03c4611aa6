//! API documentation: per-module inputs and the cross-module aggregate

pub mod aggregator;

pub use aggregator::{DocAggregator, DocInputs, prepare_destination};
