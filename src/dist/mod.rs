//! Distribution packaging
//!
//! - **manifest**: include/exclude rules, destination layouts and upstream task list
//! - **packager**: deterministic gzip tar assembly plus checksum

pub mod manifest;
pub mod packager;

pub use manifest::{DistributionManifest, PathRule};
pub use packager::{PackageReport, assemble};
