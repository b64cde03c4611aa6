//! Integration tests for the shipyard CLI

mod helpers;
mod test_channel;
mod test_docs;
mod test_dist;
mod test_plan;
mod test_run;
