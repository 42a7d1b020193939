//! Shared plumbing for the workspace: logging setup, Prometheus metrics and
//! small wire types used by more than one crate.

pub mod types;
pub mod utils;
pub mod metrics;
