pub mod cli;
pub mod config;
pub mod flock;
pub mod git;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod resolver;
pub mod tags;
pub mod version;

mod api;

pub use api::{Cpkg, CpkgBuilder, TidyMode};
