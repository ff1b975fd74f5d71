//! Subcommand implementations

pub mod common;
pub mod list;
pub mod route;
pub mod run;
