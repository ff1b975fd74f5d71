//! Compliance gate for verification blocks embedded in guidance documents.
//!
//! A run routes from an entry document to the documents relevant to a task,
//! extracts their `<verification-block>`s, resolves template variables, runs
//! the tests in dependency order and reports a pass/fail decision.
//!
//! ```no_run
//! use gatecheck::config::GateConfig;
//! use gatecheck::pipeline::{DocumentSource, GateRun, RunRequest};
//!
//! let request = RunRequest::new(DocumentSource::Entry("AGENTS.md".into()), ".", GateConfig::default())
//!     .with_keywords(vec!["database".to_string()]);
//! let report = GateRun::execute(request)?;
//! std::process::exit(report.exit_code);
//! # Ok::<(), gatecheck::error::GateError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod completions;
pub mod config;
pub mod document;
pub mod error;
pub mod executor;
pub mod extract;
pub mod graph;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod router;
pub mod variables;
