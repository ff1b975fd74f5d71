//! Helpers shared by the run and list commands.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::cli::{ExecutionArgs, InputArgs};
use crate::config::GateConfig;
use crate::pipeline::{DocumentSource, RunRequest};
use crate::router::matcher::parse_keywords;
use crate::variables::parse_override;

/// Build a run request from CLI input. Flags win over the config file.
pub fn build_request(input: &InputArgs, execution: &ExecutionArgs) -> Result<RunRequest> {
    let config = GateConfig::load(input.config.as_deref(), &input.project)?;

    let source = match &input.entry {
        Some(entry) => DocumentSource::Entry(entry.clone()),
        None => DocumentSource::Explicit(input.doc.clone()),
    };

    let mut overrides = BTreeMap::new();
    for raw in &input.var {
        let (name, value) = parse_override(raw).map_err(|e| anyhow!("invalid --var '{raw}': {e}"))?;
        overrides.insert(name, value);
    }

    let mut request = RunRequest::new(source, &input.project, config)
        .with_keywords(parse_keywords(&input.task))
        .with_overrides(overrides);

    if let Some(mode) = execution.mode {
        request = request.with_mode(mode);
    }
    if let Some(secs) = execution.timeout {
        request.executor = request.executor.with_timeout(Duration::from_secs(secs));
    }
    if let Some(jobs) = execution.jobs {
        let jobs = usize::try_from(jobs).map_err(|_| anyhow!("--jobs {jobs} is too large"))?;
        request.executor = request.executor.with_max_parallel(jobs);
    }
    if let Some(retries) = execution.retries {
        request.executor = request.executor.with_retries(retries);
    }
    Ok(request)
}

/// Shorten a string to `max` characters for table output
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
