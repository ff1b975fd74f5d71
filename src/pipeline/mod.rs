//! One gate run, end to end: route, extract, resolve, execute, report.

pub mod state;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::{GateConfig, CONFIG_FILE_NAME};
use crate::document::{BlockScanner, Document};
use crate::error::{GateError, Location};
use crate::executor::{ExecutorConfig, Scheduler};
use crate::extract::{CacheStats, Extractor};
use crate::graph::TestGraph;
use crate::models::{PlannedTest, TestDefinition, TestId, VerificationBlock};
use crate::policy::CommandPolicy;
use crate::report::{GateMode, Report};
use crate::router::{display_path, explicit_documents, Router};
use crate::variables::{
    ProfileDefaults, ProjectIntrospection, ProjectIntrospector, Variable, VariableResolver,
};

pub use state::{PhaseTracker, RunPhase};

/// Where the documents of a batch come from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Route from an entry document using the task keywords
    Entry(PathBuf),
    /// Fixed list of paths or glob patterns, no routing
    Explicit(Vec<String>),
}

/// Everything a run needs. Build it with [`RunRequest::new`], which applies
/// the `[run]` table of the config, then override individual fields.
pub struct RunRequest {
    pub source: DocumentSource,
    pub keywords: Vec<String>,
    pub mode: GateMode,
    pub project_root: PathBuf,
    pub overrides: BTreeMap<String, String>,
    pub config: GateConfig,
    pub executor: ExecutorConfig,
    /// Replaces manifest-based detection when set
    pub introspection: Option<Box<dyn ProjectIntrospection>>,
}

impl RunRequest {
    pub fn new(source: DocumentSource, project_root: impl Into<PathBuf>, config: GateConfig) -> Self {
        let mut executor = ExecutorConfig::default();
        if let Some(secs) = config.run.timeout_secs {
            executor = executor.with_timeout(std::time::Duration::from_secs(secs));
        }
        if let Some(jobs) = config.run.max_parallel {
            executor = executor.with_max_parallel(jobs);
        }
        if let Some(retries) = config.run.retries {
            executor = executor.with_retries(retries);
        }
        Self {
            source,
            keywords: Vec::new(),
            mode: config.run.mode.unwrap_or_default(),
            project_root: project_root.into(),
            overrides: BTreeMap::new(),
            config,
            executor,
            introspection: None,
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_mode(mut self, mode: GateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_introspection(mut self, introspection: Box<dyn ProjectIntrospection>) -> Self {
        self.introspection = Some(introspection);
        self
    }
}

/// Ordered, rendered tests of a batch, before anything runs
#[derive(Debug, Serialize)]
pub struct Plan {
    pub documents: Vec<String>,
    pub cache: CacheStats,
    /// In topological order
    pub tests: Vec<PlannedTest>,
    pub variables: Vec<Variable>,
    #[serde(skip)]
    pub graph: TestGraph,
}

#[derive(Debug, Default)]
pub struct GateRun {
    phase: PhaseTracker,
}

impl GateRun {
    /// Perform one full run.
    pub fn execute(request: RunRequest) -> Result<Report, GateError> {
        let mut run = GateRun::default();
        let mode = request.mode;
        let root = canonical_root(&request.project_root)?;
        let executor = request.executor.clone();
        let plan = run.prepare(request, &root)?;

        run.phase.advance(RunPhase::Executing)?;
        let outcome = Scheduler::new(&plan.tests, &plan.graph, &root, &executor).run();
        if outcome.halted_by.is_some() {
            run.phase.advance(RunPhase::Halted)?;
        }

        let report = Report::new(mode, outcome.results, outcome.halted_by, plan.documents, plan.cache);
        run.phase.advance(RunPhase::Reported)?;
        info!(
            decision = ?report.decision,
            exit_code = report.exit_code,
            pass = report.summary.pass,
            fail = report.summary.fail,
            skipped = report.summary.skipped,
            blocked = report.summary.blocked,
            "gate run finished"
        );
        Ok(report)
    }

    /// Stop after resolution and return the test plan without executing it.
    pub fn plan(request: RunRequest) -> Result<Plan, GateError> {
        let mut run = GateRun::default();
        let root = canonical_root(&request.project_root)?;
        run.prepare(request, &root)
    }

    pub fn phase(&self) -> RunPhase {
        self.phase.current()
    }

    fn prepare(&mut self, request: RunRequest, root: &Path) -> Result<Plan, GateError> {
        info!(mode = ?request.mode, keywords = ?request.keywords, "gate run starting");
        self.phase.advance(RunPhase::Extracting)?;

        let scanner = BlockScanner::new();
        let policy = CommandPolicy::new(&request.config.policy).map_err(|message| GateError::Config {
            path: PathBuf::from(CONFIG_FILE_NAME),
            message,
        })?;

        let documents = match &request.source {
            DocumentSource::Entry(entry) => {
                Router::new(root, &request.keywords, &scanner).route(entry)?
            }
            DocumentSource::Explicit(patterns) => explicit_documents(patterns, &scanner)?,
        };
        let extraction = Extractor::new(&scanner, &policy).extract(&documents)?;
        let graph = TestGraph::build(&extraction.blocks)?;

        self.phase.advance(RunPhase::Resolving)?;
        let introspection = request.introspection.unwrap_or_else(|| {
            Box::new(ProjectIntrospector::new(root, request.config.variables.clone()))
        });
        let mut resolver = VariableResolver::new(
            request.overrides,
            introspection,
            ProfileDefaults::with_overrides(&request.config.profiles),
        );

        let definitions: HashMap<TestId, (&VerificationBlock, &TestDefinition)> = extraction
            .blocks
            .iter()
            .flat_map(|block| block.tests.iter().map(move |t| (block.test_id(t), (block, t))))
            .collect();

        let mut tests = Vec::with_capacity(graph.len());
        for id in graph.topological_order() {
            let Some(&(block, def)) = definitions.get(id) else {
                continue;
            };
            let planned = PlannedTest {
                id: id.clone(),
                description: def.description.clone(),
                required: def.required,
                blocking: def.blocking,
                depends_on: def.depends_on.clone(),
                rendering: resolver.render_test(id, def),
                location: Location::at_line(block.location.path.clone(), def.line),
            };
            // Substituted values can introduce commands the template did not show
            if let Some(commands) = planned.commands() {
                policy.enforce(&commands.command, &planned.location)?;
            }
            tests.push(planned);
        }

        Ok(Plan {
            documents: display_documents(root, &documents),
            cache: extraction.stats,
            tests,
            variables: resolver.resolved(),
            graph,
        })
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, GateError> {
    root.canonicalize().map_err(|source| GateError::Io {
        path: root.to_path_buf(),
        source,
    })
}

fn display_documents(root: &Path, documents: &[Document]) -> Vec<String> {
    documents.iter().map(|d| display_path(root, &d.path)).collect()
}
