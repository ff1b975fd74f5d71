//! Bounded worker pool that runs planned tests in dependency order.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use tracing::{debug, warn};

use super::{run_test, ExecutorConfig};
use crate::graph::TestGraph;
use crate::models::{ExecutionResult, PlannedTest, TestId};

/// Results of a batch, in topological order
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub results: Vec<ExecutionResult>,
    /// First blocking failure that stopped dispatch
    pub halted_by: Option<TestId>,
}

pub struct Scheduler<'a> {
    /// Must already be in topological order
    tests: &'a [PlannedTest],
    graph: &'a TestGraph,
    working_dir: &'a Path,
    config: &'a ExecutorConfig,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        tests: &'a [PlannedTest],
        graph: &'a TestGraph,
        working_dir: &'a Path,
        config: &'a ExecutorConfig,
    ) -> Self {
        Self {
            tests,
            graph,
            working_dir,
            config,
        }
    }

    pub fn run(&self) -> ExecutionOutcome {
        let count = self.tests.len();
        let positions: HashMap<&TestId, usize> =
            self.tests.iter().enumerate().map(|(i, t)| (&t.id, i)).collect();
        let mut slots: Vec<Option<ExecutionResult>> = vec![None; count];
        let mut halted_by: Option<TestId> = None;

        // Unrenderable tests are terminal before anything runs
        for (index, test) in self.tests.iter().enumerate() {
            if let Some(result) = ExecutionResult::unresolved(test) {
                debug!(test = %test.id, "not dispatched: unresolved variables");
                self.settle(index, result, &mut slots, &positions);
            }
        }

        if count > 0 {
            let cancel = Arc::new(AtomicBool::new(false));
            let workers = self.config.max_parallel.clamp(1, count);
            thread::scope(|scope| {
                let (job_tx, job_rx) = mpsc::channel::<usize>();
                let (done_tx, done_rx) = mpsc::channel::<(usize, ExecutionResult)>();
                let job_rx = Arc::new(Mutex::new(job_rx));

                for _ in 0..workers {
                    let job_rx = Arc::clone(&job_rx);
                    let done_tx = done_tx.clone();
                    let cancel = Arc::clone(&cancel);
                    scope.spawn(move || loop {
                        let next = match job_rx.lock() {
                            Ok(rx) => rx.recv(),
                            Err(_) => break,
                        };
                        let Ok(index) = next else { break };
                        let result = run_test(&self.tests[index], self.working_dir, self.config);
                        if result.halts_batch() {
                            cancel.store(true, Ordering::SeqCst);
                        }
                        if done_tx.send((index, result)).is_err() {
                            break;
                        }
                    });
                }
                drop(done_tx);

                let mut dispatched = vec![false; count];
                let mut in_flight = 0usize;
                loop {
                    for index in 0..count {
                        if in_flight >= workers || cancel.load(Ordering::SeqCst) {
                            break;
                        }
                        if dispatched[index] || slots[index].is_some() {
                            continue;
                        }
                        if !self.prerequisites_passed(index, &slots, &positions) {
                            continue;
                        }
                        debug!(test = %self.tests[index].id, "dispatching");
                        if job_tx.send(index).is_err() {
                            break;
                        }
                        dispatched[index] = true;
                        in_flight += 1;
                    }

                    if in_flight == 0 {
                        break;
                    }
                    let Ok((index, result)) = done_rx.recv() else {
                        break;
                    };
                    in_flight -= 1;
                    if result.halts_batch() && halted_by.is_none() {
                        warn!(test = %result.id, "blocking test failed, halting dispatch");
                        halted_by = Some(result.id.clone());
                    }
                    self.settle(index, result, &mut slots, &positions);
                }
                drop(job_tx);
            });
        }

        let leftover_reason = match &halted_by {
            Some(id) => format!("halted by {id}"),
            None => "not scheduled".to_string(),
        };
        let results = slots
            .into_iter()
            .zip(self.tests)
            .map(|(slot, test)| {
                slot.unwrap_or_else(|| ExecutionResult::skipped(test, leftover_reason.clone()))
            })
            .collect();

        ExecutionOutcome { results, halted_by }
    }

    fn prerequisites_passed(
        &self,
        index: usize,
        slots: &[Option<ExecutionResult>],
        positions: &HashMap<&TestId, usize>,
    ) -> bool {
        self.tests[index].depends_on.iter().all(|dep| {
            positions
                .get(dep)
                .and_then(|&j| slots[j].as_ref())
                .is_some_and(|r| r.status.is_pass())
        })
    }

    /// Record a terminal result once; a non-pass skips everything downstream.
    fn settle(
        &self,
        index: usize,
        result: ExecutionResult,
        slots: &mut [Option<ExecutionResult>],
        positions: &HashMap<&TestId, usize>,
    ) {
        if slots[index].is_some() {
            return;
        }
        let failed = (!result.status.is_pass()).then(|| result.id.clone());
        slots[index] = Some(result);

        let Some(id) = failed else { return };
        for dependent in self.graph.transitive_dependents(&id) {
            let Some(&j) = positions.get(dependent) else { continue };
            if slots[j].is_none() {
                debug!(test = %dependent, prerequisite = %id, "skipping");
                slots[j] = Some(ExecutionResult::skipped(
                    &self.tests[j],
                    format!("prerequisite {id} did not pass"),
                ));
            }
        }
    }
}
