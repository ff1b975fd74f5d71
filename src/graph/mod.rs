//! Dependency graph over the tests of one batch

pub mod cycle;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{GateError, Location};
use crate::models::{TestId, VerificationBlock};

/// Tests and their `depends_on` edges, with a stable topological order
#[derive(Debug, Clone)]
pub struct TestGraph {
    /// Declaration order
    ids: Vec<TestId>,
    index: HashMap<TestId, usize>,
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl TestGraph {
    pub fn build(blocks: &[VerificationBlock]) -> Result<Self, GateError> {
        let mut ids = Vec::new();
        let mut locations = Vec::new();
        let mut raw_deps = Vec::new();
        for block in blocks {
            for test in &block.tests {
                ids.push(block.test_id(test));
                locations.push(Location::at_line(&block.location.path, test.line));
                raw_deps.push(&test.depends_on);
            }
        }

        let index: HashMap<TestId, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut dependencies = vec![Vec::new(); ids.len()];
        let mut dependents = vec![Vec::new(); ids.len()];
        for (i, deps) in raw_deps.iter().enumerate() {
            for dep in deps.iter() {
                let Some(&j) = index.get(dep) else {
                    return Err(GateError::structural(
                        locations[i].clone(),
                        format!(
                            "test '{}' depends on '{dep}', which is not part of this batch",
                            ids[i]
                        ),
                    ));
                };
                if !dependencies[i].contains(&j) {
                    dependencies[i].push(j);
                    dependents[j].push(i);
                }
            }
        }

        let order = kahn_order(&dependencies, &dependents);
        if order.len() < ids.len() {
            let placed: HashSet<usize> = order.iter().copied().collect();
            let remaining: Vec<usize> = (0..ids.len()).filter(|i| !placed.contains(i)).collect();
            let nodes: Vec<String> = remaining.iter().map(|&i| ids[i].to_string()).collect();
            let edges: HashMap<String, Vec<String>> = remaining
                .iter()
                .map(|&i| {
                    let targets = dependencies[i].iter().map(|&j| ids[j].to_string()).collect();
                    (ids[i].to_string(), targets)
                })
                .collect();
            let members = cycle::find_cycle(&nodes, &edges).unwrap_or(nodes);
            return Err(GateError::structural(
                locations[remaining[0]].clone(),
                format!("dependency cycle: {}", members.join(" -> ")),
            ));
        }

        Ok(Self {
            ids,
            index,
            dependents,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tests in dependency order, ties broken by declaration order
    pub fn topological_order(&self) -> Vec<&TestId> {
        self.order.iter().map(|&i| &self.ids[i]).collect()
    }

    /// Everything that directly or indirectly depends on `id`, in topological order
    pub fn transitive_dependents(&self, id: &TestId) -> Vec<&TestId> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &next in &self.dependents[node] {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        self.order
            .iter()
            .filter(|i| seen.contains(*i))
            .map(|&i| &self.ids[i])
            .collect()
    }
}

/// Kahn's algorithm; a min-heap over declaration index keeps the order stable
fn kahn_order(dependencies: &[Vec<usize>], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(dependencies.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &next in &dependents[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }
    order
}
