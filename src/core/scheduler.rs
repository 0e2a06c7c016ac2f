//! Build ordering
//!
//! Computes a total build order over a package set such that every package
//! comes after all of its dependencies. Among packages that are ready at the
//! same time, the lexicographically smallest name goes first, so the same
//! input always yields the same order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::core::package::Package;
use crate::error::SchedulerError;

/// Dependency graph for packages
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Adjacency list: package -> dependencies
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package and its dependencies
    pub fn add_package<I, S>(&mut self, name: &str, dependencies: I) -> Result<(), SchedulerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.edges.contains_key(name) {
            return Err(SchedulerError::DuplicatePackage {
                name: name.to_string(),
            });
        }
        self.edges.insert(
            name.to_string(),
            dependencies.into_iter().map(Into::into).collect(),
        );
        Ok(())
    }

    /// Number of packages in the graph
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no packages
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Compute the build order
    ///
    /// Kahn's algorithm with a min-heap of ready packages. When packages
    /// remain unordered, they sit on or behind a cycle, which is then
    /// located and reported.
    pub fn build_order(&self) -> Result<Vec<String>, SchedulerError> {
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (name, deps) in &self.edges {
            for dep in deps {
                if !self.edges.contains_key(dep) {
                    return Err(SchedulerError::MissingDependency {
                        package: name.clone(),
                        dependency: dep.clone(),
                    });
                }
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
            pending.insert(name.as_str(), deps.len());
        }

        let mut ready: BinaryHeap<Reverse<&str>> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| Reverse(*name))
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(Reverse(name)) = ready.pop() {
            order.push(name.to_string());
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(*dependent));
                    }
                }
            }
        }

        if order.len() < self.edges.len() {
            let scheduled: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let cycle = self.find_cycle(&scheduled);
            return Err(SchedulerError::CircularDependency { cycle });
        }

        Ok(order)
    }

    /// Locate one cycle among the unscheduled packages
    ///
    /// The returned path starts and ends with the same package.
    fn find_cycle(&self, scheduled: &BTreeSet<&str>) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut path = Vec::new();

        for node in self.edges.keys() {
            if scheduled.contains(node.as_str()) || visited.contains(node) {
                continue;
            }
            if let Some(cycle) = self.visit(node, &mut visited, &mut path) {
                return cycle;
            }
        }
        Vec::new()
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut BTreeSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if let Some(start) = path.iter().position(|n| n == node) {
            let mut cycle = path[start..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if visited.contains(node) {
            return None;
        }

        path.push(node.to_string());
        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if let Some(cycle) = self.visit(dep, visited, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        visited.insert(node.to_string());

        None
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        matches!(
            self.build_order(),
            Err(SchedulerError::CircularDependency { .. })
        )
    }
}

/// Orders packages into a build batch
#[derive(Debug, Default, Clone, Copy)]
pub struct Scheduler;

impl Scheduler {
    /// Create a scheduler
    pub fn new() -> Self {
        Self
    }

    /// Order packages so that dependencies precede dependents
    ///
    /// Fails without returning a partial order when the dependency graph has
    /// a cycle or references a package outside the set.
    pub fn schedule(&self, packages: Vec<Package>) -> Result<Vec<Package>, SchedulerError> {
        let mut graph = DependencyGraph::new();
        for package in &packages {
            graph.add_package(&package.name, package.dependencies.iter().cloned())?;
        }

        let order = graph.build_order()?;

        let mut by_name: BTreeMap<String, Package> = packages
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        let batch: Vec<Package> = order
            .iter()
            .filter_map(|name| by_name.remove(name))
            .collect();

        tracing::info!(
            "Build order: {}",
            batch
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(batch)
    }
}
