//! Dependency graph for pipeline tasks
//!
//! Built from extracted tasks without rejecting cycles. A cycle only surfaces
//! when a topological order is requested. Uses petgraph for graph operations.

use petgraph::algo::{is_cyclic_directed, kosaraju_scc, toposort};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::pipeline::DeclaredTask;
use super::run::RunState;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Task ordering contains a cycle through: {0}")]
    CycleDetected(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),
}

/// A dependency graph of pipeline tasks
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Edges point from predecessor to dependent
    graph: DiGraph<String, ()>,

    /// Map from task name to node index
    node_map: HashMap<String, NodeIndex>,

    /// Names that were declared as tasks (the rest are dangling references)
    declared: HashSet<String>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from extracted tasks
    ///
    /// Predecessors that are not declared are added as nodes and reported by
    /// [`DependencyGraph::dangling`].
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a DeclaredTask>) -> Self {
        let mut graph = Self::new();

        // First pass: add all declared nodes
        let tasks: Vec<_> = tasks.into_iter().collect();
        for task in &tasks {
            graph.add_task(&task.name);
        }

        // Second pass: add all edges
        for task in &tasks {
            for predecessor in &task.run_after {
                graph.add_dependency(&task.name, predecessor);
            }
        }

        graph
    }

    /// Adds a declared task to the graph
    pub fn add_task(&mut self, name: &str) {
        self.node(name);
        self.declared.insert(name.to_string());
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.node_map.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        idx
    }

    /// Adds an ordering edge: `task` runs after `predecessor`
    ///
    /// Unknown names are added as undeclared nodes. Repeated edges are ignored.
    pub fn add_dependency(&mut self, task: &str, predecessor: &str) {
        let task_idx = self.node(task);
        let dep_idx = self.node(predecessor);

        if self.graph.find_edge(dep_idx, task_idx).is_none() {
            self.graph.add_edge(dep_idx, task_idx, ());
        }
    }

    fn index(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::TaskNotFound(name.to_string()))
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Result<Vec<String>, GraphError> {
        let idx = self.index(name)?;
        let mut names: Vec<_> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Returns the direct predecessors of a task, sorted by name
    pub fn dependencies(&self, name: &str) -> Result<Vec<String>, GraphError> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Returns the tasks that run directly after a task, sorted by name
    pub fn dependents(&self, name: &str) -> Result<Vec<String>, GraphError> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Returns tasks without predecessors, in insertion order
    pub fn roots(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Returns names referenced as predecessors but never declared, in insertion order
    pub fn dangling(&self) -> Vec<String> {
        self.graph
            .node_weights()
            .filter(|name| !self.declared.contains(*name))
            .cloned()
            .collect()
    }

    /// Returns true if the ordering contains a cycle
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Returns all tasks with predecessors before dependents
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(GraphError::CycleDetected(self.cycle_members(cycle.node_id()))),
        }
    }

    /// Names of the strongly connected component containing `idx`
    fn cycle_members(&self, idx: NodeIndex) -> String {
        let mut members: Vec<_> = kosaraju_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&idx))
            .unwrap_or_else(|| vec![idx])
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        members.sort();
        members.join(", ")
    }

    /// Returns declared tasks that may start now
    ///
    /// A task is ready when it has not reached a terminal state and every
    /// predecessor has finished. Tasks missing from `states` have not started.
    pub fn ready_tasks(&self, states: &HashMap<String, RunState>) -> Vec<String> {
        let finished = |name: &str| states.get(name) == Some(&RunState::Finished);

        self.graph
            .node_indices()
            .filter_map(|idx| {
                let name = self.graph.node_weight(idx)?;
                if !self.declared.contains(name) {
                    return None;
                }
                if states.get(name).is_some_and(|state| state.is_terminal()) {
                    return None;
                }
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .filter_map(|dep| self.graph.node_weight(dep))
                    .all(|dep| finished(dep))
                    .then(|| name.clone())
            })
            .collect()
    }

    /// Renders the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(|_, name| name.as_str(), |_, _| "");
        format!("{}", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Returns the number of nodes, dangling references included
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns (predecessor, dependent) pairs
    pub fn edges(&self) -> Vec<(String, String)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .filter_map(|(from, to)| {
                Some((
                    self.graph.node_weight(from)?.clone(),
                    self.graph.node_weight(to)?.clone(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, run_after: &[&str]) -> DeclaredTask {
        let mut task = DeclaredTask::new(name, format!("{}-ref", name));
        for predecessor in run_after {
            task.add_predecessor(predecessor);
        }
        task
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.topological_order(), Ok(vec![]));
    }

    #[test]
    fn from_tasks() {
        let tasks = [task("build", &[]), task("test", &["build"]), task("deploy", &["build", "test"])];
        let graph = DependencyGraph::from_tasks(&tasks);

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependencies("deploy"), Ok(vec!["build".to_string(), "test".to_string()]));
        assert_eq!(graph.dependents("build"), Ok(vec!["deploy".to_string(), "test".to_string()]));
        assert_eq!(graph.roots(), vec!["build".to_string()]);
        assert!(graph.dangling().is_empty());
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn topological_order() {
        let tasks = [task("deploy", &["test"]), task("test", &["build"]), task("build", &[])];
        let graph = DependencyGraph::from_tasks(&tasks);

        let order = graph.topological_order().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

        assert!(pos("build") < pos("test"));
        assert!(pos("test") < pos("deploy"));
    }

    #[test]
    fn cycles_are_kept_and_reported() {
        let tasks = [task("a", &["c"]), task("b", &["a"]), task("c", &["b"]), task("d", &[])];
        let graph = DependencyGraph::from_tasks(&tasks);

        assert!(graph.has_cycle());
        assert_eq!(graph.len(), 4);
        assert_eq!(
            graph.topological_order(),
            Err(GraphError::CycleDetected("a, b, c".to_string()))
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = DependencyGraph::from_tasks(&[task("loop", &["loop"])]);
        assert!(graph.has_cycle());
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn dangling_references_become_nodes() {
        let graph = DependencyGraph::from_tasks(&[task("build-skaffold-web", &["fooTask"])]);

        assert!(graph.contains("fooTask"));
        assert_eq!(graph.dangling(), vec!["fooTask".to_string()]);
        assert_eq!(graph.roots(), vec!["fooTask".to_string()]);
    }

    #[test]
    fn unknown_task_returns_error() {
        let graph = DependencyGraph::from_tasks(&[task("build", &[])]);
        assert_eq!(
            graph.dependencies("missing"),
            Err(GraphError::TaskNotFound("missing".to_string()))
        );
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut graph = DependencyGraph::new();
        graph.add_task("a");
        graph.add_task("b");
        graph.add_dependency("b", "a");
        graph.add_dependency("b", "a");

        assert_eq!(graph.edges(), vec![("a".to_string(), "b".to_string())]);
    }

    #[test]
    fn ready_tasks() {
        let tasks = [task("build", &[]), task("test", &["build"]), task("lint", &[])];
        let graph = DependencyGraph::from_tasks(&tasks);

        let mut states = HashMap::new();
        let ready = graph.ready_tasks(&states);
        assert_eq!(ready, vec!["build".to_string(), "lint".to_string()]);

        states.insert("build".to_string(), RunState::Finished);
        states.insert("lint".to_string(), RunState::Started);
        let ready = graph.ready_tasks(&states);
        assert_eq!(ready, vec!["test".to_string(), "lint".to_string()]);

        states.insert("build".to_string(), RunState::Failed);
        let ready = graph.ready_tasks(&states);
        assert_eq!(ready, vec!["lint".to_string()]);
    }

    #[test]
    fn dot_output_names_tasks() {
        let graph = DependencyGraph::from_tasks(&[task("build", &[]), task("deploy", &["build"])]);
        let dot = graph.to_dot();

        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("\"build\""));
        assert!(dot.contains("->"));
    }

    #[test]
    fn performance_500_tasks() {
        use std::time::Instant;

        let tasks: Vec<_> = (0..500)
            .map(|i| {
                let name = format!("task-{}", i);
                if i == 0 {
                    task(&name, &[])
                } else {
                    task(&name, &[&format!("task-{}", i - 1)])
                }
            })
            .collect();

        let start = Instant::now();
        let graph = DependencyGraph::from_tasks(&tasks);
        let order = graph.topological_order().unwrap();
        let duration = start.elapsed();

        assert_eq!(order.first().map(String::as_str), Some("task-0"));
        assert!(duration.as_millis() < 100, "Graph build took {:?}", duration);
    }
}
