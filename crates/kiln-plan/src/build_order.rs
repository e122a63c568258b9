//! Target configuration order using topological sort
use crate::error::{PlanError, PlanResult};
use std::collections::{HashMap, HashSet, VecDeque};

/// A target in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetNode {
    /// Target name
    pub name: String,
    /// Targets that must be configured first
    pub dependencies: Vec<String>,
}

impl TargetNode {
    /// Create a new target node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Dependency graph over plan targets
///
/// Nodes keep their insertion order, which is used to break ties so that
/// the computed order is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    nodes: Vec<TargetNode>,
    index: HashMap<String, usize>,
}

impl BuildGraph {
    /// Create a new empty build graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node with the same name
    pub fn add_node(&mut self, node: TargetNode) {
        match self.index.get(&node.name) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.index.insert(node.name.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Get a node by name
    pub fn get_node(&self, name: &str) -> Option<&TargetNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that every dependency names a node in the graph
    pub fn validate(&self) -> PlanResult<()> {
        for node in &self.nodes {
            for dep in &node.dependencies {
                if !self.index.contains_key(dep) {
                    return Err(PlanError::target_not_found(format!(
                        "{} (required by {})",
                        dep, node.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Compute the configuration order using Kahn's algorithm.
    /// Dependencies come before the targets that need them.
    pub fn compute_build_order(&self) -> PlanResult<Vec<String>> {
        let mut in_degree: Vec<usize> = self
            .nodes
            .iter()
            .map(|n| {
                n.dependencies
                    .iter()
                    .collect::<HashSet<_>>()
                    .len()
            })
            .collect();

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(current) = queue.pop_front() {
            let current_name = &self.nodes[current].name;
            result.push(current_name.clone());

            for (i, node) in self.nodes.iter().enumerate() {
                if node.dependencies.contains(current_name) {
                    in_degree[i] -= 1;
                    if in_degree[i] == 0 {
                        queue.push_back(i);
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            return Err(PlanError::CircularDependency(self.find_cycle()));
        }

        Ok(result)
    }

    /// Find a cycle in the graph (for error reporting)
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node in &self.nodes {
            if let Some(cycle) =
                self.dfs_find_cycle(&node.name, &mut visited, &mut rec_stack, &mut path)
            {
                return cycle;
            }
        }

        "unknown cycle".to_string()
    }

    fn dfs_find_cycle(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<String> {
        if rec_stack.contains(name) {
            path.push(name.to_string());
            if let Some(start) = path.iter().position(|m| m == name) {
                return Some(path[start..].join(" -> "));
            }
            return Some(path.join(" -> "));
        }

        if visited.contains(name) {
            return None;
        }

        visited.insert(name.to_string());
        rec_stack.insert(name.to_string());
        path.push(name.to_string());

        if let Some(node) = self.get_node(name) {
            for dep in &node.dependencies {
                if let Some(cycle) = self.dfs_find_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(name);
        path.pop();
        None
    }
}
