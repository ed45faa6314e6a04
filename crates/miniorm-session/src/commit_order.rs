//! Dependency-respecting commit ordering.
//!
//! A general directed-graph topological sorter keyed by string node names,
//! with no knowledge of entities. Nodes are emitted depth-first postorder,
//! so every dependency of a node precedes the node itself; nodes with no
//! dependency relationship keep first-visited order, which is stable for a
//! fixed insertion order.

use miniorm_core::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Topological sorter over named nodes.
#[derive(Debug, Default)]
pub struct CommitOrderCalculator {
    /// Node names in insertion order.
    order: Vec<String>,
    /// Node -> its dependencies, deduplicated, in insertion order.
    nodes: HashMap<String, Vec<String>>,
}

impl CommitOrderCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Returns whether it was newly added.
    pub fn add_node(&mut self, node: &str) -> bool {
        if self.nodes.contains_key(node) {
            return false;
        }
        self.nodes.insert(node.to_string(), Vec::new());
        self.order.push(node.to_string());
        true
    }

    /// Record that `node` depends on `dependency`, ensuring `node` exists.
    /// Returns whether the edge was newly added.
    pub fn add_dependency(&mut self, node: &str, dependency: &str) -> bool {
        self.add_node(node);
        let deps = self
            .nodes
            .get_mut(node)
            .expect("node registered by add_node");
        if deps.iter().any(|d| d == dependency) {
            return false;
        }
        deps.push(dependency.to_string());
        true
    }

    /// Compute the commit order.
    ///
    /// Every node appears exactly once, after all of its dependencies. A
    /// cyclic graph fails fast with `Error::DependencyCycle` naming the
    /// cycle members.
    pub fn calculate(&self) -> Result<Vec<String>> {
        let mut order = Vec::with_capacity(self.order.len());
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();

        for node in &self.order {
            self.visit(node, &mut visited, &mut visiting, &mut order)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        visiting: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if visited.contains(node) {
            return Ok(());
        }

        if let Some(start) = visiting.iter().position(|n| n == node) {
            let mut cycle: Vec<String> = visiting[start..].to_vec();
            cycle.push(node.to_string());
            return Err(Error::cycle(cycle));
        }

        visiting.push(node.to_string());
        for dependency in self.nodes.get(node).into_iter().flatten() {
            self.visit(dependency, visited, visiting, order)?;
        }
        visiting.pop();

        visited.insert(node.to_string());
        order.push(node.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_precede_dependents() {
        let mut calculator = CommitOrderCalculator::new();
        calculator.add_node("A");
        calculator.add_node("B");
        calculator.add_node("C");
        calculator.add_node("D");
        calculator.add_dependency("D", "B");
        calculator.add_dependency("D", "C");
        calculator.add_dependency("C", "A");
        calculator.add_dependency("C", "B");
        calculator.add_dependency("B", "A");

        assert_eq!(calculator.calculate().unwrap(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut calculator = CommitOrderCalculator::new();
        assert!(calculator.add_node("A"));
        assert!(!calculator.add_node("A"));
    }

    #[test]
    fn test_add_dependency_dedups_and_creates_node() {
        let mut calculator = CommitOrderCalculator::new();
        assert!(calculator.add_dependency("B", "A"));
        assert!(!calculator.add_dependency("B", "A"));
        // B was created implicitly.
        assert!(!calculator.add_node("B"));
    }

    #[test]
    fn test_unrelated_nodes_keep_insertion_order() {
        let mut calculator = CommitOrderCalculator::new();
        calculator.add_node("Z");
        calculator.add_node("M");
        calculator.add_node("A");

        assert_eq!(calculator.calculate().unwrap(), vec!["Z", "M", "A"]);
    }

    #[test]
    fn test_every_node_emitted_once() {
        let mut calculator = CommitOrderCalculator::new();
        calculator.add_node("A");
        calculator.add_node("B");
        calculator.add_node("C");
        // Diamond: both B and C depend on A, D depends on both.
        calculator.add_dependency("B", "A");
        calculator.add_dependency("C", "A");
        calculator.add_dependency("D", "B");
        calculator.add_dependency("D", "C");

        let order = calculator.calculate().unwrap();
        assert_eq!(order.len(), 4);
        let position =
            |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("A") < position("B"));
        assert!(position("A") < position("C"));
        assert!(position("B") < position("D"));
        assert!(position("C") < position("D"));
    }

    #[test]
    fn test_cycle_fails_fast() {
        let mut calculator = CommitOrderCalculator::new();
        calculator.add_dependency("A", "B");
        calculator.add_dependency("B", "C");
        calculator.add_dependency("C", "A");

        let err = calculator.calculate().unwrap_err();
        match err {
            Error::DependencyCycle(cycle) => {
                assert_eq!(cycle.nodes, vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut calculator = CommitOrderCalculator::new();
        calculator.add_dependency("A", "A");
        assert!(calculator.calculate().is_err());
    }
}
