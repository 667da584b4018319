//! Deterministic DAG executor.
//!
//! Derivation stages are declared as named nodes with explicit dependency
//! lists. The executor:
//!
//! - topologically sorts the dependency map (depth-first, with a "visiting"
//!   set for cycle detection; roots iterated in lexical order so the total
//!   order is deterministic),
//! - runs each node's compute function exactly once, threading the
//!   accumulated context, and
//! - enforces the **dependency firewall**: a node can only read context keys
//!   for nodes it declared as dependencies. An undeclared read is a latent
//!   correctness bug, so it fails the node rather than returning data.
//!
//! Structural errors (cycle, unknown dependency) abort the whole computation:
//! there is no meaningful partial execution of a malformed graph.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A back-edge was found while the node was still on the DFS stack.
    #[error("dependency cycle detected at node `{0}`")]
    Cycle(String),

    /// A node lists a dependency that is not present in the graph.
    #[error("node `{node}` depends on unknown node `{dependency}`")]
    UnknownDependency { node: String, dependency: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A node's compute function failed; the failure is attributed to the node.
    #[error("node `{node}` failed: {source}")]
    Node {
        node: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Produce a deterministic total order in which every node appears after all
/// of its dependencies.
///
/// The same dependency map always yields the same order: the DFS visits roots
/// in sorted key order (`BTreeMap` iteration) and each node's dependencies in
/// declaration order.
pub fn topo_sort(deps: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>, GraphError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    fn visit(
        node: &str,
        deps: &BTreeMap<String, Vec<String>>,
        marks: &mut BTreeMap<String, Mark>,
        order: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        match marks.get(node).copied().unwrap_or(Mark::Unvisited) {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(GraphError::Cycle(node.to_string())),
            Mark::Unvisited => {}
        }
        marks.insert(node.to_string(), Mark::Visiting);
        for dep in deps.get(node).into_iter().flatten() {
            if !deps.contains_key(dep) {
                return Err(GraphError::UnknownDependency {
                    node: node.to_string(),
                    dependency: dep.clone(),
                });
            }
            visit(dep, deps, marks, order)?;
        }
        marks.insert(node.to_string(), Mark::Done);
        order.push(node.to_string());
        Ok(())
    }

    let mut marks = BTreeMap::new();
    let mut order = Vec::with_capacity(deps.len());
    for node in deps.keys() {
        visit(node, deps, &mut marks, &mut order)?;
    }
    Ok(order)
}

/// Read-only view of the context a node is allowed to see: the outputs of its
/// declared dependencies, nothing else.
pub struct NodeView<'a, O> {
    node: &'a str,
    deps: &'a [&'a str],
    outputs: &'a BTreeMap<String, O>,
}

impl<'a, O> NodeView<'a, O> {
    /// Fetch a declared dependency's output.
    ///
    /// Reading a node that was not declared as a dependency is an error even
    /// if that node has already run — the firewall is what keeps the declared
    /// graph honest.
    pub fn get(&self, name: &str) -> Result<&'a O> {
        if !self.deps.contains(&name) {
            return Err(anyhow!(
                "node `{}` read undeclared dependency `{name}`",
                self.node
            ));
        }
        self.outputs
            .get(name)
            .ok_or_else(|| anyhow!("dependency `{name}` has no output yet"))
    }
}

type NodeFn<I, O> = Box<dyn Fn(&NodeView<'_, O>, &I) -> Result<O> + Send + Sync>;

struct Node<I, O> {
    deps: Vec<&'static str>,
    run: NodeFn<I, O>,
}

/// The executor: a registry of named nodes plus their dependency lists.
///
/// Generic over the per-node input `I` (threaded unchanged to every node) and
/// the node output type `O` (typically a sum type over stage outputs).
pub struct Engine<I, O> {
    nodes: BTreeMap<String, Node<I, O>>,
}

impl<I, O> Default for Engine<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> Engine<I, O> {
    pub fn new() -> Self {
        Self { nodes: BTreeMap::new() }
    }

    /// Register a node. Re-registering a name replaces the previous node.
    pub fn register<F>(&mut self, name: &'static str, deps: &[&'static str], run: F)
    where
        F: Fn(&NodeView<'_, O>, &I) -> Result<O> + Send + Sync + 'static,
    {
        self.nodes.insert(
            name.to_string(),
            Node { deps: deps.to_vec(), run: Box::new(run) },
        );
    }

    fn dependency_map(&self) -> BTreeMap<String, Vec<String>> {
        self.nodes
            .iter()
            .map(|(name, node)| {
                (name.clone(), node.deps.iter().map(|d| d.to_string()).collect())
            })
            .collect()
    }

    /// The deterministic execution order for the registered graph.
    pub fn execution_order(&self) -> Result<Vec<String>, GraphError> {
        topo_sort(&self.dependency_map())
    }

    /// Execute every node exactly once in topological order.
    ///
    /// Returns the full context keyed by node name. Structural errors and
    /// node failures abort execution.
    pub fn run(&self, input: &I) -> Result<BTreeMap<String, O>, EngineError> {
        let order = self.execution_order()?;
        let mut outputs: BTreeMap<String, O> = BTreeMap::new();
        for name in &order {
            let node = &self.nodes[name];
            let view = NodeView {
                node: name,
                deps: &node.deps,
                outputs: &outputs,
            };
            tracing::debug!(node = %name, "running dag node");
            let out = (node.run)(&view, input)
                .map_err(|source| EngineError::Node { node: name.clone(), source })?;
            outputs.insert(name.clone(), out);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps_of(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(n, ds)| {
                (n.to_string(), ds.iter().map(|d| d.to_string()).collect())
            })
            .collect()
    }

    #[test]
    fn diamond_sorts_dependencies_first() {
        let deps = deps_of(&[
            ("d", &["b", "c"]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("a", &[]),
        ]);
        let order = topo_sort(&deps).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn order_is_deterministic() {
        let deps = deps_of(&[("z", &[]), ("m", &[]), ("a", &[])]);
        assert_eq!(topo_sort(&deps).unwrap(), vec!["a", "m", "z"]);
    }

    #[test]
    fn cycle_is_reported_with_a_member_node() {
        let deps = deps_of(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        match topo_sort(&deps) {
            Err(GraphError::Cycle(node)) => {
                assert!(["a", "b", "c"].contains(&node.as_str()));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let deps = deps_of(&[("a", &["a"])]);
        assert!(matches!(topo_sort(&deps), Err(GraphError::Cycle(_))));
    }

    #[test]
    fn unknown_dependency_names_both_sides() {
        let deps = deps_of(&[("a", &["ghost"])]);
        match topo_sort(&deps) {
            Err(GraphError::UnknownDependency { node, dependency }) => {
                assert_eq!(node, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected unknown-dependency error, got {other:?}"),
        }
    }

    #[test]
    fn engine_threads_context_between_nodes() {
        let mut engine: Engine<i64, i64> = Engine::new();
        engine.register("base", &[], |_ctx, input| Ok(*input));
        engine.register("double", &["base"], |ctx, _| Ok(ctx.get("base")? * 2));
        engine.register("sum", &["base", "double"], |ctx, _| {
            Ok(ctx.get("base")? + ctx.get("double")?)
        });
        let outputs = engine.run(&7).unwrap();
        assert_eq!(outputs["double"], 14);
        assert_eq!(outputs["sum"], 21);
    }

    #[test]
    fn undeclared_read_fails_the_node() {
        let mut engine: Engine<(), i64> = Engine::new();
        engine.register("a", &[], |_, _| Ok(1));
        engine.register("b", &[], |ctx, _| Ok(ctx.get("a")? + 1));
        match engine.run(&()) {
            Err(EngineError::Node { node, .. }) => assert_eq!(node, "b"),
            other => panic!("expected node failure, got {other:?}"),
        }
    }

    #[test]
    fn cycle_aborts_the_engine() {
        let mut engine: Engine<(), i64> = Engine::new();
        engine.register("a", &["b"], |_, _| Ok(1));
        engine.register("b", &["a"], |_, _| Ok(2));
        assert!(matches!(engine.run(&()), Err(EngineError::Graph(GraphError::Cycle(_)))));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        /// Layered random DAGs: node i may only depend on nodes with a lower
        /// index, so the graph is acyclic by construction.
        fn arb_dag() -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
            (2usize..12).prop_flat_map(|n| {
                let edges = proptest::collection::vec(
                    proptest::collection::vec(any::<bool>(), n),
                    n,
                );
                edges.prop_map(move |rows| {
                    (0..n)
                        .map(|i| {
                            let deps = (0..i)
                                .filter(|&j| rows[i][j])
                                .map(|j| format!("n{j}"))
                                .collect();
                            (format!("n{i}"), deps)
                        })
                        .collect()
                })
            })
        }

        proptest! {
            #[test]
            fn every_dependency_precedes_its_node(deps in arb_dag()) {
                let order = topo_sort(&deps).unwrap();
                prop_assert_eq!(order.len(), deps.len());
                let pos: BTreeMap<&str, usize> = order
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n.as_str(), i))
                    .collect();
                for (node, node_deps) in &deps {
                    for dep in node_deps {
                        prop_assert!(pos[dep.as_str()] < pos[node.as_str()]);
                    }
                }
            }

            #[test]
            fn adding_a_back_edge_creates_a_cycle(deps in arb_dag()) {
                let mut deps = deps;
                // Wire a two-node cycle between the first and last node.
                let last = format!("n{}", deps.len() - 1);
                deps.get_mut(&last).unwrap().push("n0".to_string());
                deps.get_mut("n0").unwrap().push(last);
                prop_assert!(matches!(topo_sort(&deps), Err(GraphError::Cycle(_))));
            }
        }
    }
}
