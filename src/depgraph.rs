//! Dependency graph over symbols, with reachability and a reverse index.
//!
//! Edge `A → B` means "A uses B". Every node of the symbol graph is a vertex
//! (namespaces and tests included); duplicate usage edges are collapsed.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::SymbolGraph;
use crate::symbol::Symbol;

/// Map from a symbol to the set of symbols that transitively reach it.
pub type ReverseIndex = BTreeMap<Symbol, BTreeSet<Symbol>>;

/// Directed "uses" graph with O(1) vertex lookup by symbol.
pub struct DepGraph {
    graph: DiGraph<Symbol, ()>,
    index: HashMap<Symbol, NodeIndex>,
}

impl DepGraph {
    /// Build from a symbol graph. Vertices are inserted in sorted symbol
    /// order and edges in the graph's (already sorted) edge order, so the
    /// construction is deterministic.
    pub fn from_symbol_graph(sg: &SymbolGraph) -> Self {
        let mut graph = DiGraph::with_capacity(sg.nodes.len(), sg.edges.len());
        let mut index = HashMap::with_capacity(sg.nodes.len());
        for symbol in sg.nodes.keys() {
            let idx = graph.add_node(symbol.clone());
            index.insert(symbol.clone(), idx);
        }
        for edge in &sg.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
                if !graph.contains_edge(from, to) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        DepGraph { graph, index }
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.index.contains_key(symbol)
    }

    /// Successors of a vertex in edge-insertion order.
    ///
    /// petgraph iterates adjacency newest-first; reversing restores the order
    /// the edges were added in.
    fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut succs: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        succs.reverse();
        succs
    }

    /// All symbols reachable from `start`, including `start` itself.
    ///
    /// A test is always in its own reachable set, which is what makes a test
    /// select itself when its own definition changes.
    pub fn reachable(&self, start: &Symbol) -> BTreeSet<Symbol> {
        let mut seen = BTreeSet::new();
        let Some(&start_idx) = self.index.get(start) else {
            return seen;
        };
        let mut visited = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::new();
        visited[start_idx.index()] = true;
        queue.push_back(start_idx);
        while let Some(idx) = queue.pop_front() {
            seen.insert(self.graph[idx].clone());
            for succ in self.graph.neighbors(idx) {
                if !visited[succ.index()] {
                    visited[succ.index()] = true;
                    queue.push_back(succ);
                }
            }
        }
        seen
    }

    /// Compute `rev[x]` = the set of vertices from which `x` is reachable,
    /// excluding `x` itself, for every `x` with at least one such vertex.
    ///
    /// Single DP pass over the strongly-connected-component condensation:
    /// `tarjan_scc` yields components in reverse topological order, so each
    /// component's reachable set is the union of its members and the already
    /// computed sets of its successor components — computed once, no
    /// per-caller traversals. Cycles collapse into one component, so the DP
    /// stays correct on cyclic graphs.
    pub fn reverse_index(&self) -> ReverseIndex {
        let _span = tracing::info_span!(
            "reverse_index",
            vertices = self.graph.node_count(),
            edges = self.graph.edge_count()
        )
        .entered();

        let sccs = tarjan_scc(&self.graph);
        let mut scc_of = vec![0usize; self.graph.node_count()];
        for (i, scc) in sccs.iter().enumerate() {
            for &n in scc {
                scc_of[n.index()] = i;
            }
        }

        // reach[i] = members of component i plus everything strictly downstream
        let mut reach: Vec<BTreeSet<Symbol>> = Vec::with_capacity(sccs.len());
        for (i, scc) in sccs.iter().enumerate() {
            let mut set: BTreeSet<Symbol> = scc.iter().map(|&n| self.graph[n].clone()).collect();
            for &n in scc {
                for succ in self.graph.neighbors(n) {
                    let j = scc_of[succ.index()];
                    if j != i {
                        set.extend(reach[j].iter().cloned());
                    }
                }
            }
            reach.push(set);
        }

        let mut rev: ReverseIndex = BTreeMap::new();
        for (i, scc) in sccs.iter().enumerate() {
            for &n in scc {
                let v = &self.graph[n];
                for d in &reach[i] {
                    if d != v {
                        rev.entry(d.clone()).or_default().insert(v.clone());
                    }
                }
            }
        }
        rev
    }

    /// Shortest path `src → … → dst` for explaining a selection, or `None`
    /// when `dst` is not reachable. BFS; ties break toward earlier-inserted
    /// edges.
    pub fn witness_path(&self, src: &Symbol, dst: &Symbol) -> Option<Vec<Symbol>> {
        let (&src_idx, &dst_idx) = (self.index.get(src)?, self.index.get(dst)?);
        if src_idx == dst_idx {
            return Some(vec![src.clone()]);
        }
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(src_idx);
        while let Some(idx) = queue.pop_front() {
            for succ in self.successors(idx) {
                if succ != src_idx && !parent.contains_key(&succ) {
                    parent.insert(succ, idx);
                    if succ == dst_idx {
                        let mut path = vec![self.graph[succ].clone()];
                        let mut cur = succ;
                        while let Some(&p) = parent.get(&cur) {
                            path.push(self.graph[p].clone());
                            cur = p;
                        }
                        path.reverse();
                        return Some(path);
                    }
                    queue.push_back(succ);
                }
            }
        }
        None
    }
}
