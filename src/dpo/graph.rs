use crate::dpo::document::Element;
use crate::dpo::error::StructuralError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifies a node within the graph that owns it.
pub type NodeId = String;

/// An undirected edge. The endpoints are always stored sorted so that `{a, b}` and
/// `{b, a}` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(NodeId, NodeId)", into = "(NodeId, NodeId)")]
pub struct Edge(NodeId, NodeId);

impl Edge {
    pub fn new(node1: impl Into<NodeId>, node2: impl Into<NodeId>) -> Self {
        let (node1, node2) = (node1.into(), node2.into());
        if node1 <= node2 {
            Edge(node1, node2)
        } else {
            Edge(node2, node1)
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.0, &self.1)
    }

    /// The identifier used when the edge is exported, e.g. `"a-b"`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.0, self.1)
    }
}

impl From<(NodeId, NodeId)> for Edge {
    fn from((a, b): (NodeId, NodeId)) -> Self {
        Edge::new(a, b)
    }
}

impl From<Edge> for (NodeId, NodeId) {
    fn from(edge: Edge) -> Self {
        (edge.0, edge.1)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// A set of nodes and edges picked out of some graph, e.g. by a user clicking on them.
/// Nothing guarantees that the elements exist; consumers filter as they need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub nodes: BTreeSet<NodeId>,
    #[serde(default)]
    pub edges: BTreeSet<Edge>,
}

impl Selection {
    pub fn new<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator,
        N::Item: Into<NodeId>,
        E: IntoIterator,
        E::Item: Into<Edge>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            edges: edges.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }
}

/// An undirected simple graph keyed by string identifiers.
///
/// The node and edge maps are the only source of truth. Each entry carries the tick at
/// which it was inserted, so that [`Graph::to_elements`] can reproduce insertion order
/// for display without a second element list to keep in sync.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, u64>,
    edges: BTreeMap<Edge, u64>,
    /// Each edge is stored as two adjacencies, A->B and B->A.
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    next_tick: u64,
    /// Counter backing [`Graph::fresh_node_id`].
    next_fresh: usize,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.keys().eq(other.nodes.keys()) && self.edges.keys().eq(other.edges.keys())
    }
}

impl Eq for Graph {}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.nodes.keys()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.keys()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_edge(&self, sid: &str, tid: &str) -> bool {
        self.contains_edge(&Edge::new(sid, tid))
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains_key(edge)
    }

    /// Neighbours of `id`, empty if the node does not exist.
    pub fn neighbors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.adjacency.get(id).into_iter().flatten()
    }

    pub fn degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    pub fn add_node(&mut self, id: impl Into<NodeId>) -> Result<(), StructuralError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(StructuralError::DuplicateNode(id));
        }
        let tick = self.tick();
        self.adjacency.insert(id.clone(), BTreeSet::new());
        self.nodes.insert(id, tick);
        Ok(())
    }

    /// Connect two existing nodes. Returns false if they were already connected.
    pub fn add_edge(&mut self, sid: &str, tid: &str) -> Result<bool, StructuralError> {
        if sid == tid {
            return Err(StructuralError::SelfLoop(sid.to_string()));
        }
        for id in [sid, tid] {
            if !self.has_node(id) {
                return Err(StructuralError::UnknownEndpoint {
                    from: sid.to_string(),
                    to: tid.to_string(),
                    missing: id.to_string(),
                });
            }
        }
        Ok(self.link(sid, tid))
    }

    /// Infallible internal method used to implement add_edge(). Both endpoints must
    /// exist and differ.
    pub(crate) fn link(&mut self, sid: &str, tid: &str) -> bool {
        let edge = Edge::new(sid, tid);
        if sid == tid || self.edges.contains_key(&edge) {
            return false;
        }
        let tick = self.tick();
        self.edges.insert(edge, tick);
        self.adjacency
            .entry(sid.to_string())
            .or_default()
            .insert(tid.to_string());
        self.adjacency
            .entry(tid.to_string())
            .or_default()
            .insert(sid.to_string());
        true
    }

    pub fn remove_edge(&mut self, sid: &str, tid: &str) -> bool {
        if self.edges.remove(&Edge::new(sid, tid)).is_none() {
            return false;
        }
        if let Some(adjacent) = self.adjacency.get_mut(sid) {
            adjacent.remove(tid);
        }
        if let Some(adjacent) = self.adjacency.get_mut(tid) {
            adjacent.remove(sid);
        }
        true
    }

    /// Remove all edges incident to `id`, returning how many were removed.
    pub fn remove_edges_with(&mut self, id: &str) -> usize {
        let neighbors: Vec<NodeId> = self.neighbors(id).cloned().collect();
        neighbors
            .iter()
            .filter(|neighbor| self.remove_edge(id, neighbor))
            .count()
    }

    /// Remove a node together with its incident edges.
    pub fn remove_node(&mut self, id: &str) -> bool {
        self.remove_edges_with(id);
        self.adjacency.remove(id);
        self.nodes.remove(id).is_some()
    }

    /// Remove the selected nodes and edges, except those in `protected`. Removing a node
    /// takes its incident edges with it. Returns the number of elements removed.
    pub fn remove_elements(&mut self, selection: &Selection, protected: &Selection) -> usize {
        let mut removed = 0;
        for edge in selection.edges.iter().filter(|e| !protected.contains_edge(e)) {
            let (sid, tid) = edge.endpoints();
            if self.remove_edge(sid, tid) {
                removed += 1;
            }
        }
        for node in selection.nodes.iter().filter(|n| !protected.contains_node(n)) {
            if self.has_node(node) {
                removed += self.remove_edges_with(node);
                self.remove_node(node);
                removed += 1;
            }
        }
        log::debug!("Removed {} elements", removed);
        removed
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.adjacency.clear();
    }

    /// Build a graph out of a selection: every selected node, and every selected edge
    /// whose endpoints were both selected.
    pub fn from_selection(selection: &Selection) -> Self {
        let mut graph = Graph::new();
        for node in &selection.nodes {
            // Selection nodes are a set, so this cannot collide.
            let _ = graph.add_node(node.as_str());
        }
        for edge in &selection.edges {
            let (sid, tid) = edge.endpoints();
            if sid != tid && graph.has_node(sid) && graph.has_node(tid) {
                graph.link(sid, tid);
            }
        }
        graph
    }

    /// Synthesise an identifier that is not used by any node of this graph, nor handed
    /// out before by this graph.
    pub fn fresh_node_id(&mut self, prefix: &str) -> NodeId {
        loop {
            self.next_fresh += 1;
            let candidate = format!("{}{}", prefix, self.next_fresh);
            if !self.has_node(&candidate) {
                return candidate;
            }
        }
    }

    /// Export the graph as an element list: nodes, then edges, each in insertion order.
    pub fn to_elements(&self) -> Vec<Element> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by_key(|(_, tick)| **tick);
        let mut edges: Vec<_> = self.edges.iter().collect();
        edges.sort_by_key(|(_, tick)| **tick);

        nodes
            .into_iter()
            .map(|(id, _)| Element::node(id.as_str()))
            .chain(edges.into_iter().map(|(edge, _)| {
                let (source, target) = edge.endpoints();
                Element::edge(source, target)
            }))
            .collect()
    }

    /// Rebuild a graph from an element list. Node records are inserted before edge
    /// records, so the list may mention an edge before its endpoints.
    pub fn from_elements(elements: &[Element]) -> Result<Self, StructuralError> {
        let mut graph = Graph::new();
        for element in elements {
            if let Element::Node { id, .. } = element {
                graph.add_node(id.as_str())?;
            }
        }
        for element in elements {
            if let Element::Edge { source, target, .. } = element {
                graph.add_edge(source, target)?;
            }
        }
        Ok(graph)
    }
}
