use crate::dpo::document::{InterfaceDocument, RuleDocument};
use crate::dpo::error::{Side, StructuralError, ValidationError};
use crate::dpo::graph::{Graph, NodeId, Selection};

/// Describes a rewrite rule as a span `L <- K -> R`.
///
/// Every node and edge of the interface K also exists, by identifier, in both L and R.
/// Rewriting deletes `L \ K`, keeps K, and adds `R \ K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    lhs: Graph,
    interface: Graph,
    rhs: Graph,
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule {
    /// An empty rule with a random id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            lhs: Graph::new(),
            interface: Graph::new(),
            rhs: Graph::new(),
        }
    }

    /// Assemble a rule from its three graphs, checking that K is shared by L and R.
    pub fn from_parts(
        id: impl Into<String>,
        lhs: Graph,
        interface: Graph,
        rhs: Graph,
    ) -> Result<Self, ValidationError> {
        let rule = Self {
            id: id.into(),
            lhs,
            interface,
            rhs,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Build L and R as identical copies of a selection. K starts out empty.
    pub fn initialize_from_selection(selection: &Selection) -> Self {
        let lhs = Graph::from_selection(selection);
        Self {
            rhs: lhs.clone(),
            lhs,
            ..Self::new()
        }
    }

    pub fn lhs(&self) -> &Graph {
        &self.lhs
    }

    pub fn interface(&self) -> &Graph {
        &self.interface
    }

    pub fn rhs(&self) -> &Graph {
        &self.rhs
    }

    /// Give the rule a new random id, e.g. when it is copied back into an editor.
    pub fn renew_id(&mut self) {
        self.id = uuid::Uuid::new_v4().to_string();
    }

    /// Recompute K from a selection. Only nodes present in both L and R are kept, and
    /// only edges present in both whose endpoints made it into K. Anything else in the
    /// selection is ignored.
    pub fn set_interface(&mut self, selection: &Selection) {
        let mut interface = Graph::new();
        for node in &selection.nodes {
            if self.lhs.has_node(node) && self.rhs.has_node(node) {
                let _ = interface.add_node(node.as_str());
            }
        }
        for edge in &selection.edges {
            let (sid, tid) = edge.endpoints();
            if interface.has_node(sid)
                && interface.has_node(tid)
                && self.lhs.contains_edge(edge)
                && self.rhs.contains_edge(edge)
            {
                let _ = interface.add_edge(sid, tid);
            }
        }
        log::debug!(
            "Interface of rule {} now has {} nodes and {} edges",
            self.id,
            interface.node_count(),
            interface.edge_count()
        );
        self.interface = interface;
    }

    /// Discard R and replace it with a copy of L.
    pub fn reset_rhs_to_lhs(&mut self) {
        self.rhs = self.lhs.clone();
    }

    /// Add a node to the pattern. It is added to R as well so that the rule stays a
    /// no-op for it until R is edited.
    pub fn add_lhs_node(&mut self, id: &str) -> Result<(), StructuralError> {
        if self.rhs.has_node(id) {
            return Err(StructuralError::DuplicateNode(id.to_string()));
        }
        self.lhs.add_node(id)?;
        self.rhs.add_node(id)
    }

    pub fn add_lhs_edge(&mut self, sid: &str, tid: &str) -> Result<bool, StructuralError> {
        let added = self.lhs.add_edge(sid, tid)?;
        // L nodes are always R nodes unless R was edited, in which case the edge stays L only.
        if self.rhs.has_node(sid) && self.rhs.has_node(tid) {
            self.rhs.add_edge(sid, tid)?;
        }
        Ok(added)
    }

    pub fn add_rhs_node(&mut self, id: &str) -> Result<(), StructuralError> {
        self.rhs.add_node(id)
    }

    pub fn add_rhs_edge(&mut self, sid: &str, tid: &str) -> Result<bool, StructuralError> {
        self.rhs.add_edge(sid, tid)
    }

    /// Pick an identifier that is unused in both L and R.
    pub fn fresh_node_id(&mut self, prefix: &str) -> NodeId {
        loop {
            let id = self.lhs.fresh_node_id(prefix);
            if !self.rhs.has_node(&id) {
                return id;
            }
        }
    }

    /// Remove a selection from both L and R. Interface elements are protected.
    pub fn remove_from_lhs(&mut self, selection: &Selection) -> usize {
        let protected = self.interface_selection();
        let removed = self.lhs.remove_elements(selection, &protected);
        self.rhs.remove_elements(selection, &protected);
        removed
    }

    /// Remove a selection from R only. Interface elements are protected.
    pub fn remove_from_rhs(&mut self, selection: &Selection) -> usize {
        let protected = self.interface_selection();
        self.rhs.remove_elements(selection, &protected)
    }

    fn interface_selection(&self) -> Selection {
        Selection::new(
            self.interface.nodes().cloned(),
            self.interface.edges().cloned(),
        )
    }

    /// Check that every interface node and edge exists in both L and R.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (side, graph) in [(Side::Lhs, &self.lhs), (Side::Rhs, &self.rhs)] {
            if let Some(node) = self.interface.nodes().find(|n| !graph.has_node(n)) {
                return Err(ValidationError::InterfaceNodeMissing {
                    node: node.clone(),
                    side,
                });
            }
            if let Some(edge) = self.interface.edges().find(|e| !graph.contains_edge(e)) {
                return Err(ValidationError::InterfaceEdgeMissing {
                    edge: edge.clone(),
                    side,
                });
            }
        }
        Ok(())
    }

    pub fn to_document(&self) -> RuleDocument {
        RuleDocument {
            id: self.id.clone(),
            lhs: self.lhs.to_elements(),
            rhs: self.rhs.to_elements(),
            k: InterfaceDocument {
                nodes: self.interface.nodes().cloned().collect(),
                edges: self.interface.edges().map(|e| e.id()).collect(),
            },
        }
    }
}

impl TryFrom<&RuleDocument> for Rule {
    type Error = ValidationError;

    fn try_from(doc: &RuleDocument) -> Result<Self, Self::Error> {
        let lhs = Graph::from_elements(&doc.lhs)?;
        let rhs = Graph::from_elements(&doc.rhs)?;
        let mut interface = Graph::new();
        for node in &doc.k.nodes {
            interface.add_node(node.as_str())?;
        }
        for edge_id in &doc.k.edges {
            let edge = doc.k.resolve_edge(edge_id)?;
            let (sid, tid) = edge.endpoints();
            interface.add_edge(sid, tid)?;
        }
        Rule::from_parts(doc.id.clone(), lhs, interface, rhs)
    }
}
