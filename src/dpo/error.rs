use crate::dpo::graph::{Edge, NodeId};
use thiserror::Error;

/// A mutation that would break the graph's own invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("node {0:?} already exists")]
    DuplicateNode(NodeId),
    /// One of the edge's endpoints is not a node of the graph.
    #[error("cannot connect {from:?} and {to:?}: {missing:?} is not in the graph")]
    UnknownEndpoint {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },
    #[error("self loop on {0:?} is not allowed in a simple graph")]
    SelfLoop(NodeId),
}

/// Which side of a rule an interface element was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Lhs => f.write_str("left-hand side"),
            Side::Rhs => f.write_str("right-hand side"),
        }
    }
}

/// A rule document that cannot be turned into a well-formed rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid rule graph: {0}")]
    Structural(#[from] StructuralError),
    #[error("interface node {node:?} is missing from the {side}")]
    InterfaceNodeMissing { node: NodeId, side: Side },
    #[error("interface edge {edge} is missing from the {side}")]
    InterfaceEdgeMissing { edge: Edge, side: Side },
    /// An interface edge id that does not name exactly one pair of interface nodes.
    #[error("cannot resolve interface edge id {0:?}")]
    MalformedEdgeId(String),
}

/// Why a single match could not be rewritten. These are expected outcomes, and the
/// host graph is never modified when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteRejected {
    /// Deleting `node` (matched to `image`) would orphan the host edge to `neighbor`.
    #[error("deleting {node:?} (matched to {image:?}) would leave a dangling edge to {neighbor:?}")]
    DanglingEdge {
        node: NodeId,
        image: NodeId,
        neighbor: NodeId,
    },
    #[error("pattern node {0:?} has no image in the match")]
    UnmappedNode(NodeId),
    #[error("matched host node {0:?} no longer exists")]
    MissingImage(NodeId),
    /// Two pattern nodes share the host node `image`.
    #[error("pattern nodes {first:?} and {second:?} are both matched to {image:?}")]
    NotInjective {
        first: NodeId,
        second: NodeId,
        image: NodeId,
    },
}
