// Double pushout graph rewriting on undirected simple graphs.
// A rule L <- K -> R is matched into a host graph, L \ K is deleted and R \ K is glued in.

pub mod document;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod parallel;
pub mod rewriter;
pub mod rule;
pub mod store;

pub use error::{RewriteRejected, StructuralError, ValidationError};
pub use graph::{Edge, Graph, NodeId, Selection};
pub use matcher::{find_matches, Match};
pub use parallel::{apply_first_applicable, apply_parallel, apply_parallel_report};
pub use rule::Rule;
pub use store::RuleStore;
