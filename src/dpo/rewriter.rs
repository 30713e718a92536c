//! The double pushout rewrite step.

use crate::dpo::error::RewriteRejected;
use crate::dpo::graph::{Edge, Graph, NodeId};
use crate::dpo::matcher::Match;
use crate::dpo::rule::Rule;
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of identifiers synthesised for nodes created by a rewrite.
pub const FRESH_NODE_PREFIX: &str = "n";

/// What a successful rewrite did to the host graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewrite {
    pub removed_nodes: BTreeSet<NodeId>,
    pub removed_edges: BTreeSet<Edge>,
    /// Created `R \ K` nodes: rule node id -> fresh host node id.
    pub added_nodes: BTreeMap<NodeId, NodeId>,
    pub added_edges: BTreeSet<Edge>,
}

impl Rewrite {
    pub fn is_identity(&self) -> bool {
        self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
            && self.added_nodes.is_empty()
            && self.added_edges.is_empty()
    }
}

/// Everything a rewrite will touch, resolved against the host before mutating it.
struct Plan<'r> {
    delete_nodes: Vec<NodeId>,
    delete_edges: Vec<Edge>,
    add_nodes: Vec<&'r NodeId>,
    add_edges: Vec<&'r Edge>,
}

/// Apply `rule` at `m`. On rejection the host is left exactly as it was.
pub fn apply(host: &mut Graph, rule: &Rule, m: &Match) -> Result<Rewrite, RewriteRejected> {
    let plan = check(host, rule, m)?;
    let mut rewrite = Rewrite::default();

    // Edges go first so that no edge is ever left with a missing endpoint.
    for edge in plan.delete_edges {
        let (sid, tid) = edge.endpoints();
        if host.remove_edge(sid, tid) {
            rewrite.removed_edges.insert(edge);
        }
    }
    for node in plan.delete_nodes {
        host.remove_node(&node);
        rewrite.removed_nodes.insert(node);
    }

    for node in plan.add_nodes {
        let id = host.fresh_node_id(FRESH_NODE_PREFIX);
        // The fresh id is unused, so this cannot collide.
        let _ = host.add_node(id.as_str());
        rewrite.added_nodes.insert(node.clone(), id);
    }
    for edge in plan.add_edges {
        let (sid, tid) = edge.endpoints();
        let resolve = |node: &str| {
            rewrite
                .added_nodes
                .get(node)
                .or_else(|| m.get(node))
                .cloned()
        };
        if let (Some(sid), Some(tid)) = (resolve(sid), resolve(tid)) {
            if host.link(&sid, &tid) {
                rewrite.added_edges.insert(Edge::new(sid, tid));
            }
        }
    }

    log::info!(
        "Applied rule {}: -{} nodes -{} edges +{} nodes +{} edges",
        rule.id,
        rewrite.removed_nodes.len(),
        rewrite.removed_edges.len(),
        rewrite.added_nodes.len(),
        rewrite.added_edges.len()
    );
    Ok(rewrite)
}

/// Validate the match and the gluing condition without touching the host.
fn check<'r>(host: &Graph, rule: &'r Rule, m: &Match) -> Result<Plan<'r>, RewriteRejected> {
    let lhs = rule.lhs();
    let interface = rule.interface();

    let mut images: BTreeMap<&str, &NodeId> = BTreeMap::new();
    let mut preimages: BTreeMap<&NodeId, &NodeId> = BTreeMap::new();
    for node in lhs.nodes() {
        let image = m
            .get(node)
            .ok_or_else(|| RewriteRejected::UnmappedNode(node.clone()))?;
        if !host.has_node(image) {
            return Err(RewriteRejected::MissingImage(image.clone()));
        }
        if let Some(first) = preimages.insert(image, node) {
            return Err(RewriteRejected::NotInjective {
                first: first.clone(),
                second: node.clone(),
                image: image.clone(),
            });
        }
        images.insert(node.as_str(), image);
    }

    let mut delete_nodes = Vec::new();
    for node in lhs.nodes().filter(|n| !interface.has_node(n)) {
        let image = images[node.as_str()];
        let allowed: BTreeSet<&NodeId> = lhs.neighbors(node).map(|n| images[n.as_str()]).collect();
        if let Some(neighbor) = host.neighbors(image).find(|h| !allowed.contains(h)) {
            log::debug!("Dangling edge {}-{} blocks deleting {}", image, neighbor, node);
            return Err(RewriteRejected::DanglingEdge {
                node: node.clone(),
                image: image.clone(),
                neighbor: neighbor.clone(),
            });
        }
        delete_nodes.push(image.clone());
    }

    let delete_edges = lhs
        .edges()
        .filter(|e| !interface.contains_edge(e))
        .map(|e| {
            let (a, b) = e.endpoints();
            Edge::new(images[a].as_str(), images[b].as_str())
        })
        .collect();

    let rhs = rule.rhs();
    Ok(Plan {
        delete_nodes,
        delete_edges,
        add_nodes: rhs.nodes().filter(|n| !interface.has_node(n)).collect(),
        add_edges: rhs.edges().filter(|e| !interface.contains_edge(e)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpo::graph::Selection;
    use maplit::{btreemap, btreeset};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for node in nodes {
            graph.add_node(*node).unwrap();
        }
        for (sid, tid) in edges {
            graph.add_edge(sid, tid).unwrap();
        }
        graph
    }

    fn mapping(pairs: &[(&str, &str)]) -> Match {
        pairs
            .iter()
            .map(|(p, h)| (p.to_string(), h.to_string()))
            .collect()
    }

    /// L = A-B, K = {A}, R = A-D.
    fn get_replace_leaf_rule() -> Rule {
        Rule::from_parts(
            "replace-leaf",
            graph(&["A", "B"], &[("A", "B")]),
            graph(&["A"], &[]),
            graph(&["A", "D"], &[("A", "D")]),
        )
        .unwrap()
    }

    #[test]
    fn test_rewrite_leaf() {
        let mut host = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C")]);
        let rule = get_replace_leaf_rule();
        let rewrite = apply(&mut host, &rule, &mapping(&[("A", "A"), ("B", "B")])).unwrap();
        let fresh = rewrite.added_nodes["D"].clone();
        assert_eq!(rewrite.removed_nodes, btreeset! { "B".to_string() });
        assert_eq!(rewrite.removed_edges, btreeset! { Edge::new("A", "B") });
        assert_eq!(rewrite.added_edges, btreeset! { Edge::new("A", fresh.as_str()) });
        assert_eq!(
            host,
            graph(&["A", "C", fresh.as_str()], &[("A", "C"), ("A", fresh.as_str())])
        );
    }

    /// In the path A-B-C, deleting B would orphan B-C, which the rule does not cover.
    #[test]
    fn test_dangling_edge_leaves_host_untouched() {
        let mut host = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let before = host.clone();
        let before_elements = host.to_elements();
        let rule = get_replace_leaf_rule();
        let err = apply(&mut host, &rule, &mapping(&[("A", "A"), ("B", "B")])).unwrap_err();
        assert_eq!(
            err,
            RewriteRejected::DanglingEdge {
                node: "B".to_string(),
                image: "B".to_string(),
                neighbor: "C".to_string()
            }
        );
        assert_eq!(host, before);
        assert_eq!(host.to_elements(), before_elements);
    }

    #[test]
    fn test_delete_middle_of_path_when_fully_matched() {
        // L = x-y-z, K = {x, z}, R = x-z: contract the middle node.
        let rule = Rule::from_parts(
            "contract",
            graph(&["x", "y", "z"], &[("x", "y"), ("y", "z")]),
            graph(&["x", "z"], &[]),
            graph(&["x", "z"], &[("x", "z")]),
        )
        .unwrap();
        let mut host = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let rewrite = apply(&mut host, &rule, &mapping(&[("x", "a"), ("y", "b"), ("z", "c")])).unwrap();
        assert!(rewrite.added_nodes.is_empty());
        assert_eq!(host, graph(&["a", "c"], &[("a", "c")]));
    }

    #[test]
    fn test_identity_rule_is_noop() {
        let selection = Selection::new(vec!["p", "q"], vec![Edge::new("p", "q")]);
        let mut rule = Rule::initialize_from_selection(&selection);
        rule.set_interface(&selection);
        let mut host = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let before = host.clone();
        for m in crate::dpo::matcher::find_matches(&before, rule.lhs()) {
            let rewrite = apply(&mut host, &rule, &m).unwrap();
            assert!(rewrite.is_identity());
            assert_eq!(host, before);
        }
    }

    #[test]
    fn test_fresh_ids_do_not_collide() {
        // R adds two nodes connected to each other and to the kept node.
        let rule = Rule::from_parts(
            "sprout",
            graph(&["x"], &[]),
            graph(&["x"], &[]),
            graph(&["x", "u", "v"], &[("x", "u"), ("u", "v")]),
        )
        .unwrap();
        let mut host = graph(&["n1", "n3"], &[]);
        let rewrite = apply(&mut host, &rule, &mapping(&[("x", "n1")])).unwrap();
        let added: BTreeSet<_> = rewrite.added_nodes.values().cloned().collect();
        assert_eq!(added.len(), 2);
        assert!(!added.contains("n1") && !added.contains("n3"));
        assert_eq!(host.node_count(), 4);
        assert!(host.has_edge("n1", &rewrite.added_nodes["u"]));
        assert!(host.has_edge(&rewrite.added_nodes["u"], &rewrite.added_nodes["v"]));
    }

    #[test]
    fn test_delete_edge_between_kept_nodes() {
        // K keeps both nodes but not the edge between them.
        let rule = Rule::from_parts(
            "cut",
            graph(&["x", "y"], &[("x", "y")]),
            graph(&["x", "y"], &[]),
            graph(&["x", "y"], &[]),
        )
        .unwrap();
        let mut host = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let rewrite = apply(&mut host, &rule, &mapping(&[("x", "b"), ("y", "c")])).unwrap();
        assert_eq!(rewrite.removed_edges, btreeset! { Edge::new("b", "c") });
        assert_eq!(host, graph(&["a", "b", "c"], &[("a", "b")]));
    }

    #[test]
    fn test_rejects_partial_and_stale_matches() {
        let rule = get_replace_leaf_rule();
        let mut host = graph(&["A", "B"], &[("A", "B")]);
        assert_eq!(
            apply(&mut host, &rule, &mapping(&[("A", "A")])),
            Err(RewriteRejected::UnmappedNode("B".to_string()))
        );
        assert_eq!(
            apply(&mut host, &rule, &Match::from(btreemap! {
                "A".to_string() => "A".to_string(),
                "B".to_string() => "gone".to_string(),
            })),
            Err(RewriteRejected::MissingImage("gone".to_string()))
        );
        assert_eq!(host.node_count(), 2);
    }

    #[test]
    fn test_rejects_non_injective_match() {
        // Joining two kept nodes that share an image would make a self loop.
        let rule = Rule::from_parts(
            "join",
            graph(&["x", "y"], &[]),
            graph(&["x", "y"], &[]),
            graph(&["x", "y"], &[("x", "y")]),
        )
        .unwrap();
        let mut host = graph(&["a"], &[]);
        let before = host.clone();
        assert_eq!(
            apply(&mut host, &rule, &mapping(&[("x", "a"), ("y", "a")])),
            Err(RewriteRejected::NotInjective {
                first: "x".to_string(),
                second: "y".to_string(),
                image: "a".to_string(),
            })
        );
        assert_eq!(host, before);
        assert_eq!(host.edge_count(), 0);
    }
}
