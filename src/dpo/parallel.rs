//! Application of a rule at many non-interfering places at once.
//!
//! "Parallel" refers to the independence of the rewrites, not to threads: the selected
//! matches are rewritten one after another against the same host graph.

use crate::dpo::error::RewriteRejected;
use crate::dpo::graph::Graph;
use crate::dpo::matcher::{find_matches, Match};
use crate::dpo::rewriter::{self, Rewrite};
use crate::dpo::rule::Rule;

/// Two matches are parallel independent if their host images share no node.
pub fn are_independent(m1: &Match, m2: &Match) -> bool {
    let image = m1.image();
    m2.iter().all(|(_, host)| !image.contains(host))
}

/// Greedily keep every match that is independent of all matches kept before it, in the
/// order given. Not necessarily a largest such subset.
pub fn select_independent(matches: Vec<Match>) -> Vec<Match> {
    let mut selected: Vec<Match> = Vec::new();
    for candidate in matches {
        if selected.iter().all(|m| are_independent(m, &candidate)) {
            selected.push(candidate);
        }
    }
    selected
}

/// Outcome of [`apply_parallel_report`].
#[derive(Debug, Default)]
pub struct ParallelApplication {
    /// Number of matches of the left-hand side in the host before rewriting.
    pub found: usize,
    /// Number of matches kept by the independence filter.
    pub selected: usize,
    pub applied: Vec<Rewrite>,
    pub rejected: Vec<RewriteRejected>,
}

impl ParallelApplication {
    pub fn count(&self) -> usize {
        self.applied.len()
    }
}

/// Rewrite every match of an independent subset, returning how many succeeded.
pub fn apply_parallel(host: &mut Graph, rule: &Rule) -> usize {
    apply_parallel_report(host, rule).count()
}

/// Like [`apply_parallel`], but keep the details of every attempt.
///
/// Matches are computed once against the unmodified host. Each selected match is then
/// applied with its original mapping; independence guarantees the mappings stay valid,
/// but a match can still fail the gluing condition and is then skipped.
pub fn apply_parallel_report(host: &mut Graph, rule: &Rule) -> ParallelApplication {
    let matches = find_matches(host, rule.lhs());
    let found = matches.len();
    let selected = select_independent(matches);
    let mut report = ParallelApplication {
        found,
        selected: selected.len(),
        ..Default::default()
    };

    for m in &selected {
        match rewriter::apply(host, rule, m) {
            Ok(rewrite) => report.applied.push(rewrite),
            Err(rejected) => {
                log::warn!("Rule {} not applicable at {:?}: {}", rule.id, m, rejected);
                report.rejected.push(rejected);
            }
        }
    }
    log::info!(
        "Rule {}: {} matches, {} independent, {} applied",
        rule.id,
        report.found,
        report.selected,
        report.count()
    );
    report
}

/// Try each rule in turn and stop at the first that applies at least once. Returns the
/// index of that rule and its application count.
pub fn apply_first_applicable(host: &mut Graph, rules: &[Rule]) -> Option<(usize, usize)> {
    for (index, rule) in rules.iter().enumerate() {
        let count = apply_parallel(host, rule);
        if count > 0 {
            return Some((index, count));
        }
        log::info!("No applicable match found for rule {}", rule.id);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpo::graph::{Edge, Selection};

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

    /// L = x-y, K = {x}, R = x: delete the leaf y.
    fn get_prune_rule() -> Rule {
        Rule::from_parts(
            "prune",
            graph(&["x", "y"], &[("x", "y")]),
            graph(&["x"], &[]),
            graph(&["x"], &[]),
        )
        .unwrap()
    }

    #[test]
    fn test_independence() {
        let m1 = mapping(&[("x", "a"), ("y", "b")]);
        let m2 = mapping(&[("x", "c"), ("y", "d")]);
        let m3 = mapping(&[("x", "d"), ("y", "e")]);
        assert!(are_independent(&m1, &m2));
        assert!(are_independent(&m2, &m1));
        assert!(!are_independent(&m2, &m3));
        assert!(!are_independent(&m1, &m1));
    }

    #[test]
    fn test_select_independent_is_greedy() {
        let matches = vec![
            mapping(&[("x", "b"), ("y", "c")]),
            mapping(&[("x", "a"), ("y", "b")]),
            mapping(&[("x", "c"), ("y", "d")]),
            mapping(&[("x", "e"), ("y", "f")]),
        ];
        let selected = select_independent(matches.clone());
        // Taking b-c first blocks both a-b and c-d, even though those two together
        // would have been a larger selection.
        assert_eq!(selected, vec![matches[0].clone(), matches[3].clone()]);
        for (i, m1) in selected.iter().enumerate() {
            for m2 in &selected[i + 1..] {
                assert!(are_independent(m1, m2));
            }
        }
    }

    #[test]
    fn test_parallel_application_count() {
        let mut host = graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        let count = apply_parallel(&mut host, &get_prune_rule());
        assert_eq!(count, 2);
        assert_eq!(host.node_count(), 2);
        assert_eq!(host.edge_count(), 0);
        // Exactly one node survives per occurrence.
        assert!(host.has_node("a") ^ host.has_node("b"));
        assert!(host.has_node("c") ^ host.has_node("d"));
    }

    #[test]
    fn test_parallel_sprouts_get_distinct_ids() {
        // L = K = x-y, R = x-y plus a new neighbour z of x.
        let sprout = Rule::from_parts(
            "sprout",
            graph(&["x", "y"], &[("x", "y")]),
            graph(&["x", "y"], &[("x", "y")]),
            graph(&["x", "y", "z"], &[("x", "y"), ("x", "z")]),
        )
        .unwrap();
        let mut host = graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        let report = apply_parallel_report(&mut host, &sprout);
        assert_eq!(report.count(), 2);
        let fresh: Vec<_> = report
            .applied
            .iter()
            .map(|rewrite| rewrite.added_nodes["z"].clone())
            .collect();
        assert_ne!(fresh[0], fresh[1]);
        for id in &fresh {
            assert!(!["a", "b", "c", "d"].contains(&id.as_str()));
            assert!(host.has_node(id));
            assert_eq!(host.degree(id), 1);
        }
        assert_eq!(host.node_count(), 6);
        assert_eq!(host.edge_count(), 4);
    }

    #[test]
    fn test_parallel_report_counts_rejections() {
        // A star: every match deletes a leaf or the centre. Deleting the centre is
        // blocked by the other leaves.
        let mut host = graph(&["c", "l1", "l2"], &[("c", "l1"), ("c", "l2")]);
        let report = apply_parallel_report(&mut host, &get_prune_rule());
        assert_eq!(report.found, 4);
        assert_eq!(report.selected, 1);
        assert_eq!(report.count() + report.rejected.len(), 1);
    }

    #[test]
    fn test_no_match_applies_nothing() {
        let mut host = graph(&["a", "b"], &[]);
        let before = host.clone();
        assert_eq!(apply_parallel(&mut host, &get_prune_rule()), 0);
        assert_eq!(host, before);
    }

    #[test]
    fn test_apply_first_applicable() {
        let triangle = Selection::new(
            vec!["x", "y", "z"],
            vec![Edge::new("x", "y"), Edge::new("y", "z"), Edge::new("z", "x")],
        );
        let mut needs_triangle = Rule::initialize_from_selection(&triangle);
        needs_triangle.set_interface(&triangle);
        let rules = vec![needs_triangle, get_prune_rule()];
        let mut host = graph(&["a", "b"], &[("a", "b")]);
        assert_eq!(apply_first_applicable(&mut host, &rules), Some((1, 1)));
        assert_eq!(host.node_count(), 1);
        assert_eq!(apply_first_applicable(&mut host, &rules), None);
    }
}
