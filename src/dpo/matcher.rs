use crate::dpo::graph::{Graph, NodeId};
use crate::dpo::rule::Rule;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// An embedding of a pattern into a host graph: pattern node id -> host node id.
/// Total on the pattern's nodes, injective, and edge preserving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Match(BTreeMap<NodeId, NodeId>);

impl Match {
    pub fn get(&self, pattern_node: &str) -> Option<&NodeId> {
        self.0.get(pattern_node)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
        self.0.iter()
    }

    /// The host nodes this match touches.
    pub fn image(&self) -> BTreeSet<&NodeId> {
        self.0.values().collect()
    }
}

impl FromIterator<(NodeId, NodeId)> for Match {
    fn from_iter<T: IntoIterator<Item = (NodeId, NodeId)>>(iter: T) -> Self {
        Match(iter.into_iter().collect())
    }
}

impl From<BTreeMap<NodeId, NodeId>> for Match {
    fn from(mapping: BTreeMap<NodeId, NodeId>) -> Self {
        Match(mapping)
    }
}

impl Rule {
    pub fn matches<'a>(&'a self, graph: &'a Graph) -> Matcher<'a> {
        Matcher::new(graph, self.lhs())
    }
}

/// Every embedding of `pattern` into `host`. Empty when the pattern has no nodes.
/// The order of the result is not meaningful.
pub fn find_matches(host: &Graph, pattern: &Graph) -> Vec<Match> {
    let matches: Vec<Match> = Matcher::new(host, pattern).collect();
    log::debug!(
        "Found {} matches of a {}-node pattern in a {}-node graph",
        matches.len(),
        pattern.node_count(),
        host.node_count()
    );
    matches
}

pub enum MatchingDecision {
    NoMatch,
    Continue,
    Mapped,
}

/// Host candidates for one pattern node, and how far we have scanned them.
struct Frame<'a> {
    candidates: Vec<&'a NodeId>,
    next: usize,
}

/// Hold state for the embedding search.
///
/// Pattern nodes are mapped one at a time in a fixed order where every node after the
/// first of its component has an earlier neighbour. A candidate is only accepted if it
/// is unused, has enough neighbours, and is adjacent to the images of every already
/// mapped pattern neighbour.
pub struct Matcher<'a> {
    host: &'a Graph,
    pattern: &'a Graph,
    /// Pattern nodes in the order they are mapped.
    order: Vec<&'a NodeId>,
    /// Position of each pattern node in `order`.
    position: BTreeMap<&'a str, usize>,
    /// An earlier-ordered neighbour of each pattern node, used to narrow candidates.
    anchor: Vec<Option<usize>>,
    /// One frame per pattern node currently being searched.
    frames: Vec<Frame<'a>>,
    /// `mapping[i]` is the image of `order[i]`.
    mapping: Vec<&'a NodeId>,
    used: BTreeSet<&'a str>,
    finished: bool,
}

impl<'a> Matcher<'a> {
    pub fn new(host: &'a Graph, pattern: &'a Graph) -> Self {
        let order = search_order(pattern);
        let position: BTreeMap<&str, usize> = order
            .iter()
            .copied()
            .enumerate()
            .map(|(i, node)| (node.as_str(), i))
            .collect();
        let anchor = order
            .iter()
            .enumerate()
            .map(|(i, node)| {
                pattern
                    .neighbors(node)
                    .filter_map(|n| position.get(n.as_str()).copied())
                    .filter(|&p| p < i)
                    .min()
            })
            .collect();

        let mut matcher = Self {
            host,
            pattern,
            order,
            position,
            anchor,
            frames: Vec::new(),
            mapping: Vec::new(),
            used: BTreeSet::new(),
            finished: false,
        };
        if matcher.order.is_empty() || matcher.order.len() > host.node_count() {
            matcher.finished = true;
        } else {
            let frame = matcher.frame_for(0);
            matcher.frames.push(frame);
        }
        matcher
    }

    fn frame_for(&self, depth: usize) -> Frame<'a> {
        let host = self.host;
        let candidates = match self.anchor[depth] {
            Some(anchor) => host.neighbors(self.mapping[anchor]).collect(),
            None => host.nodes().collect(),
        };
        Frame {
            candidates,
            next: 0,
        }
    }

    /// Whether mapping the pattern node at `depth` to `candidate` keeps the partial
    /// mapping injective and edge preserving.
    fn is_feasible(&self, depth: usize, candidate: &str) -> bool {
        let node = self.order[depth];
        if self.used.contains(candidate)
            || self.host.degree(candidate) < self.pattern.degree(node)
        {
            return false;
        }
        self.pattern
            .neighbors(node)
            .filter_map(|n| self.position.get(n.as_str()).copied())
            .filter(|&p| p < depth)
            .all(|p| self.host.has_edge(candidate, self.mapping[p]))
    }

    /// Extend or retract the partial mapping by one step.
    pub fn continue_search(&mut self) -> MatchingDecision {
        if self.mapping.len() == self.order.len() {
            return MatchingDecision::Mapped;
        }
        let depth = self.mapping.len();
        let mut found = None;
        {
            let frame = &self.frames[depth];
            for i in frame.next..frame.candidates.len() {
                if self.is_feasible(depth, frame.candidates[i]) {
                    found = Some(i);
                    break;
                }
            }
        }

        match found {
            Some(i) => {
                let frame = &mut self.frames[depth];
                let candidate = frame.candidates[i];
                // Bookmark progress
                frame.next = i + 1;
                log::trace!("Tentatively mapping {} -> {}", self.order[depth], candidate);
                self.mapping.push(candidate);
                self.used.insert(candidate.as_str());
                if self.mapping.len() < self.order.len() {
                    let frame = self.frame_for(depth + 1);
                    self.frames.push(frame);
                }
                MatchingDecision::Continue
            }
            None => {
                self.frames.pop();
                if self.frames.is_empty() {
                    return MatchingDecision::NoMatch;
                }
                self.retract();
                MatchingDecision::Continue
            }
        }
    }

    fn retract(&mut self) {
        if let Some(node) = self.mapping.pop() {
            self.used.remove(node.as_str());
        }
    }

    fn current_match(&self) -> Match {
        self.order
            .iter()
            .zip(&self.mapping)
            .map(|(p, h)| ((*p).clone(), (*h).clone()))
            .collect()
    }
}

impl Iterator for Matcher<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.continue_search() {
                MatchingDecision::NoMatch => {
                    self.finished = true;
                    return None;
                }
                MatchingDecision::Mapped => {
                    let output = self.current_match();
                    // Retract the last node so the next call resumes from its bookmark.
                    self.retract();
                    return Some(output);
                }
                MatchingDecision::Continue => {}
            }
        }
    }
}

/// Order pattern nodes breadth first, starting each component at its highest degree
/// node, so that every node except component roots follows one of its neighbours.
fn search_order(pattern: &Graph) -> Vec<&NodeId> {
    let mut order = Vec::with_capacity(pattern.node_count());
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut roots: Vec<&NodeId> = pattern.nodes().collect();
    roots.sort_by_key(|n| std::cmp::Reverse(pattern.degree(n)));

    for root in roots {
        if !seen.insert(root.as_str()) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for neighbor in pattern.neighbors(node) {
                if seen.insert(neighbor.as_str()) {
                    queue.push_back(neighbor);
                }
            }
        }
    }
    order
}
