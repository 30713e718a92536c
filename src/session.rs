//! An editing session: a host graph, a rule being drafted, and the finished rules.
//!
//! User actions arrive as [`Command`]s, so a session can be driven from a script file as
//! easily as from an interactive front end.

use crate::dpo::{apply_first_applicable, Graph, NodeId, Rule, RuleStore, Selection};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// One user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    AddNode,
    /// Connect every pair of the given host nodes.
    AddEdges { nodes: Vec<NodeId> },
    RemoveSelected { selection: Selection },
    /// Start a new draft rule from a host selection.
    NewRule { selection: Selection },
    SelectInterface { selection: Selection },
    ResetRhs,
    AddLhsNode,
    AddLhsEdges { nodes: Vec<NodeId> },
    RemoveLhs { selection: Selection },
    AddRhsNode,
    AddRhsEdges { nodes: Vec<NodeId> },
    RemoveRhs { selection: Selection },
    /// Move the draft into the rule list and start a fresh draft.
    FinalizeRule,
    /// Copy a finished rule back into the draft.
    LoadRule { id: String },
    RemoveRule { id: String },
    ApplyRules,
}

/// What a command did, for the front end to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NodeAdded(NodeId),
    EdgesAdded(usize),
    Removed(usize),
    DraftChanged,
    RuleFinalized { id: String, number: usize },
    RuleRemoved(String),
    Applied { rule: String, count: usize },
    NotApplicable,
}

#[derive(Debug, Default)]
pub struct Session {
    pub host: Graph,
    pub draft: Rule,
    pub rules: Vec<Rule>,
    /// Where finalized rules are persisted, if anywhere.
    store: Option<RuleStore>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(host: Graph) -> Self {
        Self {
            host,
            ..Self::default()
        }
    }

    /// Persist finalized rules to `store`, and start from the rules already in it.
    pub fn with_store(mut self, store: RuleStore) -> Result<Self> {
        self.rules = store.load_all()?;
        self.store = Some(store);
        Ok(self)
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        log::debug!("Executing {:?}", command);
        Ok(match command {
            Command::AddNode => {
                let id = self.host.fresh_node_id("");
                self.host.add_node(id.as_str())?;
                Outcome::NodeAdded(id)
            }
            Command::AddEdges { nodes } => {
                let mut host = self.host.clone();
                let added = for_each_pair(&nodes, |sid, tid| host.add_edge(sid, tid))?;
                self.host = host;
                Outcome::EdgesAdded(added)
            }
            Command::RemoveSelected { selection } => {
                Outcome::Removed(self.host.remove_elements(&selection, &Selection::default()))
            }
            Command::NewRule { selection } => {
                self.draft = Rule::initialize_from_selection(&selection);
                Outcome::DraftChanged
            }
            Command::SelectInterface { selection } => {
                self.draft.set_interface(&selection);
                Outcome::DraftChanged
            }
            Command::ResetRhs => {
                self.draft.reset_rhs_to_lhs();
                Outcome::DraftChanged
            }
            Command::AddLhsNode => {
                let id = self.draft.fresh_node_id("lhs_");
                self.draft.add_lhs_node(&id)?;
                Outcome::NodeAdded(id)
            }
            Command::AddLhsEdges { nodes } => {
                let mut draft = self.draft.clone();
                let added = for_each_pair(&nodes, |sid, tid| draft.add_lhs_edge(sid, tid))?;
                self.draft = draft;
                Outcome::EdgesAdded(added)
            }
            Command::RemoveLhs { selection } => {
                Outcome::Removed(self.draft.remove_from_lhs(&selection))
            }
            Command::AddRhsNode => {
                let id = self.draft.fresh_node_id("rhs_");
                self.draft.add_rhs_node(&id)?;
                Outcome::NodeAdded(id)
            }
            Command::AddRhsEdges { nodes } => {
                let mut draft = self.draft.clone();
                let added = for_each_pair(&nodes, |sid, tid| draft.add_rhs_edge(sid, tid))?;
                self.draft = draft;
                Outcome::EdgesAdded(added)
            }
            Command::RemoveRhs { selection } => {
                Outcome::Removed(self.draft.remove_from_rhs(&selection))
            }
            Command::FinalizeRule => {
                self.draft.validate()?;
                if let Some(store) = &self.store {
                    store.save(&self.draft)?;
                }
                let rule = std::mem::take(&mut self.draft);
                let id = rule.id.clone();
                self.rules.push(rule);
                Outcome::RuleFinalized {
                    id,
                    number: self.rules.len(),
                }
            }
            Command::LoadRule { id } => {
                let mut rule = self.find_rule(&id)?.clone();
                rule.renew_id();
                self.draft = rule;
                Outcome::DraftChanged
            }
            Command::RemoveRule { id } => {
                self.find_rule(&id)?;
                if let Some(store) = &self.store {
                    store.remove(&id)?;
                }
                self.rules.retain(|rule| rule.id != id);
                Outcome::RuleRemoved(id)
            }
            Command::ApplyRules => match apply_first_applicable(&mut self.host, &self.rules) {
                Some((index, count)) => Outcome::Applied {
                    rule: self.rules[index].id.clone(),
                    count,
                },
                None => Outcome::NotApplicable,
            },
        })
    }

    fn find_rule(&self, id: &str) -> Result<&Rule> {
        self.rules
            .iter()
            .find(|rule| rule.id == id)
            .ok_or_else(|| anyhow!("no rule with id {:?}", id))
    }
}

/// Run `connect` on every pair of `nodes`, counting the calls that added something.
/// Stops at the first error, so callers hand it a scratch copy.
fn for_each_pair<F, E>(nodes: &[NodeId], mut connect: F) -> Result<usize>
where
    F: FnMut(&str, &str) -> std::result::Result<bool, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut added = 0;
    for (i, sid) in nodes.iter().enumerate() {
        for tid in &nodes[i + 1..] {
            if connect(sid, tid)? {
                added += 1;
            }
        }
    }
    Ok(added)
}
