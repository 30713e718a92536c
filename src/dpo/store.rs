//! Rules and graphs on disk.
//!
//! Rules are kept one per file in a directory, named `rule_<seq>_<id prefix>.json`, where
//! `seq` is the human-facing rule number. Graph snapshots are `graph_<seq>.json`.

use crate::dpo::document::{Format, GraphDocument, RuleDocument};
use crate::dpo::graph::Graph;
use crate::dpo::rule::Rule;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const RULE_PREFIX: &str = "rule_";
const GRAPH_PREFIX: &str = "graph_";

/// Read a rule from a JSON or YAML file, validating it.
pub fn load_rule(path: &Path) -> Result<Rule> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading rule {}", path.display()))?;
    let doc: RuleDocument = Format::from_path(path)
        .parse(&text)
        .with_context(|| format!("parsing rule {}", path.display()))?;
    Rule::try_from(&doc).with_context(|| format!("invalid rule {}", path.display()))
}

/// Read a host graph from a JSON or YAML file.
pub fn load_graph(path: &Path) -> Result<Graph> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading graph {}", path.display()))?;
    let doc: GraphDocument = Format::from_path(path)
        .parse(&text)
        .with_context(|| format!("parsing graph {}", path.display()))?;
    Graph::from_elements(&doc.elements).with_context(|| format!("invalid graph {}", path.display()))
}

/// Write a host graph to `path`, in the format its extension asks for.
pub fn write_graph(path: &Path, graph: &Graph) -> Result<()> {
    let doc = GraphDocument {
        elements: graph.to_elements(),
    };
    let text = Format::from_path(path).render(&doc)?;
    fs::write(path, text).with_context(|| format!("writing graph {}", path.display()))
}

/// Save a graph snapshot as the next `graph_<seq>.json` in `dir`.
pub fn save_graph(dir: &Path, graph: &Graph) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let seq = next_sequence(&numbered_files(dir, GRAPH_PREFIX)?);
    let path = dir.join(format!("{}{:03}.json", GRAPH_PREFIX, seq));
    write_graph(&path, graph)?;
    log::info!("Saved graph to {}", path.display());
    Ok(path)
}

/// The sequence number in a name like `rule_012_ab12cd34.json` or `graph_7.json`.
fn sequence_of(name: &str, prefix: &str) -> Option<u64> {
    let rest = name.strip_prefix(prefix)?.strip_suffix(".json")?;
    let digits = rest.split('_').next()?;
    digits.parse().ok()
}

/// `.json` files in `dir` named `<prefix><seq>...`, sorted by sequence number. A missing
/// directory has no files.
fn numbered_files(dir: &Path, prefix: &str) -> Result<Vec<(u64, PathBuf)>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let seq = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| sequence_of(name, prefix));
        if let Some(seq) = seq {
            files.push((seq, path));
        }
    }
    files.sort();
    Ok(files)
}

/// One past the highest sequence number in use, so numbers are never reused.
fn next_sequence(files: &[(u64, PathBuf)]) -> u64 {
    files.iter().map(|(seq, _)| *seq).max().unwrap_or(0) + 1
}

/// A directory of saved rules.
#[derive(Debug)]
pub struct RuleStore {
    dir: PathBuf,
}

impl RuleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a rule under the next sequence number. Returns the file written.
    pub fn save(&self, rule: &Rule) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let seq = next_sequence(&numbered_files(&self.dir, RULE_PREFIX)?);
        let short_id: String = rule.id.chars().take(8).collect();
        let path = self
            .dir
            .join(format!("{}{:03}_{}.json", RULE_PREFIX, seq, short_id));
        let text = Format::Json.render(&rule.to_document())?;
        fs::write(&path, text).with_context(|| format!("writing rule {}", path.display()))?;
        log::info!("Saved rule {} as {}", rule.id, path.display());
        Ok(path)
    }

    /// Every saved rule, in sequence order. A malformed file aborts the whole load.
    pub fn load_all(&self) -> Result<Vec<Rule>> {
        numbered_files(&self.dir, RULE_PREFIX)?
            .iter()
            .map(|(_, path)| load_rule(path))
            .collect()
    }

    /// Delete the saved files of the rule with this id. Returns how many were deleted.
    /// Files that do not load are left alone.
    pub fn remove(&self, id: &str) -> Result<usize> {
        let mut removed = 0;
        for (_, path) in numbered_files(&self.dir, RULE_PREFIX)? {
            let rule = match load_rule(&path) {
                Ok(rule) => rule,
                Err(e) => {
                    log::warn!("Skipping {}: {:#}", path.display(), e);
                    continue;
                }
            };
            if rule.id == id {
                fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpo::graph::{Edge, Selection};

    fn get_test_rule() -> Rule {
        let selection = Selection::new(vec!["a", "b"], vec![Edge::new("a", "b")]);
        let mut rule = Rule::initialize_from_selection(&selection);
        rule.set_interface(&Selection::new(vec!["a"], Vec::<Edge>::new()));
        rule
    }

    #[test]
    fn test_save_and_load_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("rules"));
        assert!(store.load_all().unwrap().is_empty());

        let first = get_test_rule();
        let second = get_test_rule();
        let path = store.save(&first).unwrap();
        store.save(&second).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("rule_001_"), "{}", name);

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![first.clone(), second]);

        assert_eq!(store.remove(&first.id).unwrap(), 1);
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_sequence_numbers_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path());
        let mut rules = vec![get_test_rule(), get_test_rule(), get_test_rule()];
        rules[0].id = "bbbbbbbb-1".to_string();
        rules[1].id = "cccccccc-2".to_string();
        rules[2].id = "aaaaaaaa-3".to_string();
        store.save(&rules[0]).unwrap();
        store.save(&rules[1]).unwrap();
        store.remove(&rules[0].id).unwrap();
        let path = store.save(&rules[2]).unwrap();
        assert!(path.ends_with("rule_003_aaaaaaaa.json"), "{}", path.display());
        let ids: Vec<_> = store.load_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["cccccccc-2", "aaaaaaaa-3"]);
    }

    #[test]
    fn test_files_sort_by_number() {
        let dir = tempfile::tempdir().unwrap();
        for name in &["rule_1000_a.json", "rule_101_b.json", "rule_9_c.json", "notes.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = numbered_files(dir.path(), RULE_PREFIX).unwrap();
        let seqs: Vec<_> = files.iter().map(|(seq, _)| *seq).collect();
        assert_eq!(seqs, vec![9, 101, 1000]);
        assert_eq!(next_sequence(&files), 1001);
    }

    #[test]
    fn test_remove_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rule_001_bad.json"), "not json").unwrap();
        let store = RuleStore::new(dir.path());
        let rule = get_test_rule();
        store.save(&rule).unwrap();
        assert_eq!(store.remove(&rule.id).unwrap(), 1);
        assert!(dir.path().join("rule_001_bad.json").exists());
    }

    #[test]
    fn test_load_rejects_malformed_rule() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rule_001_bad.json"),
            r#"{"id": "bad", "lhs": [{"id": "a"}], "rhs": [], "k": {"nodes": ["a"], "edges": []}}"#,
        )
        .unwrap();
        let err = RuleStore::new(dir.path()).load_all().unwrap_err();
        assert!(format!("{:#}", err).contains("right-hand side"), "{:#}", err);
    }

    #[test]
    fn test_load_yaml_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grow.yaml");
        fs::write(
            &path,
            r#"
id: grow
lhs:
  - {id: a}
rhs:
  - {id: a}
  - {id: b}
  - {source: a, target: b}
k:
  nodes: [a]
"#,
        )
        .unwrap();
        let rule = load_rule(&path).unwrap();
        assert_eq!(rule.id, "grow");
        assert!(rule.rhs().has_edge("a", "b"));
    }

    #[test]
    fn test_save_and_load_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = Graph::new();
        graph.add_node("1").unwrap();
        graph.add_node("2").unwrap();
        graph.add_edge("1", "2").unwrap();
        let path = save_graph(dir.path(), &graph).unwrap();
        assert!(path.ends_with("graph_001.json"));
        assert_eq!(load_graph(&path).unwrap(), graph);
        let second = save_graph(dir.path(), &graph).unwrap();
        assert!(second.ends_with("graph_002.json"));
    }
}
