mod logger;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dpograph::dpo::document::{Format, GraphDocument};
use dpograph::dpo::store::{load_graph, load_rule, save_graph, write_graph};
use dpograph::dpo::{apply_first_applicable, find_matches, Graph, RuleStore};
use dpograph::session::{Command, Session};
use simplelog::LevelFilter;
use std::path::{Path, PathBuf};

/// Build graphs and rewrite them with double pushout rules.
#[derive(Parser)]
#[command(name = "dpograph", version)]
struct Cli {
    /// One of off, error, warn, info, debug, trace.
    #[arg(long, global = true, env = "DPOGRAPH_LOG", default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the first applicable rule at every independent match.
    Apply {
        #[arg(long)]
        graph: PathBuf,
        /// Rule files, tried in order.
        #[arg(long = "rule", required = true)]
        rules: Vec<PathBuf>,
        /// Write the result here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print every match of a rule's left-hand side.
    Matches {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        rule: PathBuf,
    },
    /// Check that rule files are well formed.
    Validate {
        #[arg(required = true)]
        rules: Vec<PathBuf>,
    },
    /// Replay a list of session commands and print the final host graph.
    Run {
        script: PathBuf,
        /// Start from this host graph instead of an empty one.
        #[arg(long)]
        graph: Option<PathBuf>,
        #[arg(long, env = "DPOGRAPH_RULES_DIR", default_value = "saved_rules")]
        rules_dir: PathBuf,
        #[arg(long, env = "DPOGRAPH_GRAPHS_DIR", default_value = "saved_graphs")]
        graphs_dir: PathBuf,
        /// Persist finalized rules and the final graph.
        #[arg(long)]
        save: bool,
    },
}

fn print_graph(graph: &Graph) -> Result<()> {
    let doc = GraphDocument {
        elements: graph.to_elements(),
    };
    println!("{}", Format::Json.render(&doc)?);
    Ok(())
}

fn run_script(
    script: &Path,
    graph: Option<&Path>,
    rules_dir: &Path,
    graphs_dir: &Path,
    save: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let commands: Vec<Command> = Format::from_path(script)
        .parse(&text)
        .with_context(|| format!("parsing script {}", script.display()))?;

    let host = match graph {
        Some(path) => load_graph(path)?,
        None => Graph::new(),
    };
    let mut session = Session::with_host(host);
    if save {
        session = session.with_store(RuleStore::new(rules_dir))?;
        log::info!(
            "Loaded {} rules from {}",
            session.rules.len(),
            rules_dir.display()
        );
    }

    for (step, command) in commands.into_iter().enumerate() {
        let outcome = session
            .execute(command)
            .with_context(|| format!("command {} failed", step + 1))?;
        log::info!("{}: {:?}", step + 1, outcome);
    }

    if save {
        save_graph(graphs_dir, &session.host)?;
    }
    print_graph(&session.host)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::start_logger(cli.log_level)?;

    match cli.command {
        Commands::Apply { graph, rules, out } => {
            let mut host = load_graph(&graph)?;
            let rules = rules
                .iter()
                .map(|path| load_rule(path))
                .collect::<Result<Vec<_>>>()?;
            match apply_first_applicable(&mut host, &rules) {
                Some((index, count)) => {
                    log::info!("Rule {} applied {} times", rules[index].id, count)
                }
                None => log::warn!("No rule was applicable"),
            }
            match out {
                Some(path) => write_graph(&path, &host),
                None => print_graph(&host),
            }
        }
        Commands::Matches { graph, rule } => {
            let host = load_graph(&graph)?;
            let rule = load_rule(&rule)?;
            let matches = find_matches(&host, rule.lhs());
            println!("{}", Format::Json.render(&matches)?);
            Ok(())
        }
        Commands::Validate { rules } => {
            for path in &rules {
                let rule = load_rule(path)?;
                println!(
                    "{}: rule {} ok ({} -> {} nodes, {} kept)",
                    path.display(),
                    rule.id,
                    rule.lhs().node_count(),
                    rule.rhs().node_count(),
                    rule.interface().node_count()
                );
            }
            Ok(())
        }
        Commands::Run {
            script,
            graph,
            rules_dir,
            graphs_dir,
            save,
        } => run_script(&script, graph.as_deref(), &rules_dir, &graphs_dir, save),
    }
}
