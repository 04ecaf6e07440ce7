// SPDX-License-Identifier: MIT OR Apache-2.0
//! `talos-graph` - command line access to Talos bots and their skill graphs.
//!
//! Works directly on the projects directory the editor uses:
//! - `bots` lists the registered bots
//! - `skills` lists the skill catalog
//! - `create-bot` creates a bot folder and registers it
//! - `init` opens a bot's graph like the editor does, writing the default
//!   graph when none exists
//! - `show` / `check` print or validate a stored graph
//! - `export-svg` draws a stored graph

mod export;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use talos_skill_graph::config::CONFIG_FILE_NAME;
use talos_skill_graph::graph::GraphDocument;
use talos_skill_graph::{
    BotEntry, BotPath, EditorConfig, FileGraphStore, Graph, GraphStore, PortAnchorResolver,
    SkillGraphEditor, StoreError,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Manage Talos bots and their skill graphs.
#[derive(Parser)]
#[command(name = "talos-graph", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor settings file.
    #[arg(long, global = true, env = "TALOS_GRAPH_CONFIG", default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Projects directory, overriding the settings file.
    #[arg(long, global = true)]
    projects_dir: Option<PathBuf>,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered bots.
    #[command(alias = "ls")]
    Bots,

    /// List the skill catalog.
    Skills,

    /// Create a bot folder and register it.
    CreateBot {
        /// Bot name, also its folder name.
        name: String,

        /// Free-form description.
        #[arg(short, long, default_value = "")]
        description: String,

        /// Parent directory, instead of the default bots directory.
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Load a bot's skill graph, writing the default graph if none is stored.
    Init {
        /// Bot name or bot directory.
        bot: String,
    },

    /// Print a bot's skill graph.
    Show {
        /// Bot name or bot directory.
        bot: String,

        /// Print the stored JSON document instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Validate a bot's skill graph.
    Check {
        /// Bot name or bot directory.
        bot: String,
    },

    /// Draw a bot's skill graph as SVG.
    ExportSvg {
        /// Bot name or bot directory.
        bot: String,

        /// Output file.
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("talos_skill_graph={level}").parse()?)
        .add_directive(format!("talos_graph_tool={level}").parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = EditorConfig::load(&cli.config)
        .with_context(|| format!("reading settings {}", cli.config.display()))?;
    if let Some(projects_dir) = cli.projects_dir {
        config.projects_dir = projects_dir;
    }
    tracing::debug!("Projects directory: {}", config.projects_dir.display());

    let store = FileGraphStore::new(&config.projects_dir);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Command::Bots => {
            let bots = runtime.block_on(store.list_bots())?;
            if bots.is_empty() {
                println!("No bots in {}", store.bots_dir().display());
            }
            for bot in bots {
                println!("{:<20} {}  {}", bot.name, bot.path, bot.description);
            }
        }
        Command::Skills => {
            let skills = runtime.block_on(store.list_skills())?;
            if skills.is_empty() {
                println!("No skills in {}", store.skills_dir().display());
            }
            for skill in skills {
                println!("{:<20} {}", skill.name, skill.path);
            }
        }
        Command::CreateBot {
            name,
            description,
            path,
        } => {
            let entry = runtime
                .block_on(store.create_bot(&name, &description, path.as_deref()))
                .with_context(|| format!("creating bot '{name}'"))?;
            println!("Created {} at {}", entry.name, entry.path);
        }
        Command::Init { bot } => {
            let bot = runtime.block_on(resolve_bot(&store, &bot))?;
            let mut editor = SkillGraphEditor::open(store, bot.clone(), &config)?;
            editor.wait_for_load();
            let graph = editor.state().graph();
            println!(
                "{bot}: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
            editor.close();
        }
        Command::Show { bot, json } => {
            let bot = runtime.block_on(resolve_bot(&store, &bot))?;
            let document = runtime.block_on(store.load_graph(&bot))?;
            if json {
                println!("{document}");
            } else {
                print_summary(&decode(&document)?);
            }
        }
        Command::Check { bot } => {
            let bot = runtime.block_on(resolve_bot(&store, &bot))?;
            let document = runtime.block_on(store.load_graph(&bot))?;
            let graph = decode(&document)?;
            println!(
                "{bot}: ok ({} nodes, {} edges)",
                graph.node_count(),
                graph.edge_count()
            );
        }
        Command::ExportSvg { bot, output } => {
            let bot = runtime.block_on(resolve_bot(&store, &bot))?;
            let document = runtime.block_on(store.load_graph(&bot))?;
            let graph = decode(&document)?;
            let svg = export::graph_to_svg(&graph, &PortAnchorResolver::new(config.layout));
            svg::save(&output, &svg)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!("Exported {bot} to {}", output.display());
        }
    }
    Ok(())
}

/// A registered bot name, or else a bot directory
async fn resolve_bot(store: &FileGraphStore, bot: &str) -> Result<BotPath, StoreError> {
    let bots = store.list_bots().await?;
    Ok(bots
        .iter()
        .find(|entry| entry.name == bot)
        .map_or_else(|| BotPath::new(bot), BotEntry::bot_path))
}

fn decode(document: &str) -> Result<Graph> {
    let document: GraphDocument =
        serde_json::from_str(document).context("parsing skill graph document")?;
    Graph::try_from(document).context("validating skill graph")
}

fn print_summary(graph: &Graph) {
    println!("Nodes ({}):", graph.node_count());
    for node in graph.nodes() {
        println!(
            "  {} \"{}\" [{}] at ({:.1}, {:.1})",
            node.id, node.label, node.skill_type, node.x, node.y
        );
        for port in node.ports() {
            println!("    {:?} {} \"{}\": {}", port.direction, port.id, port.label, port.port_type);
        }
    }
    println!("Edges ({}):", graph.edge_count());
    for edge in graph.edges() {
        println!(
            "  {}.{} -> {}.{} ({:?})",
            edge.from_node, edge.from_port, edge.to_node, edge.to_port, edge.kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_resolve_bot_by_name_or_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGraphStore::new(dir.path());

        block_on(async {
            let entry = store.create_bot("Prar", "", None).await.unwrap();
            assert_eq!(resolve_bot(&store, "Prar").await.unwrap(), entry.bot_path());
            assert_eq!(
                resolve_bot(&store, "some/other/dir").await.unwrap(),
                BotPath::new("some/other/dir")
            );
        });
    }

    #[test]
    fn test_parse_skills_command() {
        let cli =
            Cli::try_parse_from(["talos-graph", "--projects-dir", "elsewhere", "skills"]).unwrap();
        assert!(matches!(cli.command, Command::Skills));
        assert_eq!(cli.projects_dir, Some(PathBuf::from("elsewhere")));
    }

    #[test]
    fn test_decode_rejects_dangling_edges() {
        let document = r#"{"nodes": [], "edges": [{"fromSkillId": "a", "fromPortId": "o", "toSkillId": "b", "toPortId": "i", "type": "execution"}]}"#;
        assert!(decode(document).is_err());
        assert_eq!(decode(r#"{"nodes": [], "edges": []}"#).unwrap().node_count(), 0);
    }
}
