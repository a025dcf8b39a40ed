mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::GraphArgs;
use output::OutputFormat;

/// converge - Declarative convergence of hosts towards desired state
#[derive(Parser)]
#[command(name = "cvg")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the repository
  #[arg(short, long, global = true, default_value = ".")]
  repo: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List a node's items and their dependencies
  Items {
    node: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Print a node's dependency graph in Graphviz format
  Graph {
    node: String,

    #[command(flatten)]
    args: GraphArgs,
  },

  /// Inspect every item and show what would change
  Plan { node: String },

  /// Inspect and fix a single item
  Fix {
    node: String,

    /// Item id, e.g. pkg_apt:nginx
    item: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,
  },

  /// Show the order items would be applied in
  Waves { node: String },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Items { node, output } => cmd::cmd_items(&cli.repo, &node, output),
    Commands::Graph { node, args } => cmd::cmd_graph(&cli.repo, &node, &args),
    Commands::Plan { node } => cmd::cmd_plan(&cli.repo, &node),
    Commands::Fix { node, item, force } => cmd::cmd_fix(&cli.repo, &node, &item, force),
    Commands::Waves { node } => cmd::cmd_waves(&cli.repo, &node),
  }
}
