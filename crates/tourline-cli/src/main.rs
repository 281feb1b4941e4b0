mod cmd_export;
mod cmd_list;
mod cmd_record;
mod cmd_refs;
mod cmd_step;
#[cfg(not(target_os = "emscripten"))]
mod cmd_watch;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tourline_engine::{TourEngine, TourHandle};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tour")]
#[command(about = "Discover, inspect, record, and edit code tours")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root to discover tours under (repeatable)
    #[arg(long = "root", global = true, default_value = ".")]
    roots: Vec<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered tours
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a tour's steps
    Show {
        /// Tour title or file path
        tour: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a step to its content address
    Resolve {
        /// Tour title or file path
        tour: String,

        /// Step number (1-based)
        step: usize,

        /// Print the step's content instead of its address
        #[arg(long)]
        content: bool,
    },
    /// Export a tour with every step's content inlined
    Export {
        /// Tour title or file path
        tour: String,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a tour file
    Validate {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Create a new, empty tour to record into
    Record {
        /// Tour title
        title: String,

        /// Ref to pin the tour to (branch, tag, or commit)
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },
    /// Edit a tour's steps
    Step {
        #[command(subcommand)]
        op: cmd_step::StepOp,
    },
    /// List refs a tour can be pinned to
    Refs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Watch tour locations and report changes
    #[cfg(not(target_os = "emscripten"))]
    Watch {
        /// Output events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("TOURLINE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Engine over `roots` with git-backed ref pinning, after one discovery pass.
pub(crate) fn open_engine(roots: &[PathBuf]) -> TourEngine {
    let roots = roots
        .iter()
        .map(|r| std::fs::canonicalize(r).unwrap_or_else(|_| r.clone()))
        .collect();
    let mut engine = TourEngine::new(roots).with_vcs(Box::new(tourline_git::GitProvider::new()));
    engine.discover();
    engine
}

/// Find a tour by exact title, or by the path of its file.
pub(crate) fn select_tour(engine: &TourEngine, selector: &str) -> Result<TourHandle> {
    if let Some(tour) = engine.find_by_title(selector) {
        return Ok(tour.clone());
    }
    let path = Path::new(selector);
    if let Ok(canonical) = std::fs::canonicalize(path)
        && let Some(tour) = engine.find_tour(&canonical.to_string_lossy())
    {
        return Ok(tour.clone());
    }
    if let Some(tour) = engine.find_tour(selector) {
        return Ok(tour.clone());
    }
    bail!("No tour titled or located at {:?}", selector)
}

/// Convert a 1-based step number to an index into `tour`.
pub(crate) fn step_index(tour: &TourHandle, number: usize) -> Result<usize> {
    let len = tour.step_count();
    if number == 0 || number > len {
        bail!("Step #{} doesn't exist; {:?} has {} steps", number, tour.title(), len);
    }
    Ok(number - 1)
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let pretty = cli.pretty;

    match cli.command {
        Commands::List { json } => cmd_list::run_list(&cli.roots, json, pretty),
        Commands::Show { tour, json } => cmd_list::run_show(&cli.roots, &tour, json, pretty),
        Commands::Resolve {
            tour,
            step,
            content,
        } => cmd_list::run_resolve(&cli.roots, &tour, step, content),
        Commands::Export { tour, output } => cmd_export::run_export(&cli.roots, &tour, output),
        Commands::Validate { input } => cmd_export::run_validate(&input),
        Commands::Record { title, git_ref } => {
            cmd_record::run(&cli.roots, &title, git_ref.as_deref())
        }
        Commands::Step { op } => cmd_step::run(&cli.roots, op),
        Commands::Refs { json } => cmd_refs::run(&cli.roots, json, pretty),
        #[cfg(not(target_os = "emscripten"))]
        Commands::Watch { json } => cmd_watch::run(&cli.roots, json),
    }
}
