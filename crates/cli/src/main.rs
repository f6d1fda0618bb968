mod colors;
mod config;
mod display;
mod journal;
mod show;
mod signal;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tree_core::explorer::StopReason;
use tree_core::oracle::EngineProcess;
use tree_core::{Explorer, NodeStore, SnapshotError, snapshot};

use config::{RunParams, TreeParams};
use display::Console;
use journal::AnalysisLog;

#[derive(Parser, Debug)]
#[command(
    name = "tree-explorer",
    version,
    about = "Grows a resumable best-line opening tree with a UCI engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<SubCommands>,

    #[command(flatten)]
    run_params: RunParams,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Explore until interrupted (the default)
    Run {
        #[command(flatten)]
        run_params: RunParams,
    },
    /// Print a saved tree
    Show {
        #[command(flatten)]
        tree: TreeParams,

        /// Snapshot to read instead of the one derived from the tree options
        #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Deepest ply printed
        #[arg(long, default_value_t = 4)]
        max_depth: usize,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    match args.command {
        Some(SubCommands::Run { run_params }) => run(&run_params),
        Some(SubCommands::Show {
            tree,
            file,
            max_depth,
        }) => {
            let path = file.unwrap_or_else(|| tree.snapshot_path());
            let store = snapshot::load_from_path(&path)
                .with_context(|| format!("reading {}", path.display()))?
                .with_context(|| format!("no snapshot at {}", path.display()))?;
            show::print_tree(&store, max_depth)
        }
        None => run(&args.run_params),
    }
}

fn run(params: &RunParams) -> Result<()> {
    let snapshot_path = params.tree.snapshot_path();
    if let Some(dir) = snapshot_path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let stored = load_snapshot(&snapshot_path)?;
    let log_path = params.tree.log_path();
    let analysis_log = AnalysisLog::open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    let engine_config = params.engine_config()?;
    let oracle_options = params.oracle_options();
    info!(
        "Starting {} ({}, depth {}, multipv {})",
        params.engine, oracle_options.variant, params.tree.depth, oracle_options.multipv
    );
    let engine = EngineProcess::spawn(&engine_config, &oracle_options)
        .with_context(|| format!("starting engine `{}`", params.engine))?;

    let explorer_config = params.explorer_config();
    let resumed = stored.is_some();
    let mut explorer = match stored {
        Some(store) => Explorer::new(engine, store, &explorer_config),
        None => Explorer::with_fresh_tree(engine, &params.root_setup(), &explorer_config)
            .context("identifying the root position")?,
    };

    signal::install().context("installing signal handlers")?;

    let mut console = Console::new(Some(analysis_log));
    console.show_start(explorer.store(), &snapshot_path, resumed);
    let summary = explorer.run(&params.run_options(), &signal::INTERRUPTED, &mut console);
    console.show_summary(&summary);

    match summary.stop {
        StopReason::Failed(err) => Err(err).context("exploration aborted"),
        StopReason::Cancelled | StopReason::IterationLimit => Ok(()),
    }
}

/// Loads the snapshot at `path`, moving a corrupt one aside.
fn load_snapshot(path: &Path) -> Result<Option<NodeStore>> {
    match snapshot::load_from_path(path) {
        Ok(store) => Ok(store),
        Err(err @ SnapshotError::Corrupt { .. }) => {
            let aside = quarantine_path(path);
            fs::rename(path, &aside)
                .with_context(|| format!("moving corrupt snapshot {}", path.display()))?;
            warn!(
                "{} is corrupt ({err}); moved to {} and starting a fresh tree",
                path.display(),
                aside.display()
            );
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt");
    PathBuf::from(name)
}
