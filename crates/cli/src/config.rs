//! Command-line parameters and their translation into library configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use tree_core::explorer::{RunOptions, SavePolicy};
use tree_core::oracle::{EngineConfig, OracleOptions, PositionSetup};
use tree_core::{ExplorerConfig, SelectionPolicy};

/// Variant definitions picked up from the working directory when present.
pub const VARIANTS_FILE: &str = "variants.ini";

const EVAL_FILE_EXTENSION: &str = "nnue";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Always follow the best-scored candidate
    #[default]
    Strict,
    /// Trade score against the length of each candidate's unresolved best line
    Progress,
}

/// Locates one tree on disk.
#[derive(Args, Debug, Clone)]
pub struct TreeParams {
    /// Variant name, also the snapshot subdirectory
    #[arg(long, default_value = "chess")]
    pub variant: String,

    /// Fixed engine search depth
    #[arg(long, default_value_t = 16)]
    pub depth: u32,

    /// Working directory holding the per-variant snapshots and analysis logs
    #[arg(long, default_value = ".", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub dir: PathBuf,
}

impl TreeParams {
    /// `<dir>/<variant>/<variant>_<depth>.txt`
    pub fn snapshot_path(&self) -> PathBuf {
        self.variant_dir()
            .join(format!("{}_{}.txt", self.variant, self.depth))
    }

    /// `<dir>/<variant>/<variant>_<depth>.log`
    pub fn log_path(&self) -> PathBuf {
        self.snapshot_path().with_extension("log")
    }

    fn variant_dir(&self) -> PathBuf {
        self.dir.join(&self.variant)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunParams {
    #[command(flatten)]
    pub tree: TreeParams,

    /// Engine command line (program path and arguments)
    #[arg(long, default_value = "stockfish")]
    pub engine: String,

    /// NNUE evaluation file; defaults to the first `*.nnue` in the variant directory
    #[arg(long = "eval-file", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub eval_file: Option<PathBuf>,

    /// Variant definitions to load; defaults to `variants.ini` when it exists
    #[arg(long = "variants-file", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub variants_file: Option<PathBuf>,

    /// Candidates requested per analysis
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u16).range(1..))]
    pub multipv: u16,

    #[arg(long, default_value_t = 4)]
    pub threads: usize,

    /// Engine hash size in MB
    #[arg(long, default_value_t = 8192, value_name = "MB")]
    pub hash: usize,

    /// Centipawns a score loses per ply when backed up
    #[arg(long, default_value_t = 5)]
    pub tempo: i32,

    #[arg(long, value_enum, default_value_t = Policy::Strict)]
    pub policy: Policy,

    /// Root position of a fresh tree; the variant's start position if omitted
    #[arg(long = "root-fen", value_name = "FEN")]
    pub root_fen: Option<String>,

    /// Analyses between snapshots (0 disables)
    #[arg(long = "save-every", default_value_t = 256)]
    pub save_every: u64,

    /// Seconds between snapshots (0 disables)
    #[arg(long = "save-interval", default_value_t = 600, value_name = "SECONDS")]
    pub save_interval: u64,

    /// Stop after this many analyses
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<u64>,

    /// Consecutive failed analyses tolerated before giving up
    #[arg(long = "max-retries", default_value_t = 3)]
    pub max_retries: u32,
}

impl RunParams {
    /// Splits `--engine` into program and arguments.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let (program, args) = parse_engine_command(&self.engine);
        if program.is_empty() {
            bail!("empty engine command");
        }
        let mut config = EngineConfig::new(program);
        config.args = args;
        Ok(config)
    }

    pub fn oracle_options(&self) -> OracleOptions {
        OracleOptions {
            variant: self.tree.variant.clone(),
            eval_file: self
                .eval_file
                .clone()
                .or_else(|| find_eval_file(&self.tree.variant_dir())),
            variants_file: self.variants_file.clone().or_else(|| {
                let default = PathBuf::from(VARIANTS_FILE);
                default.is_file().then_some(default)
            }),
            threads: self.threads,
            hash_mb: self.hash,
            multipv: usize::from(self.multipv),
        }
    }

    pub fn explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            search_depth: self.tree.depth,
            candidate_limit: usize::from(self.multipv),
            tempo_decay: self.tempo,
            policy: match self.policy {
                Policy::Strict => SelectionPolicy::Strict,
                Policy::Progress => SelectionPolicy::progress_weighted(self.tree.depth),
            },
        }
    }

    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new(self.tree.snapshot_path());
        options.save_policy = SavePolicy {
            every_analyses: (self.save_every > 0).then_some(self.save_every),
            every: (self.save_interval > 0).then(|| Duration::from_secs(self.save_interval)),
        };
        options.max_iterations = self.max_iterations;
        options.max_retries = self.max_retries;
        options
    }

    pub fn root_setup(&self) -> PositionSetup<'_> {
        match &self.root_fen {
            Some(fen) => PositionSetup::Fen { fen, moves: &[] },
            None => PositionSetup::StartPos,
        }
    }
}

/// First `*.nnue` file in `dir`, by name.
fn find_eval_file(dir: &Path) -> Option<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(EVAL_FILE_EXTENSION))
        })
        .collect();
    found.sort();
    found.into_iter().next()
}

/// Parse an engine command string into program and arguments.
///
/// Quoting follows shell rules on Unix; elsewhere the command is split on
/// whitespace.
pub fn parse_engine_command(engine_cmd: &str) -> (String, Vec<String>) {
    #[cfg(not(windows))]
    if let Some(parts) = shlex::split(engine_cmd) {
        return split_program(parts);
    }

    split_program(engine_cmd.split_whitespace().map(str::to_string).collect())
}

fn split_program(mut parts: Vec<String>) -> (String, Vec<String>) {
    if parts.is_empty() {
        return (String::new(), Vec::new());
    }
    let program = parts.remove(0);
    (program, parts)
}
