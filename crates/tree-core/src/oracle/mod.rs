//! Access to the external analysis engine.
//!
//! The explorer only sees the [`Oracle`] trait. [`UciSession`] implements the
//! line protocol over any reader/writer pair and [`EngineProcess`] binds a
//! session to a spawned engine executable.

mod process;
mod session;
pub mod uci;

use std::fmt;
use std::path::PathBuf;

pub use process::{EngineConfig, EngineProcess};
pub use session::{SessionState, UciSession};

use crate::error::OracleError;
use crate::score::Score;

/// A position description understood by the engine's `position` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionSetup<'a> {
    /// The variant's initial position.
    StartPos,
    /// A position given by its encoding, optionally followed by moves.
    Fen { fen: &'a str, moves: &'a [&'a str] },
}

impl PositionSetup<'_> {
    /// Renders the `position` command for this setup.
    pub fn command(&self) -> String {
        let (mut command, moves) = match self {
            PositionSetup::StartPos => ("position startpos".to_string(), &[][..]),
            PositionSetup::Fen { fen, moves } => (format!("position fen {fen}"), *moves),
        };
        if !moves.is_empty() {
            command.push_str(" moves");
            for mv in moves {
                command.push(' ');
                command.push_str(mv);
            }
        }
        command
    }
}

/// One continuation reported by a multi-candidate search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedMove {
    pub mv: String,
    /// Engine evaluation after the move, from the searching side's perspective.
    pub score: Score,
}

impl RankedMove {
    pub fn new(mv: impl Into<String>, score: Score) -> Self {
        Self {
            mv: mv.into(),
            score,
        }
    }
}

impl fmt::Display for RankedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mv, self.score)
    }
}

/// Engine options sent once during session setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleOptions {
    /// Value of `UCI_Variant`.
    pub variant: String,
    /// NNUE network; enables `Use NNUE` when present.
    pub eval_file: Option<PathBuf>,
    /// Variant definitions loaded with the `load` command before any option.
    pub variants_file: Option<PathBuf>,
    pub threads: usize,
    /// Hash table size in MB.
    pub hash_mb: usize,
    /// Number of ranked candidates the engine reports (`MultiPV`).
    pub multipv: usize,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            variant: "chess".to_string(),
            eval_file: None,
            variants_file: None,
            threads: 4,
            hash_mb: 8192,
            multipv: 6,
        }
    }
}

impl OracleOptions {
    /// Commands issued between the handshake and the readiness check.
    pub fn setup_commands(&self) -> Vec<String> {
        let mut commands = Vec::with_capacity(7);
        if let Some(path) = &self.variants_file {
            commands.push(format!("load {}", path.display()));
        }
        commands.push(format!("setoption name UCI_Variant value {}", self.variant));
        match &self.eval_file {
            Some(path) => {
                commands.push(format!("setoption name EvalFile value {}", path.display()));
                commands.push("setoption name Use NNUE value true".to_string());
            }
            None => commands.push("setoption name Use NNUE value false".to_string()),
        }
        commands.push(format!("setoption name Threads value {}", self.threads));
        commands.push(format!("setoption name Hash value {}", self.hash_mb));
        commands.push(format!("setoption name MultiPV value {}", self.multipv));
        commands
    }
}

/// Source of position identities and ranked move evaluations.
pub trait Oracle {
    /// Returns the canonical encoding of the position described by `setup`.
    fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError>;

    /// Searches `position_key` to `depth` and returns up to `limit` candidates
    /// ordered by rank, best first.
    fn ranked_candidates(
        &mut self,
        position_key: &str,
        depth: u32,
        limit: usize,
    ) -> Result<Vec<RankedMove>, OracleError>;

    /// Ends the session. Calling it again has no effect.
    fn shutdown(&mut self) -> Result<(), OracleError>;
}

impl<T: Oracle + ?Sized> Oracle for &mut T {
    fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError> {
        (**self).position_key(setup)
    }

    fn ranked_candidates(
        &mut self,
        position_key: &str,
        depth: u32,
        limit: usize,
    ) -> Result<Vec<RankedMove>, OracleError> {
        (**self).ranked_candidates(position_key, depth, limit)
    }

    fn shutdown(&mut self) -> Result<(), OracleError> {
        (**self).shutdown()
    }
}
