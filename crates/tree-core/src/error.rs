//! Error types for the tree explorer.
//!
//! Failures are grouped by the layer that raises them: line-level parse
//! failures, engine session failures, snapshot failures, and the explorer
//! errors that wrap the other two.

use std::error::Error;
use std::fmt;
use std::io;

/// A response line or snapshot field that does not have the expected shape.
///
/// Line-level parse failures are recovered where they happen; the offending
/// line is dropped and the exchange continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ParseError {}

/// Failures talking to the analysis engine.
#[derive(Debug)]
pub enum OracleError {
    /// The engine executable could not be started.
    Spawn(io::Error),
    /// Reading from or writing to the engine pipes failed.
    Io(io::Error),
    /// The engine exited, or an expected terminator or marker line never came.
    Protocol(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Spawn(err) => write!(f, "Failed to start engine: {err}"),
            OracleError::Io(err) => write!(f, "Engine IO error: {err}"),
            OracleError::Protocol(msg) => write!(f, "Engine protocol error: {msg}"),
        }
    }
}

impl Error for OracleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OracleError::Spawn(err) | OracleError::Io(err) => Some(err),
            OracleError::Protocol(_) => None,
        }
    }
}

impl From<io::Error> for OracleError {
    fn from(err: io::Error) -> Self {
        OracleError::Io(err)
    }
}

/// Failures reading or writing a snapshot.
#[derive(Debug)]
pub enum SnapshotError {
    Io(io::Error),
    /// The snapshot text does not describe a valid tree.
    Corrupt { line: usize, reason: String },
}

impl SnapshotError {
    pub(crate) fn corrupt(line: usize, reason: impl Into<String>) -> Self {
        SnapshotError::Corrupt {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io(err) => write!(f, "Snapshot IO error: {err}"),
            SnapshotError::Corrupt { line: 0, reason } => {
                write!(f, "Corrupt snapshot: {reason}")
            }
            SnapshotError::Corrupt { line, reason } => {
                write!(f, "Corrupt snapshot at line {line}: {reason}")
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SnapshotError::Io(err) => Some(err),
            SnapshotError::Corrupt { .. } => None,
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

/// Failures of a growth iteration or of the run loop.
#[derive(Debug)]
pub enum ExploreError {
    Oracle(OracleError),
    Snapshot(SnapshotError),
    /// The engine returned no usable candidate for the frontier leaf.
    ///
    /// The leaf is left unexpanded; the iteration may be retried.
    ExhaustedExpansion { position_key: String },
    /// Following best moves from the root revisited a node.
    CyclicLine { position_key: String },
}

impl ExploreError {
    /// Returns `true` if the failed iteration can be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExploreError::ExhaustedExpansion { .. })
    }
}

impl fmt::Display for ExploreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExploreError::Oracle(err) => write!(f, "{err}"),
            ExploreError::Snapshot(err) => write!(f, "{err}"),
            ExploreError::ExhaustedExpansion { position_key } => {
                write!(f, "No usable candidates for position {position_key}")
            }
            ExploreError::CyclicLine { position_key } => {
                write!(f, "Best line revisits position {position_key}")
            }
        }
    }
}

impl Error for ExploreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExploreError::Oracle(err) => Some(err),
            ExploreError::Snapshot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OracleError> for ExploreError {
    fn from(err: OracleError) -> Self {
        ExploreError::Oracle(err)
    }
}

impl From<SnapshotError> for ExploreError {
    fn from(err: SnapshotError) -> Self {
        ExploreError::Snapshot(err)
    }
}

/// Convenience alias used by the explorer.
pub type Result<T, E = ExploreError> = std::result::Result<T, E>;
