//! Resumable best-line exploration driven by an external UCI engine.
//!
//! The [`explorer::Explorer`] repeatedly expands the frontier leaf of the
//! best known line with the engine's ranked candidates and backs the scores
//! up to the root. The tree lives in a [`store::NodeStore`] and is persisted
//! with [`snapshot`].

pub mod error;
pub mod explorer;
pub mod node;
pub mod oracle;
pub mod score;
pub mod snapshot;
pub mod store;

pub use error::{ExploreError, OracleError, ParseError, SnapshotError};
pub use explorer::{Explorer, ExplorerConfig, IterationReport, SelectionPolicy};
pub use node::{Candidate, Node, NodeId};
pub use score::Score;
pub use store::NodeStore;
