//! Flat text snapshots of a [`NodeStore`].
//!
//! One header line prefixed with `%`, then one record per node:
//!
//! ```text
//! node_id|analysis|progress; position_key; 0|best_move|score|best_child; 1|move|score|child; ...;
//! ```
//!
//! Entry 0 carries the node's own score and its chosen continuation (empty
//! move and child `-1` while unexpanded). Entries from 1 are the ranked
//! candidates with the engine's evaluation from the node's perspective.
//! Scores are plain centipawns or `#N` for mate distances.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SnapshotError;
use crate::node::{Candidate, Node, NodeId};
use crate::score::Score;
use crate::store::NodeStore;

/// Marker of comment lines.
pub const COMMENT_MARKER: char = '%';

/// Schema description written as the first line.
pub const HEADER: &str = "% tree-explorer v1: node_id|analysis|progress; position_key; \
                          rank|move|score|child_id; ...";

const FIELD_SEPARATOR: char = ';';
const ENTRY_SEPARATOR: char = '|';
const NO_CHILD: i64 = -1;

/// Serializes every node in id order.
pub fn save(store: &NodeStore) -> String {
    let mut out = String::with_capacity(64 + store.len() * 160);
    out.push_str(HEADER);
    out.push('\n');
    for node in store.iter() {
        out.push_str(&Record(node).to_string());
        out.push('\n');
    }
    out
}

/// One node rendered as a snapshot line, without the newline.
struct Record<'a>(&'a Node);

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        write!(
            f,
            "{}|{}|{}; {}; ",
            node.id(),
            node.analysis_sequence(),
            node.progress_distance(),
            node.position_key()
        )?;
        match node.best_candidate() {
            Some(best) => write!(f, "0|{}|{}|{};", best.mv, node.score(), best.child)?,
            None => write!(f, "0||{}|{NO_CHILD};", node.score())?,
        }
        for (rank, candidate) in node.candidates().iter().enumerate() {
            write!(
                f,
                " {}|{}|{}|{};",
                rank + 1,
                candidate.mv,
                candidate.score,
                candidate.child
            )?;
        }
        Ok(())
    }
}

/// Rebuilds a store from snapshot text.
///
/// Records may appear in any order. Ids must form the contiguous range
/// starting at the root, keys must be unique, and every child id must refer
/// to a record in the snapshot.
pub fn load(text: &str) -> Result<NodeStore, SnapshotError> {
    let mut records = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }
        let record =
            parse_record(line).map_err(|reason| SnapshotError::corrupt(index + 1, reason))?;
        records.push((index + 1, record));
    }

    if records.is_empty() {
        return Err(SnapshotError::corrupt(0, "no node records"));
    }
    records.sort_by_key(|(_, node)| node.id);

    let count = records.len();
    let mut keys = HashSet::with_capacity(count);
    for (expected, (line, node)) in records.iter().enumerate() {
        if node.id.index() != expected {
            let reason = if node.id.index() < expected {
                format!("duplicate node id {}", node.id)
            } else {
                format!("missing node id {expected}")
            };
            return Err(SnapshotError::corrupt(*line, reason));
        }
        if !keys.insert(node.position_key.as_str()) {
            return Err(SnapshotError::corrupt(
                *line,
                format!("duplicate position key {}", node.position_key),
            ));
        }
        if let Some(candidate) = node.candidates.iter().find(|c| c.child.index() >= count) {
            return Err(SnapshotError::corrupt(
                *line,
                format!("child id {} out of range", candidate.child),
            ));
        }
    }

    Ok(NodeStore::from_nodes(
        records.into_iter().map(|(_, node)| node).collect(),
    ))
}

fn parse_record(line: &str) -> Result<Node, String> {
    let body = line
        .strip_suffix(FIELD_SEPARATOR)
        .ok_or("record is not terminated by ';'")?;
    let mut fields = body.split(FIELD_SEPARATOR).map(str::trim);

    let header = fields.next().ok_or("missing node header")?;
    let [id, analysis, progress] = split_entry::<3>(header)?;
    let id = parse_field::<u32>(id, "node id")?;
    let analysis_sequence = parse_field::<u64>(analysis, "analysis number")?;
    let progress_distance = parse_field::<u32>(progress, "progress distance")?;

    let position_key = fields
        .next()
        .filter(|key| !key.is_empty())
        .ok_or("missing position key")?
        .to_string();

    let best_entry = fields.next().ok_or("missing best entry")?;
    let [rank, best_move, score, best_child] = split_entry::<4>(best_entry)?;
    if rank != "0" {
        return Err(format!("best entry has rank {rank}"));
    }
    let score = parse_score(score)?;
    let best_child = parse_field::<i64>(best_child, "best child id")?;

    let mut candidates = Vec::new();
    for (index, entry) in fields.enumerate() {
        let [rank, mv, move_score, child] = split_entry::<4>(entry)?;
        if parse_field::<usize>(rank, "candidate rank")? != index + 1 {
            return Err(format!("candidate rank {rank} out of order"));
        }
        if mv.is_empty() {
            return Err(format!("candidate {rank} has no move"));
        }
        candidates.push(Candidate {
            mv: mv.to_string(),
            score: parse_score(move_score)?,
            child: NodeId(parse_field::<u32>(child, "child id")?),
        });
    }

    let best = if best_child == NO_CHILD {
        if !candidates.is_empty() || !best_move.is_empty() {
            return Err("expanded node without a best entry".to_string());
        }
        None
    } else {
        let index = candidates
            .iter()
            .position(|c| c.mv == best_move && i64::from(c.child.0) == best_child)
            .ok_or_else(|| format!("best move {best_move} is not a candidate"))?;
        Some(index)
    };

    Ok(Node {
        id: NodeId(id),
        position_key,
        score,
        best,
        candidates,
        progress_distance,
        analysis_sequence,
    })
}

fn split_entry<const N: usize>(entry: &str) -> Result<[&str; N], String> {
    let parts: Vec<&str> = entry.split(ENTRY_SEPARATOR).map(str::trim).collect();
    parts
        .try_into()
        .map_err(|parts: Vec<&str>| format!("expected {N} fields in {entry:?}, found {}", parts.len()))
}

fn parse_field<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {what}: {value:?}"))
}

fn parse_score(value: &str) -> Result<Score, String> {
    value.parse::<Score>().map_err(|err| err.to_string())
}

/// Writes a snapshot next to `path` and renames it into place.
pub fn save_to_path(store: &NodeStore, path: &Path) -> Result<(), SnapshotError> {
    let staging = staging_path(path);
    fs::write(&staging, save(store))?;
    fs::rename(&staging, path)?;
    Ok(())
}

/// Reads a snapshot file; `Ok(None)` if it does not exist.
pub fn load_from_path(path: &Path) -> Result<Option<NodeStore>, SnapshotError> {
    match fs::read_to_string(path) {
        Ok(text) => load(&text).map(Some),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
