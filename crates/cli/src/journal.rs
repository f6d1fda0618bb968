//! Append-only analysis log kept next to the snapshot.
//!
//! Every finished analysis is appended as a plain-text block, so a run that
//! spans days leaves a record of each line it extended:
//!
//! ```text
//! Analysis #12
//! cp -30
//! pv e2e4 e7e5
//! alt1 g1f3 cp 21
//! alt2 f1c4 mate 4
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tree_core::{IterationReport, Score};

pub struct AnalysisLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AnalysisLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one report and flushes it to disk.
    pub fn record(&mut self, report: &IterationReport) -> io::Result<()> {
        self.writer.write_all(format_report(report).as_bytes())?;
        self.writer.flush()
    }
}

fn format_score(score: Score) -> String {
    match score {
        Score::Centipawns(cp) => format!("cp {cp}"),
        Score::Mate(n) => format!("mate {n}"),
    }
}

pub fn format_report(report: &IterationReport) -> String {
    let mut text = format!(
        "\nAnalysis #{}\n{}\npv {}\n",
        report.analysis,
        format_score(report.leaf_score),
        report.line.join(" ")
    );
    for (rank, ranked) in report.alternatives.iter().enumerate() {
        text.push_str(&format!(
            "alt{} {} {}\n",
            rank + 1,
            ranked.mv,
            format_score(ranked.score)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tree_core::oracle::RankedMove;

    use super::*;

    fn report(analysis: u64) -> IterationReport {
        IterationReport {
            analysis,
            line: vec!["e2e4".to_string(), "e7e5".to_string()],
            leaf_score: Score::Centipawns(-30),
            alternatives: vec![
                RankedMove::new("g1f3", Score::Centipawns(21)),
                RankedMove::new("f1c4", Score::Mate(4)),
            ],
            root_score: Score::Centipawns(12),
            nodes: 9,
        }
    }

    #[test]
    fn test_format_report() {
        assert_eq!(
            format_report(&report(12)),
            "\nAnalysis #12\ncp -30\npv e2e4 e7e5\nalt1 g1f3 cp 21\nalt2 f1c4 mate 4\n"
        );
    }

    #[test]
    fn test_log_appends_across_opens() {
        let dir = std::env::temp_dir().join(format!("tree-explorer-journal-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chess_16.log");

        AnalysisLog::open(&path).unwrap().record(&report(1)).unwrap();
        let mut reopened = AnalysisLog::open(&path).unwrap();
        reopened.record(&report(2)).unwrap();
        assert_eq!(reopened.path(), path.as_path());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Analysis #1\n"));
        assert!(text.contains("Analysis #2\n"));
        assert!(text.find("#1").unwrap() < text.find("#2").unwrap());

        fs::remove_dir_all(&dir).unwrap();
    }
}
