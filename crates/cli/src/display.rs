//! Console output for exploration runs.
//!
//! A spinner stays on screen while the engine searches; each finished
//! analysis is printed as a short report with the line that was extended
//! and the ranked candidates found at its end.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use num_format::{Locale, ToFormattedString};
use tree_core::explorer::{RunObserver, RunSummary, StopReason};
use tree_core::{ExploreError, IterationReport, NodeStore};

use crate::colors::{self, ThemeColor};
use crate::journal::AnalysisLog;

const SPINNER_TICK: Duration = Duration::from_millis(120);
const MAX_LINE_DISPLAY_LEN: usize = 24;

pub fn count(n: impl ToFormattedString) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Joins moves for display, keeping only the tail of long lines.
pub fn format_line(moves: &[String]) -> String {
    if moves.is_empty() {
        return "(root)".to_string();
    }
    if moves.len() <= MAX_LINE_DISPLAY_LEN {
        return moves.join(" ");
    }
    let tail = &moves[moves.len() - MAX_LINE_DISPLAY_LEN..];
    format!("... {}", tail.join(" "))
}

/// Progress reporter for [`tree_core::Explorer::run`].
///
/// Reports also go to the analysis log when one is attached.
pub struct Console {
    spinner: Option<ProgressBar>,
    log: Option<AnalysisLog>,
}

impl Console {
    pub fn new(log: Option<AnalysisLog>) -> Self {
        Self { spinner: None, log }
    }

    /// Prints where the run starts from.
    pub fn show_start(&self, store: &NodeStore, snapshot_path: &Path, resumed: bool) {
        let origin = if resumed { "Resuming" } else { "Starting" };
        println!(
            "{} {} {}",
            origin.primary().bold(),
            snapshot_path.display().to_string().text(),
            format!(
                "({} nodes, {} analyses)",
                count(store.len()),
                count(store.analysis_count())
            )
            .subtext()
        );
        println!(
            "  {} {}",
            "root".subtext(),
            store.root().position_key().text()
        );
        if let Some(log) = &self.log {
            println!("  {} {}", "log".subtext(), log.path().display());
        }
    }

    pub fn show_summary(&mut self, summary: &RunSummary) {
        self.clear_spinner();
        let outcome = match &summary.stop {
            StopReason::Cancelled => "Interrupted".warning().bold(),
            StopReason::IterationLimit => "Finished".success().bold(),
            StopReason::Failed(_) => "Aborted".failure().bold(),
        };
        println!(
            "{} after {} analyses ({} in tree), {} nodes saved to {}",
            outcome,
            count(summary.analyses),
            count(summary.total_analyses),
            count(summary.nodes),
            summary.snapshot_path.display()
        );
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn create_spinner(analysis: u64) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(format!("Analysis #{}", count(analysis)));
        spinner.enable_steady_tick(SPINNER_TICK);
        spinner
    }
}

impl RunObserver for Console {
    fn analysis_started(&mut self, analysis: u64) {
        self.clear_spinner();
        self.spinner = Some(Self::create_spinner(analysis));
    }

    fn analysis_finished(&mut self, report: &IterationReport) {
        self.clear_spinner();
        if let Some(log) = &mut self.log {
            if let Err(err) = log.record(report) {
                warn!("Failed to append to {}: {err}", log.path().display());
            }
        }
        println!(
            "{} {} {}",
            format!("#{:<6}", count(report.analysis)).primary().bold(),
            colors::score(report.leaf_score),
            format_line(&report.line).text()
        );
        let alternatives: Vec<String> = report
            .alternatives
            .iter()
            .enumerate()
            .map(|(rank, ranked)| {
                format!(
                    "{}{} {}",
                    format!("{}.", rank + 1).subtext(),
                    ranked.mv,
                    colors::score(ranked.score)
                )
            })
            .collect();
        println!(
            "        {}  {}",
            alternatives.join("  "),
            format!(
                "root {} | {} nodes",
                report.root_score,
                count(report.nodes)
            )
            .subtext()
        );
    }

    fn retrying(&mut self, error: &ExploreError, attempt: u32) {
        self.clear_spinner();
        println!(
            "{} {} {}",
            "Retry".warning().bold(),
            format!("#{attempt}").warning(),
            error.to_string().dimmed()
        );
    }

    fn saved(&mut self, path: &Path, nodes: usize) {
        if let Some(spinner) = &self.spinner {
            spinner.suspend(|| print_saved(path, nodes));
        } else {
            print_saved(path, nodes);
        }
    }
}

fn print_saved(path: &Path, nodes: usize) {
    println!(
        "{}",
        format!("Saved {} nodes to {}", count(nodes), path.display()).subtext()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("m{i}")).collect()
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(&[]), "(root)");
        assert_eq!(format_line(&moves(3)), "m0 m1 m2");

        let long = format_line(&moves(MAX_LINE_DISPLAY_LEN + 2));
        assert!(long.starts_with("... m2 "));
        assert!(long.ends_with(&format!("m{}", MAX_LINE_DISPLAY_LEN + 1)));
    }

    #[test]
    fn test_finished_analyses_reach_the_log() {
        use tree_core::Score;
        use tree_core::oracle::RankedMove;

        let dir = std::env::temp_dir().join(format!("tree-explorer-console-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chess_16.log");

        let mut console = Console::new(Some(AnalysisLog::open(&path).unwrap()));
        console.analysis_started(7);
        console.analysis_finished(&IterationReport {
            analysis: 7,
            line: vec!["d2d4".to_string()],
            leaf_score: Score::Centipawns(-18),
            alternatives: vec![RankedMove::new("d7d5", Score::Centipawns(18))],
            root_score: Score::Centipawns(13),
            nodes: 12,
        });

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Analysis #7\ncp -18\npv d2d4\nalt1 d7d5 cp 18\n"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_count_groups_thousands() {
        assert_eq!(count(1_234_567u64), "1,234,567");
        assert_eq!(count(12usize), "12");
    }
}
