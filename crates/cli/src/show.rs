//! The `show` subcommand: prints a saved tree.

use anyhow::Result;
use colored::Colorize;
use tree_core::NodeStore;
use tree_core::explorer::{WalkEntry, principal_line, walk};

use crate::colors::{self, ThemeColor};
use crate::display::{count, format_line};

pub fn print_tree(store: &NodeStore, max_depth: usize) -> Result<()> {
    let root = store.root();
    let line = principal_line(store)?;

    println!("{} {}", "Root".primary().bold(), root.position_key().text());
    println!(
        "  {} {}  {} {}  {} {}",
        "score".subtext(),
        colors::score(root.score()),
        "nodes".subtext(),
        count(store.len()),
        "analyses".subtext(),
        count(store.analysis_count())
    );
    println!("  {} {}", "best line".subtext(), format_line(&line.moves).text());
    println!();

    walk(store, max_depth, |entry| println!("{}", describe(entry)));
    Ok(())
}

fn describe(entry: &WalkEntry<'_>) -> String {
    let indent = "  ".repeat(entry.depth.saturating_sub(1));
    let mv = if entry.is_best {
        entry.candidate.mv.as_str().success().bold()
    } else {
        entry.candidate.mv.as_str().text()
    };
    let mut text = format!("{indent}{mv} {}", colors::score(entry.candidate.score));
    if entry.is_transposition {
        text.push_str(&format!(" {}", format!("= node {}", entry.child.id()).subtext()));
    } else if !entry.child.is_expanded() {
        text.push_str(&format!(" {}", "leaf".dimmed()));
    }
    text
}
