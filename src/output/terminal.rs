// Colored terminal output for clustering runs and stored results.

use colored::Colorize;

use crate::clustering::NOISE_LABEL;
use crate::db::models::{ClusterAssignmentRow, RunSummary};
use crate::pipeline::{ClusteringRun, UNRESOLVED_LABEL};

/// Group keywords by label: real clusters in ascending order, then noise,
/// then unresolved. Keywords keep their input order within a group.
pub fn group_by_label<'a>(pairs: &[(&'a str, i32)]) -> Vec<(i32, Vec<&'a str>)> {
    let mut groups: Vec<(i32, Vec<&'a str>)> = Vec::new();
    for &(keyword, label) in pairs {
        match groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, members)) => members.push(keyword),
            None => groups.push((label, vec![keyword])),
        }
    }
    groups.sort_by_key(|(label, _)| sort_key(*label));
    groups
}

fn sort_key(label: i32) -> (u8, i32) {
    match label {
        l if l >= 0 => (0, l),
        NOISE_LABEL => (1, 0),
        _ => (2, label),
    }
}

fn label_heading(label: i32, size: usize) -> String {
    match label {
        l if l >= 0 => format!("Cluster {l} ({size})").bold().to_string(),
        NOISE_LABEL => format!("Noise ({size})").yellow().to_string(),
        UNRESOLVED_LABEL => format!("Unresolved ({size})").red().to_string(),
        other => format!("Label {other} ({size})").dimmed().to_string(),
    }
}

/// Display a fresh run, with the top snippet next to each keyword.
pub fn display_run(run: &ClusteringRun) {
    println!(
        "\n{}",
        format!(
            "=== Keyword Clusters ({} keywords, hl={}, gl={}) ===",
            run.outcomes.len(),
            run.hl,
            run.gl
        )
        .bold()
    );

    let pairs: Vec<(&str, i32)> = run
        .outcomes
        .iter()
        .map(|o| (o.keyword.as_str(), o.label.unwrap_or(UNRESOLVED_LABEL)))
        .collect();

    for (label, members) in group_by_label(&pairs) {
        println!("\n  {}", label_heading(label, members.len()));
        for keyword in members {
            let snippet = run
                .outcomes
                .iter()
                .find(|o| o.keyword == keyword)
                .and_then(|o| o.response.as_ref())
                .and_then(|r| r.top_snippet())
                .map(|s| super::truncate_chars(s, 80))
                .unwrap_or_default();
            println!("    {:<32} {}", keyword, snippet.dimmed());
        }
    }
    println!();
}

/// Display stored assignments for one run.
pub fn display_assignments(rows: &[ClusterAssignmentRow]) {
    let Some(first) = rows.first() else {
        println!("No cluster assignments stored yet. Run `kwcluster cluster` first.");
        return;
    };

    println!(
        "\n{}",
        format!(
            "=== Run {} ({} keywords) ===",
            first.request_timestamp,
            rows.len()
        )
        .bold()
    );

    let pairs: Vec<(&str, i32)> = rows
        .iter()
        .map(|r| (r.search_terms.as_str(), r.cluster))
        .collect();

    for (label, members) in group_by_label(&pairs) {
        println!("\n  {}", label_heading(label, members.len()));
        for keyword in members {
            println!("    {keyword}");
        }
    }
    println!();
}

/// Display a table of stored runs, newest first.
pub fn display_runs(runs: &[RunSummary]) {
    if runs.is_empty() {
        return;
    }

    println!("{}", "Recent runs:".bold());
    println!(
        "  {:<24} {:>8} {:>8} {:>6}",
        "Timestamp".dimmed(),
        "Keywords".dimmed(),
        "Clusters".dimmed(),
        "Noise".dimmed(),
    );
    println!("  {}", "-".repeat(50).dimmed());
    for run in runs {
        println!(
            "  {:<24} {:>8} {:>8} {:>6}",
            run.request_timestamp, run.keywords, run.clusters, run.noise
        );
    }
}
