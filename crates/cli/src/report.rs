//! Analysis report rendering.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use boilersync_core::models::{FileAnalysis, MergeActionKind, ThreeWayOutcome};
use boilersync_core::swizzle::SwizzleLookup;

use crate::style;

/// Render the per-file analysis table plus a one-line summary.
pub fn print_analysis(files: &[FileAnalysis]) {
    if files.is_empty() {
        println!();
        println!("{}", style::success("No files tracked by the boilerplate"));
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "History", "Blob", "Risk", "3-way", "Swizzle", "Action"]);

    for analysis in files {
        table.add_row(vec![
            Cell::new(&analysis.path),
            Cell::new(analysis.divergence.status.to_string()),
            Cell::new(analysis.blob.to_string()),
            Cell::new(analysis.risk.likelihood.to_string()),
            Cell::new(three_way_cell(analysis.three_way)),
            Cell::new(swizzle_cell(&analysis.swizzle)),
            action_cell(analysis.action.kind),
        ]);
    }
    println!("{table}");

    let needs_attention = files
        .iter()
        .filter(|f| {
            matches!(
                f.action.kind,
                MergeActionKind::Manual | MergeActionKind::Undetermined
            ) || matches!(f.swizzle, SwizzleLookup::Stale(_))
        })
        .count();
    println!();
    if needs_attention == 0 {
        println!(
            "{}",
            style::success(&format!("{} file(s) analysed, all resolvable", files.len()))
        );
    } else {
        println!(
            "{}",
            style::warn(&format!(
                "{} file(s) analysed, {} need attention",
                files.len(),
                needs_attention
            ))
        );
    }
}

fn three_way_cell(outcome: ThreeWayOutcome) -> &'static str {
    match outcome {
        ThreeWayOutcome::Clean => "clean",
        ThreeWayOutcome::Conflicted => "conflict",
        ThreeWayOutcome::NotApplicable => "—",
    }
}

fn swizzle_cell(lookup: &SwizzleLookup) -> String {
    match lookup {
        SwizzleLookup::None => "—".into(),
        SwizzleLookup::Overridden(event) => format!("{event} (override)"),
        SwizzleLookup::Active(record) => record.event.to_string(),
        SwizzleLookup::Inactive(record) => format!("{} (inactive)", record.event),
        SwizzleLookup::Stale(record) => format!("{} (STALE)", record.event),
    }
}

fn action_cell(kind: MergeActionKind) -> Cell {
    let cell = Cell::new(kind.to_string());
    match kind {
        MergeActionKind::KeepFork => cell.fg(comfy_table::Color::Green),
        MergeActionKind::KeepBoilerplate => cell.fg(comfy_table::Color::Blue),
        MergeActionKind::DropFromFork | MergeActionKind::DropFromBoilerplate => {
            cell.fg(comfy_table::Color::Yellow)
        }
        MergeActionKind::Manual | MergeActionKind::Undetermined => {
            cell.fg(comfy_table::Color::Red)
        }
    }
}
