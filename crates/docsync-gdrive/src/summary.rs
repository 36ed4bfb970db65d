//! Markdown job summary for the GitHub Actions run page.

use std::fmt::Write as _;
use std::path::Path;

use docsync_core::{RunOutcome, ScanMode};
use tokio::io::AsyncWriteExt;

/// Render the run totals and any failures as Markdown.
pub fn render_markdown(outcome: &RunOutcome) -> String {
    let mode = match outcome.mode {
        ScanMode::FullScan => "full scan",
        ScanMode::Incremental => "incremental",
    };

    let mut out = String::new();
    let _ = writeln!(out, "## Document sync ({})\n", mode);
    let _ = writeln!(out, "| Uploaded | Skipped | Failed |");
    let _ = writeln!(out, "|---:|---:|---:|");
    let _ = writeln!(
        out,
        "| {} | {} | {} |",
        outcome.uploaded, outcome.skipped, outcome.failed
    );

    if !outcome.uploads.is_empty() {
        let _ = writeln!(out, "\n### Uploaded\n");
        let _ = writeln!(out, "| File | Folder | Result |");
        let _ = writeln!(out, "|---|---|---|");
        for upload in &outcome.uploads {
            let _ = writeln!(
                out,
                "| `{}` | `{}` | {} |",
                cell(&upload.path),
                cell(&upload.destination_id),
                upload.outcome.label()
            );
        }
    }

    if !outcome.failures.is_empty() {
        let _ = writeln!(out, "\n### Failures\n");
        let _ = writeln!(out, "| File | Reason |");
        let _ = writeln!(out, "|---|---|");
        for failure in &outcome.failures {
            let _ = writeln!(out, "| `{}` | {} |", cell(&failure.path), cell(&failure.reason));
        }
    }

    out
}

/// Append the rendered summary to the step summary file.
pub async fn append_summary(path: &Path, outcome: &RunOutcome) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(render_markdown(outcome).as_bytes()).await?;
    file.flush().await
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
