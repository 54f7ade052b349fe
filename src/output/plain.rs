//! Plain text output formatting.
//!
//! Produces the human-readable banner and end-of-run summary with colors.

use crate::coordinator::RunSummary;
use crate::orchestrator::HostStatus;
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print the startup banner.
pub fn print_banner() {
    println!("{}", style(RULE).cyan());
    println!(
        "  {} v{} {}",
        style("brrmap").cyan().bold(),
        env!("CARGO_PKG_VERSION"),
        style("adaptive multi-stage recon").dim()
    );
    println!("{}", style(RULE).cyan());
    println!();
}

/// Print the run summary to stdout.
pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_summary(&mut out, summary)
}

/// Write the run summary: totals, per-host table and findings.
pub fn write_summary(out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} Run Summary",
        style("brrmap").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {}",
        style("Run ID:").bold(),
        style(summary.run_id.short()).dim()
    )?;
    writeln!(
        out,
        "  {} {}",
        style("Started:").bold(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "  {} {} hosts in {:.2}s",
        style("Statistics:").bold(),
        summary.hosts(),
        summary.duration.as_secs_f64()
    )?;
    writeln!(
        out,
        "               {} completed, {} failed, {} stages, {} findings",
        style(summary.completed()).green().bold(),
        style(summary.failed()).red(),
        summary.total_stages(),
        style(summary.findings.len()).yellow()
    )?;

    let counts = summary.stage_counts();
    if !counts.is_empty() {
        let per_stage = counts
            .iter()
            .map(|(stage, n)| format!("{} {}", stage.name(), n))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "               {}", style(per_stage).dim())?;
    }
    writeln!(out)?;

    if summary.outcomes.is_empty() {
        writeln!(out, "  {}", style("No hosts scanned.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:<28}  {:^6}  {:<12}  {}",
            style("HOST").bold(),
            style("STAGES").bold(),
            style("LAST").bold(),
            style("RESULT").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for outcome in &summary.outcomes {
            let (result, result_style) = match &outcome.status {
                HostStatus::Completed(reason) => (reason.to_string(), Style::new().green()),
                HostStatus::Failed(reason) => (reason.clone(), Style::new().red().bold()),
            };
            let last = outcome.last_stage().map(|s| s.name()).unwrap_or("-");

            writeln!(
                out,
                "  {:<28}  {:^6}  {:<12}  {}",
                truncate_string(outcome.host.as_str(), 28),
                outcome.stages_completed(),
                last,
                result_style.apply_to(truncate_string(&result, 60))
            )?;
        }
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    if !summary.findings.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Findings:").bold())?;
        for finding in &summary.findings {
            writeln!(
                out,
                "    {} {} {}",
                style(finding.host.as_str()).white().bold(),
                style(&finding.title).yellow(),
                style(truncate_string(&finding.snippet, 50)).dim()
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
