use std::fmt::Write;

use crate::analytics::{AnalyticsSnapshot, NamedCount};
use crate::models::{Feedback, Status};

fn write_ranking(output: &mut String, title: &str, entries: &[NamedCount], empty: &str) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if entries.is_empty() {
        let _ = writeln!(output, "{empty}");
    } else {
        for (rank, entry) in entries.iter().enumerate() {
            let _ = writeln!(output, "{}. {}: {} applications", rank + 1, entry.name, entry.count);
        }
    }
}

/// Renders a snapshot as markdown. `scope` describes the date range the
/// snapshot was computed over.
pub fn build_report(snapshot: &AnalyticsSnapshot, scope: &str) -> String {
    let kpis = &snapshot.kpis;
    let mut output = String::new();

    let _ = writeln!(output, "# Daily Open Court Report");
    let _ = writeln!(
        output,
        "Generated for {} (reference date {})",
        scope, snapshot.reference_date
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total applications: {}", kpis.total);
    let _ = writeln!(
        output,
        "- Resolution rate: {:.1}% ({} closed)",
        kpis.resolution_rate, kpis.closed
    );
    let _ = writeln!(output, "- Pending share: {:.1}%", kpis.pending_share);
    let _ = writeln!(
        output,
        "- Positive feedback rate: {:.1}%",
        kpis.positive_feedback_rate
    );
    let _ = writeln!(
        output,
        "- Average resolution time: {:.1} days",
        kpis.avg_resolution_days
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    for status in Status::ALL {
        let _ = writeln!(
            output,
            "- {}: {}",
            status.label(),
            snapshot.status_distribution.count(status)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Feedback Mix");
    for feedback in Feedback::ALL {
        let _ = writeln!(
            output,
            "- {}: {}",
            feedback.label(),
            snapshot.feedback_distribution.count(feedback)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");
    if snapshot.monthly_trend.is_empty() {
        let _ = writeln!(output, "No dated applications in this range.");
    } else {
        for point in &snapshot.monthly_trend {
            let _ = writeln!(output, "- {}: {}", point.month, point.applications);
        }
    }

    write_ranking(
        &mut output,
        "Top Police Stations",
        &snapshot.top_stations,
        "No police stations recorded.",
    );
    write_ranking(
        &mut output,
        "Top Categories",
        &snapshot.top_categories,
        "No categories recorded.",
    );
    write_ranking(
        &mut output,
        "Top Officers",
        &snapshot.top_officers,
        "No officers assigned.",
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Division Performance");
    if snapshot.division_performance.is_empty() {
        let _ = writeln!(output, "No divisions recorded.");
    } else {
        for division in &snapshot.division_performance {
            let _ = writeln!(
                output,
                "- {}: {} total, {} pending, {} resolved ({:.1}%)",
                division.name,
                division.total,
                division.pending,
                division.resolved,
                division.resolution_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pending Application Age");
    for bucket in &snapshot.pending_ages {
        let _ = writeln!(output, "- {} days: {}", bucket.label, bucket.count);
    }

    let contact = &snapshot.contact_completeness;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");
    let _ = writeln!(
        output,
        "- Contact numbers on file: {} of {} ({:.1}%)",
        contact.with_contact, contact.total, contact.percentage
    );

    output
}
