// Report rendering for the terminal
use colored::Colorize;
use robot_master_core::application::{DispatchReport, StepOutcome};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Enqueued")]
    enqueued: usize,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl StepRow {
    fn new(step: &str, outcome: &StepOutcome) -> Self {
        let (label, detail) = match outcome {
            StepOutcome::Enqueued { .. } => ("enqueued", String::new()),
            StepOutcome::Skipped { reason } => ("skipped", reason.to_string()),
            StepOutcome::Failed { error, .. } => ("failed", error.to_string()),
        };

        Self {
            step: step.to_string(),
            outcome: label,
            enqueued: outcome.enqueued(),
            detail,
        }
    }
}

/// Per-step table followed by a one-line summary
pub fn render_table(report: &DispatchReport) -> String {
    let rows: Vec<StepRow> = report
        .steps
        .iter()
        .map(|s| StepRow::new(s.step.as_str(), &s.outcome))
        .collect();

    let summary = format!(
        "{}:{} run {}: {} enqueued, {} failed step(s)",
        report.namespace,
        report.pipeline,
        report.run_id,
        report.total_enqueued(),
        report.failures().count()
    );
    let summary = if report.is_success() {
        format!("{} {}", "✓".green().bold(), summary)
    } else {
        format!("{} {}", "✗".red().bold(), summary.red())
    };

    format!("{}\n{}", Table::new(rows), summary)
}

pub fn render_json(report: &DispatchReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
