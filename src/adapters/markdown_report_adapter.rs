//! Markdown historical accuracy report implementing ReportPort.

use std::fs;
use std::path::Path;

use crate::domain::accuracy::{AccuracyReport, HorizonAccuracy};
use crate::domain::error::PredtrackError;
use crate::domain::prediction::Horizon;
use crate::ports::report_port::{ReportContext, ReportPort};

pub struct MarkdownReportAdapter;

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "-".to_string(),
    }
}

fn delta(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.1} pts", v * 100.0),
        None => "-".to_string(),
    }
}

pub fn render_summary(ctx: &ReportContext) -> String {
    let report = ctx.report;
    let period = match (report.first_date, report.last_date) {
        (Some(first), Some(last)) => format!("{} ~ {}", first, last),
        _ => "-".to_string(),
    };

    let mut output = String::new();
    output.push_str("# Multi-Horizon Prediction Accuracy\n\n");
    output.push_str(&format!("**Generated**: {}\n", ctx.generated_on));
    output.push_str(&format!("**Period**: {}\n", period));
    output.push_str(&format!(
        "**Coverage**: {} days, {} predictions\n",
        report.days, report.records
    ));
    output
}

pub fn render_accuracy_table(report: &AccuracyReport) -> String {
    let mut output = String::new();
    output.push_str("| Horizon | Accuracy | vs T+0 | Samples | Days | Daily mean | Direction |\n");
    output.push_str("|---------|----------|--------|---------|------|------------|-----------|\n");

    for h in &report.horizons {
        let vs_base = if h.horizon == Horizon::T0 {
            "-".to_string()
        } else {
            delta(report.delta_vs_base(h.horizon))
        };
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            h.horizon,
            pct(h.accuracy),
            vs_base,
            h.samples,
            h.days,
            pct(h.mean_daily_accuracy),
            pct(h.direction_accuracy),
        ));
    }
    output
}

pub fn render_breakdown(report: &AccuracyReport) -> String {
    let mut output = String::new();
    output.push_str("| Horizon | Success | Partial | Fail |\n");
    output.push_str("|---------|---------|---------|------|\n");
    for h in &report.horizons {
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            h.horizon, h.successes, h.partials, h.failures
        ));
    }
    output
}

pub fn render_findings(report: &AccuracyReport) -> String {
    if report.total_samples() == 0 {
        return "_No verified predictions yet._\n".to_string();
    }

    let base = report.horizon(Horizon::T0).and_then(|h| h.accuracy);
    let mut lines: Vec<String> = Vec::new();

    for h in report.horizons.iter().filter(|h| h.horizon != Horizon::T0) {
        let (Some(base), Some(acc)) = (base, h.accuracy) else {
            continue;
        };
        let diff = (acc - base) * 100.0;
        let word = if diff > 0.0 {
            "higher than"
        } else if diff < 0.0 {
            "lower than"
        } else {
            "equal to"
        };
        lines.push(format!(
            "{} accuracy is {:.1} pts {} T+0 ({} → {})",
            h.horizon,
            diff.abs(),
            word,
            pct(Some(base)),
            pct(Some(acc)),
        ));
    }

    if let Some(best) = report.best_horizon() {
        lines.push(best_line(best));
    }

    let mut output = String::new();
    for (i, line) in lines.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, line));
    }
    output
}

fn best_line(best: &HorizonAccuracy) -> String {
    if best.horizon == Horizon::T0 {
        format!(
            "Same-day verification is the most accurate horizon ({})",
            pct(best.accuracy)
        )
    } else {
        format!(
            "{} is the most accurate horizon ({} over {} samples); prefer it as the primary check",
            best.horizon,
            pct(best.accuracy),
            best.samples
        )
    }
}

pub fn render(ctx: &ReportContext) -> String {
    let mut output = render_summary(ctx);
    output.push_str("\n---\n\n## Accuracy by Horizon\n\n");
    output.push_str(&render_accuracy_table(ctx.report));
    output.push_str("\n## Outcomes\n\n");
    output.push_str(&render_breakdown(ctx.report));
    output.push_str("\n## Key Findings\n\n");
    output.push_str(&render_findings(ctx.report));
    output
}

impl ReportPort for MarkdownReportAdapter {
    fn write(&self, ctx: &ReportContext, output_path: &str) -> Result<(), PredtrackError> {
        let content = render(ctx);
        if let Some(parent) = Path::new(output_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|e| PredtrackError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(output_path, content).map_err(|e| PredtrackError::Report {
            reason: format!("failed to write {}: {}", output_path, e),
        })
    }
}
