use scandeval_core::{Result, Split, SummaryStatistic};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::benchmark::BenchmarkReport;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

/// Formats the train and test summaries of a metric, given its plural display name.
///
/// With a single repetition there is no standard error, so the `+-` part and
/// the word "Mean" are left out.
pub fn format_summary(
    metric_plural: &str,
    dataset_pretty_name: &str,
    model_id: &str,
    train: &SummaryStatistic,
    test: &SummaryStatistic,
    scale: bool,
) -> String {
    let factor = if scale { 100.0 } else { 1.0 };
    let train = train.scaled(factor);
    let test = test.scaled(factor);

    if train.has_std_err() {
        format!(
            "Mean {} on {} for {}:\n  - Train: {:.2} +- {:.2}\n  - Test: {:.2} +- {:.2}",
            metric_plural,
            dataset_pretty_name,
            model_id,
            train.mean,
            train.std_err,
            test.mean,
            test.std_err
        )
    } else {
        format!(
            "{} on {} for {}:\n  - Train: {:.2}\n  - Test: {:.2}",
            capitalize(metric_plural),
            dataset_pretty_name,
            model_id,
            train.mean,
            test.mean
        )
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render(report: &BenchmarkReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Markdown => Ok(render_markdown(report)),
    }
}

fn render_markdown(report: &BenchmarkReport) -> String {
    let factor = if report.scaled { 100.0 } else { 1.0 };
    let mut md = String::new();

    md.push_str(&format!("# {} on {}\n\n", report.model_id, report.pretty_name));
    md.push_str(&format!("**Run ID:** {}\n\n", report.id));
    md.push_str(&format!("**Generated:** {}\n\n", report.generated_at.to_rfc3339()));
    md.push_str(&format!("**Task:** {} ({})\n\n", report.task, report.model_family));
    md.push_str(&format!("**Repetitions:** {}\n\n", report.runs.len()));

    md.push_str("| Metric | Split | Mean | Std. error |\n");
    md.push_str("|--------|-------|------|------------|\n");
    for (metric, by_split) in &report.summary {
        for split in Split::ALL {
            let Some(statistic) = by_split.get(&split) else {
                continue;
            };
            let statistic = statistic.scaled(factor);
            let std_err = if statistic.has_std_err() {
                format!("{:.2}", statistic.std_err)
            } else {
                "-".to_string()
            };
            md.push_str(&format!(
                "| {} | {} | {:.2} | {} |\n",
                metric, split, statistic.mean, std_err
            ));
        }
    }

    md.push_str("\n## Data\n\n");
    md.push_str(&format!("- Train fingerprint: `{}`\n", report.train_fingerprint));
    md.push_str(&format!("- Test fingerprint: `{}`\n", report.test_fingerprint));

    md
}

/// File name shared by every format of a report, without extension.
pub fn report_stem(report: &BenchmarkReport) -> String {
    let model: String = report
        .model_id
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    format!("{}-{}-{}", report.benchmark, model, report.id)
}

/// Writes the report in every requested format into `dir`, creating it if needed.
pub async fn write_report(
    report: &BenchmarkReport,
    dir: &Path,
    formats: &[ReportFormat],
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let stem = report_stem(report);
    let mut paths = Vec::with_capacity(formats.len());
    for format in formats {
        let path = dir.join(format!("{}.{}", stem, format.extension()));
        tokio::fs::write(&path, render(report, *format)?).await?;
        tracing::debug!(path = %path.display(), "Wrote report");
        paths.push(path);
    }
    Ok(paths)
}
