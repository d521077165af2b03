//! Plain-text and JSON rendering of the dashboard views.

use std::fmt::Write as _;

use nursery_core::calculations::COMPLIANCE_THRESHOLD;
use nursery_core::formatting::{
    compliance_label, format_day_month, format_percent, month_name, percent_bar, week_label,
};
use nursery_core::models::{Filters, Selector};
use nursery_data::aggregator::TrendPoint;
use nursery_data::analysis::{DashboardSummary, ProcessDetail};
use unicode_width::UnicodeWidthStr;

const BAR_WIDTH: usize = 20;
const NAME_WIDTH: usize = 36;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Right-pad `text` with spaces to `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    let shown = UnicodeWidthStr::width(text);
    format!("{}{}", text, " ".repeat(width.saturating_sub(shown)))
}

fn filters_line(filters: &Filters) -> String {
    let month = match filters.month {
        Selector::All => "ALL MONTHS".to_string(),
        Selector::Only(m) => month_name(m).unwrap_or("?").to_string(),
    };
    let week = match filters.week {
        Selector::All => "ALL WEEKS".to_string(),
        Selector::Only(w) => week_label(w),
    };
    format!("Period: {} / {}", month, week)
}

fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

// ── Overview ──────────────────────────────────────────────────────────────────

pub fn overview_text(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NURSERY QUALITY OVERVIEW");
    let _ = writeln!(out, "{}", filters_line(&summary.filters));
    let _ = writeln!(
        out,
        "Global average: {} ({}, target {})",
        format_percent(summary.global_average),
        compliance_label(summary.global_average),
        format_percent(COMPLIANCE_THRESHOLD)
    );
    let _ = writeln!(
        out,
        "Records: {} in view / {} total",
        summary.filtered_records, summary.total_records
    );
    out.push('\n');

    for process in &summary.processes {
        if process.has_data() {
            let _ = writeln!(
                out,
                "{} {:>7} {} {:<13} n={}",
                pad(&process.process, NAME_WIDTH),
                format_percent(process.average),
                percent_bar(process.average, BAR_WIDTH),
                compliance_label(process.average),
                process.samples
            );
        } else {
            let _ = writeln!(
                out,
                "{} {:>7} {}",
                pad(&process.process, NAME_WIDTH),
                "-",
                "no data"
            );
        }
    }

    let failing: Vec<&str> = summary.non_compliant().map(|p| p.process.as_str()).collect();
    if !failing.is_empty() {
        let _ = writeln!(out, "\nBelow target: {}", failing.join(", "));
    }
    out
}

pub fn overview_json(summary: &DashboardSummary) -> anyhow::Result<String> {
    to_json(summary)
}

// ── Process ───────────────────────────────────────────────────────────────────

pub fn process_text(detail: &ProcessDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", detail.process.to_uppercase());
    let _ = writeln!(out, "{}", filters_line(&detail.filters));
    if detail.samples == 0 {
        let _ = writeln!(out, "No evaluations in this period.");
        return out;
    }
    let _ = writeln!(
        out,
        "Average: {} ({})",
        format_percent(detail.average),
        compliance_label(detail.average)
    );
    let _ = writeln!(out, "Technical deficit: {:.1} pts", detail.technical_deficit);
    let _ = writeln!(out, "Samples: {}", detail.samples);
    out.push('\n');

    for parameter in &detail.parameters {
        let _ = writeln!(
            out,
            "{} {:>7} {} {}",
            pad(&parameter.parameter, NAME_WIDTH + 12),
            format_percent(parameter.average),
            percent_bar(parameter.average, BAR_WIDTH),
            parameter.unit.as_str()
        );
    }
    out
}

pub fn process_json(detail: &ProcessDetail) -> anyhow::Result<String> {
    to_json(detail)
}

// ── Trend ─────────────────────────────────────────────────────────────────────

pub fn trend_text(process: &str, trend: &[TrendPoint]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} TREND", process.to_uppercase());
    if trend.is_empty() {
        let _ = writeln!(out, "No evaluations in this period.");
        return out;
    }
    for point in trend {
        let values: Vec<String> = point
            .values
            .iter()
            .map(|(parameter, value)| format!("{parameter}: {value:.1}"))
            .collect();
        let _ = writeln!(out, "{}  {}", format_day_month(point.date), values.join(" | "));
    }
    out
}

pub fn trend_json(trend: &[TrendPoint]) -> anyhow::Result<String> {
    to_json(&trend)
}

// ── Weeks ─────────────────────────────────────────────────────────────────────

pub fn weeks_text(weeks: &[u32]) -> String {
    if weeks.is_empty() {
        return "No weeks with evaluations.\n".to_string();
    }
    let labels: Vec<String> = weeks.iter().map(|w| week_label(*w)).collect();
    format!("{}\n", labels.join("\n"))
}

pub fn weeks_json(weeks: &[u32]) -> anyhow::Result<String> {
    to_json(&serde_json::json!({ "weeks": weeks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nursery_core::models::EvaluationRecord;
    use nursery_core::processes::ProcessConfig;
    use nursery_data::analysis::{describe_process, summarize};

    fn records() -> Vec<EvaluationRecord> {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        vec![
            EvaluationRecord::new(d(3, 4), "Irrigação", "Irrigação Minijardim", 70.0),
            EvaluationRecord::new(d(3, 5), "Irrigação", "Irrigação plataformas", 95.0),
            EvaluationRecord::new(d(3, 4), "Adubação", "Adubação Minijardim", 96.0),
        ]
    }

    #[test]
    fn test_pad_counts_display_width() {
        assert_eq!(pad("Irrigação", 12), "Irrigação   ");
        assert_eq!(pad("toolong", 3), "toolong");
    }

    #[test]
    fn test_filters_line() {
        assert_eq!(filters_line(&Filters::default()), "Period: ALL MONTHS / ALL WEEKS");
        assert_eq!(
            filters_line(&Filters::new(Selector::Only(3), Selector::Only(10))),
            "Period: MARÇO / WEEK 10"
        );
    }

    #[test]
    fn test_overview_text() {
        let summary = summarize(&records(), &Filters::default(), &ProcessConfig::nursery());
        let text = overview_text(&summary);
        assert!(text.contains("Global average: 89.3% (NON-COMPLIANT"));
        assert!(text.contains("Adubação"));
        assert!(text.contains("no data"));
        assert!(text.contains("Below target: Irrigação"));
    }

    #[test]
    fn test_overview_json_round_trips_fields() {
        let summary = summarize(&records(), &Filters::default(), &ProcessConfig::nursery());
        let value: serde_json::Value =
            serde_json::from_str(&overview_json(&summary).unwrap()).unwrap();
        assert_eq!(value["global_average"], 89.3);
        assert_eq!(value["available_weeks"], serde_json::json!([10]));
    }

    #[test]
    fn test_process_text() {
        let detail = describe_process(
            &records(),
            &Filters::default(),
            &ProcessConfig::nursery(),
            "Irrigação",
        )
        .unwrap();
        let text = process_text(&detail);
        assert!(text.starts_with("IRRIGAÇÃO\n"));
        assert!(text.contains("Technical deficit: 7.5 pts"));
        assert!(text.contains("Irrigação plataformas"));
    }

    #[test]
    fn test_process_text_without_data() {
        let detail = describe_process(
            &records(),
            &Filters::default(),
            &ProcessConfig::nursery(),
            "Expedição",
        )
        .unwrap();
        assert!(process_text(&detail).contains("No evaluations"));
    }

    #[test]
    fn test_trend_text() {
        let detail = describe_process(
            &records(),
            &Filters::default(),
            &ProcessConfig::nursery(),
            "Irrigação",
        )
        .unwrap();
        let text = trend_text(&detail.process, &detail.trend);
        assert!(text.contains("04/03  Irrigação Minijardim: 70.0"));
        assert!(text.contains("05/03  Irrigação plataformas: 95.0"));
    }

    #[test]
    fn test_weeks() {
        assert_eq!(weeks_text(&[9, 10]), "WEEK 9\nWEEK 10\n");
        assert!(weeks_text(&[]).starts_with("No weeks"));
        let value: serde_json::Value = serde_json::from_str(&weeks_json(&[9]).unwrap()).unwrap();
        assert_eq!(value["weeks"], serde_json::json!([9]));
    }
}
