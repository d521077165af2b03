//! Dashboard views assembled from the aggregations.
//!
//! [`summarize`] backs the overview, [`describe_process`] backs the
//! per-process page. Both are pure and serialize directly to JSON.

use chrono::Utc;
use serde::Serialize;

use nursery_core::calculations::{
    filtered_records, global_average, is_compliant, technical_deficit,
};
use nursery_core::error::Result;
use nursery_core::models::{EvaluationRecord, Filters};
use nursery_core::processes::ProcessConfig;

use crate::aggregator::{DashboardAggregator, ParameterSummary, ProcessSummary, TrendPoint};

// ── Public types ──────────────────────────────────────────────────────────────

/// Overview of the whole nursery under the active filters.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// ISO-8601 timestamp when this summary was generated.
    pub generated_at: String,
    pub filters: Filters,
    /// Mean of the non-zero process averages, one decimal.
    pub global_average: f64,
    pub global_compliant: bool,
    pub processes: Vec<ProcessSummary>,
    /// Weeks available across every record, regardless of filters.
    pub available_weeks: Vec<u32>,
    pub total_records: usize,
    pub filtered_records: usize,
}

impl DashboardSummary {
    /// Processes with data in view that miss the threshold.
    pub fn non_compliant(&self) -> impl Iterator<Item = &ProcessSummary> {
        self.processes
            .iter()
            .filter(|p| p.has_data() && !p.compliant)
    }
}

/// Detail page of a single process.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessDetail {
    pub process: String,
    pub filters: Filters,
    pub average: f64,
    pub compliant: bool,
    /// `90 - average`, one decimal.
    pub technical_deficit: f64,
    pub samples: usize,
    pub parameters: Vec<ParameterSummary>,
    pub trend: Vec<TrendPoint>,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Build the overview for `records` under `filters`.
pub fn summarize(
    records: &[EvaluationRecord],
    filters: &Filters,
    config: &ProcessConfig,
) -> DashboardSummary {
    let aggregator = DashboardAggregator::new();
    let view = filtered_records(records, filters);
    let global = global_average(&view, config);

    DashboardSummary {
        generated_at: Utc::now().to_rfc3339(),
        filters: *filters,
        global_average: global,
        global_compliant: is_compliant(global),
        processes: aggregator.process_summaries(&view, config),
        available_weeks: aggregator.available_weeks(records),
        total_records: records.len(),
        filtered_records: view.len(),
    }
}

/// Build the detail page of `process`.
///
/// Fails with `UnknownProcess` when the name is not in `config`.
pub fn describe_process(
    records: &[EvaluationRecord],
    filters: &Filters,
    config: &ProcessConfig,
    process: &str,
) -> Result<ProcessDetail> {
    let definition = config.require(process)?;
    let aggregator = DashboardAggregator::new();
    let view = filtered_records(records, filters);
    let summary = aggregator.process_summary(&view, definition);

    Ok(ProcessDetail {
        process: summary.process,
        filters: *filters,
        average: summary.average,
        compliant: summary.compliant,
        technical_deficit: technical_deficit(summary.average),
        samples: summary.samples,
        parameters: aggregator.parameter_performance(&view, definition),
        trend: aggregator.trend_series(&view, &definition.name),
    })
}
