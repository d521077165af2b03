//! Dashboard aggregations over a filtered record view.
//!
//! Every function takes the view produced by
//! [`filtered_records`](nursery_core::calculations::filtered_records) and
//! recomputes from scratch; nothing is cached between calls.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use nursery_core::calculations::{
    average_for_parameter, average_for_process, is_compliant, sample_count, technical_deficit,
};
use nursery_core::models::{EvaluationRecord, Unit};
use nursery_core::processes::{ProcessConfig, ProcessDefinition};

// ── Output rows ───────────────────────────────────────────────────────────────

/// One process line of the overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSummary {
    pub process: String,
    /// One-decimal mean, `0.0` when the process has no records in view.
    pub average: f64,
    pub compliant: bool,
    pub samples: usize,
    /// `90 - average`, one decimal.
    pub deficit: f64,
}

impl ProcessSummary {
    pub fn has_data(&self) -> bool {
        self.samples > 0
    }
}

/// One bar of a process's parameter chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub parameter: String,
    pub average: f64,
    pub compliant: bool,
    pub unit: Unit,
}

/// One point of a process's trend chart: every parameter value on `date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

// ── DashboardAggregator ───────────────────────────────────────────────────────

/// Stateless helper grouping the per-view derivations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardAggregator;

impl DashboardAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Distinct ISO weeks present in `records`, ascending.
    pub fn available_weeks(&self, records: &[EvaluationRecord]) -> Vec<u32> {
        records
            .iter()
            .map(|r| r.week)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct months present in `records`, ascending.
    pub fn available_months(&self, records: &[EvaluationRecord]) -> Vec<u32> {
        records
            .iter()
            .map(|r| r.month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// One summary per non-reserved process, in configured order.
    pub fn process_summaries(
        &self,
        view: &[&EvaluationRecord],
        config: &ProcessConfig,
    ) -> Vec<ProcessSummary> {
        config
            .trackable()
            .map(|p| self.process_summary(view, p))
            .collect()
    }

    pub fn process_summary(
        &self,
        view: &[&EvaluationRecord],
        process: &ProcessDefinition,
    ) -> ProcessSummary {
        let average = average_for_process(view, &process.name);
        ProcessSummary {
            process: process.name.clone(),
            average,
            compliant: is_compliant(average),
            samples: sample_count(view, &process.name),
            deficit: technical_deficit(average),
        }
    }

    /// Per-parameter averages of `process`, in configured parameter order.
    pub fn parameter_performance(
        &self,
        view: &[&EvaluationRecord],
        process: &ProcessDefinition,
    ) -> Vec<ParameterSummary> {
        process
            .parameters
            .iter()
            .map(|parameter| {
                let average = average_for_parameter(view, &process.name, parameter);
                ParameterSummary {
                    parameter: parameter.clone(),
                    average,
                    compliant: is_compliant(average),
                    unit: Unit::for_parameter(parameter),
                }
            })
            .collect()
    }

    /// Date-ordered parameter values of `process`.
    ///
    /// A later record for the same date and parameter replaces the earlier
    /// value.
    pub fn trend_series(&self, view: &[&EvaluationRecord], process: &str) -> Vec<TrendPoint> {
        let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();
        for record in view.iter().filter(|r| r.process == process) {
            by_date
                .entry(record.date)
                .or_default()
                .insert(record.parameter.clone(), record.value);
        }
        by_date
            .into_iter()
            .map(|(date, values)| TrendPoint { date, values })
            .collect()
    }
}
