use crate::models::{EvaluationRecord, Filters};
use crate::processes::ProcessConfig;

/// Averages at or above this value are compliant.
pub const COMPLIANCE_THRESHOLD: f64 = 90.0;

/// Round to one decimal place, halves away from zero.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `true` when `average` meets the compliance threshold (inclusive).
pub fn is_compliant(average: f64) -> bool {
    average >= COMPLIANCE_THRESHOLD
}

/// Distance from the compliance threshold, one decimal. Negative when the
/// average is above the target.
pub fn technical_deficit(average: f64) -> f64 {
    round_one_decimal(COMPLIANCE_THRESHOLD - average)
}

/// The records that pass `filters`, in input order.
pub fn filtered_records<'a>(
    records: &'a [EvaluationRecord],
    filters: &Filters,
) -> Vec<&'a EvaluationRecord> {
    records.iter().filter(|r| filters.matches(r)).collect()
}

/// Full-precision mean of `values`, or `None` when there are none.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0_usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean value of `process` over the filtered view, one decimal.
///
/// Returns `0.0` when the process has no records; callers treat that zero
/// as "no data" rather than a real score.
pub fn average_for_process(view: &[&EvaluationRecord], process: &str) -> f64 {
    mean(
        view.iter()
            .filter(|r| r.process == process)
            .map(|r| r.value),
    )
    .map(round_one_decimal)
    .unwrap_or(0.0)
}

/// Mean value of one parameter of `process` over the filtered view, one
/// decimal, or `0.0` without data.
pub fn average_for_parameter(view: &[&EvaluationRecord], process: &str, parameter: &str) -> f64 {
    mean(
        view.iter()
            .filter(|r| r.process == process && r.parameter == parameter)
            .map(|r| r.value),
    )
    .map(round_one_decimal)
    .unwrap_or(0.0)
}

/// Mean of the per-process averages across every non-reserved process.
///
/// Processes whose average is the zero sentinel do not contribute. Returns
/// `0.0` when no process has data.
pub fn global_average(view: &[&EvaluationRecord], config: &ProcessConfig) -> f64 {
    mean(
        config
            .trackable()
            .map(|p| average_for_process(view, &p.name))
            .filter(|avg| *avg > 0.0),
    )
    .map(round_one_decimal)
    .unwrap_or(0.0)
}

/// Number of records of `process` in the filtered view.
pub fn sample_count(view: &[&EvaluationRecord], process: &str) -> usize {
    view.iter().filter(|r| r.process == process).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Selector;
    use chrono::NaiveDate;

    fn rec(y: i32, m: u32, d: u32, process: &str, parameter: &str, value: f64) -> EvaluationRecord {
        EvaluationRecord::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            process,
            parameter,
            value,
        )
    }

    fn sample() -> Vec<EvaluationRecord> {
        vec![
            rec(2024, 2, 5, "Adubação", "Adubação Minijardim", 80.0),
            rec(2024, 2, 12, "Adubação", "Adubação plataformas", 100.0),
            rec(2024, 3, 4, "Irrigação", "Irrigação Minijardim", 70.0),
            rec(2024, 3, 5, "Irrigação", "Irrigação plataformas", 95.0),
            rec(2024, 3, 11, "Estaqueamento", "Estaca verde", 88.0),
        ]
    }

    fn all(records: &[EvaluationRecord]) -> Vec<&EvaluationRecord> {
        filtered_records(records, &Filters::default())
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(90.0), 90.0);
        assert_eq!(round_one_decimal(86.666_666), 86.7);
        assert_eq!(round_one_decimal(82.25), 82.3);
        assert_eq!(round_one_decimal(-82.25), -82.3);
    }

    #[test]
    fn test_compliance_threshold_is_inclusive() {
        assert!(is_compliant(90.0));
        assert!(is_compliant(97.5));
        assert!(!is_compliant(89.9));
        assert!(!is_compliant(0.0));
    }

    #[test]
    fn test_technical_deficit() {
        assert_eq!(technical_deficit(85.5), 4.5);
        assert_eq!(technical_deficit(90.0), 0.0);
        assert_eq!(technical_deficit(95.2), -5.2);
    }

    #[test]
    fn test_average_for_process_mean_is_compliant() {
        let records = sample();
        let view = all(&records);
        let avg = average_for_process(&view, "Adubação");
        assert_eq!(avg, 90.0);
        assert!(is_compliant(avg));
        assert_eq!(average_for_process(&view, "Irrigação"), 82.5);
    }

    #[test]
    fn test_average_for_process_empty_is_zero() {
        let records = sample();
        let view = all(&records);
        assert_eq!(average_for_process(&view, "Expedição"), 0.0);
        assert_eq!(average_for_process(&[], "Adubação"), 0.0);
    }

    #[test]
    fn test_average_for_parameter() {
        let records = sample();
        let view = all(&records);
        assert_eq!(
            average_for_parameter(&view, "Adubação", "Adubação plataformas"),
            100.0
        );
        assert_eq!(average_for_parameter(&view, "Irrigação", "Adubação plataformas"), 0.0);
    }

    #[test]
    fn test_average_for_parameter_keeps_processes_apart() {
        let records = vec![
            rec(2024, 1, 2, "Formar Minijardim", "% de sobrevivência", 60.0),
            rec(2024, 1, 2, "Casa de vegetação - Sobrevivência", "% de sobrevivência", 100.0),
        ];
        let view = all(&records);
        assert_eq!(
            average_for_parameter(&view, "Formar Minijardim", "% de sobrevivência"),
            60.0
        );
    }

    #[test]
    fn test_global_average_skips_processes_without_data() {
        let records = sample();
        let view = all(&records);
        // (90.0 + 82.5 + 88.0) / 3 = 86.833..
        assert_eq!(global_average(&view, &ProcessConfig::nursery()), 86.8);
    }

    #[test]
    fn test_global_average_empty_is_zero() {
        assert_eq!(global_average(&[], &ProcessConfig::nursery()), 0.0);
    }

    #[test]
    fn test_filters_narrow_the_view() {
        let records = sample();
        let march = filtered_records(&records, &Filters::new(Selector::Only(3), Selector::All));
        assert_eq!(march.len(), 3);
        assert_eq!(average_for_process(&march, "Adubação"), 0.0);

        let week = records[2].week;
        let one_week = filtered_records(&records, &Filters::new(Selector::All, Selector::Only(week)));
        assert!(one_week.iter().all(|r| r.week == week));
    }

    #[test]
    fn test_filtering_is_commutative() {
        let records = sample();
        let month = Filters::new(Selector::Only(3), Selector::All);
        let week = Filters::new(Selector::All, Selector::Only(records[2].week));

        let month_then_week: Vec<EvaluationRecord> = filtered_records(&records, &month)
            .into_iter()
            .filter(|r| week.matches(r))
            .cloned()
            .collect();
        let week_then_month: Vec<EvaluationRecord> = filtered_records(&records, &week)
            .into_iter()
            .filter(|r| month.matches(r))
            .cloned()
            .collect();
        assert_eq!(month_then_week, week_then_month);
        assert!(!month_then_week.is_empty());
    }

    #[test]
    fn test_sample_count() {
        let records = sample();
        let view = all(&records);
        assert_eq!(sample_count(&view, "Irrigação"), 2);
        assert_eq!(sample_count(&view, "Expedição"), 0);
    }
}
