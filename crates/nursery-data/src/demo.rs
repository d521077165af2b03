//! Synthetic inspection data for running the dashboard without a workbook.

use chrono::{Days, NaiveDate};
use rand::Rng;

use nursery_core::models::EvaluationRecord;
use nursery_core::processes::ProcessConfig;

/// Days of history generated per parameter, ending on the processing day.
pub const DEMO_DAYS: u64 = 20;

/// Lowest and one-past-highest generated score.
const DEMO_VALUE_RANGE: std::ops::Range<u32> = 75..100;

/// One record per trackable process, parameter and day, with integer scores
/// drawn uniformly from 75–99.
pub fn generate_demo_records<R: Rng>(
    config: &ProcessConfig,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<EvaluationRecord> {
    let mut records = Vec::new();
    for process in config.trackable() {
        for parameter in &process.parameters {
            for offset in 0..DEMO_DAYS {
                let Some(date) = today.checked_sub_days(Days::new(offset)) else {
                    break;
                };
                let value = f64::from(rng.gen_range(DEMO_VALUE_RANGE));
                records.push(EvaluationRecord::new(date, &process.name, parameter, value));
            }
        }
    }
    records
}
