use chrono::NaiveDate;

use crate::calculations::{is_compliant, round_one_decimal};

/// Portuguese month names as shown on the month selector.
const MONTH_NAMES: [&str; 12] = [
    "JANEIRO",
    "FEVEREIRO",
    "MARÇO",
    "ABRIL",
    "MAIO",
    "JUNHO",
    "JULHO",
    "AGOSTO",
    "SETEMBRO",
    "OUTUBRO",
    "NOVEMBRO",
    "DEZEMBRO",
];

/// Format an average as a one-decimal percentage.
///
/// # Examples
///
/// ```
/// use nursery_core::formatting::format_percent;
///
/// assert_eq!(format_percent(90.0), "90.0%");
/// assert_eq!(format_percent(86.66), "86.7%");
/// ```
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", round_one_decimal(value))
}

/// Compliance label for an average.
pub fn compliance_label(average: f64) -> &'static str {
    if is_compliant(average) {
        "COMPLIANT"
    } else {
        "NON-COMPLIANT"
    }
}

/// Short `DD/MM` label used on trend axes.
///
/// ```
/// use chrono::NaiveDate;
/// use nursery_core::formatting::format_day_month;
///
/// let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
/// assert_eq!(format_day_month(d), "07/03");
/// ```
pub fn format_day_month(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// Upper-case Portuguese name of `month` (1–12), or `None` when out of range.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// Label for the week selector option, e.g. `"WEEK 7"`.
pub fn week_label(week: u32) -> String {
    format!("WEEK {}", week)
}

/// Render a 0–100 value as a fixed-width bar of `width` cells.
///
/// Values outside 0–100 are clamped; NaN renders as an empty bar.
pub fn percent_bar(value: f64, width: usize) -> String {
    let ratio = if value.is_nan() {
        0.0
    } else {
        (value / 100.0).clamp(0.0, 1.0)
    };
    let filled = (ratio * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(100.0), "100.0%");
        assert_eq!(format_percent(82.25), "82.3%");
    }

    #[test]
    fn test_compliance_label() {
        assert_eq!(compliance_label(90.0), "COMPLIANT");
        assert_eq!(compliance_label(89.9), "NON-COMPLIANT");
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), Some("JANEIRO"));
        assert_eq!(month_name(3), Some("MARÇO"));
        assert_eq!(month_name(12), Some("DEZEMBRO"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn test_week_label() {
        assert_eq!(week_label(7), "WEEK 7");
    }

    #[test]
    fn test_percent_bar() {
        assert_eq!(percent_bar(50.0, 10).chars().filter(|c| *c == '█').count(), 5);
        assert_eq!(percent_bar(150.0, 4), "████");
        assert_eq!(percent_bar(-3.0, 4), "░░░░");
        assert_eq!(percent_bar(f64::NAN, 3), "░░░");
    }
}
