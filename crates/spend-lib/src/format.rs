//! Display formatting for costs, percentages, durations and timestamps

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Below this many hours an ETA is reported as "less than 1 minute"
const ETA_MINUTE_THRESHOLD_HOURS: f64 = 0.017;

const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

/// Format a USD amount with thousands separators and two decimals
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Compact large numbers: 1500 -> "1.5K", 2_300_000 -> "2.3M"
pub fn format_number(num: f64) -> String {
    if num >= 1_000_000.0 {
        format!("{:.1}M", num / 1_000_000.0)
    } else if num >= 1_000.0 {
        format!("{:.1}K", num / 1_000.0)
    } else {
        format!("{:.0}", num)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// "Oct 19, 2026"
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// "Oct 19, 02:30 PM"
pub fn format_date_time(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %I:%M %p").to_string()
}

/// Band a number of hours into minutes, hours+minutes or days+hours
///
/// Rounds to whole minutes first so a value just under a band boundary
/// lands in the next band ("1h", not "60m").
pub fn format_duration(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).round() as u64;

    if total_minutes < MINUTES_PER_HOUR {
        return format!("{}m", total_minutes);
    }

    if total_minutes < MINUTES_PER_DAY {
        let h = total_minutes / MINUTES_PER_HOUR;
        let m = total_minutes % MINUTES_PER_HOUR;
        return if m > 0 {
            format!("{}h {}m", h, m)
        } else {
            format!("{}h", h)
        };
    }

    let days = total_minutes / MINUTES_PER_DAY;
    let h = (total_minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR;
    if h > 0 {
        format!("{}d {}h", days, h)
    } else {
        format!("{}d", days)
    }
}

/// Estimated time remaining, with a fixed phrase for sub-minute values
pub fn format_eta(hours: f64) -> String {
    if hours < ETA_MINUTE_THRESHOLD_HOURS {
        return "less than 1 minute".to_string();
    }
    format_duration(hours)
}

/// Relative age of a timestamp ("just now", "5m ago", ... or an absolute date)
pub fn relative_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_mins = (now - date).num_minutes();

    if diff_mins < 1 {
        return "just now".to_string();
    }
    if diff_mins < 60 {
        return format!("{}m ago", diff_mins);
    }

    let diff_hours = diff_mins / 60;
    if diff_hours < 24 {
        return format!("{}h ago", diff_hours);
    }

    let diff_days = diff_hours / 24;
    if diff_days < 7 {
        return format!("{}d ago", diff_days);
    }

    format_date(date)
}

/// Accuracy points gained per dollar, scaled by 100
pub fn calculate_roi(accuracy_gain: f64, cost: f64) -> f64 {
    if cost <= 0.0 {
        return 0.0;
    }
    (accuracy_gain / cost) * 100.0
}

/// Qualitative GPU efficiency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EfficiencyRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl EfficiencyRating {
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization >= 70.0 {
            EfficiencyRating::Excellent
        } else if utilization >= 50.0 {
            EfficiencyRating::Good
        } else if utilization >= 30.0 {
            EfficiencyRating::Fair
        } else {
            EfficiencyRating::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EfficiencyRating::Excellent => "Excellent",
            EfficiencyRating::Good => "Good",
            EfficiencyRating::Fair => "Fair",
            EfficiencyRating::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for EfficiencyRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Insert comma separators into an integer: 1234567 -> "1,234,567"
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(67.28), "$67.28");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(50_000.0), "$50,000.00");
        assert_eq!(format_currency(-12.5), "-$12.50");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1_500.0), "1.5K");
        assert_eq!(format_number(2_300_000.0), "2.3M");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(75.0), "75.0%");
        assert_eq!(format_percent(89.96), "90.0%");
    }

    #[test]
    fn test_format_eta_bands() {
        assert_eq!(format_eta(0.01), "less than 1 minute");
        assert_eq!(format_eta(0.0), "less than 1 minute");
        assert_eq!(format_eta(0.5), "30m");
        assert_eq!(format_eta(2.25), "2h 15m");
        assert_eq!(format_eta(3.0), "3h");
        assert_eq!(format_eta(25.0), "1d 1h");
        assert_eq!(format_eta(48.0), "2d");
    }

    #[test]
    fn test_format_duration_carries_rounded_minutes() {
        // 2h 59.7m rounds up to a whole hour rather than "2h 60m"
        assert_eq!(format_duration(2.995), "3h");
        assert_eq!(format_duration(0.25), "15m");
        // 59.97m is a whole hour, 23h 59.7m a whole day
        assert_eq!(format_duration(0.9995), "1h");
        assert_eq!(format_eta(0.9995), "1h");
        assert_eq!(format_duration(23.995), "1d");
        assert_eq!(format_duration(24.0), "1d");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now - Duration::seconds(30), now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2d ago");
        assert_eq!(relative_time(now - Duration::days(10), now), "Oct 9, 2026");
    }

    #[test]
    fn test_format_date_time() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(format_date(ts), "Mar 5, 2026");
        assert_eq!(format_date_time(ts), "Mar 5, 02:07 PM");
    }

    #[test]
    fn test_calculate_roi() {
        assert!((calculate_roi(5.0, 500.0) - 1.0).abs() < 1e-9);
        assert_eq!(calculate_roi(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_efficiency_rating() {
        assert_eq!(EfficiencyRating::from_utilization(85.0), EfficiencyRating::Excellent);
        assert_eq!(EfficiencyRating::from_utilization(70.0), EfficiencyRating::Excellent);
        assert_eq!(EfficiencyRating::from_utilization(55.0), EfficiencyRating::Good);
        assert_eq!(EfficiencyRating::from_utilization(30.0), EfficiencyRating::Fair);
        assert_eq!(EfficiencyRating::from_utilization(12.0).label(), "Poor");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_200), "1,200");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
