//! # Calendar Helpers
//!
//! Due dates advance by calendar months while preserving the day-of-month,
//! clamped to the last valid day of the target month. This is the rule that
//! turns a Jan 31 first due date into Feb 28 / Mar 31 / Apr 30 instead of
//! producing invalid dates.

use chrono::{Datelike, Months, NaiveDate};

/// Adds `months` calendar months to `date`, clamping the day-of-month to the
/// last valid day of the target month.
///
/// ## Example
/// ```rust
/// use boutique_core::dates::add_months_clamped;
/// use chrono::NaiveDate;
///
/// let jan31 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let feb = add_months_clamped(jan31, 1);
/// assert_eq!(feb, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
///
/// // Year carry: Nov + 3 months lands in February of the next year
/// let nov15 = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
/// assert_eq!(
///     add_months_clamped(nov15, 3),
///     NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()
/// );
/// ```
pub fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    // checked_add_months already clamps the day; None only on calendar
    // overflow far outside any business date range.
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = first.and_then(|d| d.checked_add_months(Months::new(1)));
    match (first, next) {
        (Some(a), Some(b)) => b.signed_duration_since(a).num_days() as u32,
        _ => 30,
    }
}

/// True when both dates fall in the same calendar month and year.
///
/// Consolidation eligibility and the monthly statement both hinge on this.
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_months_plain() {
        assert_eq!(add_months_clamped(d(2025, 1, 15), 1), d(2025, 2, 15));
        assert_eq!(add_months_clamped(d(2025, 1, 15), 2), d(2025, 3, 15));
        assert_eq!(add_months_clamped(d(2025, 1, 15), 0), d(2025, 1, 15));
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months_clamped(d(2025, 1, 31), 1), d(2025, 2, 28));
        assert_eq!(add_months_clamped(d(2025, 1, 31), 2), d(2025, 3, 31));
        assert_eq!(add_months_clamped(d(2025, 1, 31), 3), d(2025, 4, 30));
        // Leap year February keeps the 29th
        assert_eq!(add_months_clamped(d(2024, 1, 31), 1), d(2024, 2, 29));
    }

    #[test]
    fn test_add_months_year_carry() {
        // (start_month + offset) mod 12 with year carry
        assert_eq!(add_months_clamped(d(2024, 11, 10), 4), d(2025, 3, 10));
        assert_eq!(add_months_clamped(d(2024, 12, 31), 2), d(2025, 2, 28));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 1), 31);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_same_month() {
        assert!(same_month(d(2025, 3, 1), d(2025, 3, 31)));
        assert!(!same_month(d(2025, 3, 31), d(2025, 4, 1)));
        // Same month number, different year
        assert!(!same_month(d(2024, 3, 10), d(2025, 3, 10)));
    }
}
