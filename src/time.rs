//! Calendar-month arithmetic.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone};

/// First day of the month containing `date`.
pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_day_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Shifts `date` by `months` (negative goes back), clamping the day to the
/// length of the target month: Jan 31 + 1 month is Feb 28 (or 29).
///
/// Returns `None` when the result is out of range.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let shift = Months::new(months.unsigned_abs());
    if months >= 0 {
        date.checked_add_months(shift)
    } else {
        date.checked_sub_months(shift)
    }
}

/// Midnight on the first day of the month containing `at`, in the same
/// timezone.
///
/// Returns `None` when that local midnight does not exist (a DST gap).
pub fn first_instant_of_month<Tz: TimeZone>(at: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let first = first_day_of_month(at.date_naive()).and_hms_opt(0, 0, 0)?;
    at.timezone().from_local_datetime(&first).earliest()
}
