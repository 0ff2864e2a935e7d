use chrono::{Datelike, NaiveDateTime, Timelike};

/// `num_days_from_ce` of 1899-12-30, the day before serial 1 in the 1900 system.
const EXCEL_EPOCH_DAYS_FROM_CE: i64 = 693_594;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Spreadsheet serial day number at millisecond precision.
///
/// Serials before 1900-03-01 do not reproduce the 1900 leap-year bug.
#[inline(always)]
pub(crate) fn datetime_to_excel_serial(dt: &NaiveDateTime) -> f64 {
    let days = dt.date().num_days_from_ce() as i64 - EXCEL_EPOCH_DAYS_FROM_CE;
    // Leap-second nanos are clamped into the last millisecond of the second.
    let millis = dt.num_seconds_from_midnight() as i64 * 1000
        + (dt.nanosecond().min(999_999_999) / 1_000_000) as i64;
    days as f64 + millis as f64 / MILLIS_PER_DAY
}
