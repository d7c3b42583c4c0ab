use chrono::{Local, NaiveDate};

/// The device-local calendar day. Only call this at the outermost edge;
/// everything below the service boundary takes `today` as a parameter.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Whole days from `from` to `to`. Negative when `from` is in the future.
pub fn day_diff(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn is_yesterday(date: NaiveDate, today: NaiveDate) -> bool {
    day_diff(date, today) == 1
}
