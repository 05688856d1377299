use chrono::{Datelike, Local, NaiveDate};

/// The clinic's calendar date. Visit dates, registrations, dashboard counts and
/// yearly sequence numbers all roll over at local midnight, not UTC midnight.
pub fn clinic_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn clinic_year() -> i32 {
    clinic_today().year()
}
