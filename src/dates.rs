use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub const UNKNOWN_DATE: &str = "UNKNOWN";

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Formats an ISO date as a passport-style `DDMMMYY` token.
///
/// Empty input yields [`UNKNOWN_DATE`]; anything that is not a calendar date is
/// returned unchanged.
pub fn format_passport_date(input: &str) -> String {
    format_passport_date_or(input, UNKNOWN_DATE)
}

pub fn format_passport_date_or(input: &str, unknown: &str) -> String {
    if input.is_empty() {
        return unknown.to_string();
    }
    match parse_calendar_date(input) {
        Some(date) => date_token(date),
        None => input.to_string(),
    }
}

/// Reads the calendar date written in `input` without any timezone shift.
///
/// Timestamps keep the date printed in the string, whatever their offset.
pub fn parse_calendar_date(input: &str) -> Option<Date> {
    let raw = input.trim();
    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Some(date);
    }
    if let Ok(datetime) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(datetime.date());
    }
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
    .map(|datetime| datetime.date())
}

fn date_token(date: Date) -> String {
    let month = MONTHS[usize::from(u8::from(date.month())) - 1];
    format!(
        "{:02}{}{:02}",
        date.day(),
        month,
        date.year().rem_euclid(100)
    )
}
