use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current calendar date in the server's local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current wall-clock time as a naive UTC timestamp.
pub fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Resolves a natural date key from loosely formatted input.
///
/// Accepts `YYYY-MM-DD`, or a datetime whose date portion precedes a `T` or a
/// space. Anything else, including an absent value, resolves to `fallback`.
/// Never fails.
pub fn parse_date_key(raw: Option<&str>, fallback: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback;
    };

    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);

    match NaiveDate::parse_from_str(date_part, DATE_FORMAT) {
        Ok(date) => date,
        Err(_) => {
            log::debug!(
                "[Reconcile] Unparseable date key '{}', defaulting to {}",
                raw,
                fallback
            );
            fallback
        }
    }
}

/// Parses an ISO-ish timestamp. A trailing `Z` or numeric offset is accepted and
/// normalised to UTC; a bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc).naive_utc());
    }

    let without_zulu = raw.strip_suffix('Z').unwrap_or(raw);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(without_zulu, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(without_zulu, DATE_FORMAT)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Like [`parse_timestamp`] but substitutes `fallback` for absent or unparseable input.
pub fn parse_timestamp_or(raw: Option<&str>, fallback: NaiveDateTime) -> NaiveDateTime {
    raw.and_then(parse_timestamp).unwrap_or(fallback)
}

/// Parses a date of birth; unlike date keys an invalid value yields `None`.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Whole years between `date_of_birth` and `on`.
pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// ISO form without offset, readable back by `parse_timestamp`.
pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}
