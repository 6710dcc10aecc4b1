//! Conversions between Postgres text output and stored values.
//!
//! Rows reach the pipeline as Postgres text output (`None` is SQL NULL).
//! Dates are stored as days since the Unix epoch and timestamps as
//! microseconds since the Unix epoch, matching Iceberg's physical types.

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, Utc};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

pub(crate) fn parse_bool(text: &str) -> Result<bool, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err("not a boolean".to_string()),
    }
}

pub(crate) fn parse_number<T>(text: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text.trim().parse::<T>().map_err(|e| e.to_string())
}

pub(crate) fn parse_date(text: &str) -> Result<i32, String> {
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| e.to_string())?;
    Ok(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<i64, String> {
    parse_naive(text.trim()).map(|ts| ts.and_utc().timestamp_micros())
}

pub(crate) fn parse_timestamptz(text: &str) -> Result<i64, String> {
    let text = text.trim();
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(text, format) {
            return Ok(ts.timestamp_micros());
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.timestamp_micros());
    }
    // No offset: the value is already UTC.
    parse_timestamp(text)
}

fn parse_naive(text: &str) -> Result<NaiveDateTime, String> {
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| "not a timestamp".to_string())
}

pub(crate) fn format_date(days: i32) -> Option<String> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn utc_from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

pub(crate) fn format_timestamp(micros: i64) -> Option<String> {
    utc_from_micros(micros).map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
}

pub(crate) fn format_timestamptz(micros: i64) -> Option<String> {
    utc_from_micros(micros).map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f+00").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_booleans() {
        assert_eq!(parse_bool("t"), Ok(true));
        assert_eq!(parse_bool("FALSE"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_dates_are_days_since_epoch() {
        assert_eq!(parse_date("1970-01-01"), Ok(0));
        assert_eq!(parse_date("1970-01-02"), Ok(1));
        assert_eq!(parse_date("1969-12-31"), Ok(-1));
        assert_eq!(format_date(19_737).as_deref(), Some("2024-01-15"));
        assert_eq!(parse_date("2024-01-15"), Ok(19_737));
    }

    #[test]
    fn test_timestamps_are_micros_since_epoch() {
        assert_eq!(parse_timestamp("1970-01-01 00:00:01"), Ok(1_000_000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:00.5"), Ok(500_000));
        assert_eq!(
            format_timestamp(1_500_000).as_deref(),
            Some("1970-01-01 00:00:01.500")
        );
    }

    #[test]
    fn test_timestamptz_offsets_normalize_to_utc() {
        let utc = parse_timestamptz("2024-01-02 05:00:00+00").unwrap();
        let eastern = parse_timestamptz("2024-01-02 00:00:00-05").unwrap();
        assert_eq!(utc, eastern);
        assert_eq!(parse_timestamptz("2024-01-02T05:00:00Z").unwrap(), utc);
        assert_eq!(
            format_timestamptz(utc).as_deref(),
            Some("2024-01-02 05:00:00+00")
        );
    }
}
