//! Observation time parsing.
//!
//! The page reports the *start* of the hour the readings cover, e.g.
//! "(At January 05, 2024 13:30)". Stored records carry the *end* of that
//! hour, so 13:30 becomes hour 14 and 23:xx becomes hour 24. The date is
//! never rolled forward.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::model::MalformedInput;

const TIME_FORMAT: &str = "%B %d, %Y %H:%M";

/// Parse the page's observation time into the snapshot's (date, hour).
///
/// Accepts the raw text with its "(At " prefix and ")" suffix, or the bare
/// "<Month> <Day>, <Year> <HH>:<MM>" remainder.
pub fn parse_timestamp(text: &str) -> Result<(NaiveDate, u8), MalformedInput> {
    let invalid = || MalformedInput::InvalidTimestamp(text.to_string());

    let trimmed = text.trim();
    let inner = match trimmed.strip_prefix("(At ") {
        Some(rest) => rest.strip_suffix(')').ok_or_else(invalid)?,
        None => trimmed,
    };

    let inner = inner.trim();
    let parsed = NaiveDateTime::parse_from_str(inner, TIME_FORMAT).map_err(|_| invalid())?;

    // %B also matches "Jan"; the page always spells the month out.
    if !inner.starts_with(&parsed.format("%B ").to_string()) {
        return Err(invalid());
    }

    // hour() is 0..=23, so the end-of-hour value stays within 1..=24.
    let hour = parsed.hour() as u8 + 1;
    Ok((parsed.date(), hour))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_wrapped_timestamp() {
        let (date, hour) = parse_timestamp("(At January 05, 2024 13:30)").unwrap();
        assert_eq!(date, ymd(2024, 1, 5));
        assert_eq!(date.format("%d/%m/%Y").to_string(), "05/01/2024");
        assert_eq!(hour, 14);
    }

    #[test]
    fn test_already_stripped_timestamp() {
        assert_eq!(parse_timestamp("March 17, 2025 08:00"), Ok((ymd(2025, 3, 17), 9)));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(
            parse_timestamp("  (At December 31, 2023 00:00)\n"),
            Ok((ymd(2023, 12, 31), 1))
        );
    }

    #[test]
    fn test_last_hour_of_day_is_24_on_same_date() {
        assert_eq!(parse_timestamp("(At December 31, 2023 23:00)"), Ok((ymd(2023, 12, 31), 24)));
    }

    #[test]
    fn test_missing_closing_paren_is_malformed() {
        assert!(parse_timestamp("(At January 05, 2024 13:30").is_err());
    }

    #[test]
    fn test_non_month_name_is_malformed() {
        let text = "(At 2024-01-05 13:30)";
        assert_eq!(parse_timestamp(text), Err(MalformedInput::InvalidTimestamp(text.to_string())));
    }

    #[test]
    fn test_abbreviated_month_is_malformed() {
        let text = "(At Jan 05, 2024 13:30)";
        assert_eq!(parse_timestamp(text), Err(MalformedInput::InvalidTimestamp(text.to_string())));
        assert!(parse_timestamp("Sep 01, 2024 09:00").is_err());
    }

    #[test]
    fn test_empty_timestamp_is_malformed() {
        assert!(parse_timestamp("").is_err());
    }
}
