//! Human-readable governance durations.
//!
//! Voting delays, periods and timelocks are whole seconds. They are printed
//! as at most two non-zero units (`2d 4h`, `5m`, `90s` → `1m 30s`) and can be
//! written on the command line the same way.

use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

const UNITS: [(u64, &str); 4] = [(DAY, "d"), (HOUR, "h"), (MINUTE, "m"), (1, "s")];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration component {0:?}, expected e.g. 30s, 5m, 2h or 3d")]
    InvalidComponent(String),
    #[error("duration overflows u64 seconds")]
    Overflow,
}

/// Format whole seconds using the two most significant non-zero units.
pub fn format_duration(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }
    let mut parts = Vec::with_capacity(2);
    let mut rest = secs;
    for (unit, suffix) in UNITS {
        let count = rest / unit;
        rest %= unit;
        if count > 0 {
            parts.push(format!("{count}{suffix}"));
        } else if !parts.is_empty() {
            // Stop at the first gap so "1d 0h 5m" prints as "1d".
            break;
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}

/// Parse `"3d"`, `"1h 30m"`, `"90"` (bare seconds) or `"2d12h"` into seconds.
pub fn parse_duration(input: &str) -> Result<u64, DurationParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(secs);
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if c.is_whitespace() {
            if !digits.is_empty() {
                return Err(DurationParseError::InvalidComponent(digits));
            }
            continue;
        }
        let unit = UNITS
            .iter()
            .find(|(_, suffix)| suffix.starts_with(c))
            .map(|(unit, _)| *unit)
            .ok_or_else(|| DurationParseError::InvalidComponent(format!("{digits}{c}")))?;
        let count: u64 = digits
            .parse()
            .map_err(|_| DurationParseError::InvalidComponent(format!("{digits}{c}")))?;
        total = count
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or(DurationParseError::Overflow)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(DurationParseError::InvalidComponent(digits));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_governance_defaults() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(5 * MINUTE), "5m");
        assert_eq!(format_duration(DAY), "1d");
        assert_eq!(format_duration(3 * DAY), "3d");
        assert_eq!(format_duration(2 * DAY + 4 * HOUR + 59), "2d 4h");
        assert_eq!(format_duration(DAY + 5 * MINUTE), "1d");
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("30"), Ok(30));
        assert_eq!(parse_duration("30s"), Ok(30));
        assert_eq!(parse_duration("5m"), Ok(300));
        assert_eq!(parse_duration("1h 30m"), Ok(5_400));
        assert_eq!(parse_duration("2d12h"), Ok(2 * DAY + 12 * HOUR));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration("  "), Err(DurationParseError::Empty));
        assert!(matches!(
            parse_duration("5 m"),
            Err(DurationParseError::InvalidComponent(_))
        ));
        assert!(matches!(
            parse_duration("3w"),
            Err(DurationParseError::InvalidComponent(_))
        ));
        assert!(matches!(
            parse_duration("h"),
            Err(DurationParseError::InvalidComponent(_))
        ));
        assert_eq!(
            parse_duration("999999999999999999d"),
            Err(DurationParseError::Overflow)
        );
    }

    proptest! {
        #[test]
        fn parse_accepts_unit_output(days in 0u64..1000, hours in 0u64..24) {
            let secs = days * DAY + hours * HOUR;
            let printed = format_duration(secs);
            prop_assert_eq!(parse_duration(&printed), Ok(secs));
        }
    }
}
