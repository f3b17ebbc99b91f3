//! Human-readable durations for operator output and input.

use std::time::Duration;

use thiserror::Error;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;
const SECS_PER_MONTH: u64 = 30 * SECS_PER_DAY;
const SECS_PER_YEAR: u64 = 365 * SECS_PER_DAY;

/// Rendering used when a duration has no whole second.
const LESS_THAN_SECOND: &str = "<1s";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Hour,
    Minute,
    Second,
}

impl Unit {
    const ALL: [Unit; 4] = [Unit::Day, Unit::Hour, Unit::Minute, Unit::Second];

    fn secs(self) -> u64 {
        match self {
            Unit::Day => SECS_PER_DAY,
            Unit::Hour => SECS_PER_HOUR,
            Unit::Minute => SECS_PER_MINUTE,
            Unit::Second => 1,
        }
    }

    fn abbreviation(self) -> &'static str {
        match self {
            Unit::Day => "d",
            Unit::Hour => "h",
            Unit::Minute => "m",
            Unit::Second => "s",
        }
    }

    fn name(self, value: u64) -> String {
        let singular = match self {
            Unit::Day => "day",
            Unit::Hour => "hour",
            Unit::Minute => "minute",
            Unit::Second => "second",
        };
        if value == 1 {
            format!("{value} {singular}")
        } else {
            format!("{value} {singular}s")
        }
    }
}

/// How [`DurationStyle::format`] renders a duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationStyle {
    /// `1d 2h 3s`
    #[default]
    Compact,
    /// `1 day 2 hours 3 seconds`
    Long,
    /// `1 day and 2 hours and 3 seconds`
    LongWithAnd,
    /// `1 day, 2 hours, 3 seconds`
    Natural,
}

impl DurationStyle {
    /// Render the non-zero day/hour/minute/second parts of `duration`.
    /// Sub-second durations render as `<1s`.
    pub fn format(self, duration: Duration) -> String {
        let mut remaining = duration.as_secs();
        if remaining == 0 {
            return LESS_THAN_SECOND.to_string();
        }

        let mut parts = Vec::with_capacity(Unit::ALL.len());
        for unit in Unit::ALL {
            let value = remaining / unit.secs();
            remaining %= unit.secs();
            if value == 0 {
                continue;
            }
            parts.push(match self {
                DurationStyle::Compact => format!("{value}{}", unit.abbreviation()),
                _ => unit.name(value),
            });
        }

        let separator = match self {
            DurationStyle::Compact | DurationStyle::Long => " ",
            DurationStyle::LongWithAnd => " and ",
            DurationStyle::Natural => ", ",
        };
        parts.join(separator)
    }
}

impl std::str::FromStr for DurationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "compact" => Ok(DurationStyle::Compact),
            "long" => Ok(DurationStyle::Long),
            "long_with_and" => Ok(DurationStyle::LongWithAnd),
            "natural" => Ok(DurationStyle::Natural),
            other => Err(format!("unknown duration style: {other}")),
        }
    }
}

/// Rejected duration input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    #[error("empty duration")]
    Empty,

    #[error("expected a number at '{0}'")]
    MissingNumber(String),

    #[error("unknown duration unit '{0}'")]
    UnknownUnit(String),

    #[error("duration out of range")]
    Overflow,
}

/// Parse `30s`, `5m`, `2h`, `1d`, `1w`, `1mo`, `1y` and concatenations
/// such as `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseDurationError::Empty);
    }

    let mut total: u64 = 0;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(ParseDurationError::MissingNumber(rest.to_string()));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| ParseDurationError::Overflow)?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let secs = match unit {
            "s" => 1,
            "m" => SECS_PER_MINUTE,
            "h" => SECS_PER_HOUR,
            "d" => SECS_PER_DAY,
            "w" => SECS_PER_WEEK,
            "mo" => SECS_PER_MONTH,
            "y" => SECS_PER_YEAR,
            other => return Err(ParseDurationError::UnknownUnit(other.to_string())),
        };
        rest = &rest[unit_len..];

        total = value
            .checked_mul(secs)
            .and_then(|v| total.checked_add(v))
            .ok_or(ParseDurationError::Overflow)?;
    }

    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_styles() {
        let d = Duration::from_secs(SECS_PER_DAY + 2 * SECS_PER_HOUR + 3);
        assert_eq!(DurationStyle::Compact.format(d), "1d 2h 3s");
        assert_eq!(DurationStyle::Long.format(d), "1 day 2 hours 3 seconds");
        assert_eq!(
            DurationStyle::LongWithAnd.format(d),
            "1 day and 2 hours and 3 seconds"
        );
        assert_eq!(DurationStyle::Natural.format(d), "1 day, 2 hours, 3 seconds");
    }

    #[test]
    fn test_format_sub_second() {
        assert_eq!(DurationStyle::Compact.format(Duration::ZERO), "<1s");
        assert_eq!(DurationStyle::Long.format(Duration::from_millis(999)), "<1s");
    }

    #[test]
    fn test_parse_units_and_concatenation() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5_400)));
        assert_eq!(parse_duration("1w"), Ok(Duration::from_secs(SECS_PER_WEEK)));
        assert_eq!(parse_duration("1mo"), Ok(Duration::from_secs(SECS_PER_MONTH)));
        assert_eq!(parse_duration(" 2d "), Ok(Duration::from_secs(2 * SECS_PER_DAY)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_duration(""), Err(ParseDurationError::Empty));
        assert!(matches!(parse_duration("h"), Err(ParseDurationError::MissingNumber(_))));
        assert!(matches!(parse_duration("10x"), Err(ParseDurationError::UnknownUnit(_))));
        assert!(matches!(parse_duration("10"), Err(ParseDurationError::UnknownUnit(_))));
        assert_eq!(
            parse_duration("99999999999999999999y"),
            Err(ParseDurationError::Overflow)
        );
    }

    #[test]
    fn test_style_from_str() {
        assert_eq!("long-with-and".parse(), Ok(DurationStyle::LongWithAnd));
        assert!("fancy".parse::<DurationStyle>().is_err());
    }
}
