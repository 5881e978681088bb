//! A minimal parser for Go-style duration strings (`"30s"`, `"1h30m"`,
//! `"500ms"`) as used in `AgentDown`'s `warning`/`critical` parameters.

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration literal: {0:?}")]
pub struct ParseDurationError(pub String);

/// Parses a sequence of `<number><unit>` pairs (`ns`, `us`/`µs`, `ms`, `s`,
/// `m`, `h`), optionally prefixed with `-`. An empty string parses to zero.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let original = input;
    let mut rest = input.trim();
    if rest.is_empty() {
        return Ok(Duration::zero());
    }

    let negative = if let Some(stripped) = rest.strip_prefix('-') {
        rest = stripped;
        true
    } else {
        rest = rest.strip_prefix('+').unwrap_or(rest);
        false
    };

    let mut total_nanos: i64 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ParseDurationError(original.to_string()))?;
        if digits_end == 0 {
            return Err(ParseDurationError(original.to_string()));
        }
        let (number, remainder) = rest.split_at(digits_end);
        let value: f64 = number.parse().map_err(|_| ParseDurationError(original.to_string()))?;

        let (unit, remainder) = split_unit(remainder).ok_or_else(|| ParseDurationError(original.to_string()))?;
        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "\u{b5}s" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            _ => return Err(ParseDurationError(original.to_string())),
        };
        total_nanos += (value * nanos_per_unit).round() as i64;
        rest = remainder;
    }

    let total_nanos = if negative { -total_nanos } else { total_nanos };
    Ok(Duration::nanoseconds(total_nanos))
}

/// Splits the longest known unit prefix off `rest`, longest-match-first so
/// `"ms"` isn't mistaken for `"m"` followed by `"s"`.
fn split_unit(rest: &str) -> Option<(&str, &str)> {
    // "ms" before "m", "us"/"µs" before "s": bare "s" is checked last so it
    // doesn't shadow the two-character units.
    const UNITS: [&str; 6] = ["ns", "us", "\u{b5}s", "ms", "h", "m"];
    for unit in UNITS {
        if let Some(remainder) = rest.strip_prefix(unit) {
            return Some((unit, remainder));
        }
    }
    rest.strip_prefix('s').map(|remainder| ("s", remainder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(parse_duration("").unwrap(), Duration::zero());
    }

    #[test]
    fn simple_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::minutes(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::milliseconds(500));
    }

    #[test]
    fn compound_duration() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::minutes(90));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("banana").is_err());
    }
}
