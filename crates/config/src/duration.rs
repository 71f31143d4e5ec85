//! Duration string parsing for the CLI `--time` flag
//!
//! Accepts the usual unit-suffixed forms: `30s`, `5m`, `1h`, compounds
//! like `1h30m`, plus `ms` for tests. A bare number is treated as seconds.

use bwx_errors::{ConfigError, Error};
use std::time::Duration;

/// Parse a human-entered duration string like `30s`, `5m`, `1h` or `1h30m`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDuration` for empty input, unknown unit
/// suffixes, or malformed numbers.
pub fn parse_duration(input: &str) -> Result<Duration, Error> {
    let s = input.trim();
    if s.is_empty() {
        return Err(invalid(input));
    }

    // Bare number means seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| invalid(input))?;
        if digits_end == 0 {
            return Err(invalid(input));
        }
        let value: u64 = rest[..digits_end].parse().map_err(|_| invalid(input))?;

        let unit_end = digits_end
            + rest[digits_end..]
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(rest.len() - digits_end);
        let part = match &rest[digits_end..unit_end] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            _ => return Err(invalid(input)),
        };
        total += part;
        rest = &rest[unit_end..];
    }

    Ok(total)
}

fn invalid(input: &str) -> Error {
    ConfigError::InvalidDuration {
        input: input.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn compound_and_bare() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2m30s").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "abc", "10x", "s", "-5s", "5 m"] {
            assert!(parse_duration(bad).is_err(), "accepted {bad:?}");
        }
    }
}
