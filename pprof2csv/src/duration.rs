//! Go-style duration notation (`510ms`, `6.05s`, `1m2.5s`).
//!
//! Reports render cost in the notation `go tool pprof` users already read, and
//! previously exported tables are parsed back with the same grammar.

use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

// Keeps `fraction * unit scale` within u128.
const MAX_FRACTION_DIGITS: usize = 20;

/// Errors that can occur while parsing a duration string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration '{0}'")]
    Invalid(String),

    #[error("missing unit in duration '{0}'")]
    MissingUnit(String),

    #[error("unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit { unit: String, input: String },

    #[error("negative duration '{0}'")]
    Negative(String),

    #[error("duration '{0}' overflows")]
    Overflow(String),
}

/// Render a duration the way Go's `time.Duration` prints itself, except that
/// zero is written as `0ns`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0ns".to_string();
    }

    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, 6));
    }

    let seconds = format!("{}s", decimal(nanos % NANOS_PER_MIN, 9));
    let minutes = nanos / NANOS_PER_MIN;
    if minutes == 0 {
        return seconds;
    }
    let hours = nanos / NANOS_PER_HOUR;
    if hours == 0 {
        return format!("{}m{}", minutes, seconds);
    }
    format!("{}h{}m{}", hours, minutes % 60, seconds)
}

/// `value / 10^precision` with trailing zeros of the fraction dropped.
fn decimal(value: u128, precision: u32) -> String {
    let scale = 10u128.pow(precision);
    let whole = value / scale;
    let fraction = value % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = precision as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parse Go duration notation: a sequence of decimal numbers, each with an
/// optional fraction and a unit suffix (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`).
/// A bare `0` is accepted. Fractions below a nanosecond are truncated.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let mut rest = input.trim();
    if let Some(unsigned) = rest.strip_prefix('+') {
        rest = unsigned;
    } else if rest.starts_with('-') {
        return Err(DurationError::Negative(input.to_string()));
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Invalid(input.to_string()));
    }

    let overflow = || DurationError::Overflow(input.to_string());
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let whole_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (whole_digits, after_whole) = rest.split_at(whole_len);
        rest = after_whole;

        let mut fraction_digits = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let fraction_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            fraction_digits = &after_dot[..fraction_len];
            rest = &after_dot[fraction_len..];
        }
        if whole_digits.is_empty() && fraction_digits.is_empty() {
            return Err(DurationError::Invalid(input.to_string()));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let (unit, after_unit) = rest.split_at(unit_len);
        rest = after_unit;

        let scale = unit_scale(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let whole: u128 = if whole_digits.is_empty() {
            0
        } else {
            whole_digits.parse().map_err(|_| overflow())?
        };
        let mut component = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !fraction_digits.is_empty() {
            let digits = &fraction_digits[..fraction_digits.len().min(MAX_FRACTION_DIGITS)];
            let fraction: u128 = digits.parse().map_err(|_| overflow())?;
            let denominator = 10u128.pow(digits.len() as u32);
            component = component
                .checked_add(fraction * scale / denominator)
                .ok_or_else(overflow)?;
        }

        total = total.checked_add(component).ok_or_else(overflow)?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
    let nanos = (total % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, nanos))
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn zero_renders_as_nanoseconds() {
        assert_eq!(format_duration(Duration::ZERO), "0ns");
    }

    #[test]
    fn sub_second_units() {
        assert_eq!(format_duration(Duration::from_nanos(999)), "999ns");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1.5µs");
        assert_eq!(format_duration(ms(30)), "30ms");
        assert_eq!(format_duration(ms(250)), "250ms");
        assert_eq!(format_duration(ms(510)), "510ms");
        assert_eq!(format_duration(Duration::from_nanos(1_234_567)), "1.234567ms");
    }

    #[test]
    fn seconds_drop_trailing_zeros() {
        assert_eq!(format_duration(ms(6050)), "6.05s");
        assert_eq!(format_duration(ms(4200)), "4.2s");
        assert_eq!(format_duration(ms(4190)), "4.19s");
        assert_eq!(format_duration(ms(1000)), "1s");
    }

    #[test]
    fn minutes_and_hours() {
        assert_eq!(format_duration(ms(60_000)), "1m0s");
        assert_eq!(format_duration(ms(62_500)), "1m2.5s");
        assert_eq!(format_duration(ms(3_600_000)), "1h0m0s");
        assert_eq!(format_duration(ms(3_723_500)), "1h2m3.5s");
    }

    #[test]
    fn parse_simple_units() {
        assert_eq!(parse_duration("510ms").unwrap(), ms(510));
        assert_eq!(parse_duration("0ns").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("42ns").unwrap(), Duration::from_nanos(42));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn parse_fractions_exactly() {
        assert_eq!(parse_duration("6.05s").unwrap(), Duration::from_nanos(6_050_000_000));
        assert_eq!(parse_duration("4.19s").unwrap(), ms(4190));
        assert_eq!(parse_duration(".5s").unwrap(), ms(500));
        assert_eq!(parse_duration("1.s").unwrap(), ms(1000));
    }

    #[test]
    fn parse_micro_spellings() {
        let expected = Duration::from_nanos(1_500);
        assert_eq!(parse_duration("1.5us").unwrap(), expected);
        assert_eq!(parse_duration("1.5µs").unwrap(), expected);
        assert_eq!(parse_duration("1.5μs").unwrap(), expected);
    }

    #[test]
    fn parse_compound() {
        assert_eq!(parse_duration("1h2m3.5s").unwrap(), ms(3_723_500));
        assert_eq!(parse_duration("+1m0s").unwrap(), ms(60_000));
    }

    #[test]
    fn formatted_values_parse_back() {
        for d in [ms(6050), Duration::from_nanos(1_500), ms(3_723_500), ms(30)] {
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse_duration(""), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_duration(".s"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_duration("12"), Err(DurationError::MissingUnit(_))));
        assert!(matches!(parse_duration("-1s"), Err(DurationError::Negative(_))));
        assert!(matches!(
            parse_duration("3days"),
            Err(DurationError::UnknownUnit { unit, .. }) if unit == "days"
        ));
        assert!(matches!(
            parse_duration("99999999999999999999999999999999h"),
            Err(DurationError::Overflow(_))
        ));
    }
}
