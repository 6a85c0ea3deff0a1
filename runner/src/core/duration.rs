//! Duration grammar shared by the CLI and the config file.
//!
//! Accepted forms are `<integer>[ms|s|m|h]`; a bare integer means seconds.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s|m|h)?\s*$").expect("duration regex is valid")
});

/// Parse a positive duration such as `10s`, `500ms`, `2m` or `10`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let Some(caps) = DURATION_RE.captures(input) else {
        bail!("invalid duration {input:?} (expected <integer>[ms|s|m|h])");
    };
    let value: u64 = caps[1]
        .parse()
        .with_context(|| format!("duration {input:?} out of range"))?;
    let duration = match caps.get(2).map(|unit| unit.as_str()) {
        Some("ms") => Duration::from_millis(value),
        None | Some("s") => Duration::from_secs(value),
        Some("m") => Duration::from_secs(
            value
                .checked_mul(60)
                .with_context(|| format!("duration {input:?} out of range"))?,
        ),
        Some("h") => Duration::from_secs(
            value
                .checked_mul(3600)
                .with_context(|| format!("duration {input:?} out of range"))?,
        ),
        Some(other) => bail!("unknown duration unit {other:?}"),
    };
    if duration.is_zero() {
        bail!("duration must be > 0");
    }
    Ok(duration)
}

/// Render a duration for user-facing lines: `10s` for whole seconds, `1500ms` otherwise.
pub fn format_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// `#[serde(with = "...")]` adapter reading durations from strings.
pub mod serde_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    use super::parse_duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(|err| serde::de::Error::custom(format!("{err:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert_eq!(parse_duration(" 3 s ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        let err = parse_duration("0s").expect_err("zero");
        assert!(err.to_string().contains("> 0"));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("1.5s").is_err());
        assert!(parse_duration("10 days").is_err());
    }

    #[test]
    fn formats_whole_seconds_and_millis() {
        assert_eq!(format_duration(Duration::from_secs(1)), "1s");
        assert_eq!(format_duration(Duration::from_secs(120)), "120s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }
}
