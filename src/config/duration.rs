//! Duration parsing utilities.

use anyhow::Context;

/// Parse a duration string like "1h", "5m", "30s", "500ms", "1000" into
/// milliseconds.
/// Supports:
/// - Plain numbers (interpreted as milliseconds): "1000"
/// - Milliseconds suffix: "500ms"
/// - Seconds suffix: "30s"
/// - Minutes suffix: "5m"
/// - Hours suffix: "1h"
pub fn parse_duration_to_millis(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // "ms" before "m" and "s"
    if let Some(num_str) = s.strip_suffix("ms") {
        return num_str
            .parse::<u64>()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        return scale(hours, 3_600_000, s);
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        return scale(minutes, 60_000, s);
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return scale(secs, 1000, s);
    }

    // No suffix - treat as milliseconds
    s.parse::<u64>()
        .with_context(|| format!("Invalid duration value: {s}"))
}

fn scale(value: u64, millis_per_unit: u64, input: &str) -> anyhow::Result<u64> {
    match value.checked_mul(millis_per_unit) {
        Some(millis) => Ok(millis),
        None => anyhow::bail!("Duration out of range: {input}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number_is_millis() {
        assert_eq!(parse_duration_to_millis("1000").unwrap(), 1000);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_duration_to_millis("500ms").unwrap(), 500);
        assert_eq!(parse_duration_to_millis("30s").unwrap(), 30_000);
        assert_eq!(parse_duration_to_millis("5m").unwrap(), 300_000);
        assert_eq!(parse_duration_to_millis("1h").unwrap(), 3_600_000);
        assert_eq!(parse_duration_to_millis(" 2s ").unwrap(), 2000);
    }

    #[test]
    fn test_invalid() {
        assert!(parse_duration_to_millis("").is_err());
        assert!(parse_duration_to_millis("abc").is_err());
        assert!(parse_duration_to_millis("-5s").is_err());
        assert!(parse_duration_to_millis("1.5m").is_err());
    }

    #[test]
    fn test_overflow_is_error() {
        let err = parse_duration_to_millis("18446744073709551615h").unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(parse_duration_to_millis("307445734561825861m").is_err());
        assert!(parse_duration_to_millis("18446744073709552s").is_err());

        // Largest values that still fit
        assert_eq!(
            parse_duration_to_millis("5124095576030h").unwrap(),
            5_124_095_576_030 * 3_600_000
        );
        assert_eq!(
            parse_duration_to_millis("18446744073709551615ms").unwrap(),
            u64::MAX
        );
    }
}
