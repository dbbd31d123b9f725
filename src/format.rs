//! Display helpers for upload metadata.
//!
//! Both helpers are total: they never fail, they degrade to a neutral
//! rendering (`"0 Bytes"`, `""`) when the input is missing or garbage. The
//! backend's metadata is shown as-is, so a malformed field must not take the
//! whole view down with it.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// Size units, base 1024.
const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
const K: f64 = 1024.0;

/// Rendering used for upload timestamps.
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a raw byte count using the largest unit that keeps the value ≥ 1.
///
/// Values are rounded to two decimals and trailing zeros are dropped.
/// Zero, negative, NaN and infinite counts render as `"0 Bytes"`. Anything at
/// or above 1024 GB stays in `GB`.
///
/// ```rust
/// use docx2pdf_client::format::format_bytes;
///
/// assert_eq!(format_bytes(12345.0), "12.06 KB");
/// assert_eq!(format_bytes(1024.0), "1 KB");
/// assert_eq!(format_bytes(f64::NAN), "0 Bytes");
/// ```
pub fn format_bytes(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes;
    let mut unit = 0;
    while value >= K && unit < UNITS.len() - 1 {
        value /= K;
        unit += 1;
    }

    format!("{} {}", two_decimals(value), UNITS[unit])
}

/// [`format_bytes`] for integer sizes as reported by the backend.
pub fn format_size(bytes: u64) -> String {
    format_bytes(bytes as f64)
}

/// Round to two decimals and strip insignificant zeros ("12.50" → "12.5").
fn two_decimals(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// Parse an ISO-8601-ish timestamp.
///
/// Accepted shapes:
/// * RFC 3339 with offset: `2024-01-01T00:00:00Z`, `2024-01-01T02:00:00+02:00`
/// * naive date-time, read as local time: `2024-01-01T12:30:00.123456`
///   (what the upload service emits), also with a space separator
/// * bare date, read as UTC midnight: `2024-01-01`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().with_timezone(&Local))
}

/// Render a backend timestamp for display in the local time zone.
///
/// Missing, empty, or unparseable input renders as an empty string.
pub fn format_timestamp(input: Option<&str>) -> String {
    input
        .and_then(parse_timestamp)
        .map(|dt| dt.format(TIMESTAMP_DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Invert `format_bytes` so magnitudes can be compared across units.
    fn magnitude(rendered: &str) -> f64 {
        let (num, unit) = rendered.split_once(' ').unwrap();
        let exp = UNITS.iter().position(|u| *u == unit).unwrap();
        num.parse::<f64>().unwrap() * K.powi(exp as i32)
    }

    #[test]
    fn zero_and_invalid_render_as_zero_bytes() {
        assert_eq!(format_bytes(0.0), "0 Bytes");
        assert_eq!(format_bytes(f64::NAN), "0 Bytes");
        assert_eq!(format_bytes(-5.0), "0 Bytes");
        assert_eq!(format_bytes(f64::INFINITY), "0 Bytes");
        assert_eq!(format_size(0), "0 Bytes");
    }

    #[test]
    fn picks_largest_unit_not_exceeding_value() {
        assert_eq!(format_size(1), "1 Bytes");
        assert_eq!(format_size(1023), "1023 Bytes");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(12_345), "12.06 KB");
        assert_eq!(format_size(1024 * 1024), "1 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn stays_in_gb_above_terabyte() {
        assert_eq!(format_size(2 * 1024u64.pow(4)), "2048 GB");
    }

    #[test]
    fn sub_byte_values_use_bytes_unit() {
        assert_eq!(format_bytes(0.5), "0.5 Bytes");
    }

    #[test]
    fn magnitude_is_monotonic_across_unit_boundaries() {
        let mut samples: Vec<u64> = Vec::new();
        for exp in 0..4u32 {
            let base = 1024u64.pow(exp);
            for delta in [0u64, 1, 2, 5, 10, 100, 511, 512, 1000, 1023] {
                samples.push(base * 1024 - delta.min(base * 1024 - 1));
                samples.push(base * 1024 + delta);
            }
        }
        samples.sort_unstable();
        samples.dedup();

        let mut previous = 0.0;
        for b in samples {
            let m = magnitude(&format_size(b));
            assert!(
                m >= previous,
                "format_size({b}) = {} went backwards",
                format_size(b)
            );
            previous = m;
        }
    }

    #[test]
    fn rfc3339_timestamp_is_rendered_in_local_time() {
        let expected = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap()
            .with_timezone(&Local)
            .format(TIMESTAMP_DISPLAY_FORMAT)
            .to_string();
        assert_eq!(format_timestamp(Some("2024-01-01T00:00:00Z")), expected);
    }

    #[test]
    fn naive_isoformat_is_read_as_local_time() {
        assert_eq!(
            format_timestamp(Some("2024-03-05T14:07:09.123456")),
            "2024-03-05 14:07:09"
        );
        assert_eq!(
            format_timestamp(Some("2024-03-05T14:07:09")),
            "2024-03-05 14:07:09"
        );
    }

    #[test]
    fn missing_or_garbage_timestamp_is_empty() {
        assert_eq!(format_timestamp(None), "");
        assert_eq!(format_timestamp(Some("")), "");
        assert_eq!(format_timestamp(Some("   ")), "");
        assert_eq!(format_timestamp(Some("yesterday")), "");
        assert_eq!(format_timestamp(Some("2024-13-45T99:00:00")), "");
    }

    #[test]
    fn bare_date_is_utc_midnight() {
        let parsed = parse_timestamp("2024-06-30").unwrap();
        assert_eq!(
            parsed.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()
        );
    }
}
