//! Timezone and instant helpers shared by the builder, caster and filter

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::borrow::Cow;

use entity_types::MAX_YEAR;

use crate::error::{ContextError, StructuralError};

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, ContextError> {
    name.parse::<Tz>()
        .map_err(|_| ContextError::InvalidTimezone {
            timezone: name.to_string(),
        })
}

/// Unix milliseconds as a UTC instant
pub fn instant_from_millis(ms: i64) -> Result<DateTime<Utc>, ContextError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(ContextError::InvalidReferenceTime { value: ms })
}

/// Express a UTC instant in `tz`, keeping the offset that applies at that instant
pub fn in_timezone(instant: DateTime<Utc>, tz: Tz) -> DateTime<FixedOffset> {
    let local = instant.with_timezone(&tz);
    local.with_timezone(&local.offset().fix())
}

/// Reference instant of a request, expressed in the request timezone
pub fn reference_datetime(ms: i64, tz: Tz) -> Result<DateTime<FixedOffset>, ContextError> {
    instant_from_millis(ms).map(|instant| in_timezone(instant, tz))
}

/// Move `seconds` (may be fractional) forwards or backwards from a UTC instant
pub fn shift_seconds(instant: DateTime<Utc>, seconds: f64, forward: bool) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let delta = Duration::try_milliseconds((seconds * 1000.0).round() as i64)?;
    if forward {
        instant.checked_add_signed(delta)
    } else {
        instant.checked_sub_signed(delta)
    }
}

/// Parse an ISO-8601 timestamp with offset.
///
/// Expanded years (`+002021-...`) are accepted. Returns `Ok(None)` when the
/// year lies beyond [`MAX_YEAR`]; such values are dropped rather than
/// reported.
pub fn parse_instant(raw: &str) -> Result<Option<DateTime<FixedOffset>>, StructuralError> {
    let Some(normalized) = four_digit_year(raw) else {
        return Ok(None);
    };
    let parsed =
        DateTime::parse_from_rfc3339(&normalized).map_err(|e| StructuralError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
    if parsed.year() > MAX_YEAR {
        return Ok(None);
    }
    Ok(Some(parsed))
}

/// `raw` with an expanded year rewritten to four digits, or `None` when the
/// leading year is beyond [`MAX_YEAR`]
fn four_digit_year(raw: &str) -> Option<Cow<'_, str>> {
    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Some(Cow::Borrowed(raw));
    }
    let year = unsigned[..digits].parse::<u64>().ok()?;
    if year > MAX_YEAR as u64 {
        return None;
    }
    if digits > 4 || unsigned.len() != raw.len() {
        Some(Cow::Owned(format!("{year:04}{}", &unsigned[digits..])))
    } else {
        Some(Cow::Borrowed(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2022-01-01T12:00:00+05:30
    const REFERENCE_MS: i64 = 1_641_018_600_000;

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("Asia/Kolkata").is_ok());
        assert_eq!(
            parse_timezone("Asia/Atlantis"),
            Err(ContextError::InvalidTimezone {
                timezone: "Asia/Atlantis".to_string()
            })
        );
    }

    #[test]
    fn test_reference_datetime_uses_timezone_offset() {
        let tz = parse_timezone("Asia/Kolkata").unwrap();
        let reference = reference_datetime(REFERENCE_MS, tz).unwrap();
        assert_eq!(reference.to_rfc3339(), "2022-01-01T12:00:00+05:30");
    }

    #[test]
    fn test_shift_seconds_both_directions() {
        let instant = instant_from_millis(REFERENCE_MS).unwrap();
        let later = shift_seconds(instant, 7200.0, true).unwrap();
        let earlier = shift_seconds(instant, 7200.0, false).unwrap();
        assert_eq!(later.timestamp_millis() - REFERENCE_MS, 7_200_000);
        assert_eq!(REFERENCE_MS - earlier.timestamp_millis(), 7_200_000);
        assert!(shift_seconds(instant, f64::NAN, true).is_none());
    }

    #[test]
    fn test_parse_instant_accepts_service_format() {
        let parsed = parse_instant("2021-04-17T16:00:00.000+05:30").unwrap().unwrap();
        assert_eq!(parsed.timestamp(), 1_618_655_400);
    }

    #[test]
    fn test_parse_instant_drops_five_digit_years() {
        assert_eq!(parse_instant("10000-01-01T00:00:00.000+05:30"), Ok(None));
        assert_eq!(parse_instant("+12021-01-01T00:00:00.000Z"), Ok(None));
        assert!(parse_instant("9999-12-31T00:00:00.000+00:00").unwrap().is_some());
    }

    #[test]
    fn test_parse_instant_accepts_expanded_years() {
        let parsed = parse_instant("+002021-04-17T16:00:00.000+05:30").unwrap().unwrap();
        assert_eq!(parsed.timestamp(), 1_618_655_400);
        assert_eq!(parse_instant("+0012021-01-01T00:00:00.000Z"), Ok(None));
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        assert!(matches!(
            parse_instant("tomorrow"),
            Err(StructuralError::InvalidTimestamp { .. })
        ));
    }
}
