//! Lightweight UTC date/time utilities (no chrono dependency).
//!
//! Uses Howard Hinnant's civil date algorithms for Unix <-> date conversion.
//! History records carry their creation time as a string; new records are
//! written as ISO-8601 and older records in `M/D/YYYY h:mm:ss AM|PM` form are
//! still accepted on read.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Convert Unix seconds to ISO-8601 UTC string.
pub fn unix_to_iso8601(secs: u64) -> String {
    let days = (secs / 86400) as i64;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

/// Parse a stored timestamp back to Unix seconds.
///
/// Accepts `YYYY-MM-DDTHH:MM:SSZ` and the legacy `M/D/YYYY h:mm:ss AM|PM`
/// (or 24-hour `M/D/YYYY HH:mm:ss`). Returns `None` for anything else,
/// including dates before the Unix epoch.
pub fn parse_timestamp(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.contains('T') {
        parse_iso8601(s)
    } else {
        parse_legacy(s)
    }
}

fn parse_iso8601(s: &str) -> Option<u64> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    let (date, time) = s.split_once('T')?;
    let mut date_parts = date.split('-');
    let y: i64 = date_parts.next()?.parse().ok()?;
    let m: u64 = date_parts.next()?.parse().ok()?;
    let d: u64 = date_parts.next()?.parse().ok()?;
    if date_parts.next().is_some() {
        return None;
    }
    let (h, min, sec) = parse_clock(time)?;
    to_unix(y, m, d, h, min, sec)
}

fn parse_legacy(s: &str) -> Option<u64> {
    let mut fields = s.split_whitespace();
    let date = fields.next()?;
    let time = fields.next()?;
    let meridiem = fields.next();
    if fields.next().is_some() {
        return None;
    }

    let mut date_parts = date.split('/');
    let m: u64 = date_parts.next()?.parse().ok()?;
    let d: u64 = date_parts.next()?.parse().ok()?;
    let y: i64 = date_parts.next()?.parse().ok()?;
    if date_parts.next().is_some() {
        return None;
    }

    let (h, min, sec) = parse_clock(time)?;
    let h = match meridiem.map(str::to_ascii_uppercase).as_deref() {
        None => h,
        Some("AM") if (1..=12).contains(&h) => h % 12,
        Some("PM") if (1..=12).contains(&h) => h % 12 + 12,
        Some(_) => return None,
    };
    to_unix(y, m, d, h, min, sec)
}

fn parse_clock(s: &str) -> Option<(u64, u64, u64)> {
    let mut parts = s.split(':');
    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let sec: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((h, m, sec))
}

fn to_unix(y: i64, m: u64, d: u64, h: u64, min: u64, sec: u64) -> Option<u64> {
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || h > 23 || min > 59 || sec > 59 {
        return None;
    }
    let days = days_from_civil(y, m, d);
    if days < 0 {
        return None;
    }
    Some(days as u64 * 86400 + h * 3600 + min * 60 + sec)
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Inverse of [`civil_from_days`]: (year, month, day) → Unix epoch days.
fn days_from_civil(y: i64, m: u64, d: u64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(unix_to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_known_date() {
        // 2026-02-21T00:00:00Z = 1771632000
        assert_eq!(unix_to_iso8601(1771632000), "2026-02-21T00:00:00Z");
    }

    #[test]
    fn test_now_is_recent() {
        let ts = unix_to_iso8601(now_unix_secs());
        assert!(ts.starts_with("202"), "timestamp should be in 2020s: {ts}");
    }

    #[test]
    fn test_parse_iso_inverts_format() {
        for secs in [0, 951_782_400, 1_771_632_000, 1_771_632_000 + 86_399] {
            assert_eq!(parse_timestamp(&unix_to_iso8601(secs)), Some(secs));
        }
    }

    #[test]
    fn test_parse_legacy_meridiem() {
        assert_eq!(parse_timestamp("2/21/2026 12:00:00 AM"), Some(1_771_632_000));
        assert_eq!(
            parse_timestamp("2/21/2026 12:30:00 PM"),
            Some(1_771_632_000 + 12 * 3600 + 30 * 60)
        );
        assert_eq!(
            parse_timestamp("2/21/2026 3:04:05 pm"),
            Some(1_771_632_000 + 15 * 3600 + 4 * 60 + 5)
        );
    }

    #[test]
    fn test_parse_legacy_24_hour() {
        assert_eq!(
            parse_timestamp("02/21/2026 23:59:59"),
            Some(1_771_632_000 + 86_399)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2026-13-01T00:00:00Z"), None);
        assert_eq!(parse_timestamp("2/21/2026 13:00:00 PM"), None);
        assert_eq!(parse_timestamp("1969-12-31T23:59:59Z"), None);
    }
}
