//! Conditional-GET helpers (§6): `If-Modified-Since` parsing, HTTP-date
//! formatting, and the max-of-elements rule for array payloads.

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

const HTTP_DATE_FMT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn format_http_date(when: DateTime<Utc>) -> String {
    when.format(HTTP_DATE_FMT).to_string()
}

pub fn parse_if_modified_since(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw = headers.get(axum::http::header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// True when `effective_modified` is no newer than the client's cached copy,
/// compared at second granularity (HTTP-date has no finer resolution).
pub fn not_modified(effective_modified: DateTime<Utc>, if_modified_since: Option<DateTime<Utc>>) -> bool {
    match if_modified_since {
        Some(ims) => effective_modified.timestamp() <= ims.timestamp(),
        None => false,
    }
}

/// Max-of-elements effective-modified for an array payload (§6).
pub fn max_modified<I: IntoIterator<Item = DateTime<Utc>>>(items: I) -> Option<DateTime<Utc>> {
    items.into_iter().max()
}

pub fn modified_header(when: DateTime<Utc>) -> HeaderValue {
    HeaderValue::from_str(&format_http_date(when)).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Expires` header value `ttl` in the future, for routes with a fixed
/// cache lifetime (§6: "cache-lifetime = peer check duration", "cache =
/// AgentUpdateInterval").
pub fn expires_header(ttl: std::time::Duration) -> HeaderValue {
    let when = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
    modified_header(when)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::IF_MODIFIED_SINCE;
    use chrono::TimeZone;

    #[test]
    fn round_trips_through_http_date_format() {
        let when = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(IF_MODIFIED_SINCE, modified_header(when));
        let parsed = parse_if_modified_since(&headers).unwrap();
        assert_eq!(parsed.timestamp(), when.timestamp());
    }

    #[test]
    fn not_modified_when_effective_at_or_before_cached() {
        let when = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert!(not_modified(when, Some(when)));
        assert!(not_modified(when - chrono::Duration::seconds(1), Some(when)));
        assert!(!not_modified(when + chrono::Duration::seconds(1), Some(when)));
    }

    #[test]
    fn max_modified_picks_the_latest_element() {
        let a = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(max_modified([a, b]), Some(b));
        assert_eq!(max_modified::<[DateTime<Utc>; 0]>([]), None);
    }
}
