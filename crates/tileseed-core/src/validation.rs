//! Sub-task precondition checks

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::error::ValidationError;
use crate::types::CacheType;

/// Highest zoom level the seed specification accepts
pub const MAX_ZOOM_LEVEL: u32 = 23;

/// Timestamp layout handed to the seeding tool
pub const SEED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Check the cache type named by a task against the supported backing store
pub fn validate_cache_type(cache_type: &str) -> Result<CacheType, ValidationError> {
    CacheType::from_str(cache_type)
        .ok_or_else(|| ValidationError::UnsupportedCacheType(cache_type.to_string()))
}

/// fromZoom must not exceed toZoom
pub fn validate_zoom_range(from: u32, to: u32) -> Result<(), ValidationError> {
    if from > to {
        return Err(ValidationError::InvalidZoomRange { from, to });
    }
    Ok(())
}

/// Parse an ISO-8601 timestamp as UTC.
///
/// Accepts `yyyy-MM-dd`, `yyyy-MM-ddTHH:mm`, `yyyy-MM-ddTHH:mm:ss` with an
/// optional fraction, and any of those followed by `Z` or a numeric offset.
/// Timestamps without an offset are taken as UTC.
pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let invalid = || ValidationError::InvalidDate(value.to_string());

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(with_offset) = DateTime::parse_from_str(value, format) {
            return Ok(with_offset.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(invalid)
}

/// Validate `refresh_before`, shift it forward and render it for the tool.
///
/// The shift keeps tiles written while the seed itself is running from
/// being treated as up to date.
pub fn normalize_refresh_before(value: &str, offset_years: u32) -> Result<String, ValidationError> {
    let parsed = parse_iso8601(value)?;
    let shifted = parsed
        .checked_add_months(Months::new(offset_years.saturating_mul(12)))
        .ok_or_else(|| ValidationError::InvalidDate(value.to_string()))?;
    let rendered = shifted.format(SEED_TIME_FORMAT).to_string();
    debug!(original = value, normalized = %rendered, offset_years, "normalized refresh_before");
    Ok(rendered)
}
