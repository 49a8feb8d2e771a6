//! Local/UTC time-of-day conversion and weekday-to-day-offset resolution.
//!
//! Preset time windows are persisted as UTC time-of-day strings and shown
//! to the user in local wall-clock time. Conversion applies the local
//! offset in effect today; daylight-saving transitions are not specially
//! handled (a window saved the day before a transition shifts by the
//! offset delta until re-saved).

use chrono::{Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, Utc};

use crate::error::SwellMateError;

/// Convert a local "HH:MM" time of day to a UTC "HH:MM:SS" string,
/// using the local offset in effect today.
pub fn local_time_to_utc(local: &str) -> Result<String, SwellMateError> {
    to_utc_at_offset(local, current_local_offset())
}

/// Convert a UTC "HH:MM" or "HH:MM:SS" time of day to a local "HH:MM"
/// string, using the local offset in effect today.
pub fn utc_time_to_local(utc: &str) -> Result<String, SwellMateError> {
    to_local_at_offset(utc, current_local_offset())
}

/// Resolve a set of weekday indices (0 = Sunday .. 6 = Saturday) to the
/// ascending list of day offsets within the next week, relative to
/// `today`. An empty or unmatched set yields `[0]` so callers never see
/// an empty offset list.
pub fn weekdays_to_offsets(weekdays: &[u8], today: NaiveDate) -> Vec<u32> {
    let today_idx = today.weekday().num_days_from_sunday();
    let mut offsets: Vec<u32> = (0..7)
        .filter(|i| weekdays.contains(&(((today_idx + i) % 7) as u8)))
        .collect();
    if offsets.is_empty() {
        offsets.push(0);
    }
    offsets
}

/// The local UTC offset in effect right now.
fn current_local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

fn to_utc_at_offset(local: &str, offset: FixedOffset) -> Result<String, SwellMateError> {
    let time = parse_time_of_day(local)?;
    // The date only anchors the arithmetic; wrapping past midnight is
    // absorbed by the datetime and we keep the time component.
    let anchored = Utc::now().date_naive().and_time(time);
    let utc = anchored - Duration::seconds(i64::from(offset.local_minus_utc()));
    Ok(utc.time().format("%H:%M:%S").to_string())
}

fn to_local_at_offset(utc: &str, offset: FixedOffset) -> Result<String, SwellMateError> {
    let time = parse_time_of_day(utc)?;
    let anchored = Utc::now().date_naive().and_time(time);
    let local = anchored + Duration::seconds(i64::from(offset.local_minus_utc()));
    Ok(local.time().format("%H:%M").to_string())
}

/// Parse "HH:MM" or "HH:MM:SS".
pub(crate) fn parse_time_of_day(s: &str) -> Result<NaiveTime, SwellMateError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| SwellMateError::Validation(format!("Invalid time of day '{}': {}", s, e)))
}
