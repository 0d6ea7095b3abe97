//! Boundary validators for raw request fields.
//!
//! Everything coming off the wire passes through here before it reaches the
//! service: statuses become the closed enum, date strings become timestamps,
//! and optional strings are trimmed. Rejection happens at this boundary,
//! never downstream.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::ticket::{TicketError, TicketStatus};

/// Parse a raw status value into the status enum.
///
/// The input is trimmed and lowercased first; anything outside the four
/// status literals is an `InvalidArgument`.
pub fn parse_status(raw: &str) -> Result<TicketStatus, TicketError> {
    let refined = raw.trim().to_lowercase();
    TicketStatus::parse(&refined)
        .ok_or_else(|| TicketError::InvalidArgument(format!("'{}' is not a valid status", raw)))
}

/// Parse a raw date value.
///
/// Accepts a full timestamp (`YYYY-MM-DDTHH:MM:SS.ffffff`) or a bare date
/// (`YYYY-MM-DD`); the first matching format wins. Unparseable input yields
/// `None`, not an error, so callers treat absent and unparseable alike.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

/// Validate a ticket title.
///
/// Blank-after-trim titles are rejected; the accepted title keeps its
/// original form.
pub fn parse_title(raw: &str) -> Result<String, TicketError> {
    if raw.trim().is_empty() {
        return Err(TicketError::InvalidArgument(
            "Title cannot be blank".to_string(),
        ));
    }
    Ok(raw.to_string())
}

/// Normalize an optional string field: trimmed, with empty-after-trim
/// treated as "not supplied".
pub fn non_blank(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
