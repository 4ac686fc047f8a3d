//! Validation of externally supplied identifiers.
//!
//! Every operation converts client-provided id strings through
//! [`parse_id`] before touching the store.

use crate::error::CoreError;
use crate::types::{DbId, EpochSecs};

/// Parse a required identifier.
///
/// `param` is the human-readable parameter name used in error messages
/// (e.g. `"Unit ID"`).
///
/// - absent or blank input fails with [`CoreError::MissingParameter`];
/// - anything other than a positive base-10 integer fails with
///   [`CoreError::InvalidIdentifier`].
pub fn parse_id(param: &'static str, raw: Option<&str>) -> Result<DbId, CoreError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CoreError::MissingParameter { param })?;
    parse_present_id(param, raw)
}

/// Parse an optional identifier. Absent or blank input yields `Ok(None)`.
pub fn parse_optional_id(param: &'static str, raw: Option<&str>) -> Result<Option<DbId>, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_present_id(param, raw).map(Some),
        None => Ok(None),
    }
}

/// Parse a required Unix timestamp in seconds. Zero is accepted, values
/// that do not map to a calendar time are not.
pub fn parse_epoch(param: &'static str, raw: Option<&str>) -> Result<EpochSecs, CoreError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CoreError::MissingParameter { param })?;
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidIdentifier { param });
    }
    raw.parse::<EpochSecs>()
        .ok()
        .filter(|&secs| chrono::DateTime::from_timestamp(secs, 0).is_some())
        .ok_or(CoreError::InvalidIdentifier { param })
}

fn parse_present_id(param: &'static str, raw: &str) -> Result<DbId, CoreError> {
    // `i64::from_str` accepts a leading '+', which is not a canonical id.
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidIdentifier { param });
    }
    match raw.parse::<DbId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CoreError::InvalidIdentifier { param }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn accepts_positive_integers() {
        assert_eq!(parse_id("Unit ID", Some("42")).unwrap(), 42);
        assert_eq!(parse_id("Unit ID", Some("  7 ")).unwrap(), 7);
    }

    #[test]
    fn missing_and_blank_are_missing_parameter() {
        assert_matches!(
            parse_id("Unit ID", None),
            Err(CoreError::MissingParameter { param: "Unit ID" })
        );
        assert_matches!(
            parse_id("Unit ID", Some("   ")),
            Err(CoreError::MissingParameter { .. })
        );
    }

    #[test]
    fn malformed_values_are_invalid_identifier() {
        for raw in ["badformat", "-3", "0", "+5", "1.5", "99999999999999999999", "0x10"] {
            assert_matches!(
                parse_id("Activity Log ID", Some(raw)),
                Err(CoreError::InvalidIdentifier { .. }),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn epochs_allow_zero() {
        assert_eq!(parse_epoch("Start Time", Some("0")).unwrap(), 0);
        assert_eq!(parse_epoch("Start Time", Some("1700000000")).unwrap(), 1_700_000_000);
        assert_matches!(
            parse_epoch("Start Time", Some("yesterday")),
            Err(CoreError::InvalidIdentifier { param: "Start Time" })
        );
        assert_matches!(
            parse_epoch("End Time", None),
            Err(CoreError::MissingParameter { param: "End Time" })
        );
    }

    #[test]
    fn epochs_beyond_the_calendar_are_invalid() {
        assert_matches!(
            parse_epoch("End Time", Some("9223372036854775807")),
            Err(CoreError::InvalidIdentifier { param: "End Time" })
        );
        assert_matches!(
            parse_epoch("End Time", Some("99999999999999999")),
            Err(CoreError::InvalidIdentifier { param: "End Time" })
        );
    }

    #[test]
    fn optional_ids() {
        assert_eq!(parse_optional_id("Session ID", None).unwrap(), None);
        assert_eq!(parse_optional_id("Session ID", Some("")).unwrap(), None);
        assert_eq!(parse_optional_id("Session ID", Some("9")).unwrap(), Some(9));
        assert_matches!(
            parse_optional_id("Session ID", Some("nine")),
            Err(CoreError::InvalidIdentifier { .. })
        );
    }
}
