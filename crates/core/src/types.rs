/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Lease boundaries are stored as Unix epoch seconds.
pub type EpochSecs = i64;

/// Current time as Unix epoch seconds.
pub fn epoch_now() -> EpochSecs {
    chrono::Utc::now().timestamp()
}

/// Convert epoch seconds into a [`Timestamp`], clamping out-of-range values
/// to the Unix epoch.
pub fn timestamp_from_epoch(secs: EpochSecs) -> Timestamp {
    chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
